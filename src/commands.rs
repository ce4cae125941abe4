use tracing::{info, warn};

use crate::core::error::SyncResult;
use crate::core::events::EventSink;
use crate::core::importer::{self, ImportReport};
use crate::core::reconcile::{self, ProjectStatus, ReconcileOptions, ReconcileSummary, Reconciler};
use crate::core::rollback::{self, RollbackOutcome};
use crate::core::state::AppState;

// ── Update ──────────────────────────────────────────

/// Import untracked files, then sync every followed project.
pub async fn update(state: &AppState, force: bool, events: EventSink) -> SyncResult<ReconcileSummary> {
    state.config.require_api_key()?;
    bootstrap_import(state).await;

    if force {
        info!("Force update enabled, all mods will be re-downloaded");
    }
    let reconciler = Reconciler::new(
        state.registry.clone(),
        state.store.clone(),
        state.vault.clone(),
        state.config.target.clone(),
        ReconcileOptions {
            force,
            keep_old_versions: state.config.keep_old_versions,
            concurrency: state.config.concurrency,
        },
        events,
    );
    reconciler.run().await
}

// ── Rollback ────────────────────────────────────────

pub async fn rollback(state: &AppState, slug: &str) -> SyncResult<RollbackOutcome> {
    rollback::rollback(state.store.as_ref(), &state.vault, slug).await
}

// ── Import ──────────────────────────────────────────

pub async fn import(state: &AppState) -> SyncResult<ImportReport> {
    importer::import_installed(state.registry.as_ref(), state.store.as_ref(), &state.vault).await
}

// ── Status ──────────────────────────────────────────

pub async fn status(state: &AppState) -> SyncResult<Vec<ProjectStatus>> {
    state.config.require_api_key()?;
    bootstrap_import(state).await;
    reconcile::survey(
        state.registry.clone(),
        state.store.clone(),
        &state.vault,
        &state.config.target,
    )
    .await
}

/// Adopt files placed by hand before deciding anything. Never fatal.
async fn bootstrap_import(state: &AppState) {
    if let Err(e) = import(state).await {
        warn!(error = %e, "Failed to import existing mods");
    }
}
