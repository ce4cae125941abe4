// ─── Rollback ───
// Restores a project's previous version from the archive. Each history
// entry can be consumed once; rolling back again walks further back.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::core::error::{SyncError, SyncResult};
use crate::core::store::ModStore;
use crate::core::vault::{self, FileVault};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RollbackOutcome {
    /// The slug is not tracked.
    NothingToRollBack,
    Restored {
        slug: String,
        title: String,
        color: Option<u32>,
        from_version: String,
        to_version_id: String,
        to_version_number: String,
        install_path: PathBuf,
    },
}

/// Roll `slug` back to its most recently superseded version.
pub async fn rollback(
    store: &dyn ModStore,
    vault: &FileVault,
    slug: &str,
) -> SyncResult<RollbackOutcome> {
    restore_previous(store, vault, slug)
        .instrument(info_span!("rollback", project_slug = %slug))
        .await
}

async fn restore_previous(
    store: &dyn ModStore,
    vault: &FileVault,
    slug: &str,
) -> SyncResult<RollbackOutcome> {
    let Some(mut item) = store.find_by_slug(slug)? else {
        warn!("Mod not found in database");
        return Ok(RollbackOutcome::NothingToRollBack);
    };
    info!(title = %item.title, "Attempting rollback");

    let entry = store
        .most_recent_history(slug)?
        .ok_or_else(|| SyncError::NoHistory(slug.to_string()))?;

    let archive_path = entry
        .archive_path
        .clone()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| SyncError::MissingArchivePath {
            slug: slug.to_string(),
            version_id: entry.version_id.clone(),
        })?;
    if !vault::file_exists(&archive_path).await {
        return Err(SyncError::ArchiveMissing(archive_path));
    }

    info!(file = %item.install_path.display(), "Removing current version");
    if let Err(e) = vault.remove(&item.install_path).await {
        warn!(file = %item.install_path.display(), error = %e, "Failed to remove current version");
    }

    let target_dir = item
        .install_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let target = target_dir.join(&entry.file_name);
    info!(file = %entry.file_name, version = %entry.version_id, "Restoring previous version");
    vault.restore(&archive_path, &target).await?;

    let from_version = item.version_id.clone();
    item.version_id = entry.version_id.clone();
    item.version_number = entry.version_number.clone();
    item.file_name = entry.file_name.clone();
    item.install_path = target;
    store.save(&item)?;

    if let Err(e) = store.delete_history(&entry) {
        warn!(version = %entry.version_id, error = %e, "Failed to delete history record");
    }

    info!(
        restored_version_id = %item.version_id,
        restored_file = %item.file_name,
        "Rollback successful"
    );
    Ok(RollbackOutcome::Restored {
        slug: item.project_slug,
        title: item.title,
        color: item.color,
        from_version,
        to_version_id: item.version_id,
        to_version_number: item.version_number,
        install_path: item.install_path,
    })
}
