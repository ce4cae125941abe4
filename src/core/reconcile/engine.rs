// ─── Reconciliation Engine ───
// Fans out one task per eligible followed project, converges each against
// the store and the vault, then joins everything into a summary.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

use super::classify::{check_eligibility, classify, recorded_file_path, Eligibility, Plan};
use crate::core::error::{SyncError, SyncResult};
use crate::core::events::{EventKind, EventSink, ProgressEvent, ProjectLabel};
use crate::core::platform::{Category, TargetPlatform};
use crate::core::registry::{Project, RegistryClient, Version, VersionFile};
use crate::core::store::{HistoryEntry, ModStore, TrackedItem};
use crate::core::vault::{self, FileVault};

/// How many project units may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyLimit {
    Unbounded,
    Limited(NonZeroUsize),
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Re-download projects that are already at the latest version.
    pub force: bool,
    /// Archive superseded files instead of deleting them.
    pub keep_old_versions: bool,
    pub concurrency: ConcurrencyLimit,
}

/// Result of one project unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectOutcome {
    Installed,
    Repaired,
    Reinstalled,
    Upgraded,
    UpToDate,
    NoCompatibleVersion,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub followed: u64,
    /// Dropped by the category / side filter before scheduling.
    pub filtered: u64,
    pub installed: u64,
    /// Upgrades, forced reinstalls and repairs.
    pub updated: u64,
    pub up_to_date: u64,
    pub no_compatible_version: u64,
    pub failed: u64,
}

impl ReconcileSummary {
    fn record(&mut self, outcome: &ProjectOutcome) {
        match outcome {
            ProjectOutcome::UpToDate => self.up_to_date += 1,
            ProjectOutcome::NoCompatibleVersion => self.no_compatible_version += 1,
            ProjectOutcome::Failed(_) => self.failed += 1,
            // Counted through the shared atomic counters.
            ProjectOutcome::Installed
            | ProjectOutcome::Repaired
            | ProjectOutcome::Reinstalled
            | ProjectOutcome::Upgraded => {}
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "Finished. Downloaded {} new mods, updated {} existing mods.",
            self.installed, self.updated
        )
    }
}

#[derive(Debug, Default)]
struct Counters {
    installed: AtomicU64,
    updated: AtomicU64,
}

struct Shared {
    registry: Arc<dyn RegistryClient>,
    store: Arc<dyn ModStore>,
    vault: FileVault,
    target: TargetPlatform,
    options: ReconcileOptions,
    events: EventSink,
    counters: Counters,
}

/// Converges local state with the latest compatible remote versions.
pub struct Reconciler {
    shared: Arc<Shared>,
}

impl Reconciler {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        store: Arc<dyn ModStore>,
        vault: FileVault,
        target: TargetPlatform,
        options: ReconcileOptions,
        events: EventSink,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry,
                store,
                vault,
                target,
                options,
                events,
                counters: Counters::default(),
            }),
        }
    }

    /// Run one full reconciliation.
    ///
    /// Only failing to list followed projects aborts the batch; every
    /// per-project failure is reported as an `error` event and counted.
    pub async fn run(&self) -> SyncResult<ReconcileSummary> {
        let shared = &self.shared;
        let events = &shared.events;

        events.status("Fetching followed projects...");
        let projects = match shared.registry.list_followed_projects().await {
            Ok(projects) => projects,
            Err(e) => {
                error!(error = %e, "Failed to get followed projects");
                events.emit(ProgressEvent::new(
                    EventKind::Error,
                    format!("Failed to get followed projects: {}", e),
                ));
                events.emit(ProgressEvent::new(EventKind::Done, "Aborted"));
                return Err(e);
            }
        };

        let mut summary = ReconcileSummary {
            followed: projects.len() as u64,
            ..Default::default()
        };

        if projects.is_empty() {
            info!("No followed projects found.");
            events.status("No followed projects found.");
        } else {
            info!(
                "Found {} followed projects. Checking for updates for Minecraft {} ({})...",
                projects.len(),
                shared.target.game_version,
                shared.target.loader
            );
            events.status(format!(
                "Checking {} projects for Minecraft {} ({})",
                projects.len(),
                shared.target.game_version,
                shared.target.loader
            ));
            self.fan_out(projects, &mut summary).await;
        }

        summary.installed = shared.counters.installed.load(Ordering::SeqCst);
        summary.updated = shared.counters.updated.load(Ordering::SeqCst);

        info!("{}", summary.describe());
        events.emit(ProgressEvent::new(EventKind::Summary, summary.describe()));
        events.emit(ProgressEvent::new(EventKind::Done, "Finished"));
        Ok(summary)
    }

    async fn fan_out(&self, projects: Vec<Project>, summary: &mut ReconcileSummary) {
        let limiter = match self.shared.options.concurrency {
            ConcurrencyLimit::Unbounded => None,
            ConcurrencyLimit::Limited(n) => Some(Arc::new(Semaphore::new(n.get()))),
        };

        let mut units = JoinSet::new();
        for project in projects {
            let category = match check_eligibility(&project, &self.shared.target.installation) {
                Eligibility::Eligible(category) => category,
                Eligibility::UnsupportedType(project_type) => {
                    info!(
                        title = %project.title,
                        project_type = %project_type,
                        "Skipping non-mod/shader/resourcepack project"
                    );
                    summary.filtered += 1;
                    continue;
                }
                Eligibility::IncompatibleSide => {
                    info!(
                        title = %project.title,
                        installation_type = %self.shared.target.installation,
                        "Skipping project, incompatible with installation type"
                    );
                    summary.filtered += 1;
                    continue;
                }
            };

            let shared = Arc::clone(&self.shared);
            let limiter = limiter.clone();
            let span = info_span!("project", project_slug = %project.slug);
            units.spawn(
                async move {
                    let _permit = match limiter {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    shared.reconcile_project(project, category).await
                }
                .instrument(span),
            );
        }

        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    error!(error = %e, "Project task did not complete");
                    summary.failed += 1;
                }
            }
        }
    }
}

impl Shared {
    async fn reconcile_project(&self, project: Project, category: Category) -> ProjectOutcome {
        let label = ProjectLabel {
            title: project.title.clone(),
            slug: project.slug.clone(),
            color: project.color,
        };
        info!("Checking project");
        self.events.emit(
            ProgressEvent::new(EventKind::Check, format!("Checking {}", project.title))
                .for_project(&label),
        );

        match self.try_reconcile(&project, category, &label).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Project sync failed");
                self.events
                    .emit(ProgressEvent::new(EventKind::Error, e.to_string()).for_project(&label));
                ProjectOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_reconcile(
        &self,
        project: &Project,
        category: Category,
        label: &ProjectLabel,
    ) -> SyncResult<ProjectOutcome> {
        let versions = self
            .registry
            .list_compatible_versions(
                &project.slug,
                category,
                &self.target.game_version,
                &self.target.loader,
            )
            .await?;

        let Some(latest) = versions.into_iter().next() else {
            info!("No compatible versions found.");
            self.events.emit(
                ProgressEvent::new(EventKind::Status, "No compatible versions found")
                    .for_project(label),
            );
            return Ok(ProjectOutcome::NoCompatibleVersion);
        };
        info!(
            version_id = %latest.id,
            version_number = %latest.version_number,
            "Latest compatible version found"
        );

        let file = latest
            .primary_file()
            .ok_or_else(|| SyncError::NoFiles(latest.id.clone()))?
            .clone();

        let base_dir = self.vault.target_directory(category);
        let slug = project.slug.clone();
        let existing = self.blocking_store(move |store| store.find_by_slug(&slug)).await?;
        let file_present = match &existing {
            Some(item) => vault::file_exists(&recorded_file_path(item, &base_dir)).await,
            None => false,
        };

        let step = Step {
            project,
            version: &latest,
            file: &file,
            base_dir: &base_dir,
            label,
        };

        match classify(existing, file_present, &latest.id, self.options.force) {
            Plan::Install => {
                info!(version = %latest.version_number, "New mod - downloading");
                self.install_new(&step).await?;
                Ok(ProjectOutcome::Installed)
            }
            Plan::Repair(item) => {
                warn!(
                    path = %recorded_file_path(&item, &base_dir).display(),
                    "Installed file is missing, reinstalling"
                );
                self.replace(item, &step, false).await?;
                Ok(ProjectOutcome::Repaired)
            }
            Plan::ForceReinstall(item) => {
                info!(version = %item.version_id, "Force updating mod");
                self.replace(item, &step, true).await?;
                Ok(ProjectOutcome::Reinstalled)
            }
            Plan::Upgrade(item) => {
                info!(
                    current_version = %item.version_id,
                    new_version = %latest.id,
                    "Update available"
                );
                self.replace(item, &step, true).await?;
                Ok(ProjectOutcome::Upgraded)
            }
            Plan::UpToDate(item) => {
                info!(version = %item.version_id, "Mod is already up to date");
                self.events.emit(
                    ProgressEvent::new(EventKind::Status, "Already up to date")
                        .for_project(label)
                        .with_version(display_version(&item.version_number, &item.version_id)),
                );
                Ok(ProjectOutcome::UpToDate)
            }
        }
    }

    async fn install_new(&self, step: &Step<'_>) -> SyncResult<()> {
        let dest = self.download(step).await?;

        let item = TrackedItem::installed(step.project, step.version, step.file, dest);
        if let Err(e) = self.blocking_store(move |store| store.create(&item)).await {
            warn!(error = %e, "Failed to save mod to database");
        }
        self.counters.installed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Supersede a tracked item with the step's version. With
    /// `supersede_old` the old file is archived or removed and a history
    /// entry recorded first.
    async fn replace(
        &self,
        mut item: TrackedItem,
        step: &Step<'_>,
        supersede_old: bool,
    ) -> SyncResult<()> {
        if supersede_old {
            self.supersede(&item, step.base_dir).await;
        }

        let dest = self.download(step).await?;

        item.point_at(step.version, step.file, dest);
        item.refresh_metadata(step.project);
        if let Err(e) = self.blocking_store(move |store| store.save(&item)).await {
            warn!(error = %e, "Failed to update database record");
        }
        self.counters.updated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn supersede(&self, item: &TrackedItem, base_dir: &Path) {
        let archive_path = match self
            .vault
            .archive_or_remove(
                &item.file_name,
                &item.version_id,
                base_dir,
                self.options.keep_old_versions,
            )
            .await
        {
            Ok(path) => path,
            Err(e) => {
                warn!(file = %item.file_name, error = %e, "Failed to archive or remove old version");
                None
            }
        };

        let entry = HistoryEntry::superseding(item, archive_path);
        if let Err(e) = self
            .blocking_store(move |store| store.create_history(&entry))
            .await
        {
            warn!(error = %e, "Failed to save version history");
        }
    }

    /// SQLite calls block, so they run on the blocking pool rather than on
    /// a runtime worker.
    async fn blocking_store<T, F>(&self, op: F) -> SyncResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ModStore) -> SyncResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| SyncError::Other(format!("store task failed: {e}")))?
    }

    async fn download(&self, step: &Step<'_>) -> SyncResult<PathBuf> {
        let dest = step.base_dir.join(&step.file.filename);
        let version_label = display_version(&step.version.version_number, &step.version.id);

        info!(file = %step.file.filename, "Downloading...");
        self.events.emit(
            ProgressEvent::new(
                EventKind::DownloadStart,
                format!("Downloading {}", step.file.filename),
            )
            .for_project(step.label)
            .with_version(version_label.clone()),
        );

        let stream = self.registry.download_file(&step.file.url).await?;
        self.vault
            .place(&dest, stream, Some(&step.file.hashes))
            .await?;

        info!(filename = %step.file.filename, "Successfully downloaded file");
        self.events.emit(
            ProgressEvent::new(
                EventKind::DownloadSuccess,
                format!("Installed {}", step.file.filename),
            )
            .for_project(step.label)
            .with_version(version_label),
        );
        Ok(dest)
    }
}

/// Everything one install/replace needs about the chosen version.
struct Step<'a> {
    project: &'a Project,
    version: &'a Version,
    file: &'a VersionFile,
    base_dir: &'a Path,
    label: &'a ProjectLabel,
}

fn display_version(version_number: &str, version_id: &str) -> String {
    if version_number.is_empty() {
        version_id.to_string()
    } else {
        version_number.to_string()
    }
}
