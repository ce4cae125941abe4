// ─── Status Survey ───
// Read-only pass over the followed projects: same filter and classifier as
// a real sync, but nothing is downloaded, moved or written.

use std::fmt;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::debug;

use super::classify::{check_eligibility, classify, recorded_file_path, Action, Eligibility};
use crate::core::error::SyncResult;
use crate::core::platform::TargetPlatform;
use crate::core::registry::{Project, RegistryClient};
use crate::core::store::ModStore;
use crate::core::vault::{self, FileVault};

/// How many projects are queried in parallel.
const SURVEY_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "state", content = "detail")]
pub enum ProjectState {
    UpToDate,
    UpdateAvailable,
    NotInstalled,
    MissingFile,
    /// Filtered by category or installation side.
    Incompatible,
    NoCompatibleVersion,
    Unknown(String),
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectState::UpToDate => write!(f, "up-to-date"),
            ProjectState::UpdateAvailable => write!(f, "update-available"),
            ProjectState::NotInstalled => write!(f, "not-installed"),
            ProjectState::MissingFile => write!(f, "missing-file"),
            ProjectState::Incompatible => write!(f, "incompatible"),
            ProjectState::NoCompatibleVersion => write!(f, "no-compatible-version"),
            ProjectState::Unknown(reason) => write!(f, "unknown ({reason})"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatus {
    pub slug: String,
    pub title: String,
    pub color: Option<u32>,
    pub installed_version: Option<String>,
    pub latest_version: Option<String>,
    pub state: ProjectState,
}

/// Classify every followed project without touching disk or store.
///
/// Failing to list followed projects is fatal; a failing version lookup
/// only marks that one project `Unknown`. Results are sorted by title.
pub async fn survey(
    registry: Arc<dyn RegistryClient>,
    store: Arc<dyn ModStore>,
    vault: &FileVault,
    target: &TargetPlatform,
) -> SyncResult<Vec<ProjectStatus>> {
    let projects = registry.list_followed_projects().await?;

    let mut statuses: Vec<ProjectStatus> = stream::iter(projects)
        .map(|project| {
            let registry = Arc::clone(&registry);
            let store = Arc::clone(&store);
            async move { inspect(registry.as_ref(), store.as_ref(), vault, target, project).await }
        })
        .buffer_unordered(SURVEY_CONCURRENCY)
        .collect()
        .await;

    statuses.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
    Ok(statuses)
}

async fn inspect(
    registry: &dyn RegistryClient,
    store: &dyn ModStore,
    vault: &FileVault,
    target: &TargetPlatform,
    project: Project,
) -> ProjectStatus {
    let installed = store.find_by_slug(&project.slug).ok().flatten();
    let mut status = ProjectStatus {
        slug: project.slug.clone(),
        title: project.title.clone(),
        color: project.color,
        installed_version: installed.as_ref().map(|i| label(&i.version_number, &i.version_id)),
        latest_version: None,
        state: ProjectState::Incompatible,
    };

    let category = match check_eligibility(&project, &target.installation) {
        Eligibility::Eligible(category) => category,
        _ => return status,
    };

    let versions = match registry
        .list_compatible_versions(&project.slug, category, &target.game_version, &target.loader)
        .await
    {
        Ok(versions) => versions,
        Err(e) => {
            debug!(slug = %project.slug, error = %e, "Version lookup failed");
            status.state = ProjectState::Unknown(e.to_string());
            return status;
        }
    };
    let Some(latest) = versions.first() else {
        status.state = ProjectState::NoCompatibleVersion;
        return status;
    };
    status.latest_version = Some(label(&latest.version_number, &latest.id));

    let base_dir = vault.target_directory(category);
    let file_present = match &installed {
        Some(item) => vault::file_exists(&recorded_file_path(item, &base_dir)).await,
        None => false,
    };

    status.state = match classify(installed, file_present, &latest.id, false).action() {
        Action::Install => ProjectState::NotInstalled,
        Action::Repair => ProjectState::MissingFile,
        Action::Upgrade => ProjectState::UpdateAvailable,
        Action::UpToDate | Action::ForceReinstall => ProjectState::UpToDate,
    };
    status
}

fn label(version_number: &str, version_id: &str) -> String {
    if version_number.is_empty() {
        version_id.to_string()
    } else {
        version_number.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{InstallationType, SideSupport};
    use crate::core::registry::Version;
    use crate::core::store::{SqliteModStore, TrackedItem};
    use crate::core::testing::{project, version, FakeRegistry};

    fn target() -> TargetPlatform {
        TargetPlatform {
            game_version: "1.20.1".into(),
            loader: "fabric".into(),
            installation: InstallationType::Client,
        }
    }

    fn track(store: &SqliteModStore, vault: &FileVault, slug: &str, v: &Version, on_disk: bool) {
        let p = project(slug, "mod");
        let file = &v.files[0];
        let path = vault.root().join("mods").join(&file.filename);
        if on_disk {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"x").unwrap();
        }
        store.create(&TrackedItem::installed(&p, v, file, path)).unwrap();
    }

    #[tokio::test]
    async fn survey_reports_every_state_without_side_effects() {
        let tmp = tempfile::tempdir().unwrap();
        let vault = FileVault::new(tmp.path());
        let registry = Arc::new(FakeRegistry::new());
        let store = Arc::new(SqliteModStore::in_memory().unwrap());

        let v1 = version("a1", "1.0", "alpha.jar");
        registry.follow(project("alpha", "mod"));
        registry.publish("alpha", v1.clone(), b"a");
        track(&store, &vault, "alpha", &v1, true);

        let b1 = version("b1", "1.0", "beta.jar");
        registry.follow(project("beta", "mod"));
        registry.publish("beta", b1.clone(), b"b");
        registry.publish("beta", version("b2", "2.0", "beta-2.jar"), b"b2");
        track(&store, &vault, "beta", &b1, true);

        registry.follow(project("gamma", "mod"));
        registry.publish("gamma", version("g1", "1.0", "gamma.jar"), b"g");

        let d1 = version("d1", "1.0", "delta.jar");
        registry.follow(project("delta", "mod"));
        registry.publish("delta", d1.clone(), b"d");
        track(&store, &vault, "delta", &d1, false);

        let mut server_only = project("epsilon", "mod");
        server_only.client_side = SideSupport::Unsupported;
        registry.follow(server_only);

        registry.follow(project("zeta", "mod"));

        let statuses = survey(registry.clone(), store.clone(), &vault, &target())
            .await
            .unwrap();

        let states: Vec<(&str, ProjectState)> = statuses
            .iter()
            .map(|s| (s.slug.as_str(), s.state.clone()))
            .collect();
        assert_eq!(
            states,
            vec![
                ("alpha", ProjectState::UpToDate),
                ("beta", ProjectState::UpdateAvailable),
                ("delta", ProjectState::MissingFile),
                ("epsilon", ProjectState::Incompatible),
                ("gamma", ProjectState::NotInstalled),
                ("zeta", ProjectState::NoCompatibleVersion),
            ]
        );
        assert_eq!(statuses[1].installed_version.as_deref(), Some("1.0"));
        assert_eq!(statuses[1].latest_version.as_deref(), Some("2.0"));

        assert!(registry.downloads().is_empty());
        assert!(store.list_history("beta").unwrap().is_empty());
        assert!(!vault.root().join("mods").join("gamma.jar").exists());
    }

    #[tokio::test]
    async fn lookup_failure_marks_only_that_project() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = Arc::new(FakeRegistry::new());
        let store = Arc::new(SqliteModStore::in_memory().unwrap());
        registry.follow(project("flaky", "mod"));
        registry.follow(project("steady", "mod"));
        registry.fail_versions("flaky");
        registry.publish("steady", version("s1", "1.0", "steady.jar"), b"s");

        let statuses = survey(registry, store, &FileVault::new(tmp.path()), &target())
            .await
            .unwrap();

        assert!(matches!(statuses[0].state, ProjectState::Unknown(_)));
        assert_eq!(statuses[1].state, ProjectState::NotInstalled);
    }

    #[test]
    fn states_render_as_kebab_case() {
        assert_eq!(ProjectState::UpdateAvailable.to_string(), "update-available");
        assert_eq!(
            ProjectState::NoCompatibleVersion.to_string(),
            "no-compatible-version"
        );
    }
}
