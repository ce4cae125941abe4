use std::path::{Path, PathBuf};

use crate::core::platform::{Category, InstallationType};
use crate::core::registry::Project;
use crate::core::store::TrackedItem;

/// Whether a followed project takes part in a sync at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible(Category),
    /// Project type outside mod / shader / resourcepack.
    UnsupportedType(String),
    /// Declared sides do not fit the installation type.
    IncompatibleSide,
}

pub fn check_eligibility(project: &Project, installation: &InstallationType) -> Eligibility {
    let Some(category) = project.category() else {
        return Eligibility::UnsupportedType(project.project_type.clone());
    };
    if !installation.accepts(project.client_side, project.server_side) {
        return Eligibility::IncompatibleSide;
    }
    Eligibility::Eligible(category)
}

/// What a sync does for one project, decided in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Not tracked: install.
    Install,
    /// Tracked but the recorded file is gone: reinstall without archiving.
    Repair,
    /// Tracked, same version, `--force`: download again, superseding the old file.
    ForceReinstall,
    /// Tracked at another version: supersede and install the new one.
    Upgrade,
    /// Tracked at the latest version: nothing to do.
    UpToDate,
}

/// An action together with the record it applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Install,
    Repair(TrackedItem),
    ForceReinstall(TrackedItem),
    Upgrade(TrackedItem),
    UpToDate(TrackedItem),
}

impl Plan {
    pub fn action(&self) -> Action {
        match self {
            Plan::Install => Action::Install,
            Plan::Repair(_) => Action::Repair,
            Plan::ForceReinstall(_) => Action::ForceReinstall,
            Plan::Upgrade(_) => Action::Upgrade,
            Plan::UpToDate(_) => Action::UpToDate,
        }
    }
}

/// Classify a project against the locally recorded state.
///
/// `recorded_file_present` is only consulted for tracked items.
pub fn classify(
    existing: Option<TrackedItem>,
    recorded_file_present: bool,
    latest_version_id: &str,
    force: bool,
) -> Plan {
    let Some(item) = existing else {
        return Plan::Install;
    };
    if !recorded_file_present {
        return Plan::Repair(item);
    }
    if item.version_id != latest_version_id {
        return Plan::Upgrade(item);
    }
    if force {
        return Plan::ForceReinstall(item);
    }
    Plan::UpToDate(item)
}

/// Where a tracked item's file is expected on disk. Older records without
/// an install path fall back to the category directory.
pub fn recorded_file_path(item: &TrackedItem, base_dir: &Path) -> PathBuf {
    if item.install_path.as_os_str().is_empty() {
        base_dir.join(&item.file_name)
    } else {
        item.install_path.clone()
    }
}
