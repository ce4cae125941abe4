use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::registry::{Project, Version, VersionFile};

/// Currently installed version of one project. Unique per `project_slug`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedItem {
    /// Row identity; `None` until the store has persisted the item.
    pub id: Option<i64>,
    pub project_slug: String,
    pub project_id: String,
    pub title: String,
    pub icon_url: String,
    pub color: Option<u32>,
    /// Upstream last-modified time. Display only, never used for decisions.
    pub updated: Option<DateTime<Utc>>,

    // ── Installed version pointer ──
    pub version_id: String,
    pub version_number: String,
    pub file_name: String,
    pub install_path: PathBuf,
}

impl TrackedItem {
    /// Build a fresh record for a file just placed at `install_path`.
    pub fn installed(
        project: &Project,
        version: &Version,
        file: &VersionFile,
        install_path: PathBuf,
    ) -> Self {
        let mut item = Self {
            id: None,
            project_slug: project.slug.clone(),
            project_id: String::new(),
            title: String::new(),
            icon_url: String::new(),
            color: None,
            updated: None,
            version_id: String::new(),
            version_number: String::new(),
            file_name: String::new(),
            install_path: PathBuf::new(),
        };
        item.point_at(version, file, install_path);
        item.refresh_metadata(project);
        item
    }

    /// Move the installed-version pointer to a newly placed file.
    pub fn point_at(&mut self, version: &Version, file: &VersionFile, install_path: PathBuf) {
        self.version_id = version.id.clone();
        self.version_number = version.version_number.clone();
        self.file_name = file.filename.clone();
        self.install_path = install_path;
    }

    /// Copy identity and display fields from the registry's current view.
    pub fn refresh_metadata(&mut self, project: &Project) {
        self.project_id = project.id.clone();
        self.title = project.title.clone();
        self.icon_url = project.icon_url.clone().unwrap_or_default();
        self.color = project.color;
        self.updated = project.updated_at();
    }
}

/// A superseded version, optionally with its file preserved in the archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: Option<i64>,
    pub project_slug: String,
    pub version_id: String,
    pub version_number: String,
    pub file_name: String,
    /// Where the old file was archived; `None` when it was deleted instead.
    pub archive_path: Option<PathBuf>,
    /// Assigned by the store on insert.
    pub created_at: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    /// Snapshot the version `item` currently points at.
    pub fn superseding(item: &TrackedItem, archive_path: Option<PathBuf>) -> Self {
        Self {
            id: None,
            project_slug: item.project_slug.clone(),
            version_id: item.version_id.clone(),
            version_number: item.version_number.clone(),
            file_name: item.file_name.clone(),
            archive_path,
            created_at: None,
        }
    }
}
