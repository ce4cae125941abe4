use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::platform::{Category, SideSupport};

/// Authenticated registry user; only the id is needed to list follows.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
}

/// A project as published on the registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    pub slug: String,
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    /// Display color as packed RGB, opaque to the sync logic.
    #[serde(default)]
    pub color: Option<u32>,
    /// Upstream last-modified timestamp (RFC 3339).
    #[serde(default)]
    pub updated: Option<String>,
    pub project_type: String,
    #[serde(default)]
    pub client_side: SideSupport,
    #[serde(default)]
    pub server_side: SideSupport,
}

impl Project {
    pub fn category(&self) -> Option<Category> {
        Category::from_project_type(&self.project_type)
    }

    /// Parsed `updated` timestamp; malformed or missing values yield `None`.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }
}

/// One published version of a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    pub version_number: String,
    #[serde(default)]
    pub files: Vec<VersionFile>,
}

impl Version {
    /// The file flagged primary, else the first file. `None` when the
    /// version ships no files at all.
    pub fn primary_file(&self) -> Option<&VersionFile> {
        self.files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.first())
    }
}

/// A downloadable artifact belonging to a version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionFile {
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub hashes: FileHashes,
}

/// Published digests of a file, lowercase hex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHashes {
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub sha512: Option<String>,
}
