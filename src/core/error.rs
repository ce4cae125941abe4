use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the sync backend.
/// Every module returns `Result<T, SyncError>`.
#[derive(Debug, Error)]
pub enum SyncError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Registry request to {url} failed: HTTP {status}: {body}")]
    RegistryStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Registry returned an unusable response: {0}")]
    RegistryResponse(String),

    // ── Integrity ───────────────────────────────────────
    #[error("{algorithm} mismatch for {path:?}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Store ───────────────────────────────────────────
    #[error("Database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Project '{0}' is already tracked")]
    AlreadyTracked(String),

    #[error("Record has not been persisted yet: {0}")]
    Unpersisted(String),

    // ── Configuration ───────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── Reconciliation ──────────────────────────────────
    #[error("Version {0} has no files to install")]
    NoFiles(String),

    // ── Rollback ────────────────────────────────────────
    #[error("No previous versions found for '{0}'")]
    NoHistory(String),

    #[error("Previous version {version_id} of '{slug}' was not archived")]
    MissingArchivePath { slug: String, version_id: String },

    #[error("Archive file not found: {0:?}")]
    ArchiveMissing(PathBuf),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// Wrap an IO error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(source: std::io::Error) -> Self {
        SyncError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
