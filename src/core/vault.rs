// ─── Local File Vault ───
// Places, removes and archives add-on files under the per-category
// directories. Superseded files go to `<category dir>/versions/`.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use sha1::Sha1;
use sha2::{Digest, Sha512};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::{SyncError, SyncResult};
use crate::core::platform::Category;
use crate::core::registry::{ByteStream, FileHashes};

/// Name of the archive subdirectory inside each category directory.
pub const ARCHIVE_DIR: &str = "versions";

/// Archived file name. The version id prefix keeps same-named files from
/// different versions apart.
pub fn archive_file_name(version_id: &str, file_name: &str) -> String {
    format!("{}-{}", version_id, file_name)
}

/// Filesystem side of the sync: everything lives under one game directory.
#[derive(Debug, Clone)]
pub struct FileVault {
    root: PathBuf,
}

impl FileVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Base directory for a category's installed files.
    pub fn target_directory(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    // ── Superseded files ────────────────────────────────

    /// Move `base_dir/file_name` into the archive, or delete it.
    ///
    /// Returns the archive path when the file was archived. A missing
    /// source file is not an error (`Ok(None)`); any other failure is
    /// returned for the caller to downgrade to a warning.
    pub async fn archive_or_remove(
        &self,
        file_name: &str,
        version_id: &str,
        base_dir: &Path,
        keep_old_versions: bool,
    ) -> SyncResult<Option<PathBuf>> {
        let current = base_dir.join(file_name);

        if !keep_old_versions {
            remove_if_present(&current).await?;
            return Ok(None);
        }

        let archive_dir = base_dir.join(ARCHIVE_DIR);
        tokio::fs::create_dir_all(&archive_dir)
            .await
            .map_err(|e| SyncError::io(&archive_dir, e))?;

        let archived = archive_dir.join(archive_file_name(version_id, file_name));
        match tokio::fs::rename(&current, &archived).await {
            Ok(()) => {
                info!("Archived {:?} -> {:?}", current, archived);
                Ok(Some(archived))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Nothing to archive at {:?}", current);
                Ok(None)
            }
            Err(e) => Err(SyncError::io(&current, e)),
        }
    }

    // ── Placement ───────────────────────────────────────

    /// Stream `source` into `dest`, overwriting it.
    ///
    /// Bytes go to a sibling staging file that is renamed over `dest` only
    /// after the stream completed and, when `expected` carries a digest,
    /// verified. On any failure the staging file is removed and `dest` is
    /// left as it was. Returns the number of bytes written.
    pub async fn place(
        &self,
        dest: &Path,
        source: ByteStream,
        expected: Option<&FileHashes>,
    ) -> SyncResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io(parent, e))?;
        }

        let staging = staging_path(dest);
        let written = match write_verified(&staging, dest, source, expected).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&staging, dest).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(SyncError::io(dest, e));
        }

        debug!("Placed {} bytes at {:?}", written, dest);
        Ok(written)
    }

    /// Copy an archived file back into place.
    pub async fn restore(&self, archive_path: &Path, dest: &Path) -> SyncResult<()> {
        if !file_exists(archive_path).await {
            return Err(SyncError::ArchiveMissing(archive_path.to_path_buf()));
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io(parent, e))?;
        }
        tokio::fs::copy(archive_path, dest)
            .await
            .map_err(|e| SyncError::io(dest, e))?;
        Ok(())
    }

    /// Delete an installed file; a file that is already gone is fine.
    pub async fn remove(&self, path: &Path) -> SyncResult<()> {
        remove_if_present(path).await
    }
}

/// True if `path` is an existing regular file.
pub async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn remove_if_present(path: &Path) -> SyncResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SyncError::io(path, e)),
    }
}

fn staging_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.{}.part", name, Uuid::new_v4().simple()))
}

/// Digest check against the strongest hash the registry published.
enum Verifier {
    Sha512(Sha512, String),
    Sha1(Sha1, String),
    Skip,
}

impl Verifier {
    fn new(expected: Option<&FileHashes>) -> Self {
        match expected {
            Some(FileHashes {
                sha512: Some(hash), ..
            }) => Verifier::Sha512(Sha512::new(), hash.to_ascii_lowercase()),
            Some(FileHashes {
                sha1: Some(hash), ..
            }) => Verifier::Sha1(Sha1::new(), hash.to_ascii_lowercase()),
            _ => Verifier::Skip,
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            Verifier::Sha512(hasher, _) => hasher.update(chunk),
            Verifier::Sha1(hasher, _) => hasher.update(chunk),
            Verifier::Skip => {}
        }
    }

    fn finish(self, dest: &Path) -> SyncResult<()> {
        let (algorithm, actual, expected) = match self {
            Verifier::Sha512(hasher, expected) => {
                ("SHA-512", hex::encode(hasher.finalize()), expected)
            }
            Verifier::Sha1(hasher, expected) => ("SHA-1", hex::encode(hasher.finalize()), expected),
            Verifier::Skip => return Ok(()),
        };
        if actual != expected {
            return Err(SyncError::HashMismatch {
                path: dest.to_path_buf(),
                algorithm,
                expected,
                actual,
            });
        }
        Ok(())
    }
}

async fn write_verified(
    staging: &Path,
    dest: &Path,
    mut source: ByteStream,
    expected: Option<&FileHashes>,
) -> SyncResult<u64> {
    let mut verifier = Verifier::new(expected);
    let mut written = 0u64;

    // Scoped so the handle is closed before the rename.
    {
        let mut file = tokio::fs::File::create(staging)
            .await
            .map_err(|e| SyncError::io(staging, e))?;

        while let Some(chunk) = source.next().await {
            let chunk = chunk?;
            verifier.update(&chunk);
            file.write_all(&chunk)
                .await
                .map_err(|e| SyncError::io(staging, e))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| SyncError::io(staging, e))?;
    }

    verifier.finish(dest)?;
    Ok(written)
}
