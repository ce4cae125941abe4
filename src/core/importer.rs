// ─── Importer ───
// Adopts add-on files that are already on disk but not tracked yet, by
// identifying them on the registry through their SHA-1.

use std::path::{Path, PathBuf};

use serde::Serialize;
use sha1::{Digest, Sha1};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::error::{SyncError, SyncResult};
use crate::core::platform::Category;
use crate::core::registry::{RegistryClient, VersionFile};
use crate::core::store::{ModStore, TrackedItem};
use crate::core::vault::{FileVault, ARCHIVE_DIR};

const IMPORTABLE_EXTENSIONS: [&str; 2] = ["jar", "zip"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub scanned: u64,
    pub already_tracked: u64,
    pub imported: u64,
    /// Files the registry does not know by hash.
    pub unknown: u64,
    pub failed: u64,
}

/// Scan every category directory and track the files the registry can
/// identify. Individual failures are logged and counted, never returned.
pub async fn import_installed(
    registry: &dyn RegistryClient,
    store: &dyn ModStore,
    vault: &FileVault,
) -> SyncResult<ImportReport> {
    info!("Scanning for existing mods...");

    let dirs: Vec<PathBuf> = Category::ALL
        .iter()
        .map(|c| vault.target_directory(*c))
        .collect();
    let candidates = tokio::task::spawn_blocking(move || collect_candidates(&dirs))
        .await
        .map_err(|e| SyncError::Other(format!("scan task failed: {e}")))?;

    let mut report = ImportReport::default();
    for path in candidates {
        report.scanned += 1;
        import_file(registry, store, &path, &mut report).await;
    }

    info!(
        imported = report.imported,
        scanned = report.scanned,
        "Import finished"
    );
    Ok(report)
}

/// `.jar`/`.zip` files below `dirs`, skipping archive directories.
fn collect_candidates(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for dir in dirs.iter().filter(|d| d.is_dir()) {
        let walker = WalkDir::new(dir)
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == ARCHIVE_DIR));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Error scanning directory");
                    continue;
                }
            };
            if entry.file_type().is_file() && is_importable(entry.path()) {
                found.push(entry.into_path());
            }
        }
    }
    found.sort();
    found
}

fn is_importable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            IMPORTABLE_EXTENSIONS
                .iter()
                .any(|allowed| e.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

async fn import_file(
    registry: &dyn RegistryClient,
    store: &dyn ModStore,
    path: &Path,
    report: &mut ImportReport,
) {
    let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return;
    };

    match store.count_by_file_name(&file_name) {
        Ok(0) => {}
        Ok(_) => {
            report.already_tracked += 1;
            return;
        }
        Err(e) => {
            warn!(file = %file_name, error = %e, "Failed to query database");
            report.failed += 1;
            return;
        }
    }

    let hash = match sha1_file(path).await {
        Ok(hash) => hash,
        Err(e) => {
            warn!(file = %file_name, error = %e, "Failed to calculate hash");
            report.failed += 1;
            return;
        }
    };

    let version = match registry.get_version_by_hash(&hash).await {
        Ok(version) => version,
        Err(e) => {
            debug!(file = %file_name, error = %e, "Mod not found on Modrinth by hash");
            report.unknown += 1;
            return;
        }
    };

    let project = match registry.get_project(&version.project_id).await {
        Ok(project) => project,
        Err(e) => {
            warn!(project_id = %version.project_id, error = %e, "Failed to get project details");
            report.failed += 1;
            return;
        }
    };

    let on_disk = VersionFile {
        filename: file_name,
        ..Default::default()
    };
    let item = TrackedItem::installed(&project, &version, &on_disk, path.to_path_buf());
    match store.create(&item) {
        Ok(_) => {
            info!(title = %project.title, version = %version.version_number, "Imported existing mod");
            report.imported += 1;
        }
        Err(SyncError::AlreadyTracked(slug)) => {
            debug!(slug = %slug, file = %item.file_name, "Project already tracked under another file");
            report.already_tracked += 1;
        }
        Err(e) => {
            warn!(slug = %project.slug, error = %e, "Failed to save imported mod to DB");
            report.failed += 1;
        }
    }
}

/// Lowercase hex SHA-1 of a file, read in chunks.
pub async fn sha1_file(path: &Path) -> SyncResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| SyncError::io(path, e))?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await.map_err(|e| SyncError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::store::SqliteModStore;
    use crate::core::testing::{project, version, FakeRegistry};

    fn write(path: &Path, body: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[tokio::test]
    async fn sha1_of_known_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hello.txt");
        std::fs::write(&path, b"hello world").unwrap();

        assert_eq!(
            sha1_file(&path).await.unwrap(),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
    }

    #[tokio::test]
    async fn known_files_are_tracked_and_the_rest_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let vault = FileVault::new(tmp.path());
        let registry = FakeRegistry::new();
        let store = SqliteModStore::in_memory().unwrap();

        let sodium = tmp.path().join("mods").join("sodium.jar");
        write(&sodium, b"hello world");
        let mut v = version("v9", "0.5.8", "sodium-upstream.jar");
        v.project_id = "id-sodium".into();
        registry.index_hash(
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed",
            v,
            project("sodium", "mod"),
        );

        write(&tmp.path().join("mods").join("custom.jar"), b"home made");
        write(&tmp.path().join("mods").join("notes.txt"), b"ignore me");
        write(
            &tmp.path().join("mods").join("versions").join("v1-old.jar"),
            b"hello world",
        );

        let report = import_installed(&registry, &store, &vault).await.unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.imported, 1);
        assert_eq!(report.unknown, 1);
        let item = store.find_by_slug("sodium").unwrap().unwrap();
        assert_eq!(item.version_id, "v9");
        assert_eq!(item.version_number, "0.5.8");
        assert_eq!(item.file_name, "sodium.jar");
        assert_eq!(item.install_path, sodium);
        assert_eq!(item.title, "SODIUM");
    }

    #[tokio::test]
    async fn nested_packs_are_found_and_reimport_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let vault = FileVault::new(tmp.path());
        let registry = Arc::new(FakeRegistry::new());
        let store = SqliteModStore::in_memory().unwrap();

        let pack = tmp.path().join("resourcepacks").join("nested").join("Faithful.ZIP");
        write(&pack, b"hello world");
        let mut v = version("r1", "1.20", "faithful.zip");
        v.project_id = "id-faithful".into();
        registry.index_hash(
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed",
            v,
            project("faithful", "resourcepack"),
        );

        let first = import_installed(registry.as_ref(), &store, &vault).await.unwrap();
        let second = import_installed(registry.as_ref(), &store, &vault).await.unwrap();

        assert_eq!(first.imported, 1);
        assert_eq!(second.imported, 0);
        assert_eq!(second.already_tracked, 1);
        assert_eq!(store.list_items().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_category_directories_are_fine() {
        let tmp = tempfile::tempdir().unwrap();
        let report = import_installed(
            &FakeRegistry::new(),
            &SqliteModStore::in_memory().unwrap(),
            &FileVault::new(tmp.path()),
        )
        .await
        .unwrap();

        assert_eq!(report, ImportReport::default());
    }
}
