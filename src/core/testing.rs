// In-process registry and store doubles for engine, rollback and importer
// tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use crate::core::error::{SyncError, SyncResult};
use crate::core::platform::{Category, SideSupport};
use crate::core::registry::{ByteStream, Project, RegistryClient, Version, VersionFile};
use crate::core::store::{HistoryEntry, ModStore, SqliteModStore, TrackedItem};

#[derive(Default)]
struct FakeState {
    followed: Vec<Project>,
    follows_error: bool,
    versions: HashMap<String, Vec<Version>>,
    version_errors: HashSet<String>,
    files: HashMap<String, Vec<u8>>,
    by_hash: HashMap<String, Version>,
    projects: HashMap<String, Project>,
    downloads: Vec<String>,
    version_queries: Vec<(String, Category)>,
}

#[derive(Default)]
pub struct FakeRegistry {
    state: Mutex<FakeState>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn follow(&self, project: Project) {
        let mut state = self.state.lock().unwrap();
        state.projects.insert(project.id.clone(), project.clone());
        state.followed.push(project);
    }

    pub fn fail_follows(&self) {
        self.state.lock().unwrap().follows_error = true;
    }

    /// Publish `version` as the newest compatible version of `slug`, serving
    /// `contents` for every file it lists.
    pub fn publish(&self, slug: &str, version: Version, contents: &[u8]) {
        let mut state = self.state.lock().unwrap();
        for file in &version.files {
            state.files.insert(file.url.clone(), contents.to_vec());
        }
        state
            .versions
            .entry(slug.to_string())
            .or_default()
            .insert(0, version);
    }

    /// Register versions without serving any file bytes.
    pub fn set_versions(&self, slug: &str, versions: Vec<Version>) {
        self.state
            .lock()
            .unwrap()
            .versions
            .insert(slug.to_string(), versions);
    }

    pub fn fail_versions(&self, slug: &str) {
        self.state
            .lock()
            .unwrap()
            .version_errors
            .insert(slug.to_string());
    }

    pub fn index_hash(&self, sha1: &str, version: Version, project: Project) {
        let mut state = self.state.lock().unwrap();
        state.by_hash.insert(sha1.to_string(), version);
        state.projects.insert(project.id.clone(), project);
    }

    pub fn downloads(&self) -> Vec<String> {
        self.state.lock().unwrap().downloads.clone()
    }

    pub fn version_queries(&self) -> Vec<(String, Category)> {
        self.state.lock().unwrap().version_queries.clone()
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn list_followed_projects(&self) -> SyncResult<Vec<Project>> {
        let state = self.state.lock().unwrap();
        if state.follows_error {
            return Err(SyncError::RegistryStatus {
                url: "/user".into(),
                status: 401,
                body: "unauthorized".into(),
            });
        }
        Ok(state.followed.clone())
    }

    async fn list_compatible_versions(
        &self,
        slug: &str,
        category: Category,
        _game_version: &str,
        _loader: &str,
    ) -> SyncResult<Vec<Version>> {
        let mut state = self.state.lock().unwrap();
        state.version_queries.push((slug.to_string(), category));
        if state.version_errors.contains(slug) {
            return Err(SyncError::RegistryStatus {
                url: format!("/project/{slug}/version"),
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(state.versions.get(slug).cloned().unwrap_or_default())
    }

    async fn get_project(&self, id_or_slug: &str) -> SyncResult<Project> {
        let state = self.state.lock().unwrap();
        state
            .projects
            .get(id_or_slug)
            .or_else(|| state.projects.values().find(|p| p.slug == id_or_slug))
            .cloned()
            .ok_or_else(|| SyncError::RegistryStatus {
                url: format!("/project/{id_or_slug}"),
                status: 404,
                body: String::new(),
            })
    }

    async fn get_version_by_hash(&self, sha1: &str) -> SyncResult<Version> {
        self.state
            .lock()
            .unwrap()
            .by_hash
            .get(sha1)
            .cloned()
            .ok_or_else(|| SyncError::RegistryStatus {
                url: format!("/version_file/{sha1}"),
                status: 404,
                body: String::new(),
            })
    }

    async fn download_file(&self, url: &str) -> SyncResult<ByteStream> {
        let mut state = self.state.lock().unwrap();
        state.downloads.push(url.to_string());
        let bytes = state
            .files
            .get(url)
            .cloned()
            .ok_or_else(|| SyncError::RegistryStatus {
                url: url.to_string(),
                status: 404,
                body: String::new(),
            })?;
        Ok(stream::iter(vec![Ok(bytes)]).boxed())
    }
}

/// In-memory SQLite store whose writes can be switched to fail.
pub struct FlakyStore {
    inner: SqliteModStore,
    fail_create: AtomicBool,
    fail_save: AtomicBool,
}

impl FlakyStore {
    pub fn in_memory() -> Self {
        Self {
            inner: SqliteModStore::in_memory().unwrap(),
            fail_create: AtomicBool::new(false),
            fail_save: AtomicBool::new(false),
        }
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    fn refused(op: &str) -> SyncError {
        SyncError::Other(format!("{op} refused: disk I/O error"))
    }
}

impl ModStore for FlakyStore {
    fn find_by_slug(&self, slug: &str) -> SyncResult<Option<TrackedItem>> {
        self.inner.find_by_slug(slug)
    }

    fn create(&self, item: &TrackedItem) -> SyncResult<TrackedItem> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::refused("create"));
        }
        self.inner.create(item)
    }

    fn save(&self, item: &TrackedItem) -> SyncResult<()> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(Self::refused("save"));
        }
        self.inner.save(item)
    }

    fn create_history(&self, entry: &HistoryEntry) -> SyncResult<HistoryEntry> {
        self.inner.create_history(entry)
    }

    fn most_recent_history(&self, slug: &str) -> SyncResult<Option<HistoryEntry>> {
        self.inner.most_recent_history(slug)
    }

    fn delete_history(&self, entry: &HistoryEntry) -> SyncResult<()> {
        self.inner.delete_history(entry)
    }

    fn count_by_file_name(&self, file_name: &str) -> SyncResult<u64> {
        self.inner.count_by_file_name(file_name)
    }

    fn list_items(&self) -> SyncResult<Vec<TrackedItem>> {
        self.inner.list_items()
    }

    fn list_history(&self, slug: &str) -> SyncResult<Vec<HistoryEntry>> {
        self.inner.list_history(slug)
    }
}

pub fn project(slug: &str, project_type: &str) -> Project {
    Project {
        slug: slug.to_string(),
        id: format!("id-{slug}"),
        title: slug.to_uppercase(),
        project_type: project_type.to_string(),
        client_side: SideSupport::Required,
        server_side: SideSupport::Required,
        updated: Some("2024-05-01T12:00:00Z".into()),
        ..Default::default()
    }
}

pub fn version(id: &str, number: &str, file_name: &str) -> Version {
    Version {
        id: id.to_string(),
        project_id: String::new(),
        name: number.to_string(),
        version_number: number.to_string(),
        files: vec![VersionFile {
            filename: file_name.to_string(),
            url: format!("https://cdn.test/{id}/{file_name}"),
            primary: true,
            ..Default::default()
        }],
    }
}
