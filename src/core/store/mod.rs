pub mod model;
pub mod sqlite;

pub use model::{HistoryEntry, TrackedItem};
pub use sqlite::SqliteModStore;

use crate::core::error::SyncResult;

/// Durable record of installed items and their version history.
///
/// Implementations serialize their own writes: concurrent calls for
/// different slugs must not corrupt state, and `create` must enforce slug
/// uniqueness atomically.
pub trait ModStore: Send + Sync {
    fn find_by_slug(&self, slug: &str) -> SyncResult<Option<TrackedItem>>;

    /// Insert a new item. Fails with `AlreadyTracked` if the slug exists.
    fn create(&self, item: &TrackedItem) -> SyncResult<TrackedItem>;

    /// Update an already persisted item by its row identity.
    fn save(&self, item: &TrackedItem) -> SyncResult<()>;

    fn create_history(&self, entry: &HistoryEntry) -> SyncResult<HistoryEntry>;

    /// Newest history entry for `slug` by creation order.
    fn most_recent_history(&self, slug: &str) -> SyncResult<Option<HistoryEntry>>;

    fn delete_history(&self, entry: &HistoryEntry) -> SyncResult<()>;

    /// Number of tracked items whose installed file has this name.
    fn count_by_file_name(&self, file_name: &str) -> SyncResult<u64>;

    fn list_items(&self) -> SyncResult<Vec<TrackedItem>>;

    /// All history for `slug`, newest first.
    fn list_history(&self, slug: &str) -> SyncResult<Vec<HistoryEntry>>;
}
