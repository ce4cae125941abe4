// ─── SQLite Mod Store ───
// One connection behind a mutex; SQLite's unique index on `project_slug`
// is what enforces insert-or-fail for concurrent creates.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::debug;

use super::model::{HistoryEntry, TrackedItem};
use super::ModStore;
use crate::core::error::{SyncError, SyncResult};

const ITEM_COLUMNS: &str = "id, project_slug, project_id, title, icon_url, color, updated, \
     version_id, version_number, file_name, install_path";

const HISTORY_COLUMNS: &str =
    "id, project_slug, version_id, version_number, file_name, archive_path, created_at";

#[derive(Debug)]
pub struct SqliteModStore {
    conn: Mutex<Connection>,
}

impl SqliteModStore {
    pub fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        debug!("Opened mod database at {:?}", path);
        Self::bootstrap(conn)
    }

    pub fn in_memory() -> SyncResult<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> SyncResult<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;

            CREATE TABLE IF NOT EXISTS mods (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL,
              project_slug TEXT NOT NULL UNIQUE,
              project_id TEXT NOT NULL,
              title TEXT NOT NULL,
              icon_url TEXT NOT NULL DEFAULT '',
              color INTEGER,
              updated TEXT,
              version_id TEXT NOT NULL,
              version_number TEXT NOT NULL DEFAULT '',
              file_name TEXT NOT NULL,
              install_path TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_mods_file_name ON mods(file_name);

            CREATE TABLE IF NOT EXISTS mod_versions (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              created_at TEXT NOT NULL,
              project_slug TEXT NOT NULL,
              version_id TEXT NOT NULL,
              version_number TEXT NOT NULL DEFAULT '',
              file_name TEXT NOT NULL,
              archive_path TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_mod_versions_slug ON mod_versions(project_slug);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> SyncResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SyncError::Other("mod store lock poisoned".into()))
    }
}

impl ModStore for SqliteModStore {
    fn find_by_slug(&self, slug: &str) -> SyncResult<Option<TrackedItem>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM mods WHERE project_slug = ?1"),
                params![slug],
                map_item,
            )
            .optional()?;
        Ok(item)
    }

    fn create(&self, item: &TrackedItem) -> SyncResult<TrackedItem> {
        let conn = self.conn()?;
        let now = timestamp(&Utc::now());
        let inserted = conn.execute(
            "INSERT INTO mods (created_at, updated_at, project_slug, project_id, title, icon_url,
                               color, updated, version_id, version_number, file_name, install_path)
             VALUES (?1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                now,
                item.project_slug,
                item.project_id,
                item.title,
                item.icon_url,
                item.color,
                item.updated.as_ref().map(timestamp),
                item.version_id,
                item.version_number,
                item.file_name,
                path_text(&item.install_path),
            ],
        );

        match inserted {
            Ok(_) => Ok(TrackedItem {
                id: Some(conn.last_insert_rowid()),
                ..item.clone()
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(SyncError::AlreadyTracked(item.project_slug.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, item: &TrackedItem) -> SyncResult<()> {
        let id = item
            .id
            .ok_or_else(|| SyncError::Unpersisted(item.project_slug.clone()))?;
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE mods SET updated_at = ?2, project_slug = ?3, project_id = ?4, title = ?5,
                    icon_url = ?6, color = ?7, updated = ?8, version_id = ?9,
                    version_number = ?10, file_name = ?11, install_path = ?12
             WHERE id = ?1",
            params![
                id,
                timestamp(&Utc::now()),
                item.project_slug,
                item.project_id,
                item.title,
                item.icon_url,
                item.color,
                item.updated.as_ref().map(timestamp),
                item.version_id,
                item.version_number,
                item.file_name,
                path_text(&item.install_path),
            ],
        )?;
        if changed == 0 {
            return Err(SyncError::Unpersisted(item.project_slug.clone()));
        }
        Ok(())
    }

    fn create_history(&self, entry: &HistoryEntry) -> SyncResult<HistoryEntry> {
        let conn = self.conn()?;
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO mod_versions (created_at, project_slug, version_id, version_number,
                                       file_name, archive_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                timestamp(&created_at),
                entry.project_slug,
                entry.version_id,
                entry.version_number,
                entry.file_name,
                entry.archive_path.as_deref().map(path_text).unwrap_or_default(),
            ],
        )?;

        Ok(HistoryEntry {
            id: Some(conn.last_insert_rowid()),
            created_at: Some(created_at),
            ..entry.clone()
        })
    }

    fn most_recent_history(&self, slug: &str) -> SyncResult<Option<HistoryEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                &format!(
                    "SELECT {HISTORY_COLUMNS} FROM mod_versions WHERE project_slug = ?1
                     ORDER BY id DESC LIMIT 1"
                ),
                params![slug],
                map_history,
            )
            .optional()?;
        Ok(entry)
    }

    fn delete_history(&self, entry: &HistoryEntry) -> SyncResult<()> {
        let id = entry
            .id
            .ok_or_else(|| SyncError::Unpersisted(entry.project_slug.clone()))?;
        let conn = self.conn()?;
        conn.execute("DELETE FROM mod_versions WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn count_by_file_name(&self, file_name: &str) -> SyncResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM mods WHERE file_name = ?1",
            params![file_name],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn list_items(&self) -> SyncResult<Vec<TrackedItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM mods ORDER BY title COLLATE NOCASE ASC"
        ))?;
        let rows = stmt.query_map([], map_item)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn list_history(&self, slug: &str) -> SyncResult<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HISTORY_COLUMNS} FROM mod_versions WHERE project_slug = ?1
             ORDER BY id DESC"
        ))?;
        let rows = stmt.query_map(params![slug], map_history)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn map_item(row: &Row<'_>) -> rusqlite::Result<TrackedItem> {
    let updated: Option<String> = row.get(6)?;
    let install_path: String = row.get(10)?;
    Ok(TrackedItem {
        id: Some(row.get(0)?),
        project_slug: row.get(1)?,
        project_id: row.get(2)?,
        title: row.get(3)?,
        icon_url: row.get(4)?,
        color: row.get(5)?,
        updated: updated.as_deref().map(|raw| parse_timestamp(6, raw)).transpose()?,
        version_id: row.get(7)?,
        version_number: row.get(8)?,
        file_name: row.get(9)?,
        install_path: PathBuf::from(install_path),
    })
}

fn map_history(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let archive_path: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(HistoryEntry {
        id: Some(row.get(0)?),
        project_slug: row.get(1)?,
        version_id: row.get(2)?,
        version_number: row.get(3)?,
        file_name: row.get(4)?,
        archive_path: (!archive_path.is_empty()).then(|| PathBuf::from(archive_path)),
        created_at: Some(parse_timestamp(6, &created_at)?),
    })
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
