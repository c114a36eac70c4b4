use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value as JsonValue;
use tracing::info;

use super::models::{ContentEntry, EntityKind, EntryStatus};
use super::schema::CONTENT_VERSIONED_SCHEMAS;
use crate::sqlite_support::prepare_database;

/// Local catalog storage, scoped per entity kind.
///
/// Writes happen only from inside a draining background process, which the
/// drain lock already serializes per kind; the store itself only guarantees
/// that individual operations are atomic.
pub trait ContentStore: Send + Sync {
    /// All entries of a kind, published and drafted, ordered by external id.
    fn entries(&self, kind: EntityKind) -> Result<Vec<ContentEntry>>;

    fn find_entry(&self, kind: EntityKind, external_id: i64) -> Result<Option<ContentEntry>>;

    /// Creates a published entry.
    fn insert_entry(&self, kind: EntityKind, external_id: i64, title: &str) -> Result<()>;

    fn update_entry(
        &self,
        kind: EntityKind,
        external_id: i64,
        title: &str,
        status: EntryStatus,
    ) -> Result<()>;

    fn set_status(&self, kind: EntityKind, external_id: i64, status: EntryStatus) -> Result<()>;

    /// Writes one meta field, replacing any previous value.
    fn set_field(
        &self,
        kind: EntityKind,
        external_id: i64,
        name: &str,
        value: &JsonValue,
    ) -> Result<()>;

    fn entry_fields(
        &self,
        kind: EntityKind,
        external_id: i64,
    ) -> Result<HashMap<String, JsonValue>>;

    fn count_entries(&self, kind: EntityKind) -> Result<u64>;

    /// Removes every entry of the given kinds along with their fields.
    /// Returns the number of entries removed.
    fn delete_kinds(&self, kinds: &[EntityKind]) -> Result<u64>;
}

pub struct SqliteContentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContentStore {
    /// Open an existing content database or create a new one.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                &db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(&db_path)?;
            CONTENT_VERSIONED_SCHEMAS
                .last()
                .context("No schemas defined")?
                .create(&conn)?;
            info!("Created new content database at {:?}", db_path.as_ref());
            conn
        };

        prepare_database(&conn, CONTENT_VERSIONED_SCHEMAS, "content")?;

        Ok(SqliteContentStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        CONTENT_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?
            .create(&conn)?;
        Ok(SqliteContentStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

impl ContentStore for SqliteContentStore {
    fn entries(&self, kind: EntityKind) -> Result<Vec<ContentEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT external_id, title, status FROM entries WHERE kind = ?1 ORDER BY external_id",
        )?;
        let entries = stmt
            .query_map(params![kind.as_db_str()], |row| {
                Ok(ContentEntry {
                    external_id: row.get(0)?,
                    title: row.get(1)?,
                    status: EntryStatus::from_db_str(&row.get::<_, String>(2)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn find_entry(&self, kind: EntityKind, external_id: i64) -> Result<Option<ContentEntry>> {
        let conn = self.conn.lock().unwrap();
        let entry = conn
            .query_row(
                "SELECT external_id, title, status FROM entries WHERE kind = ?1 AND external_id = ?2",
                params![kind.as_db_str(), external_id],
                |row| {
                    Ok(ContentEntry {
                        external_id: row.get(0)?,
                        title: row.get(1)?,
                        status: EntryStatus::from_db_str(&row.get::<_, String>(2)?),
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    fn insert_entry(&self, kind: EntityKind, external_id: i64, title: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Self::now();
        conn.execute(
            "INSERT INTO entries (kind, external_id, title, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                kind.as_db_str(),
                external_id,
                title,
                EntryStatus::Published.as_db_str(),
                now
            ],
        )?;
        Ok(())
    }

    fn update_entry(
        &self,
        kind: EntityKind,
        external_id: i64,
        title: &str,
        status: EntryStatus,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE entries SET title = ?3, status = ?4, updated_at = ?5
             WHERE kind = ?1 AND external_id = ?2",
            params![
                kind.as_db_str(),
                external_id,
                title,
                status.as_db_str(),
                Self::now()
            ],
        )?;
        Ok(())
    }

    fn set_status(&self, kind: EntityKind, external_id: i64, status: EntryStatus) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE entries SET status = ?3, updated_at = ?4 WHERE kind = ?1 AND external_id = ?2",
            params![
                kind.as_db_str(),
                external_id,
                status.as_db_str(),
                Self::now()
            ],
        )?;
        Ok(())
    }

    fn set_field(
        &self,
        kind: EntityKind,
        external_id: i64,
        name: &str,
        value: &JsonValue,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let entry_id: i64 = conn
            .query_row(
                "SELECT id FROM entries WHERE kind = ?1 AND external_id = ?2",
                params![kind.as_db_str(), external_id],
                |row| row.get(0),
            )
            .optional()?
            .with_context(|| {
                format!("No {} entry with external id {external_id}", kind.as_db_str())
            })?;
        let encoded = serde_json::to_string(value)?;
        let updated = conn.execute(
            "UPDATE entry_fields SET value = ?3 WHERE entry_id = ?1 AND name = ?2",
            params![entry_id, name, encoded],
        )?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO entry_fields (entry_id, name, value) VALUES (?1, ?2, ?3)",
                params![entry_id, name, encoded],
            )?;
        }
        Ok(())
    }

    fn entry_fields(
        &self,
        kind: EntityKind,
        external_id: i64,
    ) -> Result<HashMap<String, JsonValue>> {
        let rows: Vec<(String, String)> = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT f.name, f.value FROM entry_fields f
                 JOIN entries e ON e.id = f.entry_id
                 WHERE e.kind = ?1 AND e.external_id = ?2",
            )?;
            let rows = stmt
                .query_map(params![kind.as_db_str(), external_id], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        let mut fields = HashMap::with_capacity(rows.len());
        for (name, value) in rows {
            let value = serde_json::from_str(&value)
                .with_context(|| format!("Corrupt value for field {name}"))?;
            fields.insert(name, value);
        }
        Ok(fields)
    }

    fn count_entries(&self, kind: EntityKind) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE kind = ?1",
            params![kind.as_db_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn delete_kinds(&self, kinds: &[EntityKind]) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let mut removed = 0;
        for kind in kinds {
            removed += conn.execute(
                "DELETE FROM entries WHERE kind = ?1",
                params![kind.as_db_str()],
            )?;
        }
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn insert_find_update_roundtrip() {
        let store = SqliteContentStore::in_memory().unwrap();
        store.insert_entry(EntityKind::Brand, 7, "Golden Palace").unwrap();

        let entry = store.find_entry(EntityKind::Brand, 7).unwrap().unwrap();
        assert_eq!(entry.title, "Golden Palace");
        assert_eq!(entry.status, EntryStatus::Published);

        store
            .update_entry(EntityKind::Brand, 7, "Golden Palace Casino", EntryStatus::Published)
            .unwrap();
        store.set_status(EntityKind::Brand, 7, EntryStatus::Draft).unwrap();

        let entry = store.find_entry(EntityKind::Brand, 7).unwrap().unwrap();
        assert_eq!(entry.title, "Golden Palace Casino");
        assert_eq!(entry.status, EntryStatus::Draft);

        assert!(store.find_entry(EntityKind::Brand, 8).unwrap().is_none());
        assert!(store.find_entry(EntityKind::Slot, 7).unwrap().is_none());
    }

    #[test]
    fn entries_are_scoped_and_ordered_by_external_id() {
        let store = SqliteContentStore::in_memory().unwrap();
        store.insert_entry(EntityKind::Brand, 20, "B").unwrap();
        store.insert_entry(EntityKind::Brand, 10, "A").unwrap();
        store.insert_entry(EntityKind::Slot, 15, "S").unwrap();

        let brands = store.entries(EntityKind::Brand).unwrap();
        assert_eq!(
            brands.iter().map(|e| e.external_id).collect::<Vec<_>>(),
            vec![10, 20]
        );
        assert_eq!(store.count_entries(EntityKind::Brand).unwrap(), 2);
        assert_eq!(store.count_entries(EntityKind::Slot).unwrap(), 1);
    }

    #[test]
    fn set_field_inserts_then_overwrites() {
        let store = SqliteContentStore::in_memory().unwrap();
        store.insert_entry(EntityKind::Slot, 3, "Book of Suns").unwrap();

        store
            .set_field(EntityKind::Slot, 3, "min_bet", &json!(0.1))
            .unwrap();
        store
            .set_field(EntityKind::Slot, 3, "volatility", &json!("high"))
            .unwrap();
        store
            .set_field(EntityKind::Slot, 3, "min_bet", &json!(0.2))
            .unwrap();

        let fields = store.entry_fields(EntityKind::Slot, 3).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["min_bet"], json!(0.2));
        assert_eq!(fields["volatility"], json!("high"));
    }

    #[test]
    fn set_field_on_missing_entry_fails() {
        let store = SqliteContentStore::in_memory().unwrap();
        let result = store.set_field(EntityKind::Slot, 99, "min_bet", &json!(1));
        assert!(result.is_err());
    }

    #[test]
    fn field_values_keep_their_json_shape() {
        let store = SqliteContentStore::in_memory().unwrap();
        store.insert_entry(EntityKind::Slot, 5, "Reel Deal").unwrap();
        let provider = json!({ "name": "NetEnt", "website": "https://netent.com" });
        store
            .set_field(EntityKind::Slot, 5, "software_provider", &provider)
            .unwrap();
        store
            .set_field(EntityKind::Slot, 5, "has_jackpot", &json!(true))
            .unwrap();

        let fields = store.entry_fields(EntityKind::Slot, 5).unwrap();
        assert_eq!(fields["software_provider"], provider);
        assert_eq!(fields["has_jackpot"], json!(true));
    }

    #[test]
    fn delete_kinds_cascades_to_fields() {
        let store = SqliteContentStore::in_memory().unwrap();
        store.insert_entry(EntityKind::Brand, 1, "One").unwrap();
        store.insert_entry(EntityKind::Slot, 2, "Two").unwrap();
        store
            .set_field(EntityKind::Slot, 2, "min_bet", &json!(1))
            .unwrap();

        let removed = store.delete_kinds(&[EntityKind::Slot]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count_entries(EntityKind::Slot).unwrap(), 0);
        assert_eq!(store.count_entries(EntityKind::Brand).unwrap(), 1);
        assert!(store.entry_fields(EntityKind::Slot, 2).unwrap().is_empty());

        let removed = store.delete_kinds(&EntityKind::all()).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count_entries(EntityKind::Brand).unwrap(), 0);
    }

    #[test]
    fn entries_survive_a_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("content.db");

        {
            let store = SqliteContentStore::new(&path).unwrap();
            store.insert_entry(EntityKind::Brand, 42, "Persistent").unwrap();
            store
                .set_field(EntityKind::Brand, 42, "url", &json!("https://example.com"))
                .unwrap();
        }

        let store = SqliteContentStore::new(&path).unwrap();
        let entry = store.find_entry(EntityKind::Brand, 42).unwrap().unwrap();
        assert_eq!(entry.title, "Persistent");
        assert_eq!(
            store.entry_fields(EntityKind::Brand, 42).unwrap()["url"],
            json!("https://example.com")
        );
    }
}
