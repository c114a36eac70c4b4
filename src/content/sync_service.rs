//! Reconciliation between remote catalog payloads and the local store.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::fields::{resolve_field_value, FieldTable};
use super::models::{EntityKind, EntryStatus};
use super::store::ContentStore;

/// Keeps local entries in sync with the satellite catalog.
///
/// Two write paths: [`reconcile_all`] aligns the full entry set against a
/// complete remote listing (the sync stage), [`upsert_with_fields`] enriches
/// already-known entries with mapped meta fields from one remote page (the
/// import stage).
///
/// [`reconcile_all`]: SyncService::reconcile_all
/// [`upsert_with_fields`]: SyncService::upsert_with_fields
pub struct SyncService {
    store: Arc<dyn ContentStore>,
}

impl SyncService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        SyncService { store }
    }

    /// Reconciles all entries of `kind` against the complete remote set:
    /// creates missing entries, refreshes the title of existing ones and
    /// drafts entries that no longer appear remotely. Records without a
    /// usable id or title are skipped.
    pub fn reconcile_all(
        &self,
        items: &[JsonValue],
        kind: EntityKind,
        table: &FieldTable,
    ) -> Result<()> {
        let existing = self.store.entries(kind)?;
        let mut known_ids: HashSet<i64> = existing.iter().map(|e| e.external_id).collect();
        let remote_ids: HashSet<i64> = items
            .iter()
            .filter_map(|item| record_id(item, table.id_field))
            .collect();

        for item in items {
            let Some(id) = record_id(item, table.id_field) else {
                continue;
            };
            let Some(title) = record_title(item, table.title_field) else {
                continue;
            };
            if known_ids.contains(&id) {
                self.store
                    .update_entry(kind, id, title, EntryStatus::Published)?;
            } else {
                self.store.insert_entry(kind, id, title)?;
                known_ids.insert(id);
            }
        }

        for entry in &existing {
            if !remote_ids.contains(&entry.external_id) {
                debug!(
                    "Drafting {} entry {} missing from the remote set",
                    kind.as_db_str(),
                    entry.external_id
                );
                self.store
                    .set_status(kind, entry.external_id, EntryStatus::Draft)?;
            }
        }
        Ok(())
    }

    /// Upserts meta fields onto entries already created by a prior
    /// reconciliation. Records that do not match a local entry are skipped;
    /// the import stage never creates entries. The matched entry is
    /// republished with the remote title, then every fillable field with a
    /// resolvable value is written.
    pub fn upsert_with_fields(
        &self,
        items: &[JsonValue],
        kind: EntityKind,
        table: &FieldTable,
    ) -> Result<()> {
        for item in items {
            let Some(id) = record_id(item, table.id_field) else {
                continue;
            };
            let Some(title) = record_title(item, table.title_field) else {
                continue;
            };
            if self.store.find_entry(kind, id)?.is_none() {
                debug!(
                    "No local {} entry for remote id {id}, skipping",
                    kind.as_db_str()
                );
                continue;
            }
            self.store
                .update_entry(kind, id, title, EntryStatus::Published)?;

            for field in table.fillable {
                if *field == table.external_id_field {
                    continue;
                }
                if let Some(value) = resolve_field_value(field, item, table.rules) {
                    self.store.set_field(kind, id, field, &value)?;
                }
            }
        }
        Ok(())
    }

    /// Wipes every entry of the given kinds. Returns the number removed.
    pub fn delete_all(&self, kinds: &[EntityKind]) -> Result<u64> {
        self.store.delete_kinds(kinds)
    }
}

fn record_id(item: &JsonValue, id_field: &str) -> Option<i64> {
    let value = item.get(id_field)?;
    let id = match value.as_i64() {
        Some(n) => n,
        None => value.as_str()?.parse().ok()?,
    };
    (id != 0).then_some(id)
}

fn record_title<'a>(item: &'a JsonValue, title_field: &str) -> Option<&'a str> {
    item.get(title_field)
        .and_then(|v| v.as_str())
        .filter(|title| !title.is_empty())
}
