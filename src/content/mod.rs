//! Local catalog content: entries, their meta fields and the SQLite store
//! backing them, plus the reconciliation service the sync and import stages
//! drive.

mod fields;
mod models;
mod schema;
mod store;
mod sync_service;

pub use fields::{field_table, resolve_field_value, FieldRule, FieldTable};
pub use fields::{BRAND_FIELD_TABLE, SLOT_FIELD_TABLE};
pub use models::{ContentEntry, EntityKind, EntryStatus};
pub use store::{ContentStore, SqliteContentStore};
pub use sync_service::SyncService;
