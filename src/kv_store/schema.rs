//! Database schema for state.db.

use crate::column_def;
use crate::sqlite_support::{Column, SqlType, Table, VersionedSchema};

/// Single-table key-value layout. `seq` preserves insertion order (batch
/// draining is oldest-first) and is assigned once, on first insert.
const KV_ENTRIES_TABLE_V1: Table = Table {
    name: "kv_entries",
    columns: &[
        column_def!("key", &SqlType::Text, is_primary_key = true),
        column_def!("seq", &SqlType::Integer, non_null = true),
        column_def!("value", &SqlType::Text, non_null = true),
        column_def!("updated_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_kv_entries_seq", "seq")],
};

pub const KV_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[KV_ENTRIES_TABLE_V1],
    migration: None,
}];
