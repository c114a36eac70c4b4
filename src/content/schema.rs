//! Database schema for content.db.

use crate::column_def;
use crate::sqlite_support::{Column, ForeignKey, SqlType, Table, VersionedSchema};

const ENTRIES_TABLE_V1: Table = Table {
    name: "entries",
    columns: &[
        column_def!("id", &SqlType::Integer, is_primary_key = true),
        column_def!("kind", &SqlType::Text, non_null = true),
        column_def!("external_id", &SqlType::Integer, non_null = true),
        column_def!("title", &SqlType::Text, non_null = true),
        column_def!("status", &SqlType::Text, non_null = true),
        column_def!("created_at", &SqlType::Integer, non_null = true),
        column_def!("updated_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_entries_kind_external_id", "kind, external_id")],
};

const ENTRY_FK: ForeignKey = ForeignKey {
    foreign_table: "entries",
    foreign_column: "id",
    cascade_delete: true,
};

const ENTRY_FIELDS_TABLE_V1: Table = Table {
    name: "entry_fields",
    columns: &[
        column_def!(
            "entry_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ENTRY_FK)
        ),
        column_def!("name", &SqlType::Text, non_null = true),
        column_def!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_entry_fields_entry_id", "entry_id")],
};

pub const CONTENT_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[ENTRIES_TABLE_V1, ENTRY_FIELDS_TABLE_V1],
    migration: None,
}];
