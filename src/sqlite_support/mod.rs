//! Declarative SQLite schema support.
//!
//! Tables are described as static data, stamped into the database via
//! `PRAGMA user_version` and validated on every open. Migrations are plain
//! functions attached to the schema version that introduced them.

use anyhow::{bail, Result};
use rusqlite::{params, types::Type, Connection};

/// Offset added to schema versions before writing `PRAGMA user_version`,
/// so a database created by an unrelated tool (user_version 0, 1, ...) is
/// rejected instead of silently migrated.
pub const BASE_DB_VERSION: usize = 41000;

#[macro_export]
macro_rules! column_def {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {{
        #[allow(unused_mut)]
        let mut column = Column {
            name: $name,
            sql_type: $sql_type,
            is_primary_key: false,
            non_null: false,
            foreign_key: None,
        };
        $(
            column.$field = $value;
        )*
        column
    }};
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Blob,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Blob => "BLOB",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub cascade_delete: bool,
}

pub struct Column<S: AsRef<str>> {
    pub name: S,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub foreign_key: Option<&'static ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<&'static str>],
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let mut sql = format!("CREATE TABLE {} (", self.name);
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(column.name);
            sql.push(' ');
            sql.push_str(column.sql_type.as_sql());
            if column.is_primary_key {
                sql.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                sql.push_str(" NOT NULL");
            }
            if let Some(fk) = column.foreign_key {
                sql.push_str(&format!(
                    " REFERENCES {}({})",
                    fk.foreign_table, fk.foreign_column
                ));
                if fk.cascade_delete {
                    sql.push_str(" ON DELETE CASCADE");
                }
            }
        }
        sql.push_str(");");
        conn.execute(&sql, params![])?;

        for (index_name, columns) in self.indices {
            conn.execute(
                &format!("CREATE INDEX {} ON {}({});", index_name, self.name, columns),
                params![],
            )?;
        }
        Ok(())
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual: Vec<(String, String, bool, bool)> = stmt
            .query_map(params![], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)? == 1,
                    row.get::<_, i32>(5)? == 1,
                ))
            })?
            .collect::<Result<_, _>>()?;

        if actual.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {} ({})",
                self.name,
                actual.len(),
                self.columns.len(),
                self.columns
                    .iter()
                    .map(|c| c.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for ((name, sql_type, non_null, is_pk), expected) in
            actual.iter().zip(self.columns.iter())
        {
            if name != expected.name {
                bail!(
                    "Table {}: column name mismatch, expected {}, got {}",
                    self.name,
                    expected.name,
                    name
                );
            }
            let expected_type = match sql_type.as_str() {
                "TEXT" => &SqlType::Text,
                "INTEGER" => &SqlType::Integer,
                "REAL" => &SqlType::Real,
                "BLOB" => &SqlType::Blob,
                other => {
                    return Err(rusqlite::Error::InvalidColumnType(
                        2,
                        other.to_string(),
                        Type::Text,
                    )
                    .into())
                }
            };
            if expected_type != expected.sql_type {
                bail!(
                    "Table {}: column {} type mismatch, expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    expected_type
                );
            }
            if *non_null != expected.non_null {
                bail!(
                    "Table {}: column {} non-null mismatch, expected {}",
                    self.name,
                    expected.name,
                    expected.non_null
                );
            }
            if *is_pk != expected.is_primary_key {
                bail!(
                    "Table {}: column {} primary-key mismatch, expected {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key
                );
            }
        }

        for (index_name, _) in self.indices {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    /// Create all tables and stamp the version. For fresh databases only.
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    /// Check that the live database structure matches this schema.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

/// Open-or-create boilerplate shared by the stores: reads the stamped
/// version, rejects databases that are older than the base offset or newer
/// than the latest known schema, validates the current structure and applies
/// any pending migrations.
pub fn prepare_database(
    conn: &Connection,
    schemas: &[VersionedSchema],
    label: &str,
) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON;", [])?;

    let stamped = conn
        .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))?;
    let version = stamped - BASE_DB_VERSION as i64;
    if version < 0 {
        bail!(
            "{} database version {} predates the base version {}",
            label,
            stamped,
            BASE_DB_VERSION
        );
    }
    let version = version as usize;
    if version >= schemas.len() {
        bail!(
            "{} database version {} is too new (max supported: {})",
            label,
            version,
            schemas.len() - 1
        );
    }

    schemas[version].validate(conn)?;

    let target = schemas.len() - 1;
    if version < target {
        tracing::info!("Migrating {} database from version {} to {}", label, version, target);
        for schema in schemas.iter().skip(version + 1) {
            if let Some(migration) = schema.migration {
                migration(conn)?;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + target),
            [],
        )?;
    }
    Ok(())
}
