//! Local content entities materialized from the satellite catalog.

/// The two catalog entity families the pipelines operate on. Every store
/// query is scoped to one kind; the kinds never share entries or state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Brand,
    Slot,
}

impl EntityKind {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            EntityKind::Brand => "brand",
            EntityKind::Slot => "slot",
        }
    }

    pub fn all() -> [EntityKind; 2] {
        [EntityKind::Brand, EntityKind::Slot]
    }
}

/// Visibility of a local entry. Entries absent from a full remote sync are
/// drafted rather than deleted, so they come back untouched if the remote
/// record reappears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Published,
    Draft,
}

impl EntryStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            EntryStatus::Published => "published",
            EntryStatus::Draft => "draft",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "draft" => EntryStatus::Draft,
            _ => EntryStatus::Published,
        }
    }
}

/// One local catalog entry. Meta fields live in their own table and are
/// fetched separately via
/// [`ContentStore::entry_fields`](crate::content::ContentStore::entry_fields).
#[derive(Debug, Clone, PartialEq)]
pub struct ContentEntry {
    /// Identifier of the record on the satellite side.
    pub external_id: i64,
    pub title: String,
    pub status: EntryStatus,
}
