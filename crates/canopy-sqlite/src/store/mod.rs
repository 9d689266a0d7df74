//! Collaborator implementations over one [`SqlitePool`](crate::SqlitePool)
//!
//! Every store shares the pool's connection, so a transaction opened through
//! [`SqliteTransactions`](crate::connection::SqliteTransactions) covers all
//! of them.

mod elements;
mod field_layouts;
mod groups;
mod structures;

pub use elements::SqliteElementStore;
pub use field_layouts::SqliteFieldLayoutStore;
pub use groups::SqliteCategoryRepository;
pub use structures::SqliteTreeStore;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

/// `?, ?, ?` for an `IN (..)` list
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub(crate) fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
