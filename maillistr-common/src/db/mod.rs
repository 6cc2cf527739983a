//! Storage: SQLite schema, models and queries
//!
//! Two tables: `lists` (keyed by slug) and `list_entries` (surrogate id,
//! foreign key to the list, `UNIQUE (list_slug, email)`). The uniqueness
//! constraint is the only concurrency control for entry deduplication.

pub mod entries;
pub mod init;
pub mod lists;
pub mod models;

pub use entries::InsertOutcome;
pub use init::{connect, create_schema, init_database};
pub use models::{Entry, ListSummary, MailingList};

/// Constraint classes the callers care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Violation {
    Unique,
    ForeignKey,
}

/// Map a sqlx error to the constraint it violated, if any
pub(crate) fn violation(err: &sqlx::Error) -> Option<Violation> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => Some(Violation::Unique),
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            Some(Violation::ForeignKey)
        }
        _ => None,
    }
}
