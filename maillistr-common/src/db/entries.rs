//! Entry database operations
//!
//! Entries are only ever inserted (by the ingest engine) and removed by the
//! list cascade. Deduplication relies on `UNIQUE (list_slug, email)`: a
//! losing concurrent insert surfaces as [`InsertOutcome::Duplicate`].

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::models::Entry;
use super::{violation, Violation};
use crate::time;
use crate::Result;

/// Result of an entry insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row written
    Inserted(Entry),
    /// `(list_slug, email)` already present
    Duplicate,
    /// The list no longer exists (deleted between lookup and insert)
    ListMissing,
}

/// Does the list already hold this exact address?
pub async fn entry_exists(pool: &SqlitePool, list_slug: &str, email: &str) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM list_entries WHERE list_slug = ? AND email = ?")
            .bind(list_slug)
            .bind(email)
            .fetch_optional(pool)
            .await?;

    Ok(found.is_some())
}

/// Insert one entry as a single statement
pub async fn insert_entry(
    pool: &SqlitePool,
    list_slug: &str,
    email: &str,
    ip: Option<&str>,
) -> Result<InsertOutcome> {
    let added_at = time::now();

    let result = sqlx::query(
        "INSERT INTO list_entries (list_slug, email, ip, added_at) VALUES (?, ?, ?, ?)",
    )
    .bind(list_slug)
    .bind(email)
    .bind(ip)
    .bind(time::to_storage(&added_at))
    .execute(pool)
    .await;

    match result {
        Ok(done) => Ok(InsertOutcome::Inserted(Entry {
            id: done.last_insert_rowid(),
            list_slug: list_slug.to_string(),
            email: email.to_string(),
            ip: ip.map(str::to_string),
            added_at,
        })),
        Err(err) => match violation(&err) {
            Some(Violation::Unique) => Ok(InsertOutcome::Duplicate),
            Some(Violation::ForeignKey) => Ok(InsertOutcome::ListMissing),
            None => Err(err.into()),
        },
    }
}

/// All entries of a list in insertion order
pub async fn list_entries(pool: &SqlitePool, list_slug: &str) -> Result<Vec<Entry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, list_slug, email, ip, added_at
        FROM list_entries
        WHERE list_slug = ?
        ORDER BY id
        "#,
    )
    .bind(list_slug)
    .fetch_all(pool)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

/// Email addresses of a list in insertion order
pub async fn list_emails(pool: &SqlitePool, list_slug: &str) -> Result<Vec<String>> {
    let emails =
        sqlx::query_scalar("SELECT email FROM list_entries WHERE list_slug = ? ORDER BY id")
            .bind(list_slug)
            .fetch_all(pool)
            .await?;

    Ok(emails)
}

/// Number of entries stored for a list
pub async fn count_entries(pool: &SqlitePool, list_slug: &str) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM list_entries WHERE list_slug = ?")
        .bind(list_slug)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

fn entry_from_row(row: &SqliteRow) -> Result<Entry> {
    let added_at: String = row.get("added_at");
    Ok(Entry {
        id: row.get("id"),
        list_slug: row.get("list_slug"),
        email: row.get("email"),
        ip: row.get("ip"),
        added_at: time::from_storage(&added_at)?,
    })
}
