//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and creates the schema.
//! Every pooled connection gets `foreign_keys = ON` so list deletion
//! cascades to entries.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const MAX_CONNECTIONS: u32 = 16;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the database and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    let pool = connect(db_path).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a connection pool without touching the schema
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL lets readers proceed while a submission is being written
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_lists_table(pool).await?;
    create_list_entries_table(pool).await?;
    Ok(())
}

async fn create_lists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lists (
            slug TEXT PRIMARY KEY,
            mailchimp_list_id TEXT,
            added_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_list_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS list_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            list_slug TEXT NOT NULL REFERENCES lists(slug) ON DELETE CASCADE,
            email TEXT NOT NULL,
            ip TEXT,
            added_at TEXT NOT NULL,
            UNIQUE (list_slug, email)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
