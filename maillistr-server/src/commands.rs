//! Management commands behind the CLI subcommands
//!
//! Each command opens the database itself (creating the schema when
//! missing) and closes the pool before returning.

use anyhow::{Context, Result};
use maillistr_common::config::{generate_api_key, TomlConfig};
use maillistr_common::db::{self, entries, lists, MailingList};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

async fn open(config: &TomlConfig) -> Result<SqlitePool> {
    db::init_database(&config.database_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open database {}",
                config.database_path.display()
            )
        })
}

/// Create the schema, generate a fresh API key and store it in the config
/// file. Returns the key.
pub async fn init(mut config: TomlConfig, config_path: &Path) -> Result<String> {
    open(&config).await?.close().await;

    let key = generate_api_key();
    config.api_key = key.clone();
    config
        .save(config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    info!("Wrote API key to {}", config_path.display());
    Ok(key)
}

/// Create the schema only
pub async fn createdb(config: &TomlConfig) -> Result<()> {
    open(config).await?.close().await;
    Ok(())
}

/// A fresh random API key; nothing is stored
pub fn genapikey() -> String {
    generate_api_key()
}

pub async fn createlist(
    config: &TomlConfig,
    slug: &str,
    mailchimp_list_id: Option<&str>,
) -> Result<MailingList> {
    let pool = open(config).await?;
    let mailchimp_list_id = mailchimp_list_id
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let result = lists::create_list(&pool, slug, mailchimp_list_id).await;
    pool.close().await;

    result.with_context(|| format!("Failed to create list '{}'", slug))
}

/// Delete a list. Returns how many entries went with it.
pub async fn dellist(config: &TomlConfig, slug: &str) -> Result<i64> {
    let pool = open(config).await?;
    let result = async {
        let removed = entries::count_entries(&pool, slug).await?;
        lists::delete_list(&pool, slug).await?;
        Ok::<_, maillistr_common::Error>(removed)
    }
    .await;
    pool.close().await;

    result.with_context(|| format!("Failed to delete list '{}'", slug))
}

/// All list slugs, oldest first
pub async fn lists(config: &TomlConfig) -> Result<Vec<String>> {
    let pool = open(config).await?;
    let slugs = lists::list_slugs(&pool).await;
    pool.close().await;

    Ok(slugs?)
}
