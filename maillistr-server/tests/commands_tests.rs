//! Tests for the CLI management commands

use maillistr_common::config::TomlConfig;
use maillistr_common::db::{self, entries};
use maillistr_server::commands;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> TomlConfig {
    TomlConfig {
        database_path: dir.path().join("cli.db"),
        ..TomlConfig::default()
    }
}

#[tokio::test]
async fn test_init_writes_key_to_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("maillistr.toml");

    let key = commands::init(config_in(&dir), &config_path).await.unwrap();

    assert_eq!(key.len(), 30);
    assert!(dir.path().join("cli.db").exists());

    let saved = TomlConfig::from_file(&config_path).unwrap();
    assert_eq!(saved.api_key, key);
    assert_eq!(saved.database_path, dir.path().join("cli.db"));
}

#[tokio::test]
async fn test_createdb_creates_file() {
    let dir = TempDir::new().unwrap();
    commands::createdb(&config_in(&dir)).await.unwrap();
    assert!(dir.path().join("cli.db").exists());
}

#[test]
fn test_genapikey_is_fresh_each_time() {
    assert_ne!(commands::genapikey(), commands::genapikey());
}

#[tokio::test]
async fn test_list_lifecycle() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let list = commands::createlist(&config, "news", Some("mc-1")).await.unwrap();
    assert_eq!(list.slug, "news");
    assert_eq!(list.mailchimp_list_id.as_deref(), Some("mc-1"));

    commands::createlist(&config, "events", Some("  ")).await.unwrap();

    assert!(commands::createlist(&config, "news", None).await.is_err());
    assert_eq!(
        commands::lists(&config).await.unwrap(),
        vec!["news".to_string(), "events".to_string()]
    );

    assert_eq!(commands::dellist(&config, "news").await.unwrap(), 0);
    assert!(commands::dellist(&config, "news").await.is_err());
    assert_eq!(commands::lists(&config).await.unwrap(), vec!["events".to_string()]);
}

#[tokio::test]
async fn test_createlist_rejects_bad_slug() {
    let dir = TempDir::new().unwrap();
    let result = commands::createlist(&config_in(&dir), "health", None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_dellist_reports_removed_entries() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    commands::createlist(&config, "news", None).await.unwrap();

    let pool = db::init_database(&config.database_path).await.unwrap();
    for email in ["a@x.com", "b@x.com", "c@x.com"] {
        entries::insert_entry(&pool, "news", email, None).await.unwrap();
    }
    pool.close().await;

    assert_eq!(commands::dellist(&config, "news").await.unwrap(), 3);
    assert!(commands::lists(&config).await.unwrap().is_empty());
}
