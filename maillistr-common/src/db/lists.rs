//! List database operations

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::models::{ListSummary, MailingList};
use crate::time;
use crate::{Error, Result};

const MAX_SLUG_LEN: usize = 64;

/// Slugs shadowed by fixed routes
const RESERVED_SLUGS: &[&str] = &["health"];

/// Check that a slug can be used as a single URL path segment
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
        return Err(Error::InvalidInput(format!(
            "List slug must be 1-{} characters",
            MAX_SLUG_LEN
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::InvalidInput(
            "List slug may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }
    if RESERVED_SLUGS.contains(&slug) {
        return Err(Error::InvalidInput(format!("List slug '{}' is reserved", slug)));
    }
    Ok(())
}

/// Create a list. An existing list with the same slug is left untouched
/// and `Error::AlreadyExists` is returned.
pub async fn create_list(
    pool: &SqlitePool,
    slug: &str,
    mailchimp_list_id: Option<&str>,
) -> Result<MailingList> {
    validate_slug(slug)?;
    let added_at = time::now();

    let result = sqlx::query(
        r#"
        INSERT INTO lists (slug, mailchimp_list_id, added_at)
        VALUES (?, ?, ?)
        ON CONFLICT(slug) DO NOTHING
        "#,
    )
    .bind(slug)
    .bind(mailchimp_list_id)
    .bind(time::to_storage(&added_at))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::AlreadyExists(format!("list '{}'", slug)));
    }

    tracing::info!(list = %slug, mailchimp_list_id = ?mailchimp_list_id, "List created");

    Ok(MailingList {
        slug: slug.to_string(),
        mailchimp_list_id: mailchimp_list_id.map(str::to_string),
        added_at,
    })
}

/// Look up a list by slug
pub async fn get_list(pool: &SqlitePool, slug: &str) -> Result<Option<MailingList>> {
    let row = sqlx::query("SELECT slug, mailchimp_list_id, added_at FROM lists WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    row.map(|row| list_from_row(&row)).transpose()
}

/// Delete a list and, through the foreign key cascade, all of its entries
pub async fn delete_list(pool: &SqlitePool, slug: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM lists WHERE slug = ?")
        .bind(slug)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("list '{}'", slug)));
    }

    tracing::info!(list = %slug, "List deleted");
    Ok(())
}

/// All lists with entry counts, oldest first
pub async fn list_summaries(pool: &SqlitePool) -> Result<Vec<ListSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT l.slug, l.mailchimp_list_id, l.added_at, COUNT(e.id) AS nb_entries
        FROM lists l
        LEFT JOIN list_entries e ON e.list_slug = l.slug
        GROUP BY l.slug
        ORDER BY l.added_at, l.slug
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(summary_from_row).collect()
}

/// Summary for a single list
pub async fn get_summary(pool: &SqlitePool, slug: &str) -> Result<Option<ListSummary>> {
    let row = sqlx::query(
        r#"
        SELECT l.slug, l.mailchimp_list_id, l.added_at, COUNT(e.id) AS nb_entries
        FROM lists l
        LEFT JOIN list_entries e ON e.list_slug = l.slug
        WHERE l.slug = ?
        GROUP BY l.slug
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    row.map(|row| summary_from_row(&row)).transpose()
}

/// Slugs of all lists, oldest first
pub async fn list_slugs(pool: &SqlitePool) -> Result<Vec<String>> {
    let slugs = sqlx::query_scalar("SELECT slug FROM lists ORDER BY added_at, slug")
        .fetch_all(pool)
        .await?;

    Ok(slugs)
}

fn list_from_row(row: &SqliteRow) -> Result<MailingList> {
    let added_at: String = row.get("added_at");
    Ok(MailingList {
        slug: row.get("slug"),
        mailchimp_list_id: row.get("mailchimp_list_id"),
        added_at: time::from_storage(&added_at)?,
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<ListSummary> {
    let added_at: String = row.get("added_at");
    Ok(ListSummary {
        slug: row.get("slug"),
        mailchimp_list_id: row.get("mailchimp_list_id"),
        added_at: time::from_storage(&added_at)?,
        nb_entries: row.get("nb_entries"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slugs() {
        for slug in ["news", "beta-launch", "list_2024", "A"] {
            assert!(validate_slug(slug).is_ok(), "{} should be valid", slug);
        }
    }

    #[test]
    fn test_invalid_slugs() {
        let too_long = "x".repeat(65);
        for slug in ["", "has space", "slash/slug", "dot.csv", "health", too_long.as_str()] {
            assert!(
                matches!(validate_slug(slug), Err(Error::InvalidInput(_))),
                "{:?} should be rejected",
                slug
            );
        }
    }
}
