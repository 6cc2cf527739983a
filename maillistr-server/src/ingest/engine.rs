//! Dedup + ingest engine
//!
//! Decides whether a submission is a new entry for a list and persists it.
//! At most one entry per (list, email) is guaranteed by the storage
//! uniqueness constraint, not by in-process locking, so the guarantee holds
//! across concurrent requests and across server instances.

use maillistr_common::db::{entries, lists, Entry, InsertOutcome};
use maillistr_common::Result;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::validator::{validate, ValidationError};
use crate::dispatch::Dispatcher;

/// Result of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// New entry stored
    Accepted(Entry),
    /// Address already on the list; nothing written
    AlreadyPresent,
    /// Unknown list slug
    ListNotFound,
    /// Address rejected by the validator
    ValidationFailed(ValidationError),
}

/// Ingestion entry point shared by all request handlers
#[derive(Clone)]
pub struct IngestEngine {
    db: SqlitePool,
    /// `None` when external sync is disabled
    dispatcher: Option<Dispatcher>,
}

impl IngestEngine {
    pub fn new(db: SqlitePool, dispatcher: Option<Dispatcher>) -> Self {
        Self { db, dispatcher }
    }

    /// Submit `raw_email` to the list `list_slug`
    ///
    /// Only storage faults are returned as errors. Exactly one row is
    /// written when the outcome is `Accepted`, none otherwise.
    pub async fn ingest(
        &self,
        list_slug: &str,
        raw_email: &str,
        source_addr: Option<&str>,
    ) -> Result<Outcome> {
        let Some(list) = lists::get_list(&self.db, list_slug).await? else {
            return Ok(Outcome::ListNotFound);
        };

        let email = match validate(raw_email) {
            Ok(email) => email,
            Err(e) => return Ok(Outcome::ValidationFailed(e)),
        };

        // Fast path; the insert below stays authoritative under races
        if entries::entry_exists(&self.db, &list.slug, email.as_str()).await? {
            debug!(list = %list.slug, email = %email, "Entry already present");
            return Ok(Outcome::AlreadyPresent);
        }

        let entry =
            match entries::insert_entry(&self.db, &list.slug, email.as_str(), source_addr).await? {
                InsertOutcome::Inserted(entry) => entry,
                InsertOutcome::Duplicate => {
                    debug!(list = %list.slug, email = %email, "Lost insert race, entry already present");
                    return Ok(Outcome::AlreadyPresent);
                }
                InsertOutcome::ListMissing => return Ok(Outcome::ListNotFound),
            };

        info!(list = %list.slug, email = %entry.email, "Entry added");

        if let (Some(dispatcher), Some(list_id)) = (&self.dispatcher, &list.mailchimp_list_id) {
            dispatcher.dispatch(list_id, &entry.email);
        }

        Ok(Outcome::Accepted(entry))
    }
}
