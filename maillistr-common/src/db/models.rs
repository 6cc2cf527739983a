//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named mailing list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailingList {
    pub slug: String,
    /// External subscription list; `None` disables external sync
    pub mailchimp_list_id: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// List with its entry count, as returned by the admin API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSummary {
    pub slug: String,
    pub mailchimp_list_id: Option<String>,
    pub added_at: DateTime<Utc>,
    pub nb_entries: i64,
}

/// One accepted email submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub list_slug: String,
    pub email: String,
    /// Submitter address, best-effort
    pub ip: Option<String>,
    pub added_at: DateTime<Utc>,
}
