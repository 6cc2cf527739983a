//! HTTP API handlers for maillistr

pub mod auth;
pub mod entries;
pub mod health;
pub mod lists;

pub use auth::AdminAuth;
pub use entries::{add_entry, add_entry_jsonp, list_entries, list_entries_csv};
pub use health::health_routes;
pub use lists::{create_list, delete_list, list_lists, show_list, ResolvedList};
