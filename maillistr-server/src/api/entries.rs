//! Entry endpoints
//!
//! Public:
//! - `POST /{slug}/entries` submit an address
//! - `GET|POST /{slug}/entries/jsonp?callback=fn` same, wrapped as `fn(json);`
//!
//! Admin:
//! - `GET /{slug}/entries` entries as JSON
//! - `GET /{slug}/entries.csv` addresses, one per line

use axum::{
    extract::{rejection::QueryRejection, ConnectInfo, Path, Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use maillistr_common::db::entries;
use serde_json::{json, Value};
use std::net::SocketAddr;

use super::auth::AdminAuth;
use super::lists::ResolvedList;
use crate::ingest::Outcome;
use crate::{ApiError, ApiResult, AppState};

const MAX_CALLBACK_LEN: usize = 128;

/// Raw `key=value` pairs. Repeated keys are kept so a malformed submission
/// still reaches the handler instead of failing extraction.
type Pairs = Vec<(String, String)>;

/// Submission parameters (query string or form body; the form wins)
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SubmissionParams {
    pub email: Option<String>,
    pub callback: Option<String>,
}

impl SubmissionParams {
    /// First occurrence of each known key
    fn from_pairs(pairs: Pairs) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "email" => &mut params.email,
                "callback" => &mut params.callback,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }

    fn merge(query: Result<Query<Pairs>, QueryRejection>, form: Option<Form<Pairs>>) -> Self {
        // Pairs accept repeated and unknown keys; any other decoding
        // failure counts as no parameters
        let query = query
            .map(|Query(pairs)| Self::from_pairs(pairs))
            .unwrap_or_default();
        let form = form
            .map(|Form(pairs)| Self::from_pairs(pairs))
            .unwrap_or_default();

        Self {
            email: form.email.or(query.email),
            callback: form.callback.or(query.callback),
        }
    }
}

/// Run a submission through the ingest engine and shape the reply
async fn submit(
    state: &AppState,
    slug: &str,
    params: &SubmissionParams,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> ApiResult<(StatusCode, Value)> {
    let source_addr = peer.map(|ConnectInfo(addr)| addr.ip().to_string());
    let email = params.email.as_deref().unwrap_or("");

    let reply = match state
        .engine
        .ingest(slug, email, source_addr.as_deref())
        .await?
    {
        Outcome::Accepted(_) => (
            StatusCode::OK,
            json!({ "success": true, "already_added": false }),
        ),
        Outcome::AlreadyPresent => (
            StatusCode::OK,
            json!({ "success": true, "already_added": true }),
        ),
        Outcome::ValidationFailed(e) => (
            StatusCode::OK,
            json!({ "success": false, "error": e.to_string() }),
        ),
        Outcome::ListNotFound => (
            StatusCode::NOT_FOUND,
            json!({ "success": false, "error": "List not found" }),
        ),
    };

    Ok(reply)
}

/// POST /{slug}/entries
pub async fn add_entry(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    peer: Option<ConnectInfo<SocketAddr>>,
    query: Result<Query<Pairs>, QueryRejection>,
    form: Option<Form<Pairs>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let params = SubmissionParams::merge(query, form);
    let (status, body) = submit(&state, &slug, &params, peer).await?;
    Ok((status, Json(body)))
}

/// GET|POST /{slug}/entries/jsonp
pub async fn add_entry_jsonp(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    peer: Option<ConnectInfo<SocketAddr>>,
    query: Result<Query<Pairs>, QueryRejection>,
    form: Option<Form<Pairs>>,
) -> ApiResult<Response> {
    let params = SubmissionParams::merge(query, form);

    let callback = params
        .callback
        .as_deref()
        .filter(|name| is_valid_callback(name))
        .ok_or_else(|| ApiError::BadRequest("Missing or invalid callback".to_string()))?
        .to_string();

    // Always 200: a script tag drops the body of an error response, so the
    // outcome travels only in the payload
    let (_status, body) = submit(&state, &slug, &params, peer).await?;
    let script = format!("{}({});", callback, body);

    Ok(([(CONTENT_TYPE, "application/javascript")], script).into_response())
}

/// Callback names are restricted to dotted JavaScript identifiers so the
/// reply cannot carry injected script.
pub fn is_valid_callback(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_CALLBACK_LEN {
        return false;
    }

    name.split('.').all(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => chars
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
            _ => false,
        }
    })
}

/// GET /{slug}/entries
pub async fn list_entries(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ResolvedList(list): ResolvedList,
) -> ApiResult<Json<Value>> {
    let entries: Vec<Value> = entries::list_entries(&state.db, &list.slug)
        .await?
        .into_iter()
        .map(|entry| {
            json!({
                "email": entry.email,
                "ip": entry.ip,
                "added_at": entry.added_at,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "nb_entries": entries.len(),
        "entries": entries,
    })))
}

/// GET /{slug}/entries.csv
pub async fn list_entries_csv(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ResolvedList(list): ResolvedList,
) -> ApiResult<Response> {
    let emails = entries::list_emails(&state.db, &list.slug).await?;

    Ok((
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        emails.join("\n"),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_names() {
        for name in ["cb", "jQuery1830_1400", "app.handlers.done", "$", "_x1"] {
            assert!(is_valid_callback(name), "{} should be accepted", name);
        }
        for name in ["", "1cb", "alert(1)", "a..b", "cb;evil()", "a-b", ".cb"] {
            assert!(!is_valid_callback(name), "{} should be rejected", name);
        }
        assert!(!is_valid_callback(&"a".repeat(129)));
    }

    fn pairs(items: &[(&str, &str)]) -> Pairs {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_form_params_override_query() {
        let query = pairs(&[("email", "query@x.com"), ("callback", "fromQuery")]);
        let form = pairs(&[("email", "form@x.com")]);

        let merged = SubmissionParams::merge(Ok(Query(query)), Some(Form(form)));
        assert_eq!(merged.email.as_deref(), Some("form@x.com"));
        assert_eq!(merged.callback.as_deref(), Some("fromQuery"));
    }

    #[test]
    fn test_repeated_keys_keep_first_value() {
        let params = SubmissionParams::from_pairs(pairs(&[
            ("email", "a@x.com"),
            ("name", "ignored"),
            ("email", "b@x.com"),
        ]));
        assert_eq!(params.email.as_deref(), Some("a@x.com"));
        assert_eq!(params.callback, None);
    }
}
