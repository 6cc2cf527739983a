//! List administration endpoints
//!
//! - `GET /` all lists with entry counts
//! - `POST /{slug}` create a list (`mailchimp_list_id` optional)
//! - `GET /{slug}` one list
//! - `DELETE /{slug}` delete a list and its entries

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::request::Parts,
    Form, Json,
};
use maillistr_common::db::{lists, MailingList};
use maillistr_common::Error;
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::AdminAuth;
use crate::{ApiError, ApiResult, AppState};

/// The list named by the `{slug}` path segment; 404 when unknown
#[derive(Debug, Clone)]
pub struct ResolvedList(pub MailingList);

#[async_trait]
impl FromRequestParts<AppState> for ResolvedList {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(slug) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::list_not_found())?;

        lists::get_list(&state.db, &slug)
            .await?
            .map(ResolvedList)
            .ok_or_else(ApiError::list_not_found)
    }
}

/// Parameters for list creation (query string or form body)
#[derive(Debug, Default, Deserialize)]
pub struct CreateListParams {
    #[serde(default)]
    pub mailchimp_list_id: Option<String>,
}

/// GET /
pub async fn list_lists(_admin: AdminAuth, State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let summaries = lists::list_summaries(&state.db).await?;

    Ok(Json(json!({
        "success": true,
        "lists": summaries,
    })))
}

/// POST /{slug}
///
/// A taken or invalid slug is reported as `{success: false, error}` with
/// status 200.
pub async fn create_list(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<CreateListParams>,
    form: Option<Form<CreateListParams>>,
) -> ApiResult<Json<Value>> {
    let mailchimp_list_id = form
        .and_then(|Form(params)| params.mailchimp_list_id)
        .or(query.mailchimp_list_id)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    match lists::create_list(&state.db, &slug, mailchimp_list_id.as_deref()).await {
        Ok(_) => Ok(Json(json!({ "success": true }))),
        Err(Error::AlreadyExists(_)) => Ok(Json(json!({
            "success": false,
            "error": "List already exists",
        }))),
        Err(Error::InvalidInput(msg)) => Ok(Json(json!({
            "success": false,
            "error": msg,
        }))),
        Err(e) => Err(e.into()),
    }
}

/// GET /{slug}
pub async fn show_list(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ResolvedList(list): ResolvedList,
) -> ApiResult<Json<Value>> {
    let summary = lists::get_summary(&state.db, &list.slug)
        .await?
        .ok_or_else(ApiError::list_not_found)?;

    Ok(Json(json!({
        "success": true,
        "list": summary,
    })))
}

/// DELETE /{slug}
pub async fn delete_list(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ResolvedList(list): ResolvedList,
) -> ApiResult<Json<Value>> {
    match lists::delete_list(&state.db, &list.slug).await {
        Ok(()) => Ok(Json(json!({ "success": true }))),
        // Deleted concurrently after resolution
        Err(Error::NotFound(_)) => Err(ApiError::list_not_found()),
        Err(e) => Err(e.into()),
    }
}
