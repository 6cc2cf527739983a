//! Mailchimp API client
//!
//! Uses the v2.0 `lists/subscribe` call. The data center is taken from the
//! API key suffix (`<key>-us7` → `https://us7.api.mailchimp.com/2.0`).

use async_trait::async_trait;
use maillistr_common::config::MailchimpConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ExternalSyncError, SubscriptionApi};

const DEFAULT_DATA_CENTER: &str = "us1";
const USER_AGENT: &str = concat!("maillistr/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct SubscribeRequest<'a> {
    apikey: &'a str,
    id: &'a str,
    email: EmailParam<'a>,
    double_optin: bool,
    update_existing: bool,
    send_welcome: bool,
}

#[derive(Debug, Serialize)]
struct EmailParam<'a> {
    email: &'a str,
}

/// Error body returned by the v2.0 API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Mailchimp API client
pub struct MailchimpClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl MailchimpClient {
    pub fn new(config: &MailchimpConfig) -> Result<Self, ExternalSyncError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ExternalSyncError::Network(e.to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| default_base_url(&config.api_key));

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout,
        })
    }

    pub fn subscribe_url(&self) -> String {
        format!("{}/lists/subscribe.json", self.base_url)
    }
}

/// Data center suffix of an API key, e.g. `us7`
pub fn data_center(api_key: &str) -> &str {
    api_key
        .rsplit_once('-')
        .map(|(_, dc)| dc)
        .filter(|dc| !dc.is_empty())
        .unwrap_or(DEFAULT_DATA_CENTER)
}

fn default_base_url(api_key: &str) -> String {
    format!("https://{}.api.mailchimp.com/2.0", data_center(api_key))
}

#[async_trait]
impl SubscriptionApi for MailchimpClient {
    async fn subscribe(&self, list_id: &str, email: &str) -> Result<(), ExternalSyncError> {
        let request = SubscribeRequest {
            apikey: &self.api_key,
            id: list_id,
            email: EmailParam { email },
            double_optin: false,
            update_existing: true,
            send_welcome: false,
        };

        tracing::debug!(list_id = %list_id, "Calling Mailchimp lists/subscribe");

        let response = self
            .http_client
            .post(self.subscribe_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExternalSyncError::Timeout(self.timeout)
                } else {
                    ExternalSyncError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(ApiErrorBody { name, error: Some(error) }) => match name {
                Some(name) => format!("{}: {}", name, error),
                None => error,
            },
            _ => body,
        };

        Err(ExternalSyncError::Api(status.as_u16(), message))
    }
}
