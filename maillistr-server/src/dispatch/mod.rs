//! Subscriber dispatcher
//!
//! Forwards newly accepted entries to the external subscription service off
//! the request path. Jobs go through a bounded queue; when the queue is full
//! the job is dropped with a warning so ingestion never waits. A single
//! worker drains the queue and runs each call as its own task, at most
//! `max_in_flight` at a time, each bounded by a timeout.
//!
//! Outcomes are only logged: no retry, nothing persisted, nothing reported
//! back to the submitter.

pub mod mailchimp;

use async_trait::async_trait;
use maillistr_common::config::DispatchConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub use mailchimp::MailchimpClient;

/// External subscription call failure. Logged, never propagated.
#[derive(Debug, Error)]
pub enum ExternalSyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Remote subscription service
#[async_trait]
pub trait SubscriptionApi: Send + Sync + 'static {
    /// Subscribe `email` to `list_id` with double opt-in off,
    /// update-existing on and no welcome message
    async fn subscribe(&self, list_id: &str, email: &str) -> Result<(), ExternalSyncError>;
}

/// One pending subscribe call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeJob {
    pub list_id: String,
    pub email: String,
}

/// Handle used by the ingest engine to queue subscribe calls
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<SubscribeJob>,
}

impl Dispatcher {
    /// Start the background worker
    ///
    /// The worker stops once every `Dispatcher` clone is dropped and the
    /// calls already in flight have finished.
    pub fn spawn(
        api: Arc<dyn SubscriptionApi>,
        config: &DispatchConfig,
        call_timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let handle = tokio::spawn(run_worker(rx, api, config.max_in_flight, call_timeout));
        (Self { tx }, handle)
    }

    /// Queue a subscribe call without waiting. Returns false if the job
    /// was dropped.
    pub fn dispatch(&self, list_id: &str, email: &str) -> bool {
        let job = SubscribeJob {
            list_id: list_id.to_string(),
            email: email.to_string(),
        };

        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(
                    list_id = %job.list_id,
                    email = %job.email,
                    "Dispatch queue full, dropping subscribe call"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!(
                    list_id = %job.list_id,
                    email = %job.email,
                    "Dispatch worker stopped, dropping subscribe call"
                );
                false
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<SubscribeJob>,
    api: Arc<dyn SubscriptionApi>,
    max_in_flight: usize,
    call_timeout: Duration,
) {
    let permits = Arc::new(Semaphore::new(max_in_flight));

    while let Some(job) = rx.recv().await {
        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let api = api.clone();

        tokio::spawn(async move {
            deliver(api.as_ref(), &job, call_timeout).await;
            drop(permit);
        });
    }

    // Wait for in-flight calls before reporting the worker as finished
    let _ = permits.acquire_many(max_in_flight as u32).await;
    debug!("Dispatch worker stopped");
}

async fn deliver(api: &dyn SubscriptionApi, job: &SubscribeJob, call_timeout: Duration) {
    let result = match tokio::time::timeout(call_timeout, api.subscribe(&job.list_id, &job.email))
        .await
    {
        Ok(result) => result,
        Err(_) => Err(ExternalSyncError::Timeout(call_timeout)),
    };

    match result {
        Ok(()) => info!(
            list_id = %job.list_id,
            email = %job.email,
            "Added to external subscription list"
        ),
        Err(e) => error!(
            list_id = %job.list_id,
            email = %job.email,
            error = %e,
            "Failed adding to external subscription list"
        ),
    }
}
