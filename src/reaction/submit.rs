//! Outbound delivery of finished sessions to the result service.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::{
    dto::results::SubmitResultRequest,
    error::ServiceError,
    services::{ranking::Location, result_service},
    state::SharedState,
};

use super::session::CompletedSession;

/// Failures delivering a session. The game logs and drops them.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request could not be sent.
    #[cfg(feature = "http")]
    #[error("failed to send result to `{url}`")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The result endpoint answered with a non-success status.
    #[error("result endpoint `{url}` answered with status {status}")]
    Status { url: String, status: u16 },
    /// The in-process service rejected the session.
    #[error("result service rejected submission")]
    Service(#[source] ServiceError),
}

/// Sink for completed sessions.
pub trait ResultSubmitter: Send + Sync {
    /// Deliver one completed session.
    fn submit(&self, session: CompletedSession) -> BoxFuture<'static, Result<(), SubmitError>>;
}

/// Builds the wire payload for a completed session.
fn request_body(session: &CompletedSession, user_id: Option<String>) -> SubmitResultRequest {
    SubmitResultRequest {
        reaction_time: None,
        reaction_times: Some(session.attempts.clone()),
        average_time: Some(f64::from(session.average_ms)),
        user_id,
    }
}

/// Posts sessions to `<base_url>/results/<test_type>`.
#[cfg(feature = "http")]
#[derive(Clone)]
pub struct HttpSubmitter {
    client: reqwest::Client,
    base_url: std::sync::Arc<str>,
    user_id: Option<String>,
}

#[cfg(feature = "http")]
impl HttpSubmitter {
    /// Create a submitter targeting the service at `base_url`.
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: std::sync::Arc::from(base_url.as_ref().trim_end_matches('/')),
            user_id: None,
        }
    }

    /// Attach a user identifier to every submission.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

#[cfg(feature = "http")]
impl ResultSubmitter for HttpSubmitter {
    fn submit(&self, session: CompletedSession) -> BoxFuture<'static, Result<(), SubmitError>> {
        let submitter = self.clone();
        Box::pin(async move {
            let url = format!("{}/results/{}", submitter.base_url, session.test_type);
            let body = request_body(&session, submitter.user_id.clone());
            let response = submitter
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|source| SubmitError::Transport {
                    url: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(SubmitError::Status {
                    url,
                    status: response.status().as_u16(),
                })
            }
        })
    }
}

/// Submits straight into an in-process result service.
#[derive(Clone)]
pub struct LocalSubmitter {
    state: SharedState,
    location: Location,
}

impl LocalSubmitter {
    /// Submit into `state`, tagging results with `location`.
    pub fn new(state: SharedState, location: Location) -> Self {
        Self { state, location }
    }
}

impl ResultSubmitter for LocalSubmitter {
    fn submit(&self, session: CompletedSession) -> BoxFuture<'static, Result<(), SubmitError>> {
        let state = self.state.clone();
        let location = self.location.clone();
        Box::pin(async move {
            let body = request_body(&session, None);
            result_service::submit(&state, &session.test_type, body, location)
                .await
                .map(|_| ())
                .map_err(SubmitError::Service)
        })
    }
}

/// Drops every session; used when no result service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSubmitter;

impl ResultSubmitter for DiscardSubmitter {
    fn submit(&self, session: CompletedSession) -> BoxFuture<'static, Result<(), SubmitError>> {
        tracing::debug!(
            session = %session.session_id,
            "no result service configured; dropping session"
        );
        Box::pin(async { Ok(()) })
    }
}
