//! Submission entry point.
//!
//! Authentication is checked before any queue logic; the payload is then
//! decoded into a `NewMessage` and handed to the `Enqueuer`.

use super::Enqueuer;
use crate::domain::{NewMessage, QueueError, RecordId};

/// Identity of the caller as established by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    uid: Option<String>,
}

impl AuthContext {
    pub fn authenticated(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The caller's uid, if it is a non-empty one.
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref().filter(|uid| !uid.is_empty())
    }
}

#[derive(Clone)]
pub struct SubmissionGateway {
    enqueuer: Enqueuer,
}

impl SubmissionGateway {
    pub fn new(enqueuer: Enqueuer) -> Self {
        Self { enqueuer }
    }

    /// Accept a raw message payload from `auth`.
    pub async fn submit(
        &self,
        auth: &AuthContext,
        payload: serde_json::Value,
    ) -> Result<RecordId, QueueError> {
        let Some(uid) = auth.uid() else {
            return Err(QueueError::Unauthenticated);
        };
        let submission: NewMessage =
            serde_json::from_value(payload).map_err(QueueError::MalformedSubmission)?;

        let id = self.enqueuer.submit(submission).await?;
        tracing::info!(caller = uid, record = %id, "submission accepted");
        Ok(id)
    }
}
