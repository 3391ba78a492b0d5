//! Errors - エラー型と分類
//!
//! - `StoreError`: ストア（正本）への読み書きの失敗
//! - `QueueError`: submit 側に同期的に返るエラー
//! - `ProcessingFailure`: processor の失敗（呼び出し元には返らない、retry で回収）

use super::ids::{PassId, RecordId};

/// Failures of the store adapter itself.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("lease on {id} is not held by {owner}")]
    LeaseLost { id: RecordId, owner: PassId },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors surfaced to a submitting caller.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("permission denied")]
    Unauthenticated,

    #[error("the message must have a processor")]
    MissingProcessor,

    #[error("there isn't any processor for the '{0}' function")]
    UnknownProcessor(String),

    #[error("malformed message: {0}")]
    MalformedSubmission(#[source] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coarse status for the submission entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    PermissionDenied,
    FailedPrecondition,
    Internal,
}

impl QueueError {
    pub fn code(&self) -> ErrorCode {
        match self {
            QueueError::Unauthenticated => ErrorCode::PermissionDenied,
            QueueError::MissingProcessor
            | QueueError::UnknownProcessor(_)
            | QueueError::MalformedSubmission(_) => ErrorCode::FailedPrecondition,
            QueueError::Store(_) => ErrorCode::Internal,
        }
    }
}

/// A processor could not handle a message.
///
/// Recovered by the retry policy; never reported to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProcessingFailure {
    message: String,
}

impl ProcessingFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build a failure out of a panic payload caught around a processor call.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::new(format!("processor panicked: {detail}"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for ProcessingFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("json decode: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_errors_map_to_codes() {
        assert_eq!(QueueError::Unauthenticated.code(), ErrorCode::PermissionDenied);
        assert_eq!(QueueError::MissingProcessor.code(), ErrorCode::FailedPrecondition);
        assert_eq!(
            QueueError::UnknownProcessor("mail".into()).code(),
            ErrorCode::FailedPrecondition
        );
        assert_eq!(
            QueueError::Store(StoreError::Backend("down".into())).code(),
            ErrorCode::Internal
        );
    }

    #[test]
    fn unknown_processor_message_names_it() {
        let err = QueueError::UnknownProcessor("mail".into());
        assert_eq!(err.to_string(), "there isn't any processor for the 'mail' function");
    }

    #[test]
    fn panic_payloads_become_failures() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(
            ProcessingFailure::from_panic(boxed.as_ref()).message(),
            "processor panicked: boom"
        );

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(
            ProcessingFailure::from_panic(boxed.as_ref()).message(),
            "processor panicked: owned"
        );

        let boxed: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert!(ProcessingFailure::from_panic(boxed.as_ref())
            .message()
            .contains("non-string"));
    }
}
