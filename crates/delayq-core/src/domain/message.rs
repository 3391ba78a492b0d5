//! Message model: the only entity the queue persists.
//!
//! Field names and optionality are the persisted record layout; existing
//! documents written with the older `retry` / `retry_count` names still load.

use serde::{Deserialize, Serialize};

use super::ids::{PassId, RecordId};
use super::timestamp::Timestamp;

/// A unit of scheduled work as stored in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Registry key of the processor that handles this message.
    pub processor: String,

    /// Opaque payload handed to the processor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,

    /// Maximum attempts before the record is dropped. `None` means "use the
    /// policy default", resolved when a failure is handled.
    #[serde(default, alias = "retry", skip_serializing_if = "Option::is_none")]
    pub retry_limit: Option<u32>,

    /// Attempts made so far (not counting the one in progress).
    #[serde(default, alias = "retry_count")]
    pub attempt_count: u32,

    /// Milliseconds to postpone the first execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,

    pub created_at: Timestamp,

    /// `created_at + delay`. Never recomputed after admission.
    pub execute_at: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution_at: Option<Timestamp>,

    /// End of the current claim, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leased_until: Option<Timestamp>,

    /// Pass holding the current claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leased_by: Option<PassId>,
}

impl Message {
    /// Admit a submission at `created_at`.
    pub fn admit(submission: NewMessage, created_at: Timestamp) -> Self {
        let delay = submission.delay;
        Self {
            processor: submission.processor,
            arguments: submission.arguments,
            retry_limit: submission.retry_limit,
            attempt_count: 0,
            delay,
            created_at,
            execute_at: created_at.plus_millis(delay.unwrap_or(0)),
            last_execution_at: None,
            leased_until: None,
            leased_by: None,
        }
    }

    /// Processor name as used for registry lookups.
    pub fn processor_name(&self) -> &str {
        self.processor.trim()
    }

    /// Attempt number of the try about to be made (1-indexed).
    pub fn next_attempt(&self) -> u32 {
        self.attempt_count.saturating_add(1)
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        self.execute_at <= now
    }

    /// Is there a live claim on this record at `now`?
    pub fn is_leased(&self, now: Timestamp) -> bool {
        self.leased_until.is_some_and(|until| until > now)
    }

    pub(crate) fn release_lease(&mut self) {
        self.leased_until = None;
        self.leased_by = None;
    }
}

/// Client-supplied part of a message.
///
/// `created_at` / `execute_at` are server-computed; if a caller sends them
/// they are ignored during deserialization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub processor: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,

    #[serde(default, alias = "retry", skip_serializing_if = "Option::is_none")]
    pub retry_limit: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
}

impl NewMessage {
    pub fn new(processor: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            ..Self::default()
        }
    }

    pub fn with_arguments(mut self, arguments: serde_json::Value) -> Self {
        self.arguments = Some(arguments);
        self
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = Some(retry_limit);
        self
    }

    pub fn with_delay_ms(mut self, delay: u64) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A message together with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: RecordId,
    pub message: Message,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(None, 1_000)]
    #[case(Some(0), 1_000)]
    #[case(Some(60_000), 61_000)]
    fn admit_computes_execute_at(#[case] delay: Option<u64>, #[case] expected: i64) {
        let mut submission = NewMessage::new("log");
        submission.delay = delay;

        let msg = Message::admit(submission, Timestamp::from_millis(1_000));

        assert_eq!(msg.created_at, Timestamp::from_millis(1_000));
        assert_eq!(msg.execute_at, Timestamp::from_millis(expected));
        assert_eq!(msg.attempt_count, 0);
        assert!(msg.last_execution_at.is_none());
    }

    #[test]
    fn persisted_layout_uses_documented_names() {
        let msg = Message::admit(
            NewMessage::new("log")
                .with_arguments(json!({"to": "a@b.c"}))
                .with_retry_limit(3),
            Timestamp::from_millis(10),
        );

        let doc = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            doc,
            json!({
                "processor": "log",
                "arguments": {"to": "a@b.c"},
                "retry_limit": 3,
                "attempt_count": 0,
                "created_at": 10,
                "execute_at": 10,
            })
        );
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let doc = json!({
            "processor": "log",
            "retry": 2,
            "retry_count": 1,
            "created_at": 5,
            "execute_at": 5,
            "last_execution_at": 7,
        });

        let msg: Message = serde_json::from_value(doc).unwrap();
        assert_eq!(msg.retry_limit, Some(2));
        assert_eq!(msg.attempt_count, 1);
        assert_eq!(msg.last_execution_at, Some(Timestamp::from_millis(7)));
    }

    #[test]
    fn submission_ignores_server_fields() {
        let payload = json!({
            "processor": "log",
            "delay": 500,
            "created_at": 1,
            "execute_at": 2,
        });

        let submission: NewMessage = serde_json::from_value(payload).unwrap();
        assert_eq!(submission, NewMessage::new("log").with_delay_ms(500));
    }

    #[test]
    fn lease_is_live_only_before_expiry() {
        let mut msg = Message::admit(NewMessage::new("log"), Timestamp::from_millis(0));
        assert!(!msg.is_leased(Timestamp::from_millis(0)));

        msg.leased_until = Some(Timestamp::from_millis(100));
        assert!(msg.is_leased(Timestamp::from_millis(99)));
        assert!(!msg.is_leased(Timestamp::from_millis(100)));

        msg.release_lease();
        assert!(msg.leased_until.is_none());
    }

    #[test]
    fn processor_name_is_trimmed() {
        let msg = Message::admit(NewMessage::new("  log "), Timestamp::from_millis(0));
        assert_eq!(msg.processor_name(), "log");
        assert_eq!(msg.next_attempt(), 1);
    }
}
