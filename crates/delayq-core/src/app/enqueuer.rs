//! Enqueuer - メッセージの受け付け
//!
//! 検証 → タイムスタンプ付与 → ストアへ insert。
//! 検証に失敗した場合はストアに一切書き込まない。

use std::sync::Arc;

use crate::domain::{Message, NewMessage, QueueError, RecordId};
use crate::ports::{Clock, MessageStore};
use crate::processor::ProcessorRegistry;

/// Validates and admits new messages.
#[derive(Clone)]
pub struct Enqueuer {
    store: Arc<dyn MessageStore>,
    registry: Arc<ProcessorRegistry>,
    clock: Arc<dyn Clock>,
}

impl Enqueuer {
    pub fn new(
        store: Arc<dyn MessageStore>,
        registry: Arc<ProcessorRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
        }
    }

    /// Admit a message and return the id of the new record.
    ///
    /// Duplicate submissions are independent records.
    pub async fn submit(&self, submission: NewMessage) -> Result<RecordId, QueueError> {
        let name = submission.processor.trim();
        if name.is_empty() {
            return Err(QueueError::MissingProcessor);
        }
        if !self.registry.contains(name) {
            return Err(QueueError::UnknownProcessor(name.to_string()));
        }

        let message = Message::admit(submission, self.clock.timestamp());
        let processor = message.processor.clone();
        let execute_at = message.execute_at;

        let id = self.store.insert(message).await?;
        tracing::debug!(record = %id, %processor, %execute_at, "message queued");
        Ok(id)
    }
}
