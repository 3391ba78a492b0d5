use async_trait::async_trait;

use super::Processor;
use crate::domain::{Message, ProcessingFailure};

/// Registry name of the built-in log processor.
pub const LOG_PROCESSOR: &str = "log";

/// Logs the processor name and arguments, then acknowledges the message.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProcessor;

impl LogProcessor {
    pub const NAME: &'static str = LOG_PROCESSOR;
}

#[async_trait]
impl Processor for LogProcessor {
    async fn process(&self, message: Message) -> Result<Message, ProcessingFailure> {
        let arguments = message
            .arguments
            .as_ref()
            .map(|value| value.to_string())
            .unwrap_or_default();
        tracing::info!(processor = %message.processor, %arguments, "log processor");
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewMessage, Timestamp};

    #[tokio::test]
    async fn returns_the_message_unchanged() {
        let msg = Message::admit(
            NewMessage::new(LogProcessor::NAME).with_arguments(serde_json::json!(["a", 1])),
            Timestamp::from_millis(3),
        );
        let out = LogProcessor.process(msg.clone()).await.unwrap();
        assert_eq!(out, msg);
    }
}
