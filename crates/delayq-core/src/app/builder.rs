//! QueueBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - `expect_processors()` で期待される processor 名を登録
//! - `build()` 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - 不足があれば `BuildError` を返す

use std::sync::Arc;

use super::{Dispatcher, Enqueuer, SubmissionGateway, WorkerHandle};
use crate::config::{ConfigError, QueueConfig};
use crate::domain::{NewMessage, PassSummary, QueueError, RecordId};
use crate::impls::InMemoryStore;
use crate::ports::{Clock, IdGenerator, MessageStore, SystemClock, UlidGenerator};
use crate::processor::{Handler, Processor, ProcessorRegistry, RegistryError, TypedArguments};

/// Builds a `Queue` from config, processors and (optionally) injected ports.
///
/// ```ignore
/// let queue = QueueBuilder::new()
///     .config(config)
///     .register("log", LogProcessor)?
///     .expect_processors(&["log"])
///     .build()?;
/// ```
///
/// Without `store()` an `InMemoryStore` is used; without `clock()` the
/// system clock.
pub struct QueueBuilder {
    registry: ProcessorRegistry,
    expected: Option<Vec<String>>,
    config: QueueConfig,
    clock: Option<Arc<dyn Clock>>,
    store: Option<Arc<dyn MessageStore>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing processors: {0:?}. These processors were expected but not registered.")]
    MissingProcessors(Vec<String>),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl QueueBuilder {
    pub fn new() -> Self {
        Self {
            registry: ProcessorRegistry::new(),
            expected: None,
            config: QueueConfig::default(),
            clock: None,
            store: None,
        }
    }

    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn register(
        mut self,
        name: impl Into<String>,
        processor: impl Processor + 'static,
    ) -> Result<Self, RegistryError> {
        self.registry.register(name, processor)?;
        Ok(self)
    }

    pub fn register_typed<A, H>(mut self, handler: H) -> Result<Self, RegistryError>
    where
        A: TypedArguments,
        H: Handler<A> + 'static,
    {
        self.registry.register_typed::<A, H>(handler)?;
        Ok(self)
    }

    /// Names that must be registered by the time `build()` runs.
    pub fn expect_processors(mut self, names: &[&str]) -> Self {
        self.expected = Some(names.iter().map(|name| name.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<Queue, BuildError> {
        self.config.validate()?;

        if let Some(expected) = &self.expected {
            let missing: Vec<String> = expected
                .iter()
                .filter(|name| !self.registry.contains(name))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingProcessors(missing));
            }
        }

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        let store: Arc<dyn MessageStore> = match self.store {
            Some(store) => store,
            None => Arc::new(InMemoryStore::with_batch_size(
                Arc::clone(&ids),
                self.config.store.stream_batch_size,
            )),
        };
        let registry = Arc::new(self.registry);

        let enqueuer = Enqueuer::new(Arc::clone(&store), Arc::clone(&registry), Arc::clone(&clock));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            clock,
            ids,
            &self.config.dispatch,
        ));

        tracing::info!(processors = ?registry.names(), "queue ready");
        Ok(Queue {
            gateway: SubmissionGateway::new(enqueuer.clone()),
            enqueuer,
            dispatcher,
            registry,
            store,
            config: self.config,
        })
    }
}

impl Default for QueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A wired queue: admission, dispatch and the periodic trigger.
pub struct Queue {
    enqueuer: Enqueuer,
    gateway: SubmissionGateway,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<ProcessorRegistry>,
    store: Arc<dyn MessageStore>,
    config: QueueConfig,
}

impl Queue {
    pub fn builder() -> QueueBuilder {
        QueueBuilder::new()
    }

    pub async fn submit(&self, message: NewMessage) -> Result<RecordId, QueueError> {
        self.enqueuer.submit(message).await
    }

    pub fn gateway(&self) -> &SubmissionGateway {
        &self.gateway
    }

    /// Run a single pass now (manual trigger).
    pub async fn run_pass(&self) -> PassSummary {
        self.dispatcher.run_pass().await
    }

    /// Start the periodic trigger configured in `[worker]`.
    pub fn spawn_worker(&self) -> WorkerHandle {
        WorkerHandle::spawn(Arc::clone(&self.dispatcher), &self.config.worker)
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, ProcessingFailure};
    use crate::processor::{LogProcessor, processor_fn};
    use async_trait::async_trait;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Ping {}

    impl TypedArguments for Ping {
        const PROCESSOR: &'static str = "ping";
    }

    struct PingHandler;

    #[async_trait]
    impl Handler<Ping> for PingHandler {
        async fn handle(&self, _args: Ping, _message: &Message) -> Result<(), ProcessingFailure> {
            Ok(())
        }
    }

    #[test]
    fn test_build_success() {
        let queue = QueueBuilder::new()
            .register(LogProcessor::NAME, LogProcessor)
            .unwrap()
            .register_typed::<Ping, _>(PingHandler)
            .unwrap()
            .expect_processors(&["log", "ping"])
            .build();
        assert!(queue.is_ok());
    }

    #[test]
    fn test_build_missing_processors() {
        let queue = QueueBuilder::new()
            .register(LogProcessor::NAME, LogProcessor)
            .unwrap()
            .expect_processors(&["log", "mail"])
            .build();
        assert!(matches!(
            queue,
            Err(BuildError::MissingProcessors(missing)) if missing == vec!["mail".to_string()]
        ));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = QueueConfig::default();
        config.worker.interval_ms = 0;
        let queue = QueueBuilder::new().config(config).build();
        assert!(matches!(queue, Err(BuildError::Config(_))));
    }

    #[test]
    fn test_duplicate_registration_surfaces() {
        let result = QueueBuilder::new()
            .register("p", processor_fn(|msg: Message| async move { Ok(msg) }))
            .unwrap()
            .register("p", LogProcessor);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[tokio::test]
    async fn built_queue_round_trips_a_typed_message() {
        let queue = QueueBuilder::new()
            .register_typed::<Ping, _>(PingHandler)
            .unwrap()
            .build()
            .unwrap();

        queue
            .submit(NewMessage::new("ping").with_arguments(serde_json::json!({})))
            .await
            .unwrap();
        let summary = queue.run_pass().await;

        assert_eq!(summary.processed, 1);
        assert!(queue.store().is_empty().await.unwrap());
    }
}
