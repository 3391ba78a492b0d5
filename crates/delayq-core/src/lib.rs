//! delayq-core
//!
//! Core building blocks for a delayed message queue.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, timestamp, message, retry, outcome, errors）
//! - **ports**: 抽象化レイヤー（MessageStore, Clock, IdGenerator）
//! - **processor**: processor の登録と解決（ProcessorRegistry, typed processor, LogProcessor）
//! - **app**: アプリケーションロジック（builder, enqueuer, gateway, dispatcher, worker）
//! - **impls**: 実装（InMemoryStore）
//! - **config**: TOML 設定
//! - **telemetry**: tracing の初期化

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod processor;
pub mod telemetry;

pub use app::{AuthContext, BuildError, Queue, QueueBuilder, WorkerHandle, WorkerProgress};
pub use config::QueueConfig;
pub use domain::{Message, NewMessage, PassSummary, ProcessingFailure, QueueError, RecordId};
pub use processor::{Handler, LogProcessor, Processor, ProcessorRegistry, TypedArguments};
