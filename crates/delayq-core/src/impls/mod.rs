//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryStore**: 開発用・テスト用の MessageStore
//!
//! 永続化バックエンドは `MessageStore` を実装した別クレートとして追加します。

pub mod memory_store;

pub use self::memory_store::InMemoryStore;
