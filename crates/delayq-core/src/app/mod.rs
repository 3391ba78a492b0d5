//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **QueueBuilder**: アプリケーションの構築とワイヤリング
//! - **Enqueuer**: メッセージの検証と受け付け
//! - **SubmissionGateway**: 認証付きの受け付け口
//! - **Dispatcher**: due なメッセージを取り出して processor を実行する 1 パス
//! - **WorkerHandle**: パスを定期的に起動するトリガー

pub mod builder;
pub mod dispatcher;
pub mod enqueuer;
pub mod gateway;
pub mod worker;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, Queue, QueueBuilder};
pub use self::dispatcher::Dispatcher;
pub use self::enqueuer::Enqueuer;
pub use self::gateway::{AuthContext, SubmissionGateway};
pub use self::worker::{WorkerHandle, WorkerProgress};
