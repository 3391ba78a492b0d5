//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。外部システム（ストア、時計、ID 採番）への
//! インターフェースだけを定義し、実装は `impls` に置く。

pub mod clock;
pub mod id_generator;
pub mod store;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::store::{MessageStore, StoreResult};
