//! Domain model (ids, timestamps, message, retry policy, outcomes, errors).
//!
//! このモジュールは queue や store の実装を前提にしない。
//! 永続化されるレコードの形と、純粋な判断ロジックだけを置く。

pub mod errors;
pub mod ids;
pub mod message;
pub mod outcome;
pub mod retry;
pub mod timestamp;

pub use self::errors::{ErrorCode, ProcessingFailure, QueueError, StoreError};
pub use self::ids::{PassId, RecordId};
pub use self::message::{Message, NewMessage, StoredMessage};
pub use self::outcome::{AttemptOutcome, AttemptReport, PassSummary};
pub use self::retry::{DEFAULT_RETRY_LIMIT, RetryDecision, RetryPolicy};
pub use self::timestamp::Timestamp;
