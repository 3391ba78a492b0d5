//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（Clock から timestamp を取る）

use std::sync::Arc;

use ulid::Ulid;

use crate::domain::{PassId, RecordId};
use crate::ports::Clock;

/// IdGenerator は分散環境でも衝突しない ID を生成
pub trait IdGenerator: Send + Sync {
    fn generate_record_id(&self) -> RecordId;

    fn generate_pass_id(&self) -> PassId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使うので、テストで時計を固定すると timestamp 部分も固定される。
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = u64::try_from(self.clock.timestamp().as_millis()).unwrap_or(0);
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl IdGenerator for UlidGenerator {
    fn generate_record_id(&self) -> RecordId {
        RecordId::from(self.next_ulid())
    }

    fn generate_pass_id(&self) -> PassId {
        PassId::from(self.next_ulid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timestamp;
    use crate::ports::{ManualClock, SystemClock};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(Arc::new(SystemClock));

        let id1 = id_gen.generate_record_id();
        let id2 = id_gen.generate_record_id();
        let id3 = id_gen.generate_record_id();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn timestamp_part_follows_the_clock() {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_704_110_400_000)));
        let id_gen = UlidGenerator::new(clock);

        let id1 = id_gen.generate_record_id();
        let id2 = id_gen.generate_pass_id();

        assert_eq!(id1.timestamp_ms(), 1_704_110_400_000);
        assert_eq!(id2.timestamp_ms(), 1_704_110_400_000);
        assert!(id2.to_string().starts_with("pass-"));
    }
}
