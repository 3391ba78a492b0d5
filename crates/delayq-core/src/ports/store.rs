//! MessageStore port - メッセージの正本（source of truth）
//!
//! ドキュメント型ストアに要求する最小の契約：
//! - 1 コレクション、レコード単位でアドレス可能
//! - `execute_at` による範囲フィルタと昇順ソート
//! - ストリーミング読み出し（全件をメモリに載せない）
//! - レコード単位の条件付き更新（claim）と削除
//!
//! # 設計原則
//! - Lease の権威はストアにある。claim に成功した pass だけがレコードを更新・削除できる
//! - プロセス内ロックには頼らない

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::{Message, PassId, RecordId, StoreError, StoredMessage, Timestamp};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store adapter for queued messages. Implementations must be thread-safe.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a new record and return its id.
    async fn insert(&self, message: Message) -> StoreResult<RecordId>;

    async fn get(&self, id: RecordId) -> StoreResult<Option<StoredMessage>>;

    /// Stream records with `execute_at <= now` that are not leased at `now`,
    /// ascending by `execute_at`.
    ///
    /// Ties are returned in the store's native order (insertion order for the
    /// in-memory store); callers must not rely on it across stores.
    /// The stream is lazy and one-shot.
    fn due(&self, now: Timestamp) -> BoxStream<'static, StoreResult<StoredMessage>>;

    /// Atomically claim a record for `owner` until `until`.
    ///
    /// Succeeds only if the record exists, is due at `now` and carries no
    /// live lease. Returns the claimed snapshot, or `None` if the record is
    /// gone, not yet due, or leased by someone else.
    async fn claim(
        &self,
        id: RecordId,
        owner: PassId,
        now: Timestamp,
        until: Timestamp,
    ) -> StoreResult<Option<StoredMessage>>;

    /// Record a failed attempt: set `attempt_count` and `last_execution_at`
    /// and release the lease. `execute_at` is left unchanged.
    ///
    /// Fails with `LeaseLost` if `owner` no longer holds the lease.
    async fn reschedule(
        &self,
        id: RecordId,
        owner: PassId,
        attempt_count: u32,
        last_execution_at: Timestamp,
    ) -> StoreResult<()>;

    /// Delete a record claimed by `owner` (success or drop).
    async fn delete(&self, id: RecordId, owner: PassId) -> StoreResult<()>;

    /// Number of stored records.
    async fn len(&self) -> StoreResult<usize>;

    async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }
}
