//! In-memory message store.
//!
//! 開発・テスト用の `MessageStore` 実装。本番ではドキュメント型ストアの
//! アダプタに差し替える想定。

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::sync::Mutex;

use crate::domain::{Message, PassId, RecordId, StoreError, StoredMessage, Timestamp};
use crate::ports::{IdGenerator, MessageStore, StoreResult};

/// Page size used when none is configured.
pub const DEFAULT_STREAM_BATCH_SIZE: usize = 100;

/// Ordering key of the due index: `execute_at`, then insertion sequence.
type IndexKey = (Timestamp, u64);

struct Entry {
    seq: u64,
    message: Message,
}

/// Store state.
///
/// - `records` is the single source of truth.
/// - `by_execute_at` holds ids only. `execute_at` never changes after insert,
///   so the index is touched on insert and delete only.
struct MemoryStoreState {
    records: HashMap<RecordId, Entry>,
    by_execute_at: BTreeMap<IndexKey, RecordId>,
    next_seq: u64,
}

impl MemoryStoreState {
    fn new() -> Self {
        Self {
            records: HashMap::new(),
            by_execute_at: BTreeMap::new(),
            next_seq: 0,
        }
    }

    fn allocate_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Read up to `limit` due, unleased records strictly after `cursor`.
    ///
    /// Returns the page and the last index key examined, which becomes the
    /// next cursor. `None` as cursor means the scan is exhausted.
    fn due_page(
        &self,
        cursor: Option<IndexKey>,
        now: Timestamp,
        limit: usize,
    ) -> (Vec<StoredMessage>, Option<IndexKey>) {
        let lower = match cursor {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        let upper = Bound::Included((now, u64::MAX));

        let mut page = Vec::new();
        let mut last = None;
        for (key, id) in self.by_execute_at.range((lower, upper)) {
            last = Some(*key);
            let Some(entry) = self.records.get(id) else {
                continue;
            };
            if entry.message.is_leased(now) {
                continue;
            }
            page.push(StoredMessage {
                id: *id,
                message: entry.message.clone(),
            });
            if page.len() >= limit {
                break;
            }
        }
        (page, last)
    }

    /// Mutable access to a record whose lease is held by `owner`.
    fn owned_mut(&mut self, id: RecordId, owner: PassId) -> StoreResult<&mut Entry> {
        let entry = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if entry.message.leased_by != Some(owner) {
            return Err(StoreError::LeaseLost { id, owner });
        }
        Ok(entry)
    }
}

/// Scan position of one `due()` stream.
enum Scan {
    From(Option<IndexKey>),
    Done,
}

/// In-memory `MessageStore`.
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryStoreState>>,
    ids: Arc<dyn IdGenerator>,
    batch_size: usize,
}

impl InMemoryStore {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self::with_batch_size(ids, DEFAULT_STREAM_BATCH_SIZE)
    }

    pub fn with_batch_size(ids: Arc<dyn IdGenerator>, batch_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryStoreState::new())),
            ids,
            batch_size: batch_size.max(1),
        }
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn insert(&self, message: Message) -> StoreResult<RecordId> {
        let id = self.ids.generate_record_id();
        let mut state = self.state.lock().await;
        if state.records.contains_key(&id) {
            return Err(StoreError::Backend(format!("duplicate record id {id}")));
        }
        let seq = state.allocate_seq();
        state.by_execute_at.insert((message.execute_at, seq), id);
        state.records.insert(id, Entry { seq, message });
        Ok(id)
    }

    async fn get(&self, id: RecordId) -> StoreResult<Option<StoredMessage>> {
        let state = self.state.lock().await;
        Ok(state.records.get(&id).map(|entry| StoredMessage {
            id,
            message: entry.message.clone(),
        }))
    }

    fn due(&self, now: Timestamp) -> BoxStream<'static, StoreResult<StoredMessage>> {
        let state = Arc::clone(&self.state);
        let limit = self.batch_size;

        // One lock per page; the lock is never held while the consumer works
        // on the yielded records.
        stream::unfold(Scan::From(None), move |scan| {
            let state = Arc::clone(&state);
            async move {
                let Scan::From(cursor) = scan else {
                    return None;
                };
                let (page, last) = state.lock().await.due_page(cursor, now, limit);
                let next = match last {
                    Some(key) if page.len() >= limit => Scan::From(Some(key)),
                    _ => Scan::Done,
                };
                if page.is_empty() {
                    return None;
                }
                Some((stream::iter(page.into_iter().map(Ok::<_, StoreError>)), next))
            }
        })
        .flatten()
        .boxed()
    }

    async fn claim(
        &self,
        id: RecordId,
        owner: PassId,
        now: Timestamp,
        until: Timestamp,
    ) -> StoreResult<Option<StoredMessage>> {
        let mut state = self.state.lock().await;
        let Some(entry) = state.records.get_mut(&id) else {
            return Ok(None);
        };
        if !entry.message.is_due(now) || entry.message.is_leased(now) {
            return Ok(None);
        }
        entry.message.leased_until = Some(until);
        entry.message.leased_by = Some(owner);
        Ok(Some(StoredMessage {
            id,
            message: entry.message.clone(),
        }))
    }

    async fn reschedule(
        &self,
        id: RecordId,
        owner: PassId,
        attempt_count: u32,
        last_execution_at: Timestamp,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let entry = state.owned_mut(id, owner)?;
        entry.message.attempt_count = attempt_count;
        entry.message.last_execution_at = Some(last_execution_at);
        entry.message.release_lease();
        Ok(())
    }

    async fn delete(&self, id: RecordId, owner: PassId) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let entry = state.owned_mut(id, owner)?;
        let key = (entry.message.execute_at, entry.seq);
        state.by_execute_at.remove(&key);
        state.records.remove(&id);
        Ok(())
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.state.lock().await.records.len())
    }
}
