//! InMemoryBroker: プロセス内で完結するブローカー実装。
//! テストおよびローカル開発用で、feature = "testing" で有効化される。
//!
//! publish は常にパーティション 0 に追記する。リトライ予算と
//! 一時障害（`fail_next_publish_attempts`）、購読中のトランスポートエラー
//! （`inject_transport_error`）を再現できる。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::watch;

use crate::consumer::{PartitionSubscriber, RecordStream, StartOffset};
use crate::error::MessagingError;
use crate::producer::RecordPublisher;
use crate::record::{PublishReceipt, Record};

const DEFAULT_PARTITION: i32 = 0;

#[derive(Debug, Clone)]
enum Slot {
    Record(Record),
    Fault(String),
}

#[derive(Default)]
struct BrokerState {
    logs: HashMap<(String, i32), Vec<Slot>>,
    pending_failures: u32,
    publish_attempts: u64,
    unavailable: bool,
}

struct Inner {
    state: Mutex<BrokerState>,
    changed: watch::Sender<u64>,
    max_retries: u32,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot_at(&self, topic: &str, partition: i32, index: usize) -> Option<Slot> {
        self.lock()
            .logs
            .get(&(topic.to_string(), partition))
            .and_then(|log| log.get(index).cloned())
    }

    fn notify(&self) {
        self.changed.send_modify(|v| *v += 1);
    }
}

/// InMemoryBroker は RecordPublisher と PartitionSubscriber の両方を実装する。
/// Clone したハンドルは同じログを共有する。
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<Inner>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::with_max_retries(0)
    }

    /// publish 1 回あたり最大 `max_retries` 回まで内部でリトライするブローカーを生成する。
    pub fn with_max_retries(max_retries: u32) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(BrokerState::default()),
                changed,
                max_retries,
            }),
        }
    }

    /// 次の `attempts` 回の送信試行を失敗させる。
    pub fn fail_next_publish_attempts(&self, attempts: u32) {
        self.inner.lock().pending_failures = attempts;
    }

    /// true の間、subscribe は接続エラーを返す。
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    /// パーティションの現在の末尾にトランスポートエラーを差し込む。
    /// 購読者はその位置でエラーを 1 件受け取り、以降のレコードを読み続ける。
    pub fn inject_transport_error(&self, topic: &str, partition: i32, message: &str) {
        self.inner
            .lock()
            .logs
            .entry((topic.to_string(), partition))
            .or_default()
            .push(Slot::Fault(message.to_string()));
        self.inner.notify();
    }

    /// パーティションに保存されているレコードを返す。
    pub fn records(&self, topic: &str, partition: i32) -> Vec<Record> {
        self.inner
            .lock()
            .logs
            .get(&(topic.to_string(), partition))
            .map(|log| {
                log.iter()
                    .filter_map(|slot| match slot {
                        Slot::Record(r) => Some(r.clone()),
                        Slot::Fault(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// トピック全体のレコード数を返す。
    pub fn record_count(&self, topic: &str) -> usize {
        self.inner
            .lock()
            .logs
            .iter()
            .filter(|((t, _), _)| t == topic)
            .map(|(_, log)| log.iter().filter(|s| matches!(s, Slot::Record(_))).count())
            .sum()
    }

    /// これまでの送信試行回数（リトライを含む）。
    pub fn publish_attempts(&self) -> u64 {
        self.inner.lock().publish_attempts
    }

    fn try_append(&self, topic: &str, payload: &[u8]) -> Result<PublishReceipt, MessagingError> {
        let mut state = self.inner.lock();
        state.publish_attempts += 1;
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(MessagingError::Publish("broker unavailable".to_string()));
        }

        let log = state
            .logs
            .entry((topic.to_string(), DEFAULT_PARTITION))
            .or_default();
        let offset = log.iter().filter(|s| matches!(s, Slot::Record(_))).count();
        let offset = i64::try_from(offset).map_err(|e| MessagingError::Publish(e.to_string()))?;
        log.push(Slot::Record(Record {
            topic: topic.to_string(),
            partition: DEFAULT_PARTITION,
            offset,
            payload: payload.to_vec(),
        }));
        Ok(PublishReceipt {
            partition: DEFAULT_PARTITION,
            offset,
        })
    }
}

#[async_trait]
impl RecordPublisher for InMemoryBroker {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<PublishReceipt, MessagingError> {
        let mut last_err = None;
        for _ in 0..=self.inner.max_retries {
            match self.try_append(topic, payload) {
                Ok(receipt) => {
                    self.inner.notify();
                    return Ok(receipt);
                }
                Err(e) => last_err = Some(e),
            }
        }
        let detail = last_err.map_or_else(String::new, |e| e.to_string());
        Err(MessagingError::Publish(format!(
            "retry budget exhausted after {} attempts: {detail}",
            self.inner.max_retries.saturating_add(1)
        )))
    }

    async fn flush(&self) -> Result<(), MessagingError> {
        Ok(())
    }
}

struct Cursor {
    inner: Arc<Inner>,
    topic: String,
    partition: i32,
    next: usize,
    changed: watch::Receiver<u64>,
}

#[async_trait]
impl PartitionSubscriber for InMemoryBroker {
    async fn subscribe(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<RecordStream, MessagingError> {
        let next = {
            let state = self.inner.lock();
            if state.unavailable {
                return Err(MessagingError::Connection("broker unavailable".to_string()));
            }
            match start {
                StartOffset::Oldest => 0,
                StartOffset::Latest => state
                    .logs
                    .get(&(topic.to_string(), partition))
                    .map_or(0, Vec::len),
            }
        };

        let cursor = Cursor {
            inner: Arc::clone(&self.inner),
            topic: topic.to_string(),
            partition,
            next,
            changed: self.inner.changed.subscribe(),
        };

        let stream = futures::stream::unfold(cursor, |mut cursor| async move {
            loop {
                // 確認済みにしてから読むことで、読んだ直後の追記も changed() で検知できる。
                drop(cursor.changed.borrow_and_update());
                if let Some(slot) = cursor.inner.slot_at(&cursor.topic, cursor.partition, cursor.next) {
                    cursor.next += 1;
                    let item = match slot {
                        Slot::Record(record) => Ok(record),
                        Slot::Fault(message) => Err(MessagingError::Transport(message)),
                    };
                    return Some((item, cursor));
                }
                if cursor.changed.changed().await.is_err() {
                    return None;
                }
            }
        });
        Ok(stream.boxed())
    }
}
