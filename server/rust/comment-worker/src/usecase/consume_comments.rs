use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use comments_messaging::{MessagingError, PartitionSubscriber, RecordStream, StartOffset};

use crate::domain::entity::{
    ConsumptionProgress, DrainReason, WorkerEvent, WorkerReport, WorkerState,
};

/// ConsumptionSink はワーカーのイベントを受け取る観測用の出力先。
#[cfg_attr(test, mockall::automock)]
pub trait ConsumptionSink: Send + Sync {
    fn emit(&self, event: WorkerEvent);
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("failed to open partition stream: {0}")]
    Connect(#[from] MessagingError),

    #[error("worker task stopped without reporting completion")]
    Aborted,
}

/// ConsumptionWorker は 1 トピックの 1 パーティションを読み続けるワーカー。
/// `connect` で Connecting を済ませ、`ConnectedWorker` がイベントループを回す。
pub struct ConsumptionWorker {
    subscriber: Arc<dyn PartitionSubscriber>,
    sink: Arc<dyn ConsumptionSink>,
    topic: String,
    partition: i32,
    start: StartOffset,
}

impl ConsumptionWorker {
    pub fn new(
        subscriber: Arc<dyn PartitionSubscriber>,
        sink: Arc<dyn ConsumptionSink>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            subscriber,
            sink,
            topic: topic.into(),
            partition: 0,
            start: StartOffset::Oldest,
        }
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_start_offset(mut self, start: StartOffset) -> Self {
        self.start = start;
        self
    }

    /// パーティションのストリームを開く。失敗は呼び出し側で致命的エラーとして扱う。
    pub async fn connect(self) -> Result<ConnectedWorker, WorkerError> {
        self.sink.emit(WorkerEvent::StateChanged(WorkerState::Connecting));
        let stream = self
            .subscriber
            .subscribe(&self.topic, self.partition, self.start)
            .await?;

        Ok(ConnectedWorker {
            topic: self.topic,
            stream,
            sink: self.sink,
            progress: ConsumptionProgress::new(),
        })
    }
}

/// ConnectedWorker はストリームを開いた後のワーカー。
pub struct ConnectedWorker {
    topic: String,
    stream: RecordStream,
    sink: Arc<dyn ConsumptionSink>,
    progress: ConsumptionProgress,
}

impl ConnectedWorker {
    /// 停止要求かストリーム終端まで受信を続け、最終件数を返す。
    ///
    /// 停止要求は各反復の待機点でのみ確認され、処理途中のレコードは中断しない。
    /// 停止要求とレコードが同時に準備できている場合は停止を優先する。
    pub async fn run(mut self, shutdown: CancellationToken) -> WorkerReport {
        self.sink.emit(WorkerEvent::StateChanged(WorkerState::Running));

        let reason = loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break DrainReason::ShutdownRequested,
                item = self.stream.next() => match item {
                    Some(Ok(record)) => {
                        let count = self.progress.record();
                        self.sink.emit(WorkerEvent::RecordReceived {
                            value: record.value_lossy().into_owned(),
                            topic: record.topic,
                            partition: record.partition,
                            offset: record.offset,
                            count,
                        });
                    }
                    Some(Err(e)) => {
                        self.sink.emit(WorkerEvent::TransportError {
                            topic: self.topic.clone(),
                            message: e.to_string(),
                        });
                    }
                    None => break DrainReason::StreamClosed,
                },
            }
        };

        self.sink.emit(WorkerEvent::StateChanged(WorkerState::Draining));
        drop(self.stream);

        let message_count = self.progress.message_count();
        self.sink.emit(WorkerEvent::Terminated { message_count });
        WorkerReport {
            message_count,
            reason,
        }
    }

    /// イベントループを別タスクで起動し、停止要求と完了待ちのためのハンドルを返す。
    pub fn spawn(self) -> WorkerHandle {
        let token = CancellationToken::new();
        let (done_tx, done_rx) = oneshot::channel();
        let loop_token = token.clone();

        tokio::spawn(async move {
            let report = self.run(loop_token).await;
            // ハンドルが先に破棄されていれば受け手はいない
            let _ = done_tx.send(report);
        });

        WorkerHandle {
            token,
            done: done_rx,
        }
    }
}

/// WorkerHandle は起動済みワーカーへの停止要求と完了待ちを提供する。
///
/// 停止要求（CancellationToken）と完了通知（oneshot）は別経路で、
/// `shutdown` はループが実際に止まるまで戻らない。
pub struct WorkerHandle {
    token: CancellationToken,
    done: oneshot::Receiver<WorkerReport>,
}

impl WorkerHandle {
    /// 停止を要求し、ループの完了通知を待つ。
    pub async fn shutdown(self) -> Result<WorkerReport, WorkerError> {
        self.token.cancel();
        self.done.await.map_err(|_| WorkerError::Aborted)
    }

    /// signal が完了したら停止を要求して完了を待つ。
    /// それより先にループが自ら終了した場合はその結果を返す。
    pub async fn drain_on<F>(mut self, signal: F) -> Result<WorkerReport, WorkerError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            report = &mut self.done => report.map_err(|_| WorkerError::Aborted),
            () = signal => self.shutdown().await,
        }
    }
}
