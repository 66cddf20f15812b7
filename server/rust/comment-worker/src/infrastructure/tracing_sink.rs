use std::sync::Arc;

use comments_telemetry::Metrics;

use crate::domain::entity::{WorkerEvent, WorkerState};
use crate::usecase::ConsumptionSink;

/// TracingSink はワーカーのイベントを tracing の構造化ログとして出力し、
/// メトリクスが設定されていれば受信件数とトランスポートエラー件数を記録する。
#[derive(Default)]
pub struct TracingSink {
    metrics: Option<Arc<Metrics>>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl ConsumptionSink for TracingSink {
    fn emit(&self, event: WorkerEvent) {
        match event {
            WorkerEvent::StateChanged(WorkerState::Running) => {
                tracing::info!(state = %WorkerState::Running, "consumer started");
            }
            WorkerEvent::StateChanged(state) => {
                tracing::info!(state = %state, "worker state changed");
            }
            WorkerEvent::RecordReceived {
                topic,
                partition,
                offset,
                value,
                count,
            } => {
                tracing::info!(
                    count = count,
                    topic = %topic,
                    partition = partition,
                    offset = offset,
                    value = %value,
                    "received message"
                );
                if let Some(ref m) = self.metrics {
                    m.record_kafka_message_consumed(&topic, partition);
                }
            }
            WorkerEvent::TransportError { topic, message } => {
                tracing::error!(topic = %topic, error = %message, "consumer transport error");
                if let Some(ref m) = self.metrics {
                    m.record_kafka_transport_error(&topic);
                }
            }
            WorkerEvent::Terminated { message_count } => {
                tracing::info!(
                    state = %WorkerState::Terminated,
                    message_count = message_count,
                    "consumer terminated"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_received_counts_consumed_message() {
        let metrics = Arc::new(Metrics::new("comments-worker"));
        let sink = TracingSink::new().with_metrics(metrics.clone());

        sink.emit(WorkerEvent::RecordReceived {
            topic: "comments".to_string(),
            partition: 0,
            offset: 0,
            value: r#"{"text":"hello"}"#.to_string(),
            count: 1,
        });

        assert_eq!(
            metrics
                .kafka_messages_consumed_total
                .with_label_values(&["comments", "0"])
                .get(),
            1
        );
    }

    #[test]
    fn test_transport_error_counted() {
        let metrics = Arc::new(Metrics::new("comments-worker"));
        let sink = TracingSink::new().with_metrics(metrics.clone());

        sink.emit(WorkerEvent::TransportError {
            topic: "comments".to_string(),
            message: "transport error: broker down".to_string(),
        });
        sink.emit(WorkerEvent::Terminated { message_count: 0 });

        assert_eq!(
            metrics
                .kafka_transport_errors_total
                .with_label_values(&["comments"])
                .get(),
            1
        );
    }

    #[test]
    fn test_emit_without_metrics() {
        let sink = TracingSink::new();
        sink.emit(WorkerEvent::StateChanged(WorkerState::Connecting));
        sink.emit(WorkerEvent::StateChanged(WorkerState::Running));
    }
}
