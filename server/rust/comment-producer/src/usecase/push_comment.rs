use std::sync::Arc;

use comments_messaging::{MessagingError, PublishReceipt, RecordPublisher};
use comments_telemetry::Metrics;

use crate::domain::entity::Comment;

/// PushCommentError はコメント publish 処理のエラー型。
#[derive(Debug, thiserror::Error)]
pub enum PushCommentError {
    #[error("failed to serialize comment: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to publish comment: {0}")]
    Publish(#[from] MessagingError),
}

/// PushCommentUseCase はコメント 1 件をシリアライズし、確認応答付きで publish する。
///
/// publisher は全リクエストで共有される。並行呼び出しの安全性は
/// `RecordPublisher: Send + Sync` の実装側が保証し、ここではロックを取らない。
/// リトライはクライアント内部に任せ、このユースケース自体は再送しない。
pub struct PushCommentUseCase {
    publisher: Arc<dyn RecordPublisher>,
    topic: String,
    metrics: Option<Arc<Metrics>>,
}

impl PushCommentUseCase {
    pub fn new(publisher: Arc<dyn RecordPublisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// コメントを publish し、保存先のパーティションとオフセットを返す。
    pub async fn execute(&self, comment: &Comment) -> Result<PublishReceipt, PushCommentError> {
        let payload = serde_json::to_vec(comment).map_err(|e| {
            tracing::error!(error = %e, "failed to serialize comment");
            e
        })?;

        match self.publisher.publish(&self.topic, &payload).await {
            Ok(receipt) => {
                tracing::info!(
                    topic = %self.topic,
                    partition = receipt.partition,
                    offset = receipt.offset,
                    "message stored in topic/partition/offset"
                );
                if let Some(ref m) = self.metrics {
                    m.record_kafka_message_produced(&self.topic);
                }
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!(topic = %self.topic, error = %e, "failed to push comment to queue");
                if let Some(ref m) = self.metrics {
                    m.record_kafka_produce_error(&self.topic);
                }
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comments_messaging::{InMemoryBroker, MockRecordPublisher};

    #[tokio::test]
    async fn test_execute_publishes_serialized_comment() {
        let mut mock = MockRecordPublisher::new();
        mock.expect_publish()
            .withf(|topic, payload| {
                topic.to_string() == "comments" && payload.to_vec() == br#"{"text":"hello"}"#.to_vec()
            })
            .times(1)
            .returning(|_, _| {
                Ok(PublishReceipt {
                    partition: 0,
                    offset: 7,
                })
            });

        let uc = PushCommentUseCase::new(Arc::new(mock), "comments");
        let receipt = uc.execute(&Comment::new("hello")).await.unwrap();
        assert_eq!(receipt.partition, 0);
        assert_eq!(receipt.offset, 7);
    }

    #[tokio::test]
    async fn test_execute_publish_error() {
        let mut mock = MockRecordPublisher::new();
        mock.expect_publish()
            .times(1)
            .returning(|_, _| Err(MessagingError::Publish("broker down".to_string())));

        let metrics = Arc::new(Metrics::new("comments-producer"));
        let uc = PushCommentUseCase::new(Arc::new(mock), "comments").with_metrics(metrics.clone());
        let err = uc.execute(&Comment::new("hello")).await.unwrap_err();
        assert!(matches!(err, PushCommentError::Publish(_)));
        assert_eq!(
            metrics
                .kafka_produce_errors_total
                .with_label_values(&["comments"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_sequential_publishes_have_increasing_offsets() {
        let broker = InMemoryBroker::new();
        let uc = PushCommentUseCase::new(Arc::new(broker.clone()), "comments");

        let mut last = -1;
        for i in 0..5 {
            let receipt = uc.execute(&Comment::new(format!("comment {i}"))).await.unwrap();
            assert!(receipt.offset > last);
            last = receipt.offset;
        }
        assert_eq!(broker.record_count("comments"), 5);
    }

    #[tokio::test]
    async fn test_identical_comments_are_not_deduplicated() {
        let broker = InMemoryBroker::new();
        let uc = PushCommentUseCase::new(Arc::new(broker.clone()), "comments");

        let first = uc.execute(&Comment::new("same")).await.unwrap();
        let second = uc.execute(&Comment::new("same")).await.unwrap();
        assert_ne!(first.offset, second.offset);

        let records = broker.records("comments", 0);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].payload, records[1].payload);
    }

    #[tokio::test]
    async fn test_client_retries_are_transparent() {
        let broker = InMemoryBroker::with_max_retries(5);
        broker.fail_next_publish_attempts(3);
        let metrics = Arc::new(Metrics::new("comments-producer"));
        let uc = PushCommentUseCase::new(Arc::new(broker.clone()), "comments").with_metrics(metrics.clone());

        let receipt = uc.execute(&Comment::new("retry me")).await.unwrap();
        assert_eq!(receipt.offset, 0);
        assert_eq!(broker.publish_attempts(), 4);
        assert_eq!(
            metrics
                .kafka_messages_produced_total
                .with_label_values(&["comments"])
                .get(),
            1
        );
    }
}
