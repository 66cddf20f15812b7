/// comments-worker integration tests
/// InMemoryBroker と TracingSink を組み合わせ、公開 API だけでワーカーを動かす。
use std::sync::Arc;
use std::time::Duration;

use comments_messaging::{InMemoryBroker, RecordPublisher};
use comments_telemetry::Metrics;
use comments_worker::domain::entity::DrainReason;
use comments_worker::infrastructure::TracingSink;
use comments_worker::usecase::{ConsumptionWorker, WorkerError};

const TOPIC: &str = "comments";

async fn wait_for_consumed(metrics: &Metrics, n: u64) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while metrics
            .kafka_messages_consumed_total
            .with_label_values(&[TOPIC, "0"])
            .get()
            < n
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_worker_consumes_published_comments() {
    let broker = InMemoryBroker::new();
    for text in ["a", "b", "c"] {
        broker
            .publish(TOPIC, format!(r#"{{"text":"{text}"}}"#).as_bytes())
            .await
            .unwrap();
    }

    let metrics = Arc::new(Metrics::new("comments-worker-test"));
    let sink = Arc::new(TracingSink::new().with_metrics(metrics.clone()));
    let handle = ConsumptionWorker::new(Arc::new(broker.clone()), sink, TOPIC)
        .connect()
        .await
        .unwrap()
        .spawn();

    wait_for_consumed(&metrics, 3).await;
    broker.inject_transport_error(TOPIC, 0, "leader not available");
    broker.publish(TOPIC, br#"{"text":"d"}"#).await.unwrap();
    wait_for_consumed(&metrics, 4).await;

    let report = handle.shutdown().await.unwrap();
    assert_eq!(report.message_count, 4);
    assert_eq!(report.reason, DrainReason::ShutdownRequested);
    assert_eq!(
        metrics
            .kafka_transport_errors_total
            .with_label_values(&[TOPIC])
            .get(),
        1
    );
}

#[tokio::test]
async fn test_restart_recounts_from_oldest() {
    let broker = InMemoryBroker::new();
    broker.publish(TOPIC, b"1").await.unwrap();
    broker.publish(TOPIC, b"2").await.unwrap();

    for _ in 0..2 {
        let metrics = Arc::new(Metrics::new("comments-worker-test"));
        let sink = Arc::new(TracingSink::new().with_metrics(metrics.clone()));
        let handle = ConsumptionWorker::new(Arc::new(broker.clone()), sink, TOPIC)
            .connect()
            .await
            .unwrap()
            .spawn();
        wait_for_consumed(&metrics, 2).await;
        let report = handle.shutdown().await.unwrap();
        assert_eq!(report.message_count, 2);
    }
}

#[tokio::test]
async fn test_unavailable_broker_is_fatal() {
    let broker = InMemoryBroker::new();
    broker.set_unavailable(true);

    let result = ConsumptionWorker::new(Arc::new(broker.clone()), Arc::new(TracingSink::new()), TOPIC)
        .connect()
        .await;
    assert!(matches!(result, Err(WorkerError::Connect(_))));
}
