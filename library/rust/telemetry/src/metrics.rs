use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Metrics は Prometheus メトリクスのヘルパー構造体である。
/// HTTP の RED メトリクスと Kafka の送受信メトリクスを提供する。
pub struct Metrics {
    pub http_requests_total: CounterVec,
    pub http_request_duration: HistogramVec,
    pub kafka_messages_produced_total: IntCounterVec,
    pub kafka_produce_errors_total: IntCounterVec,
    pub kafka_messages_consumed_total: IntCounterVec,
    pub kafka_transport_errors_total: IntCounterVec,
    registry: Registry,
}

/// デフォルトのヒストグラムバケット。
const DEFAULT_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

impl Metrics {
    /// new は Prometheus メトリクスを初期化して返す。
    /// service_name はメトリクスの service ラベルに使用される。
    pub fn new(service_name: &str) -> Self {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests")
                .const_label("service", service_name),
            &["method", "path", "status"],
        )
        .expect("failed to create http_requests_total counter");

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Histogram of HTTP request latency",
            )
            .const_label("service", service_name)
            .buckets(DEFAULT_BUCKETS.to_vec()),
            &["method", "path"],
        )
        .expect("failed to create http_request_duration histogram");

        let kafka_messages_produced_total = IntCounterVec::new(
            Opts::new(
                "kafka_messages_produced_total",
                "Total number of Kafka messages produced",
            )
            .const_label("service", service_name),
            &["topic"],
        )
        .expect("failed to create kafka_messages_produced_total counter");

        let kafka_produce_errors_total = IntCounterVec::new(
            Opts::new(
                "kafka_produce_errors_total",
                "Total number of Kafka publishes that failed after retries",
            )
            .const_label("service", service_name),
            &["topic"],
        )
        .expect("failed to create kafka_produce_errors_total counter");

        let kafka_messages_consumed_total = IntCounterVec::new(
            Opts::new(
                "kafka_messages_consumed_total",
                "Total number of Kafka messages consumed",
            )
            .const_label("service", service_name),
            &["topic", "partition"],
        )
        .expect("failed to create kafka_messages_consumed_total counter");

        let kafka_transport_errors_total = IntCounterVec::new(
            Opts::new(
                "kafka_transport_errors_total",
                "Total number of transport errors observed while consuming",
            )
            .const_label("service", service_name),
            &["topic"],
        )
        .expect("failed to create kafka_transport_errors_total counter");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("failed to register http_requests_total");
        registry
            .register(Box::new(http_request_duration.clone()))
            .expect("failed to register http_request_duration");
        registry
            .register(Box::new(kafka_messages_produced_total.clone()))
            .expect("failed to register kafka_messages_produced_total");
        registry
            .register(Box::new(kafka_produce_errors_total.clone()))
            .expect("failed to register kafka_produce_errors_total");
        registry
            .register(Box::new(kafka_messages_consumed_total.clone()))
            .expect("failed to register kafka_messages_consumed_total");
        registry
            .register(Box::new(kafka_transport_errors_total.clone()))
            .expect("failed to register kafka_transport_errors_total");

        Self {
            http_requests_total,
            http_request_duration,
            kafka_messages_produced_total,
            kafka_produce_errors_total,
            kafka_messages_consumed_total,
            kafka_transport_errors_total,
            registry,
        }
    }

    /// record_http_request は HTTP リクエストカウンタをインクリメントする。
    pub fn record_http_request(&self, method: &str, path: &str, status: &str) {
        self.http_requests_total
            .with_label_values(&[method, path, status])
            .inc();
    }

    /// record_http_duration は HTTP リクエストのレイテンシをヒストグラムに記録する。
    pub fn record_http_duration(&self, method: &str, path: &str, duration_secs: f64) {
        self.http_request_duration
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// record_kafka_message_produced は Kafka メッセージ送信カウンタをインクリメントする。
    pub fn record_kafka_message_produced(&self, topic: &str) {
        self.kafka_messages_produced_total
            .with_label_values(&[topic])
            .inc();
    }

    pub fn record_kafka_produce_error(&self, topic: &str) {
        self.kafka_produce_errors_total
            .with_label_values(&[topic])
            .inc();
    }

    /// record_kafka_message_consumed は Kafka メッセージ受信カウンタをインクリメントする。
    pub fn record_kafka_message_consumed(&self, topic: &str, partition: i32) {
        let partition = partition.to_string();
        self.kafka_messages_consumed_total
            .with_label_values(&[topic, partition.as_str()])
            .inc();
    }

    pub fn record_kafka_transport_error(&self, topic: &str) {
        self.kafka_transport_errors_total
            .with_label_values(&[topic])
            .inc();
    }

    /// gather_metrics は Prometheus テキストフォーマットでメトリクスを返す。
    /// /metrics エンドポイントのハンドラで使用する。
    pub fn gather_metrics(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kafka_produced_counter_exposed() {
        let metrics = Metrics::new("comments-producer");
        metrics.record_kafka_message_produced("comments");
        metrics.record_kafka_message_produced("comments");

        let output = metrics.gather_metrics();
        assert!(output.contains("kafka_messages_produced_total"));
        assert!(output.contains(r#"topic="comments""#));
        assert_eq!(
            metrics
                .kafka_messages_produced_total
                .with_label_values(&["comments"])
                .get(),
            2
        );
    }

    #[test]
    fn test_consumed_counter_labels_partition() {
        let metrics = Metrics::new("comments-worker");
        metrics.record_kafka_message_consumed("comments", 0);
        let output = metrics.gather_metrics();
        assert!(output.contains(r#"partition="0""#));
        assert!(output.contains(r#"service="comments-worker""#));
    }

    #[test]
    fn test_http_request_metrics() {
        let metrics = Metrics::new("comments-producer");
        metrics.record_http_request("POST", "/api/v1/comments", "200");
        metrics.record_http_duration("POST", "/api/v1/comments", 0.01);
        let output = metrics.gather_metrics();
        assert!(output.contains("http_requests_total"));
        assert!(output.contains("http_request_duration_seconds"));
    }
}
