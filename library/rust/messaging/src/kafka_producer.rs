//! KafkaRecordPublisher: rdkafka を使用した RecordPublisher 実装。
//! feature = "kafka" で有効化される。

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use crate::config::KafkaConfig;
use crate::error::MessagingError;
use crate::producer::RecordPublisher;
use crate::record::PublishReceipt;

/// flush で送信待ちメッセージを待つ上限。
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// KafkaRecordPublisher は rdkafka の FutureProducer を使った実装。
///
/// FutureProducer はスレッドセーフで内部でリクエストをパイプライン化するため、
/// 1 インスタンスを `Arc` で全リクエストから共有してよい。
pub struct KafkaRecordPublisher {
    producer: FutureProducer,
}

impl KafkaRecordPublisher {
    /// KafkaConfig から KafkaRecordPublisher を生成する。
    pub fn new(config: &KafkaConfig) -> Result<Self, MessagingError> {
        config.validate()?;
        let producer: FutureProducer = producer_client_config(config)
            .create()
            .map_err(|e| MessagingError::Connection(e.to_string()))?;

        tracing::info!(
            brokers = %config.bootstrap_servers(),
            acks = config.acks.as_kafka_value(),
            max_retries = config.max_retries,
            "kafka producer created"
        );

        Ok(Self { producer })
    }
}

/// プロデューサー用の librdkafka 設定を組み立てる。
///
/// 冪等プロデューサーは無効のままにする。確認応答の喪失時には
/// リトライで重複レコードが発生しうる（at-least-once）。
pub fn producer_client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config.set("bootstrap.servers", config.bootstrap_servers());
    client_config.set("security.protocol", &config.security_protocol);
    client_config.set("acks", config.acks.as_kafka_value());
    client_config.set("message.send.max.retries", config.max_retries.to_string());
    client_config.set("message.timeout.ms", config.message_timeout_ms.to_string());
    client_config.set("enable.idempotence", "false");
    if let Some(ref client_id) = config.client_id {
        client_config.set("client.id", client_id);
    }
    client_config
}

#[async_trait]
impl RecordPublisher for KafkaRecordPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<PublishReceipt, MessagingError> {
        let record = FutureRecord::<(), [u8]>::to(topic).payload(payload);

        // キュー投入自体は待ち続け、配信の上限は message.timeout.ms とリトライ上限に委ねる。
        let (partition, offset) = self
            .producer
            .send(record, Timeout::Never)
            .await
            .map_err(|(err, _)| MessagingError::Publish(err.to_string()))?;

        Ok(PublishReceipt { partition, offset })
    }

    async fn flush(&self) -> Result<(), MessagingError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(FLUSH_TIMEOUT))
            .await
            .map_err(|e| MessagingError::Publish(e.to_string()))?
            .map_err(|e| MessagingError::Publish(e.to_string()))
    }
}
