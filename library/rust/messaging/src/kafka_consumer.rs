//! KafkaPartitionSubscriber: rdkafka を使用した PartitionSubscriber 実装。
//! feature = "kafka" で有効化される。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};

use crate::config::KafkaConfig;
use crate::consumer::{PartitionSubscriber, RecordStream, StartOffset};
use crate::error::MessagingError;
use crate::record::Record;

/// KafkaPartitionSubscriber は 1 パーティションを直接 assign して読む。
/// グループ購読は使わず、オフセットのコミットも行わない。
pub struct KafkaPartitionSubscriber {
    config: KafkaConfig,
    group_id: String,
}

impl KafkaPartitionSubscriber {
    pub fn new(config: &KafkaConfig, group_id: impl Into<String>) -> Result<Self, MessagingError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            group_id: group_id.into(),
        })
    }
}

/// コンシューマー用の librdkafka 設定を組み立てる。
pub fn consumer_client_config(config: &KafkaConfig, group_id: &str) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config.set("bootstrap.servers", config.bootstrap_servers());
    client_config.set("group.id", group_id);
    client_config.set("security.protocol", &config.security_protocol);
    client_config.set("enable.auto.commit", "false");
    client_config.set("enable.partition.eof", "false");
    if let Some(ref client_id) = config.client_id {
        client_config.set("client.id", client_id);
    }
    client_config
}

fn kafka_offset(start: StartOffset) -> Offset {
    match start {
        StartOffset::Oldest => Offset::Beginning,
        StartOffset::Latest => Offset::End,
    }
}

/// トピックとパーティションがクラスタ上に存在するかメタデータで確認する。
/// fetch_metadata はブロッキング呼び出しなので spawn_blocking から呼ぶこと。
fn check_partition(
    consumer: &StreamConsumer,
    topic: &str,
    partition: i32,
    timeout: Duration,
) -> Result<(), MessagingError> {
    let metadata = consumer
        .fetch_metadata(Some(topic), timeout)
        .map_err(|e| MessagingError::Connection(e.to_string()))?;

    let topic_metadata = metadata
        .topics()
        .iter()
        .find(|t| t.name() == topic)
        .ok_or_else(|| MessagingError::Connection(format!("topic not found: {topic}")))?;

    if let Some(err) = topic_metadata.error() {
        return Err(MessagingError::Connection(format!(
            "topic {topic} unavailable: {err:?}"
        )));
    }

    if !topic_metadata.partitions().iter().any(|p| p.id() == partition) {
        return Err(MessagingError::Connection(format!(
            "partition {partition} not found in topic {topic}"
        )));
    }
    Ok(())
}

fn to_record<M: Message>(msg: &M) -> Record {
    Record {
        topic: msg.topic().to_string(),
        partition: msg.partition(),
        offset: msg.offset(),
        payload: msg.payload().unwrap_or_default().to_vec(),
    }
}

#[async_trait]
impl PartitionSubscriber for KafkaPartitionSubscriber {
    async fn subscribe(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<RecordStream, MessagingError> {
        let consumer: StreamConsumer = consumer_client_config(&self.config, &self.group_id)
            .create()
            .map_err(|e| MessagingError::Connection(e.to_string()))?;
        let consumer = Arc::new(consumer);

        let metadata_consumer = Arc::clone(&consumer);
        let checked_topic = topic.to_string();
        let timeout = Duration::from_millis(self.config.connection_timeout_ms);
        tokio::task::spawn_blocking(move || {
            check_partition(&metadata_consumer, &checked_topic, partition, timeout)
        })
        .await
        .map_err(|e| MessagingError::Connection(e.to_string()))??;

        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(topic, partition, kafka_offset(start))
            .map_err(|e| MessagingError::Connection(e.to_string()))?;
        consumer
            .assign(&tpl)
            .map_err(|e| MessagingError::Connection(e.to_string()))?;

        tracing::info!(
            topic = %topic,
            partition = partition,
            start = ?start,
            "kafka partition assigned"
        );

        let stream = futures::stream::unfold(consumer, |consumer| async move {
            let item = match consumer.recv().await {
                Ok(msg) => Ok(to_record(&msg)),
                Err(e) => Err(MessagingError::Transport(e.to_string())),
            };
            Some((item, consumer))
        });
        Ok(stream.boxed())
    }
}
