//! comments-messaging: コメントパイプラインのブローカークライアント抽象化ライブラリ。
//!
//! 確認応答付きの同期 publish（[`RecordPublisher`]）と、
//! 単一パーティションの購読（[`PartitionSubscriber`]）を提供する。
//! rdkafka 実装は `kafka` フィーチャー、インメモリ実装は `testing` フィーチャーで有効化される。

pub mod config;
pub mod consumer;
pub mod error;
pub mod producer;
pub mod record;

#[cfg(feature = "kafka")]
pub mod kafka_consumer;
#[cfg(feature = "kafka")]
pub mod kafka_producer;
#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use config::{AckLevel, KafkaConfig};
pub use consumer::{PartitionSubscriber, RecordStream, StartOffset};
pub use error::MessagingError;
pub use producer::RecordPublisher;
pub use record::{PublishReceipt, Record};

#[cfg(feature = "kafka")]
pub use kafka_consumer::KafkaPartitionSubscriber;
#[cfg(feature = "kafka")]
pub use kafka_producer::KafkaRecordPublisher;
#[cfg(any(test, feature = "testing"))]
pub use memory::InMemoryBroker;

#[cfg(feature = "mock")]
pub use consumer::MockPartitionSubscriber;
#[cfg(feature = "mock")]
pub use producer::MockRecordPublisher;
