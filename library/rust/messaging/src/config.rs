use serde::{Deserialize, Serialize};

use crate::error::MessagingError;

/// AckLevel は publish 成功とみなすために必要なレプリカ確認応答の水準。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckLevel {
    /// 確認応答を待たない
    None,
    /// リーダーの書き込みのみ待つ
    Leader,
    /// 全 ISR の書き込みを待つ
    #[default]
    All,
}

impl AckLevel {
    /// librdkafka の `acks` プロパティ値に変換する。
    pub fn as_kafka_value(self) -> &'static str {
        match self {
            AckLevel::None => "0",
            AckLevel::Leader => "1",
            AckLevel::All => "all",
        }
    }
}

/// KafkaConfig はブローカー接続設定を表す。起動後は読み取り専用で、
/// 1 プロセス内のすべての publish 呼び出しで共有される。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    /// Kafka ブローカーアドレスのリスト（例: ["localhost:9092"]）
    pub brokers: Vec<String>,
    /// 送受信対象のトピック名
    #[serde(default = "default_topic")]
    pub topic: String,
    /// 確認応答レベル
    #[serde(default)]
    pub acks: AckLevel,
    /// クライアント内部でのリトライ上限
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// セキュリティプロトコル（PLAINTEXT / SSL / SASL_PLAINTEXT / SASL_SSL）
    #[serde(default = "default_security_protocol")]
    pub security_protocol: String,
    /// 配信タイムアウト（ミリ秒）。リトライを含めた publish 全体の上限。
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,
    /// 購読開始時のメタデータ取得タイムアウト（ミリ秒）
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    #[serde(default)]
    pub client_id: Option<String>,
}

fn default_topic() -> String {
    "comments".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_security_protocol() -> String {
    "PLAINTEXT".to_string()
}

fn default_message_timeout_ms() -> u64 {
    30000
}

fn default_connection_timeout_ms() -> u64 {
    5000
}

impl KafkaConfig {
    /// ブローカーリストから既定値の KafkaConfig を生成する。
    pub fn new(brokers: Vec<String>) -> Self {
        Self {
            brokers,
            topic: default_topic(),
            acks: AckLevel::default(),
            max_retries: default_max_retries(),
            security_protocol: default_security_protocol(),
            message_timeout_ms: default_message_timeout_ms(),
            connection_timeout_ms: default_connection_timeout_ms(),
            client_id: None,
        }
    }

    /// ブローカーアドレスをカンマ区切り文字列で返す（rdkafka の bootstrap.servers 用）。
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }

    /// カンマ区切りのブローカー指定（環境変数 KAFKA_BROKERS 等）で brokers を上書きする。
    /// 空要素は無視し、結果が空の場合は上書きしない。
    pub fn apply_broker_override(&mut self, raw: &str) {
        let brokers: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(ToString::to_string)
            .collect();
        if !brokers.is_empty() {
            self.brokers = brokers;
        }
    }

    /// 設定の論理的妥当性を検証する。
    pub fn validate(&self) -> Result<(), MessagingError> {
        if self.brokers.is_empty() {
            return Err(MessagingError::Configuration(
                "at least one broker must be specified".to_string(),
            ));
        }
        if self.brokers.iter().any(|b| b.trim().is_empty()) {
            return Err(MessagingError::Configuration(
                "empty broker address".to_string(),
            ));
        }
        if self.topic.trim().is_empty() {
            return Err(MessagingError::Configuration(
                "topic must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
