use serde::Deserialize;

use comments_messaging::{KafkaConfig, StartOffset};
use comments_telemetry::TelemetryConfig;

/// Config はアプリケーション全体の設定。
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// YAML を読み込み、環境変数 KAFKA_BROKERS があれば brokers を上書きする。
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut cfg: Config = comments_server_common::load_yaml(path)?;
        if let Ok(brokers) = std::env::var("KAFKA_BROKERS") {
            cfg.kafka.apply_broker_override(&brokers);
        }
        cfg.kafka.validate()?;
        Ok(cfg)
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.app.name.clone(),
            version: self.app.version.clone(),
            environment: self.app.environment.clone(),
            trace_endpoint: self.observability.trace_endpoint.clone(),
            sample_rate: 1.0,
            log_level: self.observability.log_level.clone(),
            log_format: self.observability.log_format.clone(),
        }
        .with_env_trace_endpoint()
    }
}

/// AppConfig はアプリケーション設定。
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_name() -> String {
    "comments-worker".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

/// ConsumerConfig は購読対象のパーティションと開始位置。
///
/// オフセットはコミットしないため、`oldest` では再起動のたびに保持済みの履歴をすべて読み直す。
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerConfig {
    #[serde(default)]
    pub partition: i32,
    #[serde(default)]
    pub start_offset: StartOffset,
    #[serde(default = "default_group_id")]
    pub group_id: String,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            partition: 0,
            start_offset: StartOffset::default(),
            group_id: default_group_id(),
        }
    }
}

fn default_group_id() -> String {
    "comments-worker".to_string()
}

/// ObservabilityConfig はログ・トレース設定。
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default)]
    pub trace_endpoint: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            trace_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}
