use serde::Deserialize;

use comments_messaging::KafkaConfig;
use comments_telemetry::TelemetryConfig;

/// Config はアプリケーション全体の設定。
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub kafka: KafkaConfig,
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
    "comments-producer".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

/// ServerConfig はサーバー設定。
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_body_bytes() -> usize {
    64 * 1024
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
