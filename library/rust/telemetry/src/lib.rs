//! comments-telemetry: 構造化ログ・トレース・Prometheus メトリクスの初期化ライブラリ。

pub mod metrics;
#[cfg(any(feature = "axum-layer", test))]
pub mod middleware;

pub use metrics::Metrics;
#[cfg(any(feature = "axum-layer", test))]
pub use middleware::MetricsLayer;

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{trace as sdktrace, Resource};
use tracing_subscriber::{
    fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// TelemetryConfig は telemetry ライブラリの初期化設定を保持する。
pub struct TelemetryConfig {
    pub service_name: String,
    pub version: String,
    pub environment: String,
    pub trace_endpoint: Option<String>,
    pub sample_rate: f64,
    pub log_level: String,
    /// ログ出力フォーマット。"text" の場合はプレーンテキスト、それ以外は JSON。
    pub log_format: String,
}

impl TelemetryConfig {
    /// 環境変数 OTEL_EXPORTER_OTLP_ENDPOINT が設定されていれば trace_endpoint を上書きする。
    pub fn with_env_trace_endpoint(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
            if !endpoint.is_empty() {
                self.trace_endpoint = Some(endpoint);
            }
        }
        self
    }

    fn uses_text_format(&self) -> bool {
        self.log_format == "text"
    }
}

/// init_telemetry は OpenTelemetry TracerProvider と tracing-subscriber を初期化する。
/// trace_endpoint が指定されている場合、OTLP gRPC エクスポータを設定する。
/// RUST_LOG が設定されていれば log_level より優先する。
pub fn init_telemetry(cfg: &TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let tracer = if let Some(ref endpoint) = cfg.trace_endpoint {
        let exporter = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?;
        let provider = sdktrace::TracerProvider::builder()
            .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
            .with_sampler(sdktrace::Sampler::TraceIdRatioBased(cfg.sample_rate))
            .with_resource(Resource::new(vec![
                KeyValue::new("service.name", cfg.service_name.clone()),
                KeyValue::new("service.version", cfg.version.clone()),
                KeyValue::new("environment", cfg.environment.clone()),
            ]))
            .build();
        let tracer = provider.tracer("comments");
        global::set_tracer_provider(provider);
        Some(tracer)
    } else {
        None
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cfg.uses_text_format() {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        let subscriber = registry.with(fmt_layer);
        if let Some(t) = tracer {
            let telemetry_layer = tracing_opentelemetry::layer().with_tracer(t);
            subscriber.with(telemetry_layer).try_init()?;
        } else {
            subscriber.try_init()?;
        }
    } else {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        let subscriber = registry.with(fmt_layer);
        if let Some(t) = tracer {
            let telemetry_layer = tracing_opentelemetry::layer().with_tracer(t);
            subscriber.with(telemetry_layer).try_init()?;
        } else {
            subscriber.try_init()?;
        }
    }

    Ok(())
}

/// shutdown は OpenTelemetry TracerProvider をシャットダウンする。
pub fn shutdown() {
    global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(log_format: &str) -> TelemetryConfig {
        TelemetryConfig {
            service_name: "comments-producer".to_string(),
            version: "0.1.0".to_string(),
            environment: "dev".to_string(),
            trace_endpoint: None,
            sample_rate: 1.0,
            log_level: "info".to_string(),
            log_format: log_format.to_string(),
        }
    }

    #[test]
    fn test_text_format_detection() {
        assert!(make_config("text").uses_text_format());
        assert!(!make_config("json").uses_text_format());
        assert!(!make_config("").uses_text_format());
    }

    #[test]
    fn test_init_telemetry_without_endpoint() {
        // 2 回目以降の初期化はグローバル subscriber 設定済みでエラーになるため、結果は問わない。
        let _ = init_telemetry(&make_config("text"));
        tracing::info!("telemetry initialized in test");
    }
}
