use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use comments_messaging::{KafkaRecordPublisher, RecordPublisher};
use comments_producer::adapter::handler::{self, AppState};
use comments_producer::infrastructure::config::Config;
use comments_producer::usecase::PushCommentUseCase;
use comments_server_common::{config_path, shutdown_signal};
use comments_telemetry::{Metrics, MetricsLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config
    let cfg = Config::load(&config_path())?;

    // Telemetry
    comments_telemetry::init_telemetry(&cfg.telemetry_config())
        .map_err(|e| anyhow::anyhow!("failed to init telemetry: {e}"))?;

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "starting comments-producer server"
    );

    let metrics = Arc::new(Metrics::new(&cfg.app.name));

    // Kafka producer（全リクエストで 1 インスタンスを共有する）
    let publisher: Arc<dyn RecordPublisher> = Arc::new(KafkaRecordPublisher::new(&cfg.kafka)?);

    // Use cases
    let push_comment_uc = Arc::new(
        PushCommentUseCase::new(publisher.clone(), cfg.kafka.topic.clone())
            .with_metrics(metrics.clone()),
    );

    let state = AppState {
        push_comment_uc,
        metrics: metrics.clone(),
        max_body_bytes: cfg.server.max_body_bytes,
    };

    // Router
    let app = handler::router(state)
        .layer(MetricsLayer::new(metrics).with_routes(handler::ROUTES));

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("REST server starting on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 未送信のメッセージを送り切ってから終了する
    if let Err(e) = publisher.flush().await {
        tracing::warn!(error = %e, "failed to flush kafka producer");
    }

    comments_telemetry::shutdown();
    info!("comments-producer exited");
    Ok(())
}
