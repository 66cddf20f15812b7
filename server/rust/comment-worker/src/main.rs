use std::sync::Arc;

use tracing::{error, info};

use comments_messaging::{KafkaPartitionSubscriber, PartitionSubscriber};
use comments_server_common::{config_path, shutdown_signal};
use comments_telemetry::Metrics;
use comments_worker::infrastructure::config::Config;
use comments_worker::infrastructure::TracingSink;
use comments_worker::usecase::{ConsumptionSink, ConsumptionWorker};

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
        topic = %cfg.kafka.topic,
        partition = cfg.consumer.partition,
        start_offset = ?cfg.consumer.start_offset,
        "starting comments-worker"
    );

    let metrics = Arc::new(Metrics::new(&cfg.app.name));

    let subscriber: Arc<dyn PartitionSubscriber> = Arc::new(KafkaPartitionSubscriber::new(
        &cfg.kafka,
        cfg.consumer.group_id.clone(),
    )?);
    let sink: Arc<dyn ConsumptionSink> = Arc::new(TracingSink::new().with_metrics(metrics));

    let worker = ConsumptionWorker::new(subscriber, sink, cfg.kafka.topic.clone())
        .with_partition(cfg.consumer.partition)
        .with_start_offset(cfg.consumer.start_offset);

    // 接続できなければ処理を始めず非ゼロで終了する
    let connected = match worker.connect().await {
        Ok(connected) => connected,
        Err(e) => {
            error!(error = %e, "failed to start consumer");
            comments_telemetry::shutdown();
            return Err(e.into());
        }
    };

    let report = connected.spawn().drain_on(shutdown_signal()).await?;
    info!(
        message_count = report.message_count,
        reason = %report.reason,
        "processed {} messages",
        report.message_count
    );

    comments_telemetry::shutdown();
    Ok(())
}
