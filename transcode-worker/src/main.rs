//! Transcode Worker - SQS consumer launching Fargate transcode tasks
//!
//! Polls the video-processing queue for S3 event notifications and runs
//! one transcoder task per uploaded object. See `config` for the
//! environment variables it reads.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use transcode_worker::config::WorkerConfig;
use transcode_worker::consumer::QueueConsumer;
use transcode_worker::launcher::EcsJobLauncher;
use transcode_worker::queue::SqsJobQueue;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transcode_worker=info".into()),
        )
        .init();

    info!("Starting Transcode Worker");

    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env()?;
    info!(
        queue_url = %config.queue_url,
        cluster = %config.launcher.cluster,
        task_definition = %config.launcher.task_definition,
        "Configuration loaded"
    );

    let aws_config = aws_config::load_from_env().await;
    let queue = SqsJobQueue::new(
        aws_sdk_sqs::Client::new(&aws_config),
        config.queue_url.clone(),
        config.wait_time_secs,
    );
    let launcher = EcsJobLauncher::new(aws_sdk_ecs::Client::new(&aws_config), config.launcher);
    info!("AWS clients initialized");

    // ctrl-c flips the shutdown flag; the loop drains its current cycle
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl+c");
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let mut consumer = QueueConsumer::new(
        queue,
        launcher,
        Duration::from_secs(config.poll_interval_secs),
        shutdown_rx,
    );

    if let Err(e) = consumer.run().await {
        error!(error = %e, "Consumer terminated with error");
        return Err(e.into());
    }

    info!("Transcode Worker stopped");
    Ok(())
}
