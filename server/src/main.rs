mod config;
mod consumer;
mod queue;

use trace_err::*;
use tracing::{error, info};

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

fn listen_for_cancel(
    cancel_token: &tokio_util::sync::CancellationToken,
    task_tracker: &tokio_util::task::TaskTracker,
) {
    #[cfg(unix)]
    let mut term_handler =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .trace_expect("Failed to register signal handlers");
    #[cfg(not(unix))]
    let mut term_handler = std::future::pending();

    let cancel_token = cancel_token.clone();
    let task_tracker_cloned = task_tracker.clone();
    task_tracker.spawn(async move {
        tokio::select! {
            _ = term_handler.recv() => {
                // Signal stop
                info!("Received terminate signal, stopping...");
            }
            _ = tokio::signal::ctrl_c() => {
                // Signal stop
                info!("Received CTRL+C, stopping...");
            }
        }

        // Cancel everything
        cancel_token.cancel();
        task_tracker_cloned.close();
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line
    let Some((config, config_source)) = config::init() else {
        return Ok(());
    };

    // Resolve log level: env var overrides config, default to ERROR
    let log_level = std::env::var("REPLSINK_LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse::<tracing::Level>().ok())
        .or(config.log_level)
        .unwrap_or(tracing::Level::ERROR);

    {
        use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};
        let filter = EnvFilter::builder()
            .with_default_directive(
                tracing_subscriber::filter::LevelFilter::from_level(log_level).into(),
            )
            .from_env_lossy();
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_filter(filter))
            .init();
    }

    info!("{} version {} starting...", PKG_NAME, PKG_VERSION);
    info!("{config_source}");

    inner_main(config).await.inspect_err(|e| error!("{e}"))
}

async fn inner_main(config: config::Config) -> anyhow::Result<()> {
    // Connect the sink table, creating it when absent
    let table = replsink_dynamodb::Table::connect(&config.table).await;
    table.ensure_table().await?;

    let queue = queue::Client::new(&config.queue, config.vclock_format);
    let consumer = consumer::Consumer::new(queue, table, config.bucket);

    // Prepare for graceful shutdown
    let cancel_token = tokio_util::sync::CancellationToken::new();
    let task_tracker = tokio_util::task::TaskTracker::new();

    {
        let cancel_token = cancel_token.clone();
        task_tracker.spawn(async move {
            consumer.run(&cancel_token).await;
        });
    }

    // And wait for shutdown signal
    listen_for_cancel(&cancel_token, &task_tracker);

    info!("Started successfully");

    // And wait for cancel token
    cancel_token.cancelled().await;

    // Wait for all tasks to finish
    task_tracker.wait().await;

    info!("Stopped");

    Ok(())
}
