use latency_check::config::{ConfigManager, LogFormat};
use latency_check::metrics::ProbeMetrics;
use latency_check::report::reporter_for;
use latency_check::{Dispatcher, HttpProber};

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> anyhow::Result<()> {
    // Load config first to get log level
    let config = ConfigManager::start()
        .await?
        .with_target_overrides(std::env::args().skip(1));
    config.validate()?;
    let log_level = config.get_tracing_level()?;

    // Init tracing with configured log level; stdout is reserved for results
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("latency_check={}", log_level.as_str().to_lowercase()).parse()?);
    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    let metrics = ProbeMetrics::new(config.enable_latency_history)?;
    if config.enable_latency_history {
        info!("Latency history tracking enabled");
    }

    let dispatcher = Dispatcher::new(HttpProber::new())
        .with_capacity(config.channel_capacity)
        .with_metrics(metrics.clone());

    let mut reporter = reporter_for(config.output, std::io::stdout());
    let summary = dispatcher.run(config.targets, &mut reporter).await?;

    if let Some(path) = &config.metrics_file {
        tokio::fs::write(path, metrics.encode()?).await?;
        info!("metrics written to {}", path.display());
    }

    if summary.failed > 0 {
        info!("{} of {} targets failed", summary.failed, summary.total);
    }

    Ok(())
}
