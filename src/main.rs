//! osgauges - operating system and hardware gauge reporter
//!
//! Prints a snapshot of every gauge at a fixed interval until interrupted,
//! or once with `--once`.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use osgauges::{
    cli::Cli,
    config::Config,
    internal_metrics::LoggingRecorder,
    reporter::Reporter,
    EnvironmentGaugeSet,
};
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle};
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            init_logging("info");
            error!("Failed to load configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    init_logging(&config.log_level);

    info!("osgauges starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Cache Window: {}ms", config.cache.window_ms);
    info!("Report Interval: {}s", config.report.interval_seconds);
    info!("Output Format: {}", config.report.format);
    info!("Publish Metrics: {}", config.metrics.publish);
    info!("Log Metrics: {}", config.metrics.log_metrics);
    info!(
        "Log Aggregation Interval: {}s",
        config.metrics.log_aggregation_seconds
    );
    info!("-------------------------------------------------------");

    let gauges = EnvironmentGaugeSet::with_cache_window(config.cache_window())
        .metrics()
        .context("failed to build the gauge set")?;
    info!("Registered {} gauges.", gauges.len());

    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let mut metrics_task: Option<JoinHandle<()>> = None;
    if config.metrics.log_metrics {
        info!(
            "Logging recorder enabled. Metrics will be printed every {} seconds.",
            config.metrics.log_aggregation_seconds
        );
        let (recorder, handle) = LoggingRecorder::new(
            Duration::from_secs(config.metrics.log_aggregation_seconds),
            shutdown_rx.clone(),
        );
        metrics::set_global_recorder(recorder)
            .map_err(|e| anyhow::anyhow!("failed to install logging recorder: {}", e))?;
        metrics_task = Some(handle);
    }

    let mut reporter = Reporter::new(
        gauges,
        config.report.format,
        config.metrics.publish,
        std::io::stdout(),
    );

    if config.report.once {
        reporter.report()?;
    } else {
        // A zero interval would make the ticker panic.
        let interval = config.report_interval().max(Duration::from_secs(1));
        let reporter_task = tokio::spawn(reporter.run(interval, shutdown_rx.clone()));

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received. Shutting down gracefully...");
        shutdown_tx.send(()).ok();

        if let Err(e) = reporter_task.await {
            error!("Reporter task panicked: {:?}", e);
        }
    }

    shutdown_tx.send(()).ok();
    if let Some(handle) = metrics_task {
        if let Err(e) = handle.await {
            error!("Metrics task panicked: {:?}", e);
        }
    }

    info!("All tasks shut down. Exiting.");
    Ok(())
}
