//! prometheus-plugin library - can be called from multi-call binaries or standalone
//!
//! Charts Prometheus summary families: one chart per distinct set of
//! non-quantile labels, one dimension per quantile.

use std::time::SystemTime;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub mod cache;
pub mod job;
pub mod netdata_env;
pub mod plugin_config;
pub mod sample;
pub mod sort;
pub mod source;
pub mod split;
pub mod summary;
pub mod summary_chart;
mod tracing_setup;

pub use cache::{Cache, CacheEntry};
pub use job::Job;
pub use sample::{Labels, Metadata, Sample, SummaryFamily};
pub use sort::{QUANTILE_LABEL, sort_summary};
pub use source::{FileSource, SampleSource, SourceError};
pub use split::{SummaryIds, SummarySplit};
pub use summary::{MetricValues, STALE_RETRIES_THRESHOLD, SummaryCollector};
pub use summary_chart::{CollectorOptions, PRECISION};

use crate::netdata_env::NetdataEnv;
use crate::plugin_config::PluginConfig;

/// Entry point for prometheus-plugin - can be called from multi-call binary
///
/// # Arguments
/// * `args` - Command-line arguments (should include argv[0] as "prometheus-plugin")
///
/// # Returns
/// Exit code (0 for success, non-zero for errors)
pub fn run(args: Vec<String>) -> i32 {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start tokio runtime: {}", e);
            return 1;
        }
    };
    runtime.block_on(async_run(args))
}

async fn async_run(args: Vec<String>) -> i32 {
    tracing_setup::init_tracing(&NetdataEnv::from_environment(), "info");

    match run_internal(args).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{:#}", e);
            1
        }
    }
}

async fn run_internal(args: Vec<String>) -> Result<()> {
    let config = PluginConfig::new(args).context("failed to initialize plugin configuration")?;
    let source = FileSource::new(&config.samples_file);
    tracing::info!(
        "collecting summaries from {} every {}",
        source.path().display(),
        humantime::format_duration(config.update_every),
    );

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"TRUST_DURATIONS 1\n")
        .await
        .context("Failed to write TRUST_DURATIONS")?;

    let mut job = Job::new(
        source,
        config.chart_type_id.as_str(),
        config.update_every,
        config.collector_options(),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let mut interval = tokio::time::interval(config.update_every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("shutdown requested");
                break;
            }
            _ = interval.tick() => {
                let buf = job.cycle(SystemTime::now());
                if buf.is_empty() {
                    continue;
                }
                stdout
                    .write_all(&buf)
                    .await
                    .context("failed to write chart data")?;
                stdout.flush().await.context("failed to flush chart data")?;
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => tracing::warn!("failed to install SIGTERM handler: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
