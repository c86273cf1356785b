//! Tracing configuration
//!
//! Logs go to the systemd journal when Netdata tells us where it is
//! (NETDATA_SYSTEMD_JOURNAL_PATH), and to stderr otherwise. Stdout is
//! reserved for the plugin protocol.

use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, prelude::*};

use crate::netdata_env::NetdataEnv;

/// Output destination for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogOutput {
    Journal,
    Stderr,
}

impl LogOutput {
    fn detect(netdata_env: &NetdataEnv) -> Self {
        if netdata_env.systemd_journal_path.is_some() {
            LogOutput::Journal
        } else {
            LogOutput::Stderr
        }
    }

    fn description(&self) -> &'static str {
        match self {
            LogOutput::Journal => "systemd journal",
            LogOutput::Stderr => "stderr",
        }
    }
}

fn stderr_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false)
}

/// Initialize tracing.
///
/// RUST_LOG takes precedence, then NETDATA_LOG_LEVEL, then `default_filter`.
/// Falls back to stderr when the journal cannot be reached.
pub fn init_tracing(netdata_env: &NetdataEnv, default_filter: &str) {
    let mut output = LogOutput::detect(netdata_env);

    let filter = netdata_env
        .log_level
        .map(|level| level.as_filter())
        .unwrap_or(default_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    let mut journal_error = None;
    match output {
        LogOutput::Journal => match tracing_journald::layer() {
            Ok(layer) => registry
                .with(layer.with_syslog_identifier(String::from("prometheus.plugin")))
                .init(),
            Err(e) => {
                journal_error = Some(e);
                output = LogOutput::Stderr;
                registry.with(stderr_layer()).init();
            }
        },
        LogOutput::Stderr => registry.with(stderr_layer()).init(),
    }

    if let Some(e) = journal_error {
        tracing::warn!("failed to connect to journald, using stderr: {}", e);
    }

    tracing::info!(
        output = ?output,
        "tracing initialized, logging to {} with filter '{}'",
        output.description(),
        filter,
    );
}
