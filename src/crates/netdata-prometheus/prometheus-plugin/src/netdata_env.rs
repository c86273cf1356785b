use std::env;
use std::path::PathBuf;

/// Variables Netdata exports to the plugins it spawns.
///
/// Unset or unparsable variables are `None`.
#[derive(Debug, Clone, Default)]
pub struct NetdataEnv {
    pub user_config_dir: Option<PathBuf>,
    pub stock_config_dir: Option<PathBuf>,
    pub plugins_dir: Option<PathBuf>,
    pub update_every: Option<u64>,
    pub invocation_id: Option<String>,
    pub log_level: Option<LogLevel>,
    pub systemd_journal_path: Option<PathBuf>,
}

/// Severity names accepted in `NETDATA_LOG_LEVEL`, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

const LOG_LEVEL_NAMES: [(&str, LogLevel); 8] = [
    ("emergency", LogLevel::Emergency),
    ("alert", LogLevel::Alert),
    ("critical", LogLevel::Critical),
    ("error", LogLevel::Error),
    ("warning", LogLevel::Warning),
    ("notice", LogLevel::Notice),
    ("info", LogLevel::Info),
    ("debug", LogLevel::Debug),
];

impl LogLevel {
    /// `tracing` has no levels above error or between warn and info.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Emergency | Self::Alert | Self::Critical | Self::Error => "error",
            Self::Warning => "warn",
            Self::Notice | Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LOG_LEVEL_NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s.trim()))
            .map(|&(_, level)| level)
            .ok_or_else(|| format!("unknown log level '{}'", s))
    }
}

impl NetdataEnv {
    pub fn from_environment() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            user_config_dir: lookup("NETDATA_USER_CONFIG_DIR").map(PathBuf::from),
            stock_config_dir: lookup("NETDATA_STOCK_CONFIG_DIR").map(PathBuf::from),
            plugins_dir: lookup("NETDATA_PLUGINS_DIR").map(PathBuf::from),
            update_every: lookup("NETDATA_UPDATE_EVERY").and_then(|s| s.parse().ok()),
            invocation_id: lookup("NETDATA_INVOCATION_ID"),
            log_level: lookup("NETDATA_LOG_LEVEL").and_then(|s| s.parse().ok()),
            systemd_journal_path: lookup("NETDATA_SYSTEMD_JOURNAL_PATH").map(PathBuf::from),
        }
    }

    /// Netdata sets its directories and an invocation id for every plugin it
    /// spawns. None of them is present when started by hand.
    pub fn running_under_netdata(&self) -> bool {
        [&self.user_config_dir, &self.stock_config_dir, &self.plugins_dir]
            .into_iter()
            .any(Option::is_some)
            || self.invocation_id.is_some()
    }
}
