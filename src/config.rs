//! Gateway configuration
//!
//! Built once at startup and handed to the runner, the dispatcher and the
//! HTTP layer. Nothing in here changes while the gateway is running.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_LOG_LINES: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid shell quoting in elevation prefix: {0}")]
    ElevatePrefix(String),

    #[error("{0} must not be empty")]
    EmptyTool(&'static str),

    #[error("Command timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Log line count must be greater than zero")]
    ZeroLogLines,
}

/// Immutable gateway settings
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to
    pub bind: IpAddr,
    pub port: u16,
    /// Fixed privilege-escalation wrapper prepended to state-changing actions
    pub elevate: Vec<String>,
    /// Service-manager control tool (list-units, status, start, ...)
    pub systemctl: String,
    /// Log-query tool
    pub journalctl: String,
    /// Upper bound on a single external invocation
    pub timeout: Duration,
    /// Number of trailing journal entries returned by /logs
    pub log_lines: usize,
    /// Static page served at /
    pub index: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            elevate: vec!["sudo".to_string()],
            systemctl: "systemctl".to_string(),
            journalctl: "journalctl".to_string(),
            timeout: DEFAULT_TIMEOUT,
            log_lines: DEFAULT_LOG_LINES,
            index: PathBuf::from("index.html"),
        }
    }
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Check the invariants the rest of the gateway relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.systemctl.trim().is_empty() {
            return Err(ConfigError::EmptyTool("systemctl"));
        }
        if self.journalctl.trim().is_empty() {
            return Err(ConfigError::EmptyTool("journalctl"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.log_lines == 0 {
            return Err(ConfigError::ZeroLogLines);
        }
        Ok(())
    }
}

/// Command-line/environment settings shared by the gateway and the CLI
#[derive(Debug, Clone, clap::Args)]
pub struct ToolArgs {
    /// Privilege-escalation wrapper for start/stop/restart ("" disables it)
    #[arg(long, env = "SYSWEB_ELEVATE", default_value = "sudo")]
    pub elevate: String,

    /// Service-manager control tool
    #[arg(long, env = "SYSWEB_SYSTEMCTL", default_value = "systemctl")]
    pub systemctl: String,

    /// Journal query tool
    #[arg(long, env = "SYSWEB_JOURNALCTL", default_value = "journalctl")]
    pub journalctl: String,

    /// Seconds before an external command is killed
    #[arg(long = "timeout-secs", env = "SYSWEB_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Journal entries returned per log query
    #[arg(long, env = "SYSWEB_LOG_LINES", default_value_t = DEFAULT_LOG_LINES)]
    pub log_lines: usize,
}

impl ToolArgs {
    /// Overlay these settings onto `config` and validate the result
    pub fn apply(self, config: &mut Config) -> Result<(), ConfigError> {
        config.elevate = parse_elevate(&self.elevate)?;
        config.systemctl = self.systemctl;
        config.journalctl = self.journalctl;
        config.timeout = Duration::from_secs(self.timeout_secs);
        config.log_lines = self.log_lines;
        config.validate()
    }
}

/// Split an elevation prefix such as `sudo -n` using shell quoting rules.
///
/// An empty or all-whitespace string yields an empty prefix, which disables
/// elevation entirely.
pub fn parse_elevate(raw: &str) -> Result<Vec<String>, ConfigError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    shlex::split(raw).ok_or_else(|| ConfigError::ElevatePrefix(raw.to_string()))
}
