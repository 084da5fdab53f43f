use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub peers: PeersConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_daemon_url")]
    pub url: String,
    /// Per-request timeout in seconds, 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_wallet_id")]
    pub wallet_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentsConfig {
    #[serde(default = "default_comment_server")]
    pub server: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeersConfig {
    /// Channels searched at the same time
    #[serde(default = "default_channel_threads")]
    pub channel_threads: usize,
    /// Claims searched at the same time inside one channel
    #[serde(default = "default_claim_threads")]
    pub claim_threads: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

fn default_daemon_url() -> String {
    "http://localhost:5279".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_wallet_id() -> String {
    "default_wallet".to_string()
}

fn default_comment_server() -> String {
    "https://comments.odysee.com/api/v2".to_string()
}

fn default_channel_threads() -> usize {
    8
}

fn default_claim_threads() -> usize {
    32
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

fn default_console() -> bool {
    true
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            url: default_daemon_url(),
            timeout_secs: default_timeout_secs(),
            wallet_id: default_wallet_id(),
        }
    }
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            server: default_comment_server(),
        }
    }
}

impl Default for PeersConfig {
    fn default() -> Self {
        Self {
            channel_threads: default_channel_threads(),
            claim_threads: default_claim_threads(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_threads: default_num_threads(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Replace the endpoints with `CLAIMKIT_DAEMON_URL` and
    /// `CLAIMKIT_COMMENT_SERVER` when they are set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CLAIMKIT_DAEMON_URL") {
            if !url.is_empty() {
                self.daemon.url = url;
            }
        }
        if let Ok(server) = std::env::var("CLAIMKIT_COMMENT_SERVER") {
            if !server.is_empty() {
                self.comments.server = server;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.daemon.url.starts_with("http://") && !self.daemon.url.starts_with("https://") {
            bail!("daemon url must start with http:// or https://, got '{}'", self.daemon.url);
        }

        if self.daemon.wallet_id.is_empty() {
            bail!("wallet_id must not be empty");
        }

        if !self.comments.server.starts_with("http://")
            && !self.comments.server.starts_with("https://")
        {
            bail!(
                "comment server must start with http:// or https://, got '{}'",
                self.comments.server
            );
        }

        if self.peers.channel_threads == 0 {
            bail!("channel_threads must be greater than 0");
        }

        if self.peers.claim_threads == 0 {
            bail!("claim_threads must be greater than 0");
        }

        if self.runtime.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
