// Shared state for one invocation

use crate::api::client::DaemonClient;
use crate::api::comment_server::CommentClient;
use crate::core::config::Config;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Everything an operation needs to talk to the outside world
///
/// Cheap to clone; the peer search hands a clone to every worker task.
#[derive(Clone)]
pub struct Session {
    /// Local daemon
    pub daemon: Arc<DaemonClient>,

    /// Comment server
    pub comments: Arc<CommentClient>,

    /// Configuration
    pub config: Arc<Config>,
}

impl Session {
    pub fn new(config: Config) -> Result<Self> {
        let daemon = DaemonClient::new(&config.daemon.url, config.daemon.timeout_secs)
            .context("Failed to create daemon client")?;

        let comments = CommentClient::new(&config.comments.server, config.daemon.timeout_secs)
            .context("Failed to create comment server client")?;

        Ok(Self {
            daemon: Arc::new(daemon),
            comments: Arc::new(comments),
            config: Arc::new(config),
        })
    }

    pub fn wallet_id(&self) -> &str {
        &self.config.daemon.wallet_id
    }
}

#[cfg(test)]
pub(crate) fn test_session(daemon_url: &str) -> Session {
    let mut config = Config::default();
    config.daemon.url = daemon_url.to_string();
    config.comments.server = daemon_url.to_string();
    config.daemon.timeout_secs = 5;
    config.peers.channel_threads = 2;
    config.peers.claim_threads = 4;
    Session::new(config).unwrap()
}
