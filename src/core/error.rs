// Error types shared by every operation

use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the daemon or the comment server
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Could not reach {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP status {status}")]
    Http { endpoint: String, status: u16 },

    /// The server answered with an `error` object
    #[error("{method}: {name}: {message}")]
    Envelope {
        method: String,
        name: String,
        message: String,
    },

    #[error("Malformed response to {method}: {reason}")]
    Malformed { method: String, reason: String },
}

/// Result of every library operation
#[derive(Error, Debug)]
pub enum ToolError {
    /// Expected absence, such as a claim that does not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The daemon accepted the request but the stream did not download
    #[error("Download of {claim} failed: {reason}")]
    Download { claim: String, reason: String },

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Outcome<T> = Result<T, ToolError>;

impl ToolError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ToolError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ToolError::NotFound(_))
    }
}
