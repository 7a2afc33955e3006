//! Error types for discovery, retrieval and the snapshot cache

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures while locating the language server and reading its arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// No matching process, or the OS listing could not be produced.
    #[error("language server not found: {0}")]
    NotFound(String),

    /// No `--extension_server_port` value in the command line.
    #[error("no extension server port in process arguments")]
    MissingPort,

    /// Neither `--csrf_token` nor a token-shaped flag value was found.
    #[error("no CSRF token in process arguments")]
    MissingToken,

    /// Structured process listing was empty or not a JSON object.
    #[error("invalid process listing: {0}")]
    InvalidInput(String),

    /// Structured process listing had no usable process id.
    #[error("process listing has no process id")]
    MissingPid,
}

/// Failures talking to a live quota source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, TLS failure, timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// Rejected or unusable credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Any other non-200 response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body was not the JSON we expected.
    #[error("malformed response: {0}")]
    Parse(String),
}

impl FetchError {
    /// Whether the HTTPS attempt may be retried over plain HTTP
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Failures loading the OAuth credential file.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no home directory to look for credentials in")]
    NoHome,

    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse credentials: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("credentials expired {minutes} min ago")]
    Expired { minutes: i64 },
}

/// Failures reading the snapshot cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cached snapshot: {0}")]
    NotFound(String),
}

/// Failures running an external OS command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run {cmd}: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{cmd} timed out after {timeout:?}")]
    Timeout { cmd: String, timeout: Duration },

    #[error("{cmd} exited with code {code}: {stderr}")]
    NonZeroExit { cmd: String, code: i32, stderr: String },
}

/// Terminal failure of the whole retrieval pipeline.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Every tier was skipped or failed and no snapshot is cached.
    #[error("no live source succeeded and no cached data is available ({0})")]
    Unavailable(String),
}
