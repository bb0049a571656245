//! Error types for the balance logging pipeline.
//!
//! Recoverable outcomes (a missing or malformed historical record, an
//! unreadable cache on read) are not errors here; they are modelled as
//! explicit values by the components that produce them.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single HTTP attempt. These are the retryable faults.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failure, timeout or body read error.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Errors surfaced by the balance logging pipeline.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// Invalid or incomplete configuration, detected before the pipeline starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// The retry budget was exhausted on transport failures.
    #[error("failed to fetch balance after {attempts} attempts: {source}")]
    Network {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The response body did not match the account overview contract.
    #[error("failed to parse account overview response: {0}")]
    Parse(String),

    /// KuCoin rejected the request with an API error code.
    #[error("KuCoin API error {code}: {msg}")]
    Api { code: String, msg: String },

    /// The run cache or its lock file could not be written.
    #[error("cache access failed for {}: {source}", .path.display())]
    CacheAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another process held the cache lock for longer than the allowed wait.
    #[error("timed out after {waited:?} waiting for lock on {}", .path.display())]
    LockTimeout { path: PathBuf, waited: Duration },

    /// A balance record could not be read or written.
    #[error("balance record I/O failed for {}: {source}", .path.display())]
    RecordIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl BalanceError {
    /// Whether the error was produced by the network layer after retrying.
    pub fn is_network(&self) -> bool {
        matches!(self, BalanceError::Network { .. })
    }
}
