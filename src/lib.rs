//! # KuCoin Balance Logger
//!
//! Records the daily equity of a KuCoin Futures account as front-matter
//! notes in an Obsidian vault.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `exchange`: KuCoin Futures REST client (signing, retry/backoff)
//! - `persistence`: Per-day balance notes and the same-day run cache
//! - `pipeline`: The daily fetch-compare-record run
//! - `error`: Error taxonomy shared by all of the above
//! - `utils`: Shared utilities and decimal arithmetic

pub mod config;
pub mod error;
pub mod exchange;
pub mod persistence;
pub mod pipeline;
pub mod utils;

pub use config::Config;
pub use error::{BalanceError, TransportError};
pub use pipeline::{BalanceLogger, RunOutcome};
