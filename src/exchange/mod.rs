//! KuCoin Futures integration.
//!
//! Provides authenticated REST access for:
//! - Request signing (HMAC-SHA256, base64)
//! - Account equity with bounded exponential backoff

mod client;
mod retry;
mod signer;
mod traits;
mod types;

pub use client::KucoinFuturesClient;
pub use retry::{AttemptError, RetryPolicy};
pub use signer::{RequestSigner, SignedHeaders};
#[cfg(test)]
pub use traits::MockEquitySource;
pub use traits::EquitySource;
pub use types::*;
