//! Seam between the pipeline and the exchange.

use crate::error::BalanceError;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Anything that can report the current account equity.
///
/// The pipeline only depends on this trait, so it can run against a mock in
/// tests and against [`KucoinFuturesClient`](super::KucoinFuturesClient) in
/// production.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EquitySource: Send + Sync {
    /// Fetch the account's current total equity.
    async fn account_equity(&self) -> Result<Decimal, BalanceError>;
}
