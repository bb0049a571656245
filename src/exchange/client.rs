//! KuCoin Futures REST API client.

use crate::config::KucoinConfig;
use crate::error::{BalanceError, TransportError};
use crate::exchange::retry::{AttemptError, RetryPolicy};
use crate::exchange::signer::RequestSigner;
use crate::exchange::traits::EquitySource;
use crate::exchange::types::*;
use async_trait::async_trait;
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

const ACCOUNT_OVERVIEW_PATH: &str = "/api/v1/account-overview";

/// KuCoin Futures API client, scoped to one settlement currency.
pub struct KucoinFuturesClient {
    http: Client,
    signer: RequestSigner,
    base_url: String,
    currency: String,
    retry: RetryPolicy,
}

impl KucoinFuturesClient {
    /// Create a new client from configuration.
    pub fn new(config: &KucoinConfig) -> Result<Self, BalanceError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(BalanceError::HttpClient)?;

        Ok(Self {
            http,
            signer: RequestSigner::new(config),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
            retry: RetryPolicy::new(config.max_retries, config.retry_wait()),
        })
    }

    /// Path and query of the account overview request, as signed.
    fn account_overview_endpoint(&self) -> String {
        format!(
            "{}?currency={}",
            ACCOUNT_OVERVIEW_PATH,
            urlencoding::encode(&self.currency)
        )
    }

    // ==================== Account (Authenticated) ====================

    /// Get the futures account overview, retrying transient failures.
    #[instrument(skip(self), fields(currency = %self.currency))]
    pub async fn get_account_overview(&self) -> Result<AccountOverview, BalanceError> {
        let endpoint = self.account_overview_endpoint();
        let url = format!("{}{}", self.base_url, endpoint);

        let overview = self
            .retry
            .run(|_attempt| self.get_signed(&url, &endpoint))
            .await?;

        debug!(equity = %overview.account_equity, "Fetched account overview");
        Ok(overview)
    }

    /// One signed GET. Headers are signed per attempt so retries carry a fresh timestamp.
    async fn get_signed(&self, url: &str, endpoint: &str) -> Result<AccountOverview, AttemptError> {
        let headers = self
            .signer
            .sign(&Method::GET, endpoint)
            .to_header_map()
            .map_err(|e| {
                AttemptError::Fatal(BalanceError::Config(format!(
                    "kucoin.api_key is not a valid HTTP header value: {}",
                    e
                )))
            })?;

        let response = self
            .http
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body }.into());
        }

        let body = response.text().await.map_err(TransportError::from)?;
        parse_account_overview(&body).map_err(AttemptError::Fatal)
    }
}

#[async_trait]
impl EquitySource for KucoinFuturesClient {
    async fn account_equity(&self) -> Result<Decimal, BalanceError> {
        Ok(self.get_account_overview().await?.account_equity)
    }
}

/// Validate the envelope and extract the overview.
fn parse_account_overview(body: &str) -> Result<AccountOverview, BalanceError> {
    let response: ApiResponse<AccountOverview> =
        serde_json::from_str(body).map_err(|e| BalanceError::Parse(e.to_string()))?;

    if let Some(code) = response.code {
        if code != SUCCESS_CODE {
            return Err(BalanceError::Api {
                code,
                msg: response.msg.unwrap_or_default(),
            });
        }
    }

    response
        .data
        .ok_or_else(|| BalanceError::Parse("response has no data object".to_string()))
}
