//! Type definitions for KuCoin Futures API responses.

use crate::utils::decimal::parse_decimal;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Success code returned in the `code` field of every KuCoin envelope.
pub const SUCCESS_CODE: &str = "200000";

/// Standard KuCoin response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

/// Futures account overview (`/api/v1/account-overview`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOverview {
    /// Total equity: margin balance plus unrealised PnL.
    #[serde(deserialize_with = "decimal_from_number_or_str")]
    pub account_equity: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    String(String),
}

/// KuCoin sends amounts as JSON numbers on some endpoints and strings on others.
fn decimal_from_number_or_str<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::String(s) => s,
    };
    parse_decimal(raw.trim())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid decimal amount '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_account_equity_as_number() {
        let body = r#"{"code":"200000","data":{"accountEquity":1234.5678,"currency":"USDT"}}"#;
        let parsed: ApiResponse<AccountOverview> = serde_json::from_str(body).unwrap();
        let data = parsed.data.unwrap();

        assert_eq!(parsed.code.as_deref(), Some(SUCCESS_CODE));
        assert_eq!(data.account_equity, dec!(1234.5678));
        assert_eq!(data.currency.as_deref(), Some("USDT"));
    }

    #[test]
    fn test_account_equity_as_string() {
        let body = r#"{"data":{"accountEquity":"123.45"}}"#;
        let parsed: ApiResponse<AccountOverview> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.unwrap().account_equity, dec!(123.45));
    }

    #[test]
    fn test_non_numeric_equity_is_rejected() {
        let body = r#"{"data":{"accountEquity":"lots"}}"#;
        assert!(serde_json::from_str::<ApiResponse<AccountOverview>>(body).is_err());

        let body = r#"{"data":{"accountEquity":null}}"#;
        assert!(serde_json::from_str::<ApiResponse<AccountOverview>>(body).is_err());
    }

    #[test]
    fn test_missing_data_is_none() {
        let body = r#"{"code":"400100","msg":"Invalid KC-API-KEY"}"#;
        let parsed: ApiResponse<AccountOverview> = serde_json::from_str(body).unwrap();
        assert!(parsed.data.is_none());
        assert_eq!(parsed.msg.as_deref(), Some("Invalid KC-API-KEY"));
    }
}
