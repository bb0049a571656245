//! Front-matter blocks of balance notes.
//!
//! A note starts with a `---` line, holds a small YAML mapping, and closes
//! with another `---` line:
//!
//! ```text
//! ---
//! date: 2024-01-01
//! balance: 123.45
//! ---
//! ```
//!
//! Anything else in the file after the closing delimiter is ignored.

use crate::utils::decimal::{format_fixed, parse_decimal};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

const DELIMITER: &str = "---";
const BALANCE_KEY: &str = "balance";

/// Why a note could not be read as a balance record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrontMatterError {
    #[error("file does not start with a '---' front matter delimiter")]
    MissingOpening,
    #[error("front matter block is never closed with '---'")]
    Unclosed,
    #[error("front matter block is empty")]
    Empty,
    #[error("front matter is not valid YAML: {0}")]
    InvalidYaml(String),
    #[error("front matter is not a key/value mapping")]
    NotAMapping,
    #[error("front matter has no '{0}' field")]
    MissingField(&'static str),
    #[error("front matter field '{field}' is not a number: {value}")]
    NotNumeric { field: &'static str, value: String },
}

/// Extract the YAML mapping between the opening and closing delimiters.
pub fn parse(content: &str) -> Result<Mapping, FrontMatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.lines();

    match lines.next() {
        Some(first) if first.trim_end() == DELIMITER => {}
        _ => return Err(FrontMatterError::MissingOpening),
    }

    let mut body = Vec::new();
    let mut closed = false;
    for line in lines {
        if line.trim_end() == DELIMITER {
            closed = true;
            break;
        }
        body.push(line);
    }
    if !closed {
        return Err(FrontMatterError::Unclosed);
    }

    let body = body.join("\n");
    if body.trim().is_empty() {
        return Err(FrontMatterError::Empty);
    }

    match serde_yaml::from_str::<Value>(&body) {
        Ok(Value::Mapping(mapping)) => Ok(mapping),
        Ok(_) => Err(FrontMatterError::NotAMapping),
        Err(e) => Err(FrontMatterError::InvalidYaml(e.to_string())),
    }
}

/// Read the `balance` field of a parsed block. Numeric strings are accepted.
pub fn balance(mapping: &Mapping) -> Result<Decimal, FrontMatterError> {
    let value = mapping
        .get(BALANCE_KEY)
        .ok_or(FrontMatterError::MissingField(BALANCE_KEY))?;

    let parsed = match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    };

    parsed.ok_or_else(|| FrontMatterError::NotNumeric {
        field: BALANCE_KEY,
        value: render_value(value),
    })
}

/// Parse a whole note down to its balance.
pub fn parse_balance(content: &str) -> Result<Decimal, FrontMatterError> {
    balance(&parse(content)?)
}

/// Render a balance note.
pub fn render(date: NaiveDate, balance: Decimal) -> String {
    format!(
        "{delim}\ndate: {}\nbalance: {}\n{delim}\n",
        date.format("%Y-%m-%d"),
        format_fixed(balance, 2),
        delim = DELIMITER
    )
}

fn render_value(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| format!("{:?}", value))
}
