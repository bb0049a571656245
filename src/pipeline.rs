//! Daily balance logging run.
//!
//! `already_logged` -> fetch equity -> read previous day -> write today ->
//! `mark_logged` -> report the change. A fetch failure aborts before anything
//! is written, so a note only ever holds a balance that was actually fetched.

use crate::error::BalanceError;
use crate::exchange::EquitySource;
use crate::persistence::{BalanceRecord, RecordStore, RunCache};
use crate::utils::decimal::{format_fixed, percent_change, round_to_precision};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Direction of the day-over-day change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
    Unchanged,
}

impl Direction {
    pub fn marker(&self) -> &'static str {
        match self {
            Direction::Increase => "📈",
            Direction::Decrease => "📉",
            Direction::Unchanged => "🔁",
        }
    }
}

/// Change between two consecutive daily balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub absolute: Decimal,
    /// Percent of the previous balance; zero when there is no previous balance.
    pub percent: Decimal,
    pub direction: Direction,
}

impl BalanceChange {
    /// Hand-edited notes may hold extreme values; the difference saturates.
    pub fn between(previous: Decimal, current: Decimal) -> Self {
        let absolute = current.saturating_sub(previous);
        let direction = match current.cmp(&previous) {
            Ordering::Greater => Direction::Increase,
            Ordering::Less => Direction::Decrease,
            Ordering::Equal => Direction::Unchanged,
        };

        Self {
            absolute,
            percent: percent_change(previous, current),
            direction,
        }
    }
}

impl fmt::Display for BalanceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Change since previous day: {}{} ({}{}%)",
            self.direction.marker(),
            sign(self.absolute),
            format_fixed(self.absolute, 2),
            sign(self.percent),
            format_fixed(round_to_precision(self.percent, 2), 2),
        )
    }
}

fn sign(value: Decimal) -> &'static str {
    if value.is_sign_negative() && !value.is_zero() {
        ""
    } else {
        "+"
    }
}

/// What a completed run recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub balance: Decimal,
    pub previous_balance: Decimal,
    pub change: BalanceChange,
    pub record_path: PathBuf,
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    AlreadyLogged { date: NaiveDate },
    Logged(DailyReport),
}

/// Wires the equity source to the vault notes and the run cache.
pub struct BalanceLogger<S> {
    source: S,
    records: RecordStore,
    cache: RunCache,
}

impl<S: EquitySource> BalanceLogger<S> {
    pub fn new(source: S, records: RecordStore, cache: RunCache) -> Self {
        Self {
            source,
            records,
            cache,
        }
    }

    /// Log the balance for `date`. Only `date == today` is deduplicated.
    #[instrument(skip_all, fields(%today, %date))]
    pub async fn run(&self, today: NaiveDate, date: NaiveDate) -> Result<RunOutcome, BalanceError> {
        if self.cache.already_logged(today, date)? {
            warn!("🟡 Already logged today, skipping.");
            return Ok(RunOutcome::AlreadyLogged { date });
        }

        let balance = self.source.account_equity().await?;
        let previous_balance = self.records.read_previous(date)?;
        let record_path = self.records.write(&BalanceRecord { date, balance })?;
        info!("✅ Logged balance for {}: {}", date, format_fixed(balance, 2));

        if let Err(e) = self.cache.mark_logged(today, date) {
            warn!(
                error = %e,
                "Balance note written but the run cache was not updated; the next run may log again"
            );
            return Err(e);
        }

        let change = BalanceChange::between(previous_balance, balance);
        info!("{}", change);

        Ok(RunOutcome::Logged(DailyReport {
            date,
            balance,
            previous_balance,
            change,
            record_path,
        }))
    }
}
