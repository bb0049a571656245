//! Per-day balance notes inside the vault.

use crate::config::VaultConfig;
use crate::error::BalanceError;
use crate::persistence::{front_matter, write_atomic};
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One day's recorded equity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceRecord {
    pub date: NaiveDate,
    pub balance: Decimal,
}

/// Result of looking up a note without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLookup {
    Found(Decimal),
    Missing,
    Malformed(String),
}

/// Reads and writes `<vault>/<balance_folder>/<YYYY-MM-DD>.<ext>`.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
    extension: String,
}

impl RecordStore {
    pub fn new<P: AsRef<Path>>(dir: P, extension: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(config.balance_dir(), &config.extension)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the note for `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}.{}", date.format("%Y-%m-%d"), self.extension))
    }

    /// Write (or overwrite) the note for `record.date`. Returns the path written.
    pub fn write(&self, record: &BalanceRecord) -> Result<PathBuf, BalanceError> {
        let path = self.path_for(record.date);
        let content = front_matter::render(record.date, record.balance);

        write_atomic(&path, content.as_bytes()).map_err(|source| BalanceError::RecordIo {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), balance = %record.balance, "Balance note written");
        Ok(path)
    }

    /// Look up the note for `date` without touching the store.
    pub fn lookup(&self, date: NaiveDate) -> Result<RecordLookup, BalanceError> {
        let path = self.path_for(date);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RecordLookup::Missing),
            // Not UTF-8 text: as unusable as a broken front matter block.
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Ok(RecordLookup::Malformed(e.to_string()))
            }
            Err(source) => return Err(BalanceError::RecordIo { path, source }),
        };

        Ok(match front_matter::parse_balance(&content) {
            Ok(balance) => RecordLookup::Found(balance),
            Err(e) => RecordLookup::Malformed(e.to_string()),
        })
    }

    /// Balance recorded for `date`.
    ///
    /// A missing note is created as a `0.00` placeholder. A malformed note is
    /// left untouched and read as zero.
    pub fn read(&self, date: NaiveDate) -> Result<Decimal, BalanceError> {
        match self.lookup(date)? {
            RecordLookup::Found(balance) => Ok(balance),
            RecordLookup::Missing => {
                info!("🆕 No data for {}, creating placeholder.", date);
                self.write(&BalanceRecord {
                    date,
                    balance: Decimal::ZERO,
                })?;
                Ok(Decimal::ZERO)
            }
            RecordLookup::Malformed(reason) => {
                warn!(
                    path = %self.path_for(date).display(),
                    %reason,
                    "Failed to parse balance note, using 0.00"
                );
                Ok(Decimal::ZERO)
            }
        }
    }

    /// Balance recorded for the day before `date`.
    pub fn read_previous(&self, date: NaiveDate) -> Result<Decimal, BalanceError> {
        let previous = date
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| BalanceError::Config(format!("no calendar day before {}", date)))?;
        self.read(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn store(dir: &Path) -> RecordStore {
        RecordStore::new(dir.join("Trading/Balances/KuCoin"), "md")
    }

    #[test]
    fn test_path_layout() {
        let store = RecordStore::new("/vault/Trading", ".md");
        assert_eq!(
            store.path_for(date("2024-01-05")),
            PathBuf::from("/vault/Trading/2024-01-05.md")
        );
    }

    #[test]
    fn test_from_config() {
        let config = VaultConfig {
            path: PathBuf::from("/vault"),
            balance_folder: "Money".to_string(),
            extension: "txt".to_string(),
        };
        let store = RecordStore::from_config(&config);
        assert_eq!(store.dir(), Path::new("/vault/Money"));
        assert_eq!(
            store.path_for(date("2024-01-01")),
            PathBuf::from("/vault/Money/2024-01-01.txt")
        );
    }

    #[test]
    fn test_write_then_read_previous_day() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let path = store
            .write(&BalanceRecord {
                date: date("2024-01-01"),
                balance: dec!(123.45),
            })
            .unwrap();

        assert!(fs::read_to_string(&path).unwrap().contains("balance: 123.45"));
        assert_eq!(store.read_previous(date("2024-01-02")).unwrap(), dec!(123.45));
    }

    #[test]
    fn test_rewrite_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let day = date("2024-01-01");

        store.write(&BalanceRecord { date: day, balance: dec!(1) }).unwrap();
        store.write(&BalanceRecord { date: day, balance: dec!(2) }).unwrap();

        assert_eq!(store.lookup(day).unwrap(), RecordLookup::Found(dec!(2)));
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_history_creates_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        assert_eq!(store.lookup(date("2024-01-01")).unwrap(), RecordLookup::Missing);
        assert_eq!(store.read_previous(date("2024-01-02")).unwrap(), Decimal::ZERO);

        let placeholder = store.path_for(date("2024-01-01"));
        assert!(placeholder.exists());
        assert_eq!(
            fs::read_to_string(placeholder).unwrap(),
            "---\ndate: 2024-01-01\nbalance: 0.00\n---\n"
        );
    }

    #[test]
    fn test_malformed_notes_read_as_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        fs::create_dir_all(store.dir()).unwrap();

        let cases = [
            ("2024-02-01", "---\ndate: 2024-02-01\nbalance: 50.00\n"),
            ("2024-02-02", "---\nbalance: [unterminated\n---\n"),
            ("2024-02-03", "balance: 50.00\n"),
            ("2024-02-04", "---\nbalance: plenty\n---\n"),
        ];

        for (day, content) in cases {
            let path = store.path_for(date(day));
            fs::write(&path, content).unwrap();

            assert!(matches!(
                store.lookup(date(day)).unwrap(),
                RecordLookup::Malformed(_)
            ));
            assert_eq!(store.read(date(day)).unwrap(), Decimal::ZERO);
            // The hand-edited note is not replaced.
            assert_eq!(fs::read_to_string(&path).unwrap(), content);
        }
    }

    #[test]
    fn test_non_utf8_note_reads_as_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path_for(date("2024-03-01")), [0xff, 0xfe, 0x00]).unwrap();

        assert_eq!(store.read(date("2024-03-01")).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_read_previous_at_start_of_year() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        store
            .write(&BalanceRecord {
                date: date("2023-12-31"),
                balance: dec!(7.5),
            })
            .unwrap();
        assert_eq!(store.read_previous(date("2024-01-01")).unwrap(), dec!(7.5));
    }
}
