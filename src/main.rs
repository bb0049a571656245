//! KuCoin Balance Logger - Main Entry Point
//!
//! Meant to be run once a day from cron or a systemd timer.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use kucoin_balance_logger::config::{expand_home, resolve_target_date, Config, LoggingConfig};
use kucoin_balance_logger::exchange::KucoinFuturesClient;
use kucoin_balance_logger::persistence::{RecordStore, RunCache};
use kucoin_balance_logger::pipeline::{BalanceLogger, RunOutcome};
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_DIRECTIVES: &str = "info,kucoin_balance_logger=debug";

/// KuCoin Balance Logger CLI
#[derive(Parser)]
#[command(name = "kucoin-balance-logger")]
#[command(version, about = "Log KuCoin Futures equity to an Obsidian vault")]
struct Cli {
    /// Override date for backfill (YYYY-MM-DD)
    #[arg(long)]
    date: Option<String>,

    /// Override cache file location
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Configuration file (default: ./balance-logger.{toml,yaml,json} if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(cache_file) = &cli.cache_file {
        config.cache.file = expand_home(cache_file);
    }

    let _log_guard = init_logging(&config.logging)?;

    config.validate()?;
    let today = Local::now().date_naive();
    let date = resolve_target_date(cli.date.as_deref(), today)?;
    log_config(&config);

    let client = KucoinFuturesClient::new(&config.kucoin)?;
    let logger = BalanceLogger::new(
        client,
        RecordStore::from_config(&config.vault),
        RunCache::from_config(&config.cache),
    );

    match logger.run(today, date).await {
        Ok(RunOutcome::Logged(report)) => {
            debug!(path = %report.record_path.display(), "Run complete");
            Ok(())
        }
        Ok(RunOutcome::AlreadyLogged { .. }) => Ok(()),
        Err(e) => {
            error!("❌ Error: {}", e);
            Err(e.into())
        }
    }
}

/// Initialize logging to stdout, plus daily rolling files when a directory is configured.
///
/// The returned guard flushes the file writer on drop and must live until exit.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "balance-logger.log");
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            (BoxMakeWriter::new(std::io::stdout.and(file_writer)), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(rust_log.as_deref())?)
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(guard.is_none());

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(guard)
}

/// `RUST_LOG` when set, otherwise this crate at debug and everything else at info.
fn env_filter(rust_log: Option<&str>) -> Result<EnvFilter> {
    let directives = rust_log
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_LOG_DIRECTIVES);
    Ok(EnvFilter::try_new(directives)?)
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    info!("📋 Configuration:");
    info!("   Currency: {}", config.kucoin.currency);
    info!("   Notes: {}", config.vault.balance_dir().display());
    info!("   Cache: {}", config.cache.file.display());
    info!(
        "   Retries: {} (base wait {}s)",
        config.kucoin.max_retries, config.kucoin.retry_wait_secs
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_is_debug_for_crate() {
        let filter = env_filter(None).unwrap();
        let rendered = filter.to_string().to_lowercase();
        assert!(rendered.contains("kucoin_balance_logger=debug"));
        assert!(rendered.split(',').any(|d| d == "info"));

        assert_eq!(env_filter(Some("  ")).unwrap().to_string().to_lowercase(), rendered);
    }

    #[test]
    fn test_rust_log_is_not_overridden() {
        let filter = env_filter(Some("kucoin_balance_logger=warn")).unwrap();
        assert_eq!(filter.to_string().to_lowercase(), "kucoin_balance_logger=warn");
    }
}
