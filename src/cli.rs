//! CLI definition and dispatch.

use chrono::{NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_price_adapter::CsvPriceAdapter;
use crate::adapters::csv_transaction_adapter::{CsvTransactionAdapter, parse_timestamp};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::calendar;
use crate::domain::config_validation::{PRICES_SECTION, SECTION, validate_portfolio_config};
use crate::domain::error::FolioError;
use crate::domain::portfolio::{DEFAULT_CASH_TICKER, Portfolio};
use crate::domain::resolution::Resolution;
use crate::domain::transaction::Transaction;
use crate::ports::config_port::ConfigPort;
use crate::ports::transaction_port::TransactionPort;

#[derive(Parser, Debug)]
#[command(name = "folio", about = "Portfolio accounting over brokerage history")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List matched holdings, most recently closed first
    Holdings {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Print the cash balance
    Balance {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Print profit and return per position and for the portfolio
    Returns {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Print cash plus open positions marked to market
    Value {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Print successive period boundaries
    Periods {
        #[arg(long)]
        at: String,
        #[arg(short, long, default_value = "days")]
        resolution: String,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
        #[arg(long)]
        trading: bool,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Holdings { config, as_of } => run_holdings(&config, as_of.as_deref()),
        Command::Balance { config, as_of } => run_balance(&config, as_of.as_deref()),
        Command::Returns { config, as_of } => run_returns(&config, as_of.as_deref()),
        Command::Value { config, as_of } => run_value(&config, as_of.as_deref()),
        Command::Periods {
            at,
            resolution,
            count,
            trading,
        } => run_periods(&at, &resolution, count, trading),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FolioError> {
    tracing::info!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_portfolio_config(&adapter)?;
    Ok(adapter)
}

/// Relative paths in a config file are relative to the file itself.
pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let value = Path::new(value.trim());
    if value.is_absolute() {
        return value.to_path_buf();
    }
    config_path
        .parent()
        .map(|dir| dir.join(value))
        .unwrap_or_else(|| value.to_path_buf())
}

/// The `--as-of` flag, else `[portfolio] as_of`, as the last instant of
/// that day. With neither, everything recorded counts.
pub fn resolve_as_of(
    flag: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<NaiveDateTime, FolioError> {
    if let Some(raw) = flag {
        let at = parse_timestamp(raw)
            .ok_or_else(|| FolioError::invalid("as of", format!("cannot parse {raw:?}")))?;
        return Ok(calendar::current_period_close(at, Resolution::Days));
    }
    Ok(config
        .get_date(SECTION, "as_of")
        .map(|d| calendar::current_period_close(d.and_time(NaiveTime::MIN), Resolution::Days))
        .unwrap_or(NaiveDateTime::MAX))
}

pub fn build_portfolio(
    config_path: &Path,
    config: &dyn ConfigPort,
) -> Result<Portfolio, FolioError> {
    let cash_ticker = config
        .get_string(SECTION, "cash_ticker")
        .unwrap_or_else(|| DEFAULT_CASH_TICKER.to_string());
    let history = config
        .get_string(SECTION, "transactions")
        .ok_or_else(|| FolioError::ConfigMissing {
            section: SECTION.to_string(),
            key: "transactions".to_string(),
        })?;
    let mut transactions =
        CsvTransactionAdapter::new(resolve_path(config_path, &history)).load_transactions()?;

    let opening_cash = config.get_decimal(SECTION, "opening_cash", Decimal::ZERO);
    let first = transactions.iter().map(Transaction::settlement).min();
    if let Some(first) = first.filter(|_| opening_cash > Decimal::ZERO) {
        transactions.push(Transaction::deposit(first, opening_cash)?);
    }

    let mut portfolio = Portfolio::new(&cash_ticker)?;
    let rejected = portfolio.add_all(transactions);
    let strict = config.get_bool(SECTION, "strict", true);
    if let Some((_, err)) = rejected.into_iter().next().filter(|_| strict) {
        return Err(err);
    }
    tracing::info!(
        positions = portfolio.positions().count(),
        cash_entries = portfolio.cash().len(),
        "built portfolio"
    );
    Ok(portfolio)
}

fn load_portfolio(
    config_path: &Path,
    as_of: Option<&str>,
) -> Result<(FileConfigAdapter, Portfolio, NaiveDateTime), FolioError> {
    let config = load_config(config_path)?;
    let as_of = resolve_as_of(as_of, &config)?;
    let portfolio = build_portfolio(config_path, &config)?;
    Ok((config, portfolio, as_of))
}

fn run_holdings(config_path: &Path, as_of: Option<&str>) -> Result<(), FolioError> {
    let (_, portfolio, as_of) = load_portfolio(config_path, as_of)?;
    let holdings = portfolio.holdings(as_of)?;
    println!("ticker\tside\tshares\topened\tclosed\topen\tclose\tgross");
    for h in &holdings {
        println!(
            "{}\t{:?}\t{}\t{}\t{}\t{}\t{}\t{}",
            h.ticker,
            h.side,
            h.shares,
            h.head.date(),
            h.tail.date(),
            h.open_price,
            h.close_price,
            h.gross_profit()
        );
    }
    Ok(())
}

fn run_balance(config_path: &Path, as_of: Option<&str>) -> Result<(), FolioError> {
    let (_, portfolio, as_of) = load_portfolio(config_path, as_of)?;
    println!("{}", portfolio.cash_balance(as_of));
    Ok(())
}

fn run_returns(config_path: &Path, as_of: Option<&str>) -> Result<(), FolioError> {
    let (_, portfolio, as_of) = load_portfolio(config_path, as_of)?;
    println!("ticker\tnet_profit\tnet_return\tannual_return");
    for p in portfolio.positions() {
        println!(
            "{}\t{}\t{}\t{}",
            p.ticker(),
            p.net_profit(as_of)?.round_dp(2),
            p.net_return(as_of)?.round_dp(4),
            p.average_annual_return(as_of)?.round_dp(4)
        );
    }
    println!(
        "TOTAL\t{}\t{}\t{}",
        portfolio.net_profit(as_of)?.round_dp(2),
        portfolio.net_return(as_of)?.round_dp(4),
        portfolio.average_annual_return(as_of)?.round_dp(4)
    );
    Ok(())
}

fn run_value(config_path: &Path, as_of: Option<&str>) -> Result<(), FolioError> {
    let (config, portfolio, as_of) = load_portfolio(config_path, as_of)?;
    let directory = config
        .get_string(PRICES_SECTION, "directory")
        .ok_or_else(|| FolioError::ConfigMissing {
            section: PRICES_SECTION.to_string(),
            key: "directory".to_string(),
        })?;
    let prices = CsvPriceAdapter::new(resolve_path(config_path, &directory));
    println!("{}", portfolio.market_value(as_of, &prices)?.round_dp(2));
    Ok(())
}

fn run_periods(at: &str, resolution: &str, count: u32, trading: bool) -> Result<(), FolioError> {
    let at = parse_timestamp(at)
        .ok_or_else(|| FolioError::invalid("at", format!("cannot parse {at:?}")))?;
    let resolution: Resolution = resolution.parse()?;
    for line in period_lines(at, resolution, count, trading) {
        println!("{line}");
    }
    Ok(())
}

/// `count` successive periods starting with the one containing `at`, one
/// `open<TAB>close` line each.
pub fn period_lines(
    at: NaiveDateTime,
    resolution: Resolution,
    count: u32,
    trading: bool,
) -> Vec<String> {
    (0..i64::from(count))
        .map(|n| {
            let open = if trading {
                calendar::seek_trading_periods(at, n, resolution)
            } else {
                calendar::seek_periods(at, n, resolution)
            };
            let close = calendar::current_period_close(open, resolution);
            format!("{open}\t{close}")
        })
        .collect()
}
