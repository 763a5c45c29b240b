//! CSV price history adapter.
//!
//! Reads one `<TICKER>.csv` per ticker in Yahoo export layout
//! (`Date,Open,High,Low,Close[,Adj Close],Volume`). Columns are found by
//! header name, rows may appear in any order, and rows Yahoo marks `null`
//! are skipped. Parsed series are cached per ticker.

use crate::domain::error::FolioError;
use crate::domain::price_period::PricePeriod;
use crate::domain::price_series::PriceSeries;
use crate::domain::resolution::Resolution;
use crate::ports::price_port::PricePort;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

pub struct CsvPriceAdapter {
    base_path: PathBuf,
    cache: Mutex<HashMap<String, PriceSeries>>,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord, file: &str) -> Result<Self, FolioError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| FolioError::Csv {
                file: file.to_string(),
                reason: format!("missing {name} column"),
            })
        };
        Ok(Columns {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
        })
    }
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}.csv"))
    }

    /// The full daily series for `ticker`, parsed once.
    pub fn load(&self, ticker: &str) -> Result<PriceSeries, FolioError> {
        let ticker = ticker.trim().to_uppercase();
        if let Some(series) = self.cache.lock().get(&ticker) {
            return Ok(series.clone());
        }
        let series = self.read_series(&ticker)?;
        self.cache.lock().insert(ticker, series.clone());
        Ok(series)
    }

    fn read_series(&self, ticker: &str) -> Result<PriceSeries, FolioError> {
        let path = self.csv_path(ticker);
        let file = path.display().to_string();
        let content = fs::read_to_string(&path).map_err(|e| FolioError::Csv {
            file: file.clone(),
            reason: format!("failed to read: {e}"),
        })?;

        let csv_err = |line: usize, reason: String| FolioError::Csv {
            file: file.clone(),
            reason: format!("line {line}: {reason}"),
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| csv_err(1, e.to_string()))?.clone();
        let cols = Columns::from_headers(&headers, &file)?;

        let mut periods = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let line = i + 2;
            let record = result.map_err(|e| csv_err(line, e.to_string()))?;
            let field = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .map(str::trim)
                    .ok_or_else(|| csv_err(line, format!("missing {name} value")))
            };

            let fields = [
                field(cols.open, "open")?,
                field(cols.high, "high")?,
                field(cols.low, "low")?,
                field(cols.close, "close")?,
            ];
            if fields.iter().any(|f| f.eq_ignore_ascii_case("null")) {
                tracing::debug!(%ticker, line, "skipping null price row");
                continue;
            }
            let [open, high, low, close] = fields.map(|f| {
                Decimal::from_str(f).or_else(|_| Decimal::from_scientific(f))
            });
            let price = |value: Result<Decimal, rust_decimal::Error>, name: &str| {
                value.map_err(|e| csv_err(line, format!("invalid {name} value: {e}")))
            };

            let date = NaiveDate::parse_from_str(field(cols.date, "date")?, "%Y-%m-%d")
                .map_err(|e| csv_err(line, format!("invalid date format: {e}")))?;
            let volume = match cols.volume {
                Some(idx) => match field(idx, "volume")? {
                    "" => None,
                    v => Some(
                        v.parse::<u64>()
                            .map_err(|e| csv_err(line, format!("invalid volume value: {e}")))?,
                    ),
                },
                None => None,
            };

            let at = date.and_time(chrono::NaiveTime::MIN);
            let period = PricePeriod::for_period(
                at,
                Resolution::Days,
                price(open, "open")?,
                price(high, "high")?,
                price(low, "low")?,
                price(close, "close")?,
                volume,
            )
            .map_err(|e| csv_err(line, e.to_string()))?;
            periods.push(period);
        }

        tracing::debug!(%ticker, rows = periods.len(), "loaded price history");
        PriceSeries::from_periods(ticker, Resolution::Days, periods)
    }
}

impl PricePort for CsvPriceAdapter {
    fn closing_price(&self, ticker: &str, at: NaiveDateTime) -> Result<Decimal, FolioError> {
        self.load(ticker)?
            .price_at(at)
            .ok_or_else(|| FolioError::NoPriceData {
                ticker: ticker.to_string(),
                at,
            })
    }

    fn price_series(
        &self,
        ticker: &str,
        head: NaiveDateTime,
        tail: NaiveDateTime,
        resolution: Resolution,
    ) -> Result<PriceSeries, FolioError> {
        let daily = self.load(ticker)?;
        let window = PriceSeries::from_periods(
            daily.ticker(),
            Resolution::Days,
            daily.periods_between(head, tail).iter().cloned(),
        )?;
        window.resize(resolution)
    }
}
