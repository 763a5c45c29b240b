#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use folio::domain::error::FolioError;
use folio::domain::price_period::PricePeriod;
use folio::domain::price_series::PriceSeries;
use folio::domain::resolution::Resolution;
use folio::ports::price_port::PricePort;
use rust_decimal::Decimal;
use std::collections::HashMap;

pub struct MockPricePort {
    pub series: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    /// Daily closes, one per `(date, close)` pair, with open = high = low = close.
    pub fn with_closes(mut self, ticker: &str, closes: &[(&str, Decimal)]) -> Self {
        let periods = closes
            .iter()
            .map(|(d, c)| make_period(d, *c))
            .collect::<Vec<_>>();
        let series = PriceSeries::from_periods(ticker, Resolution::Days, periods).unwrap();
        self.series.insert(ticker.to_string(), series);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    fn lookup(&self, ticker: &str) -> Result<&PriceSeries, FolioError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(FolioError::Csv {
                file: format!("{ticker}.csv"),
                reason: reason.clone(),
            });
        }
        self.series.get(ticker).ok_or_else(|| FolioError::NoPriceData {
            ticker: ticker.to_string(),
            at: NaiveDateTime::MIN,
        })
    }
}

impl PricePort for MockPricePort {
    fn closing_price(&self, ticker: &str, at: NaiveDateTime) -> Result<Decimal, FolioError> {
        self.lookup(ticker)?
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
        let series = self.lookup(ticker)?;
        PriceSeries::from_periods(
            ticker,
            series.resolution(),
            series.periods_between(head, tail).iter().cloned(),
        )?
        .resize(resolution)
    }
}

pub fn date(s: &str) -> NaiveDateTime {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_period(d: &str, close: Decimal) -> PricePeriod {
    PricePeriod::for_period(date(d), Resolution::Days, close, close, close, close, Some(1000))
        .unwrap()
}

pub fn end_of_time() -> NaiveDateTime {
    NaiveDateTime::MAX
}
