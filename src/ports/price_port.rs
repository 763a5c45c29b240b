//! Historical price access port trait.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::domain::error::FolioError;
use crate::domain::price_series::PriceSeries;
use crate::domain::resolution::Resolution;

pub trait PricePort {
    /// Close of the latest period whose head is at or before `at`.
    fn closing_price(&self, ticker: &str, at: NaiveDateTime) -> Result<Decimal, FolioError>;

    /// Periods between `head` and `tail`, resampled to `resolution`.
    fn price_series(
        &self,
        ticker: &str,
        head: NaiveDateTime,
        tail: NaiveDateTime,
        resolution: Resolution,
    ) -> Result<PriceSeries, FolioError>;
}
