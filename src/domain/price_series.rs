//! Ordered, non-overlapping price history for one ticker.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::domain::calendar;
use crate::domain::error::FolioError;
use crate::domain::price_period::PricePeriod;
use crate::domain::resolution::Resolution;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawPriceSeries")
)]
pub struct PriceSeries {
    ticker: String,
    resolution: Resolution,
    periods: Vec<PricePeriod>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, resolution: Resolution) -> Self {
        PriceSeries {
            ticker: ticker.into(),
            resolution,
            periods: Vec::new(),
        }
    }

    /// Builds a series from periods in any order.
    pub fn from_periods(
        ticker: impl Into<String>,
        resolution: Resolution,
        periods: impl IntoIterator<Item = PricePeriod>,
    ) -> Result<Self, FolioError> {
        let mut series = Self::new(ticker, resolution);
        for period in periods {
            series.add_price_data(period)?;
        }
        Ok(series)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn periods(&self) -> &[PricePeriod] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Inserts a period, keeping the series sorted by head. The period must
    /// cover exactly one period of the series resolution and must not
    /// overlap any stored period.
    pub fn add_price_data(&mut self, period: PricePeriod) -> Result<(), FolioError> {
        if !period.spans(self.resolution) {
            return Err(FolioError::InvalidPeriod {
                head: period.head(),
                tail: period.tail(),
                reason: format!("not a single {} period", self.resolution),
            });
        }
        let idx = self.periods.partition_point(|p| p.head() < period.head());
        let clashes = |neighbour: Option<&PricePeriod>| neighbour.is_some_and(|n| n.overlaps(&period));
        if clashes(self.periods.get(idx)) || (idx > 0 && clashes(self.periods.get(idx - 1))) {
            return Err(FolioError::OverlappingPeriod {
                ticker: self.ticker.clone(),
                head: period.head(),
                tail: period.tail(),
            });
        }
        self.periods.insert(idx, period);
        Ok(())
    }

    fn first(&self) -> Result<&PricePeriod, FolioError> {
        self.periods.first().ok_or_else(|| self.empty())
    }

    fn last(&self) -> Result<&PricePeriod, FolioError> {
        self.periods.last().ok_or_else(|| self.empty())
    }

    fn empty(&self) -> FolioError {
        FolioError::EmptySeries {
            ticker: self.ticker.clone(),
        }
    }

    pub fn head(&self) -> Result<NaiveDateTime, FolioError> {
        self.first().map(PricePeriod::head)
    }

    pub fn tail(&self) -> Result<NaiveDateTime, FolioError> {
        self.last().map(PricePeriod::tail)
    }

    pub fn open(&self) -> Result<Decimal, FolioError> {
        self.first().map(PricePeriod::open)
    }

    pub fn close(&self) -> Result<Decimal, FolioError> {
        self.last().map(PricePeriod::close)
    }

    pub fn high(&self) -> Result<Decimal, FolioError> {
        self.periods
            .iter()
            .map(PricePeriod::high)
            .max()
            .ok_or_else(|| self.empty())
    }

    pub fn low(&self) -> Result<Decimal, FolioError> {
        self.periods
            .iter()
            .map(PricePeriod::low)
            .min()
            .ok_or_else(|| self.empty())
    }

    /// Total volume, or `None` when no period reports volume.
    pub fn volume(&self) -> Option<u64> {
        sum_volume(&self.periods)
    }

    /// Close of the latest period whose head is at or before `at`.
    pub fn price_at(&self, at: NaiveDateTime) -> Option<Decimal> {
        let idx = self.periods.partition_point(|p| p.head() <= at);
        idx.checked_sub(1).map(|i| self.periods[i].close())
    }

    /// Periods lying entirely within `[head, tail]`.
    pub fn periods_between(&self, head: NaiveDateTime, tail: NaiveDateTime) -> &[PricePeriod] {
        let start = self.periods.partition_point(|p| p.head() < head);
        let end = self.periods.partition_point(|p| p.tail() <= tail);
        if start >= end {
            return &[];
        }
        &self.periods[start..end]
    }

    /// Rolls the series up into coarser periods. Resampling to a finer
    /// resolution, or to one the stored periods do not nest within
    /// (weeks into months), fails.
    pub fn resize(&self, target: Resolution) -> Result<PriceSeries, FolioError> {
        if !self.resolution.nests_within(target) {
            return Err(FolioError::Resample {
                from: self.resolution,
                to: target,
            });
        }
        if target == self.resolution {
            return Ok(self.clone());
        }

        let mut resized = PriceSeries::new(self.ticker.clone(), target);
        let mut group: Vec<&PricePeriod> = Vec::new();
        for period in &self.periods {
            let same_bucket = group.first().is_some_and(|g| {
                calendar::current_period_open(g.head(), target)
                    == calendar::current_period_open(period.head(), target)
            });
            if !same_bucket && !group.is_empty() {
                resized.periods.push(merge(&group, target)?);
                group.clear();
            }
            group.push(period);
        }
        if !group.is_empty() {
            resized.periods.push(merge(&group, target)?);
        }
        tracing::debug!(
            ticker = %self.ticker,
            from = %self.resolution,
            to = %target,
            before = self.periods.len(),
            after = resized.periods.len(),
            "resized price series"
        );
        Ok(resized)
    }
}

/// `None` when no period reports volume; saturates at `u64::MAX`.
fn sum_volume<'a>(periods: impl IntoIterator<Item = &'a PricePeriod>) -> Option<u64> {
    periods
        .into_iter()
        .filter_map(PricePeriod::volume)
        .fold(None, |acc, v| Some(acc.unwrap_or(0).saturating_add(v)))
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawPriceSeries {
    ticker: String,
    resolution: Resolution,
    periods: Vec<PricePeriod>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawPriceSeries> for PriceSeries {
    type Error = FolioError;

    fn try_from(raw: RawPriceSeries) -> Result<Self, Self::Error> {
        PriceSeries::from_periods(raw.ticker, raw.resolution, raw.periods)
    }
}

fn merge(group: &[&PricePeriod], target: Resolution) -> Result<PricePeriod, FolioError> {
    let (first, last) = match (group.first(), group.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(FolioError::operation("cannot merge an empty group")),
    };
    let high = group.iter().map(|p| p.high()).max().unwrap_or(first.high());
    let low = group.iter().map(|p| p.low()).min().unwrap_or(first.low());
    PricePeriod::for_period(
        first.head(),
        target,
        first.open(),
        high,
        low,
        last.close(),
        sum_volume(group.iter().copied()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;

    fn day(m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2011, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn daily(m: u32, d: u32, close: Decimal) -> PricePeriod {
        PricePeriod::for_period(
            day(m, d),
            Resolution::Days,
            close - dec!(1),
            close + dec!(2),
            close - dec!(2),
            close,
            Some(100),
        )
        .unwrap()
    }

    fn july_week() -> PriceSeries {
        // Monday 25th .. Friday 29th
        PriceSeries::from_periods(
            "DE",
            Resolution::Days,
            (25..=29).map(|d| daily(7, d, Decimal::from(50 + d))),
        )
        .unwrap()
    }

    #[test]
    fn rollups() {
        let s = july_week();
        assert_eq!(s.len(), 5);
        assert_eq!(s.head().unwrap(), day(7, 25));
        assert_eq!(s.tail().unwrap(), day(7, 30) - calendar::tick());
        assert_eq!(s.open().unwrap(), dec!(74));
        assert_eq!(s.close().unwrap(), dec!(79));
        assert_eq!(s.high().unwrap(), dec!(81));
        assert_eq!(s.low().unwrap(), dec!(73));
        assert_eq!(s.volume(), Some(500));
    }

    #[test]
    fn periods_kept_sorted() {
        let s = PriceSeries::from_periods(
            "DE",
            Resolution::Days,
            vec![daily(7, 27, dec!(3)), daily(7, 25, dec!(1)), daily(7, 26, dec!(2))],
        )
        .unwrap();
        let heads: Vec<_> = s.periods().iter().map(|p| p.head()).collect();
        assert_eq!(heads, vec![day(7, 25), day(7, 26), day(7, 27)]);
    }

    #[test]
    fn overlapping_period_rejected() {
        let mut s = july_week();
        let err = s.add_price_data(daily(7, 27, dec!(9))).unwrap_err();
        assert!(matches!(err, FolioError::OverlappingPeriod { .. }));
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn period_of_wrong_resolution_rejected() {
        let mut s = PriceSeries::new("DE", Resolution::Days);
        let weekly = PricePeriod::for_period(
            day(7, 25),
            Resolution::Weeks,
            dec!(1),
            dec!(1),
            dec!(1),
            dec!(1),
            None,
        )
        .unwrap();
        assert!(matches!(
            s.add_price_data(weekly),
            Err(FolioError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn empty_series_has_no_head() {
        let s = PriceSeries::new("DE", Resolution::Days);
        assert!(matches!(s.head(), Err(FolioError::EmptySeries { .. })));
        assert!(s.tail().is_err());
        assert!(s.open().is_err());
        assert!(s.high().is_err());
        assert_eq!(s.volume(), None);
    }

    #[test]
    fn daily_to_weekly() {
        let mut s = july_week();
        s.add_price_data(daily(8, 1, dec!(90))).unwrap();
        let weekly = s.resize(Resolution::Weeks).unwrap();

        assert_eq!(weekly.resolution(), Resolution::Weeks);
        assert_eq!(weekly.len(), 2);
        let first = &weekly.periods()[0];
        assert_eq!(first.head(), day(7, 25));
        assert_eq!(first.tail(), day(8, 1) - calendar::tick());
        assert_eq!(first.open(), dec!(74));
        assert_eq!(first.close(), dec!(79));
        assert_eq!(first.high(), dec!(81));
        assert_eq!(first.low(), dec!(73));
        assert_eq!(first.volume(), Some(500));
        assert_eq!(weekly.periods()[1].close(), dec!(90));
    }

    #[test]
    fn daily_to_monthly_splits_on_month_boundary() {
        let mut s = july_week();
        s.add_price_data(daily(8, 1, dec!(90))).unwrap();
        let monthly = s.resize(Resolution::Months).unwrap();
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly.periods()[0].head(), day(7, 1));
        assert_eq!(monthly.periods()[0].tail(), day(8, 1) - calendar::tick());
        assert_eq!(monthly.periods()[1].head(), day(8, 1));
        assert_eq!(monthly.periods()[1].tail(), day(9, 1) - calendar::tick());
    }

    #[test]
    fn rollups_survive_resize() {
        let s = july_week();
        let weekly = s.resize(Resolution::Weeks).unwrap();
        assert_eq!(weekly.open().unwrap(), s.open().unwrap());
        assert_eq!(weekly.close().unwrap(), s.close().unwrap());
        assert_eq!(weekly.high().unwrap(), s.high().unwrap());
        assert_eq!(weekly.low().unwrap(), s.low().unwrap());
        assert_eq!(weekly.volume(), s.volume());
    }

    #[test]
    fn finer_resize_fails() {
        let weekly = july_week().resize(Resolution::Weeks).unwrap();
        let err = weekly.resize(Resolution::Days).unwrap_err();
        assert!(matches!(
            err,
            FolioError::Resample {
                from: Resolution::Weeks,
                to: Resolution::Days
            }
        ));
    }

    #[test]
    fn weeks_cannot_become_months() {
        let weekly = july_week().resize(Resolution::Weeks).unwrap();
        assert!(weekly.resize(Resolution::Months).is_err());
    }

    #[test]
    fn price_at_uses_latest_known_close() {
        let s = july_week();
        assert_eq!(s.price_at(day(7, 24)), None);
        assert_eq!(s.price_at(day(7, 25) + Duration::hours(12)), Some(dec!(75)));
        assert_eq!(s.price_at(day(7, 31)), Some(dec!(79)));
    }

    #[test]
    fn periods_between_is_inclusive() {
        let s = july_week();
        let slice = s.periods_between(day(7, 26), day(7, 29) - calendar::tick());
        assert_eq!(slice.len(), 3);
        assert!(s.periods_between(day(7, 1), day(7, 2)).is_empty());
    }

    #[test]
    fn extreme_volumes_saturate() {
        let huge = |d| {
            PricePeriod::for_period(day(7, d), Resolution::Days, dec!(1), dec!(1), dec!(1), dec!(1), Some(u64::MAX))
                .unwrap()
        };
        let s = PriceSeries::from_periods("DE", Resolution::Days, [huge(25), huge(26)]).unwrap();
        assert_eq!(s.volume(), Some(u64::MAX));
        let weekly = s.resize(Resolution::Weeks).unwrap();
        assert_eq!(weekly.periods()[0].volume(), Some(u64::MAX));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let s = july_week();
        let json = serde_json::to_string(&s).unwrap();
        let back: PriceSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn overlapping_series_json_rejected() {
        let s = july_week();
        let mut value = serde_json::to_value(&s).unwrap();
        let periods = value["periods"].as_array_mut().unwrap();
        let first = periods[0].clone();
        periods.push(first);
        assert!(serde_json::from_value::<PriceSeries>(value).is_err());
    }
}
