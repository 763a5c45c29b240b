//! OHLCV price data over a single period.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::domain::calendar;
use crate::domain::error::FolioError;
use crate::domain::resolution::Resolution;

/// Immutable OHLCV summary of one period. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawPricePeriod")
)]
pub struct PricePeriod {
    head: NaiveDateTime,
    tail: NaiveDateTime,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Option<u64>,
}

impl PricePeriod {
    /// Requires `head <= tail`, non-negative prices and
    /// `low <= open, close <= high`.
    pub fn new(
        head: NaiveDateTime,
        tail: NaiveDateTime,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Option<u64>,
    ) -> Result<Self, FolioError> {
        if head > tail {
            return Err(FolioError::InvalidPeriod {
                head,
                tail,
                reason: "head is after tail".into(),
            });
        }
        if low < Decimal::ZERO {
            return Err(FolioError::InvalidPeriod {
                head,
                tail,
                reason: format!("negative low price {low}"),
            });
        }
        if low > high || open < low || open > high || close < low || close > high {
            return Err(FolioError::InvalidPeriod {
                head,
                tail,
                reason: format!("inconsistent prices o={open} h={high} l={low} c={close}"),
            });
        }
        Ok(PricePeriod {
            head,
            tail,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Builds a period spanning exactly the `resolution` period containing `at`.
    pub fn for_period(
        at: NaiveDateTime,
        resolution: Resolution,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Option<u64>,
    ) -> Result<Self, FolioError> {
        Self::new(
            calendar::current_period_open(at, resolution),
            calendar::current_period_close(at, resolution),
            open,
            high,
            low,
            close,
            volume,
        )
    }

    pub fn head(&self) -> NaiveDateTime {
        self.head
    }

    pub fn tail(&self) -> NaiveDateTime {
        self.tail
    }

    pub fn open(&self) -> Decimal {
        self.open
    }

    pub fn high(&self) -> Decimal {
        self.high
    }

    pub fn low(&self) -> Decimal {
        self.low
    }

    pub fn close(&self) -> Decimal {
        self.close
    }

    pub fn volume(&self) -> Option<u64> {
        self.volume
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.head <= t && t <= self.tail
    }

    pub fn overlaps(&self, other: &PricePeriod) -> bool {
        self.head <= other.tail && other.head <= self.tail
    }

    /// Whether this period covers exactly one `resolution` period.
    pub fn spans(&self, resolution: Resolution) -> bool {
        self.head == calendar::current_period_open(self.head, resolution)
            && self.tail == calendar::current_period_close(self.head, resolution)
    }
}

/// A single trade print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawTick")
)]
pub struct Tick {
    pub time: NaiveDateTime,
    pub price: Decimal,
    pub volume: u64,
}

impl Tick {
    pub fn new(time: NaiveDateTime, price: Decimal, volume: u64) -> Result<Self, FolioError> {
        if price < Decimal::ZERO {
            return Err(FolioError::invalid("tick price", format!("{price} is negative")));
        }
        Ok(Tick {
            time,
            price,
            volume,
        })
    }
}

/// Snapshot delivered after every accepted tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUpdate {
    pub tick: Tick,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

type Observer = Box<dyn FnMut(&PriceUpdate) + Send>;

/// A period built up tick by tick. Open/high/low/close/volume are recomputed
/// on every append and each append is reported to subscribers in order.
pub struct TickedPricePeriod {
    head: NaiveDateTime,
    tail: NaiveDateTime,
    ticks: Vec<Tick>,
    observers: Vec<Observer>,
}

impl std::fmt::Debug for TickedPricePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickedPricePeriod")
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("ticks", &self.ticks)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl TickedPricePeriod {
    pub fn new(head: NaiveDateTime, tail: NaiveDateTime) -> Result<Self, FolioError> {
        if head > tail {
            return Err(FolioError::InvalidPeriod {
                head,
                tail,
                reason: "head is after tail".into(),
            });
        }
        Ok(TickedPricePeriod {
            head,
            tail,
            ticks: Vec::new(),
            observers: Vec::new(),
        })
    }

    pub fn for_period(at: NaiveDateTime, resolution: Resolution) -> Result<Self, FolioError> {
        Self::new(
            calendar::current_period_open(at, resolution),
            calendar::current_period_close(at, resolution),
        )
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&PriceUpdate) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Records a tick and notifies subscribers. Ticks may arrive out of
    /// order; they are kept sorted by time (stable for equal times).
    pub fn add_tick(&mut self, tick: Tick) -> Result<PriceUpdate, FolioError> {
        if tick.time < self.head || tick.time > self.tail {
            return Err(FolioError::operation(format!(
                "tick at {} falls outside {} .. {}",
                tick.time, self.head, self.tail
            )));
        }
        let idx = self.ticks.partition_point(|t| t.time <= tick.time);
        self.ticks.insert(idx, tick);

        let update = PriceUpdate {
            tick,
            open: self.open()?,
            high: self.high()?,
            low: self.low()?,
            close: self.close()?,
            volume: self.volume(),
        };
        for observer in &mut self.observers {
            observer(&update);
        }
        Ok(update)
    }

    pub fn head(&self) -> NaiveDateTime {
        self.head
    }

    pub fn tail(&self) -> NaiveDateTime {
        self.tail
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    fn no_ticks(&self) -> FolioError {
        FolioError::operation(format!(
            "no ticks recorded for {} .. {}",
            self.head, self.tail
        ))
    }

    pub fn open(&self) -> Result<Decimal, FolioError> {
        self.ticks.first().map(|t| t.price).ok_or_else(|| self.no_ticks())
    }

    pub fn close(&self) -> Result<Decimal, FolioError> {
        self.ticks.last().map(|t| t.price).ok_or_else(|| self.no_ticks())
    }

    pub fn high(&self) -> Result<Decimal, FolioError> {
        self.ticks
            .iter()
            .map(|t| t.price)
            .max()
            .ok_or_else(|| self.no_ticks())
    }

    pub fn low(&self) -> Result<Decimal, FolioError> {
        self.ticks
            .iter()
            .map(|t| t.price)
            .min()
            .ok_or_else(|| self.no_ticks())
    }

    /// Saturates at `u64::MAX`.
    pub fn volume(&self) -> u64 {
        self.ticks
            .iter()
            .fold(0u64, |acc, t| acc.saturating_add(t.volume))
    }

    /// Freezes the accumulated ticks into an immutable [`PricePeriod`].
    pub fn to_price_period(&self) -> Result<PricePeriod, FolioError> {
        PricePeriod::new(
            self.head,
            self.tail,
            self.open()?,
            self.high()?,
            self.low()?,
            self.close()?,
            Some(self.volume()),
        )
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawPricePeriod {
    head: NaiveDateTime,
    tail: NaiveDateTime,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Option<u64>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawPricePeriod> for PricePeriod {
    type Error = FolioError;

    fn try_from(raw: RawPricePeriod) -> Result<Self, Self::Error> {
        PricePeriod::new(
            raw.head, raw.tail, raw.open, raw.high, raw.low, raw.close, raw.volume,
        )
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawTick {
    time: NaiveDateTime,
    price: Decimal,
    volume: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawTick> for Tick {
    type Error = FolioError;

    fn try_from(raw: RawTick) -> Result<Self, Self::Error> {
        Tick::new(raw.time, raw.price, raw.volume)
    }
}
