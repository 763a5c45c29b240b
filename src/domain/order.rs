//! Pending brokerage orders and their fill rules.
//!
//! An order is a request to trade shares under a pricing constraint for a
//! window of time. Filling it produces the [`Transaction`] the broker would
//! report.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::error::FolioError;
use super::order_type::{Flow, OrderType};
use super::transaction::Transaction;

const MARKET: u8 = 1;
const LIMIT: u8 = 2;
const STOP: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PricingType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl PricingType {
    /// Decode the broker flag encoding. Only Stop and Limit may combine.
    pub fn from_flags(bits: u8) -> Result<Self, FolioError> {
        match bits {
            MARKET => Ok(PricingType::Market),
            LIMIT => Ok(PricingType::Limit),
            STOP => Ok(PricingType::Stop),
            b if b == STOP | LIMIT => Ok(PricingType::StopLimit),
            other => Err(FolioError::invalid(
                "pricing type",
                format!("flags {other:#05b} are not a valid combination"),
            )),
        }
    }

    pub fn flags(self) -> u8 {
        match self {
            PricingType::Market => MARKET,
            PricingType::Limit => LIMIT,
            PricingType::Stop => STOP,
            PricingType::StopLimit => STOP | LIMIT,
        }
    }

    pub fn has_limit(self) -> bool {
        self.flags() & LIMIT != 0
    }

    pub fn has_stop(self) -> bool {
        self.flags() & STOP != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawOrder")
)]
pub struct Order {
    ticker: String,
    order_type: OrderType,
    shares: Decimal,
    pricing: PricingType,
    limit_price: Option<Decimal>,
    stop_price: Option<Decimal>,
    issued: NaiveDateTime,
    expires: NaiveDateTime,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticker: &str,
        order_type: OrderType,
        shares: Decimal,
        pricing: PricingType,
        limit_price: Option<Decimal>,
        stop_price: Option<Decimal>,
        issued: NaiveDateTime,
        expires: NaiveDateTime,
    ) -> Result<Self, FolioError> {
        if !order_type.is_share() || order_type == OrderType::DividendReinvestment {
            return Err(FolioError::invalid(
                "order type",
                format!("cannot place a {order_type} order"),
            ));
        }
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(FolioError::invalid("ticker", "must not be empty"));
        }
        if shares <= Decimal::ZERO {
            return Err(FolioError::invalid("shares", format!("{shares} is not positive")));
        }
        if expires < issued {
            return Err(FolioError::invalid(
                "expiration",
                format!("{expires} is before issue {issued}"),
            ));
        }
        if pricing.has_limit() != limit_price.is_some() {
            return Err(FolioError::invalid(
                "limit price",
                format!("{pricing:?} order {} a limit price", needs(pricing.has_limit())),
            ));
        }
        if pricing.has_stop() != stop_price.is_some() {
            return Err(FolioError::invalid(
                "stop price",
                format!("{pricing:?} order {} a stop price", needs(pricing.has_stop())),
            ));
        }
        for (field, price) in [("limit price", limit_price), ("stop price", stop_price)] {
            if let Some(p) = price.filter(|p| *p < Decimal::ZERO) {
                return Err(FolioError::invalid(field, format!("{p} is negative")));
            }
        }

        Ok(Order {
            ticker: ticker.to_uppercase(),
            order_type,
            shares,
            pricing,
            limit_price,
            stop_price,
            issued,
            expires,
        })
    }

    pub fn market(
        ticker: &str,
        order_type: OrderType,
        shares: Decimal,
        issued: NaiveDateTime,
        expires: NaiveDateTime,
    ) -> Result<Self, FolioError> {
        Self::new(ticker, order_type, shares, PricingType::Market, None, None, issued, expires)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn shares(&self) -> Decimal {
        self.shares
    }

    pub fn pricing(&self) -> PricingType {
        self.pricing
    }

    pub fn limit_price(&self) -> Option<Decimal> {
        self.limit_price
    }

    pub fn stop_price(&self) -> Option<Decimal> {
        self.stop_price
    }

    pub fn issued(&self) -> NaiveDateTime {
        self.issued
    }

    pub fn expires(&self) -> NaiveDateTime {
        self.expires
    }

    /// Live from issue through expiration, inclusive.
    pub fn is_active(&self, at: NaiveDateTime) -> bool {
        self.issued <= at && at <= self.expires
    }

    /// Whether a trade at `price` satisfies the pricing constraint.
    ///
    /// Buying orders fill at or below the limit and trigger at or above the
    /// stop; selling orders mirror that.
    pub fn can_execute_at(&self, price: Decimal) -> bool {
        let buying = self.order_type.flow() == Some(Flow::Accumulation);
        let limit_ok = self.limit_price.is_none_or(|limit| {
            if buying { price <= limit } else { price >= limit }
        });
        let stop_ok = self.stop_price.is_none_or(|stop| {
            if buying { price >= stop } else { price <= stop }
        });
        limit_ok && stop_ok
    }

    pub fn fill(
        &self,
        settlement: NaiveDateTime,
        price: Decimal,
        commission: Decimal,
    ) -> Result<Transaction, FolioError> {
        if !self.is_active(settlement) {
            return Err(FolioError::operation(format!(
                "order for {} is not active at {settlement}",
                self.ticker
            )));
        }
        if !self.can_execute_at(price) {
            return Err(FolioError::operation(format!(
                "{:?} {} order for {} cannot fill at {price}",
                self.pricing, self.order_type, self.ticker
            )));
        }
        tracing::debug!(ticker = %self.ticker, %price, "order filled");
        Transaction::share(
            self.order_type,
            &self.ticker,
            settlement,
            self.shares,
            price,
            commission,
        )
    }
}

fn needs(required: bool) -> &'static str {
    if required { "requires" } else { "does not take" }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawOrder {
    ticker: String,
    order_type: OrderType,
    shares: Decimal,
    pricing: PricingType,
    limit_price: Option<Decimal>,
    stop_price: Option<Decimal>,
    issued: NaiveDateTime,
    expires: NaiveDateTime,
}

#[cfg(feature = "serde")]
impl TryFrom<RawOrder> for Order {
    type Error = FolioError;

    fn try_from(raw: RawOrder) -> Result<Self, Self::Error> {
        Order::new(
            &raw.ticker,
            raw.order_type,
            raw.shares,
            raw.pricing,
            raw.limit_price,
            raw.stop_price,
            raw.issued,
            raw.expires,
        )
    }
}
