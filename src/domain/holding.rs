//! FIFO lot matching.
//!
//! Opening trades (buy, sell short, dividend reinvestment) create lots on
//! their side's queue; closing trades (sell, buy to cover) consume the oldest
//! lots on the same side first, splitting a lot when a close only takes part
//! of it. Every consumption becomes one [`Holding`]. Lots still open at the
//! as-of date are not holdings.

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::error::FolioError;
use super::order_type::Side;
use super::transaction::Transaction;

/// One matched (opened, closed) share quantity.
///
/// Prices are positive magnitudes. Commissions are those of the whole
/// opening and closing transactions; a transaction split across several
/// holdings reports its full commission on each of them.
///
/// Decoded holdings are checked the way matched ones are built: a named
/// ticker, positive shares, `head <= tail`, and non-negative prices and
/// commissions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawHolding")
)]
pub struct Holding {
    pub ticker: String,
    pub side: Side,
    pub head: NaiveDateTime,
    pub tail: NaiveDateTime,
    pub shares: Decimal,
    pub open_price: Decimal,
    pub open_commission: Decimal,
    pub close_price: Decimal,
    pub close_commission: Decimal,
}

impl Holding {
    pub fn cost(&self) -> Decimal {
        self.shares * self.open_price
    }

    pub fn proceeds(&self) -> Decimal {
        self.shares * self.close_price
    }

    /// Profit before commissions. Short holdings profit when the close price
    /// is below the open price.
    pub fn gross_profit(&self) -> Decimal {
        match self.side {
            Side::Long => self.proceeds() - self.cost(),
            Side::Short => self.cost() - self.proceeds(),
        }
    }

    pub fn days_held(&self) -> i64 {
        (self.tail.date() - self.head.date()).num_days()
    }
}

/// A holding plus the positions, in the matched slice, of the transactions
/// it came from.
#[derive(Debug, Clone)]
pub(crate) struct LotMatch {
    pub holding: Holding,
    pub opening: usize,
    pub closing: usize,
}

#[derive(Debug)]
struct Lot {
    index: usize,
    remaining: Decimal,
}

/// Match every closing trade settled on or before `as_of` against the open
/// lots it closes, in the order the matches are made.
pub(crate) fn match_lots(
    transactions: &[Transaction],
    as_of: NaiveDateTime,
) -> Result<Vec<LotMatch>, FolioError> {
    let mut order: Vec<usize> = transactions
        .iter()
        .enumerate()
        .filter(|(_, t)| t.as_share().is_some() && t.settlement() <= as_of)
        .map(|(i, _)| i)
        .collect();
    // Openings sort ahead of closings that share a timestamp.
    order.sort_by_key(|&i| {
        let t = &transactions[i];
        (t.settlement(), t.order_type().is_closing())
    });

    let mut ticker: Option<&str> = None;
    let mut long: VecDeque<Lot> = VecDeque::new();
    let mut short: VecDeque<Lot> = VecDeque::new();
    let mut matches = Vec::new();

    for index in order {
        let tx = &transactions[index];
        let Some(trade) = tx.as_share() else {
            continue;
        };
        match ticker {
            None => ticker = Some(trade.ticker()),
            Some(expected) if expected != trade.ticker() => {
                return Err(FolioError::TickerMismatch {
                    expected: expected.to_string(),
                    got: trade.ticker().to_string(),
                });
            }
            Some(_) => {}
        }

        let side = if tx.order_type().is_short() {
            Side::Short
        } else {
            Side::Long
        };
        let lots = match side {
            Side::Long => &mut long,
            Side::Short => &mut short,
        };

        if tx.order_type().is_opening() {
            lots.push_back(Lot {
                index,
                remaining: trade.shares(),
            });
            continue;
        }

        let available: Decimal = lots.iter().map(|l| l.remaining).sum();
        if available < trade.shares() {
            tracing::warn!(
                ticker = trade.ticker(),
                %available,
                requested = %trade.shares(),
                "closing more shares than are open"
            );
            return Err(FolioError::InsufficientShares {
                ticker: trade.ticker().to_string(),
                date: trade.settlement(),
                available,
                requested: trade.shares(),
            });
        }

        let mut wanted = trade.shares();
        while wanted > Decimal::ZERO {
            let Some(lot) = lots.front_mut() else {
                break;
            };
            let taken = lot.remaining.min(wanted);
            let opening = &transactions[lot.index];
            // Only share trades are ever queued as lots.
            let Some(open_trade) = opening.as_share() else {
                break;
            };
            matches.push(LotMatch {
                holding: Holding {
                    ticker: trade.ticker().to_string(),
                    side,
                    head: open_trade.settlement(),
                    tail: trade.settlement(),
                    shares: taken,
                    open_price: open_trade.price(),
                    open_commission: open_trade.commission(),
                    close_price: trade.price(),
                    close_commission: trade.commission(),
                },
                opening: lot.index,
                closing: index,
            });
            lot.remaining -= taken;
            wanted -= taken;
            if lot.remaining.is_zero() {
                lots.pop_front();
            }
        }
    }

    tracing::debug!(
        ticker = ticker.unwrap_or_default(),
        matched = matches.len(),
        open_long = long.len(),
        open_short = short.len(),
        "matched lots"
    );
    Ok(matches)
}

/// Holdings closed on or before `as_of`, most recently closed first, ties
/// broken by most recently opened first.
///
/// All share transactions must be for the same ticker. Closing more shares
/// than are open fails with [`FolioError::InsufficientShares`].
pub fn match_holdings(
    transactions: &[Transaction],
    as_of: NaiveDateTime,
) -> Result<Vec<Holding>, FolioError> {
    let mut holdings: Vec<Holding> = match_lots(transactions, as_of)?
        .into_iter()
        .map(|m| m.holding)
        .collect();
    sort_holdings(&mut holdings);
    Ok(holdings)
}

pub(crate) fn sort_holdings(holdings: &mut [Holding]) {
    holdings.sort_by(|a, b| b.tail.cmp(&a.tail).then(b.head.cmp(&a.head)));
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawHolding {
    ticker: String,
    side: Side,
    head: NaiveDateTime,
    tail: NaiveDateTime,
    shares: Decimal,
    open_price: Decimal,
    open_commission: Decimal,
    close_price: Decimal,
    close_commission: Decimal,
}

#[cfg(feature = "serde")]
impl TryFrom<RawHolding> for Holding {
    type Error = FolioError;

    fn try_from(raw: RawHolding) -> Result<Self, Self::Error> {
        let ticker = raw.ticker.trim();
        if ticker.is_empty() {
            return Err(FolioError::invalid("ticker", "must not be empty"));
        }
        if raw.shares <= Decimal::ZERO {
            return Err(FolioError::invalid("shares", format!("{} is not positive", raw.shares)));
        }
        if raw.head > raw.tail {
            return Err(FolioError::invalid(
                "holding",
                format!("closed {} before it opened {}", raw.tail, raw.head),
            ));
        }
        for (field, value) in [
            ("open price", raw.open_price),
            ("open commission", raw.open_commission),
            ("close price", raw.close_price),
            ("close commission", raw.close_commission),
        ] {
            if value < Decimal::ZERO {
                return Err(FolioError::invalid(field, format!("{value} is negative")));
            }
        }
        let valued = |price: Decimal| raw.shares.checked_mul(price).is_some();
        if !valued(raw.open_price) || !valued(raw.close_price) {
            return Err(FolioError::invalid(
                "shares",
                format!("{} shares are too many to value", raw.shares),
            ));
        }
        Ok(Holding {
            ticker: ticker.to_uppercase(),
            side: raw.side,
            head: raw.head,
            tail: raw.tail,
            shares: raw.shares,
            open_price: raw.open_price,
            open_commission: raw.open_commission,
            close_price: raw.close_price,
            close_commission: raw.close_commission,
        })
    }
}
