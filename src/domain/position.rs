//! Per-ticker transaction stream and the analytics built on its holdings.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::error::FolioError;
use super::holding::{self, Holding, LotMatch};
use super::order_type::OrderType;
use super::transaction::Transaction;

const DAYS_PER_YEAR: i64 = 365;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    ticker: String,
    transactions: Vec<Transaction>,
}

impl Position {
    pub fn new(ticker: &str) -> Result<Self, FolioError> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(FolioError::invalid("ticker", "must not be empty"));
        }
        Ok(Position {
            ticker: ticker.to_uppercase(),
            transactions: Vec::new(),
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Append a transaction for this ticker. A closing trade that would
    /// close more shares than are open is rejected and leaves the position
    /// unchanged.
    pub fn add(&mut self, tx: Transaction) -> Result<(), FolioError> {
        match tx.ticker() {
            Some(t) if t == self.ticker => {}
            Some(t) => {
                return Err(FolioError::TickerMismatch {
                    expected: self.ticker.clone(),
                    got: t.to_string(),
                });
            }
            None => {
                return Err(FolioError::operation(format!(
                    "{} transactions belong in the cash account, not position {}",
                    tx.order_type(),
                    self.ticker
                )));
            }
        }

        let closing = tx.order_type().is_closing();
        self.transactions.push(tx);
        if closing {
            if let Err(e) = holding::match_lots(&self.transactions, NaiveDateTime::MAX) {
                self.transactions.pop();
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn head(&self) -> Option<NaiveDateTime> {
        self.transactions.iter().map(Transaction::settlement).min()
    }

    pub fn tail(&self) -> Option<NaiveDateTime> {
        self.transactions.iter().map(Transaction::settlement).max()
    }

    pub fn holdings(&self, as_of: NaiveDateTime) -> Result<Vec<Holding>, FolioError> {
        holding::match_holdings(&self.transactions, as_of)
    }

    fn net_shares(&self, as_of: NaiveDateTime, short: bool) -> Decimal {
        self.transactions
            .iter()
            .filter(|t| t.settlement() <= as_of && t.order_type().is_short() == short)
            .filter_map(|t| {
                let shares = t.shares()?;
                Some(if t.order_type().is_opening() {
                    shares
                } else {
                    -shares
                })
            })
            .sum()
    }

    pub fn open_long_shares(&self, as_of: NaiveDateTime) -> Decimal {
        self.net_shares(as_of, false)
    }

    pub fn open_short_shares(&self, as_of: NaiveDateTime) -> Decimal {
        self.net_shares(as_of, true)
    }

    /// Long shares still open minus short shares still open.
    pub fn open_shares(&self, as_of: NaiveDateTime) -> Decimal {
        self.open_long_shares(as_of) - self.open_short_shares(as_of)
    }

    /// Value of the open shares at `price`; short shares count negative.
    pub fn market_value(&self, as_of: NaiveDateTime, price: Decimal) -> Decimal {
        self.open_shares(as_of) * price
    }

    pub fn realized_cost(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        Ok(self.holdings(as_of)?.iter().map(Holding::cost).sum())
    }

    pub fn proceeds(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        Ok(self.holdings(as_of)?.iter().map(Holding::proceeds).sum())
    }

    pub fn gross_profit(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        Ok(self.holdings(as_of)?.iter().map(Holding::gross_profit).sum())
    }

    /// Commissions of the matched trades, each prorated by the share of
    /// its transaction the match consumed.
    pub fn total_commissions(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        Ok(holding::match_lots(&self.transactions, as_of)?
            .iter()
            .map(|m| self.prorated_commission(m))
            .sum())
    }

    pub fn net_profit(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        Ok(holding::match_lots(&self.transactions, as_of)?
            .iter()
            .map(|m| self.match_net_profit(m))
            .sum())
    }

    /// Net profit over realized cost. Zero when nothing has closed.
    pub fn net_return(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        let matches = holding::match_lots(&self.transactions, as_of)?;
        let cost: Decimal = matches.iter().map(|m| m.holding.cost()).sum();
        if cost.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let net: Decimal = matches.iter().map(|m| self.match_net_profit(m)).sum();
        Ok(net / cost)
    }

    /// Cost-weighted mean of each holding's return scaled to a 365-day year.
    /// Holdings opened and closed the same day count as held one day.
    pub fn average_annual_return(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        let matches = holding::match_lots(&self.transactions, as_of)?;
        Ok(weighted_annual_return(
            matches.iter().map(|m| (m, self.match_net_profit(m))),
        ))
    }

    /// Cash dividends received plus the value of reinvested dividends.
    pub fn dividends(&self, as_of: NaiveDateTime) -> Decimal {
        self.transactions
            .iter()
            .filter(|t| t.settlement() <= as_of)
            .map(|t| match t.order_type() {
                OrderType::DividendReceipt => t.amount().unwrap_or_default(),
                OrderType::DividendReinvestment => t.as_share().map_or(Decimal::ZERO, |s| s.gross()),
                _ => Decimal::ZERO,
            })
            .sum()
    }

    pub(crate) fn lot_matches(&self, as_of: NaiveDateTime) -> Result<Vec<(LotMatch, Decimal)>, FolioError> {
        Ok(holding::match_lots(&self.transactions, as_of)?
            .into_iter()
            .map(|m| {
                let net = self.match_net_profit(&m);
                (m, net)
            })
            .collect())
    }

    fn prorated_commission(&self, m: &LotMatch) -> Decimal {
        let share_of = |index: usize, commission: Decimal| {
            match self.transactions[index].shares() {
                Some(total) if !total.is_zero() => commission * m.holding.shares / total,
                _ => Decimal::ZERO,
            }
        };
        share_of(m.opening, m.holding.open_commission) + share_of(m.closing, m.holding.close_commission)
    }

    fn match_net_profit(&self, m: &LotMatch) -> Decimal {
        m.holding.gross_profit() - self.prorated_commission(m)
    }
}

pub(crate) fn weighted_annual_return<'a>(
    matches: impl Iterator<Item = (&'a LotMatch, Decimal)>,
) -> Decimal {
    let mut weighted = Decimal::ZERO;
    let mut total_cost = Decimal::ZERO;
    for (m, net) in matches {
        let cost = m.holding.cost();
        if cost.is_zero() {
            continue;
        }
        let days = Decimal::from(m.holding.days_held().max(1));
        let annual = net / cost * Decimal::from(DAYS_PER_YEAR) / days;
        weighted += annual * cost;
        total_cost += cost;
    }
    if total_cost.is_zero() {
        Decimal::ZERO
    } else {
        weighted / total_cost
    }
}
