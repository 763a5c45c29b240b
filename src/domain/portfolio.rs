//! Portfolio: a cash ledger plus one position per traded ticker.
//!
//! Share trades are mirrored into the cash ledger: buys and covers withdraw
//! their cost plus commission, sells and short sales deposit their proceeds
//! less commission. Dividend receipts only touch cash. Reinvested dividends
//! only touch their position.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::cash_account::CashAccount;
use super::error::FolioError;
use super::holding::{self, Holding};
use super::order_type::OrderType;
use super::position::{self, Position};
use super::transaction::Transaction;
use crate::ports::price_port::PricePort;

pub const DEFAULT_CASH_TICKER: &str = "$";

#[derive(Debug, Clone)]
pub struct Portfolio {
    cash_ticker: String,
    cash: CashAccount,
    positions: BTreeMap<String, Position>,
}

impl Default for Portfolio {
    fn default() -> Self {
        Portfolio {
            cash_ticker: DEFAULT_CASH_TICKER.to_string(),
            cash: CashAccount::new(),
            positions: BTreeMap::new(),
        }
    }
}

impl Portfolio {
    pub fn new(cash_ticker: &str) -> Result<Self, FolioError> {
        let cash_ticker = cash_ticker.trim();
        if cash_ticker.is_empty() {
            return Err(FolioError::invalid("cash ticker", "must not be empty"));
        }
        Ok(Portfolio {
            cash_ticker: cash_ticker.to_uppercase(),
            ..Portfolio::default()
        })
    }

    pub fn cash_ticker(&self) -> &str {
        &self.cash_ticker
    }

    pub fn cash(&self) -> &CashAccount {
        &self.cash
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(&ticker.trim().to_uppercase())
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Record a transaction and its cash counterpart. Nothing is recorded
    /// when either side would be rejected.
    pub fn add(&mut self, tx: Transaction) -> Result<(), FolioError> {
        if tx.order_type().is_cash() {
            return self.cash.add(tx);
        }
        let Some(trade) = tx.as_share() else {
            return Err(FolioError::operation("not a share transaction"));
        };
        if trade.ticker() == self.cash_ticker {
            return Err(FolioError::invalid(
                "ticker",
                format!("{} is the cash ticker", trade.ticker()),
            ));
        }

        let paired = self.paired_cash(&tx)?;
        let unfunded = match paired.as_ref() {
            Some(p) if !self.cash.admits(p)? => Some(p),
            _ => None,
        };
        if let Some(p) = unfunded {
            let balance = self.cash.balance(p.settlement());
            return Err(FolioError::InsufficientFunds {
                date: p.settlement(),
                balance,
                requested: -p.cash_flow(),
            });
        }

        let ticker = trade.ticker().to_string();
        let created = !self.positions.contains_key(&ticker);
        if created {
            self.positions.insert(ticker.clone(), Position::new(&ticker)?);
        }
        let Some(position) = self.positions.get_mut(&ticker) else {
            return Err(FolioError::operation(format!("no position for {ticker}")));
        };
        if let Err(e) = position.add(tx) {
            if created {
                self.positions.remove(&ticker);
            }
            return Err(e);
        }

        if let Some(p) = paired {
            self.cash.add(p)?;
        }
        tracing::debug!(%ticker, "recorded trade");
        Ok(())
    }

    /// Record a batch in settlement order. At equal settlement, cash
    /// arriving is applied first, then openings, closings and withdrawals.
    /// Rejected transactions are returned with their errors; the rest are
    /// kept.
    pub fn add_all(
        &mut self,
        transactions: impl IntoIterator<Item = Transaction>,
    ) -> Vec<(Transaction, FolioError)> {
        let mut batch: Vec<Transaction> = transactions.into_iter().collect();
        batch.sort_by_key(|t| (t.settlement(), apply_rank(t.order_type())));
        let mut rejected = Vec::new();
        for tx in batch {
            if let Err(e) = self.add(tx.clone()) {
                tracing::warn!(
                    date = %tx.settlement(),
                    kind = %tx.order_type(),
                    error = %e,
                    "transaction rejected"
                );
                rejected.push((tx, e));
            }
        }
        rejected
    }

    /// The cash-ledger mirror of a share trade, if it moves cash.
    fn paired_cash(&self, tx: &Transaction) -> Result<Option<Transaction>, FolioError> {
        if tx.order_type() == OrderType::DividendReinvestment {
            return Ok(None);
        }
        let flow = tx.cash_flow();
        let kind = if flow < Decimal::ZERO {
            OrderType::Withdrawal
        } else {
            OrderType::Deposit
        };
        Transaction::cash(kind, tx.ticker(), tx.settlement(), flow.abs()).map(Some)
    }

    /// Every recorded transaction, cash mirrors included, in settlement order.
    pub fn transactions(&self) -> Vec<Transaction> {
        let mut all = self.cash.transactions();
        for p in self.positions.values() {
            all.extend(p.transactions().iter().cloned());
        }
        all.sort_by_key(Transaction::settlement);
        all
    }

    pub fn head(&self) -> Option<NaiveDateTime> {
        self.positions
            .values()
            .filter_map(Position::head)
            .chain(self.cash.head())
            .min()
    }

    pub fn tail(&self) -> Option<NaiveDateTime> {
        self.positions
            .values()
            .filter_map(Position::tail)
            .chain(self.cash.tail())
            .max()
    }

    pub fn cash_balance(&self, as_of: NaiveDateTime) -> Decimal {
        self.cash.balance(as_of)
    }

    /// Holdings across every position, most recently closed first.
    pub fn holdings(&self, as_of: NaiveDateTime) -> Result<Vec<Holding>, FolioError> {
        let mut all = Vec::new();
        for p in self.positions.values() {
            all.extend(p.holdings(as_of)?);
        }
        holding::sort_holdings(&mut all);
        Ok(all)
    }

    fn sum_positions(
        &self,
        f: impl Fn(&Position) -> Result<Decimal, FolioError>,
    ) -> Result<Decimal, FolioError> {
        self.positions.values().map(f).sum()
    }

    pub fn realized_cost(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        self.sum_positions(|p| p.realized_cost(as_of))
    }

    pub fn proceeds(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        self.sum_positions(|p| p.proceeds(as_of))
    }

    pub fn gross_profit(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        self.sum_positions(|p| p.gross_profit(as_of))
    }

    pub fn total_commissions(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        self.sum_positions(|p| p.total_commissions(as_of))
    }

    pub fn net_profit(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        self.sum_positions(|p| p.net_profit(as_of))
    }

    pub fn net_return(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        let cost = self.realized_cost(as_of)?;
        if cost.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(self.net_profit(as_of)? / cost)
    }

    pub fn average_annual_return(&self, as_of: NaiveDateTime) -> Result<Decimal, FolioError> {
        let mut matches = Vec::new();
        for p in self.positions.values() {
            matches.extend(p.lot_matches(as_of)?);
        }
        Ok(position::weighted_annual_return(
            matches.iter().map(|(m, net)| (m, *net)),
        ))
    }

    pub fn dividends(&self, as_of: NaiveDateTime) -> Decimal {
        let received: Decimal = self
            .cash
            .transactions()
            .iter()
            .filter(|t| t.order_type() == OrderType::DividendReceipt && t.settlement() <= as_of)
            .filter_map(Transaction::amount)
            .sum();
        received + self.positions.values().map(|p| p.dividends(as_of)).sum::<Decimal>()
    }

    /// Cash plus open shares at their closing price on `as_of`; open short
    /// shares count against the total.
    pub fn market_value(
        &self,
        as_of: NaiveDateTime,
        prices: &dyn PricePort,
    ) -> Result<Decimal, FolioError> {
        let mut value = self.cash_balance(as_of);
        for p in self.positions.values() {
            let shares = p.open_shares(as_of);
            if shares.is_zero() {
                continue;
            }
            value += shares * prices.closing_price(p.ticker(), as_of)?;
        }
        Ok(value)
    }
}

fn apply_rank(order_type: OrderType) -> u8 {
    match order_type {
        OrderType::Deposit | OrderType::DividendReceipt => 0,
        OrderType::Withdrawal => 3,
        o if o.is_closing() => 2,
        _ => 1,
    }
}
