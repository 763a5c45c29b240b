//! Brokerage transactions.
//!
//! Inputs are magnitudes: a negative price, commission, share count or
//! amount is rejected rather than sign-corrected. Signs are derived from the
//! variant. Withdrawals store a negative amount, and closing trades report a
//! negative [`Transaction::signed_price`].

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::domain::error::FolioError;
use crate::domain::order_type::OrderType;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ShareTrade {
    ticker: String,
    settlement: NaiveDateTime,
    shares: Decimal,
    price: Decimal,
    commission: Decimal,
}

impl ShareTrade {
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn settlement(&self) -> NaiveDateTime {
        self.settlement
    }

    pub fn shares(&self) -> Decimal {
        self.shares
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn commission(&self) -> Decimal {
        self.commission
    }

    /// `shares * price`, before commission.
    pub fn gross(&self) -> Decimal {
        self.shares * self.price
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CashFlow {
    ticker: Option<String>,
    settlement: NaiveDateTime,
    amount: Decimal,
}

impl CashFlow {
    pub fn ticker(&self) -> Option<&str> {
        self.ticker.as_deref()
    }

    pub fn settlement(&self) -> NaiveDateTime {
        self.settlement
    }

    /// Signed: negative for withdrawals.
    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Deserializing goes through [`Transaction::share`] and
/// [`Transaction::cash`], so a decoded transaction obeys the same rules as a
/// constructed one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawTransaction")
)]
pub enum Transaction {
    Buy(ShareTrade),
    Sell(ShareTrade),
    SellShort(ShareTrade),
    BuyToCover(ShareTrade),
    DividendReinvestment(ShareTrade),
    DividendReceipt(CashFlow),
    Deposit(CashFlow),
    Withdrawal(CashFlow),
}

fn normalize_ticker(ticker: &str) -> Result<String, FolioError> {
    let trimmed = ticker.trim();
    if trimmed.is_empty() {
        return Err(FolioError::invalid("ticker", "must not be empty"));
    }
    Ok(trimmed.to_uppercase())
}

fn non_negative(field: &'static str, value: Decimal) -> Result<Decimal, FolioError> {
    if value < Decimal::ZERO {
        return Err(FolioError::invalid(field, format!("{value} is negative")));
    }
    Ok(value)
}

impl Transaction {
    /// Validated constructor for the share-moving kinds.
    pub fn share(
        order_type: OrderType,
        ticker: &str,
        settlement: NaiveDateTime,
        shares: Decimal,
        price: Decimal,
        commission: Decimal,
    ) -> Result<Self, FolioError> {
        if !order_type.is_share() {
            return Err(FolioError::invalid(
                "order type",
                format!("{order_type} does not trade shares"),
            ));
        }
        if shares <= Decimal::ZERO {
            return Err(FolioError::invalid("shares", format!("{shares} is not positive")));
        }
        let price = non_negative("price", price)?;
        let commission = non_negative("commission", commission)?;
        if shares
            .checked_mul(price)
            .and_then(|gross| gross.checked_add(commission))
            .is_none()
        {
            return Err(FolioError::invalid(
                "shares",
                format!("{shares} at {price} is too large to value"),
            ));
        }
        if order_type == OrderType::DividendReinvestment && !commission.is_zero() {
            return Err(FolioError::invalid(
                "commission",
                format!("dividend reinvestment must be commission-free, got {commission}"),
            ));
        }

        let trade = ShareTrade {
            ticker: normalize_ticker(ticker)?,
            settlement,
            shares,
            price,
            commission,
        };
        Ok(match order_type {
            OrderType::Buy => Transaction::Buy(trade),
            OrderType::Sell => Transaction::Sell(trade),
            OrderType::SellShort => Transaction::SellShort(trade),
            OrderType::BuyToCover => Transaction::BuyToCover(trade),
            _ => Transaction::DividendReinvestment(trade),
        })
    }

    /// Validated constructor for the cash-only kinds. `amount` is a
    /// magnitude; withdrawals are stored negated.
    pub fn cash(
        order_type: OrderType,
        ticker: Option<&str>,
        settlement: NaiveDateTime,
        amount: Decimal,
    ) -> Result<Self, FolioError> {
        if !order_type.is_cash() {
            return Err(FolioError::invalid(
                "order type",
                format!("{order_type} is not a cash transaction"),
            ));
        }
        let amount = non_negative("amount", amount)?;
        let ticker = match ticker {
            Some(t) => Some(normalize_ticker(t)?),
            None => None,
        };
        if order_type == OrderType::DividendReceipt && ticker.is_none() {
            return Err(FolioError::invalid("ticker", "dividend receipt needs a ticker"));
        }

        Ok(match order_type {
            OrderType::Withdrawal => Transaction::Withdrawal(CashFlow {
                ticker,
                settlement,
                amount: -amount,
            }),
            OrderType::Deposit => Transaction::Deposit(CashFlow {
                ticker,
                settlement,
                amount,
            }),
            _ => Transaction::DividendReceipt(CashFlow {
                ticker,
                settlement,
                amount,
            }),
        })
    }

    pub fn buy(
        ticker: &str,
        settlement: NaiveDateTime,
        shares: Decimal,
        price: Decimal,
        commission: Decimal,
    ) -> Result<Self, FolioError> {
        Self::share(OrderType::Buy, ticker, settlement, shares, price, commission)
    }

    pub fn sell(
        ticker: &str,
        settlement: NaiveDateTime,
        shares: Decimal,
        price: Decimal,
        commission: Decimal,
    ) -> Result<Self, FolioError> {
        Self::share(OrderType::Sell, ticker, settlement, shares, price, commission)
    }

    pub fn sell_short(
        ticker: &str,
        settlement: NaiveDateTime,
        shares: Decimal,
        price: Decimal,
        commission: Decimal,
    ) -> Result<Self, FolioError> {
        Self::share(OrderType::SellShort, ticker, settlement, shares, price, commission)
    }

    pub fn buy_to_cover(
        ticker: &str,
        settlement: NaiveDateTime,
        shares: Decimal,
        price: Decimal,
        commission: Decimal,
    ) -> Result<Self, FolioError> {
        Self::share(OrderType::BuyToCover, ticker, settlement, shares, price, commission)
    }

    pub fn dividend_reinvestment(
        ticker: &str,
        settlement: NaiveDateTime,
        shares: Decimal,
        price: Decimal,
    ) -> Result<Self, FolioError> {
        Self::share(
            OrderType::DividendReinvestment,
            ticker,
            settlement,
            shares,
            price,
            Decimal::ZERO,
        )
    }

    pub fn deposit(settlement: NaiveDateTime, amount: Decimal) -> Result<Self, FolioError> {
        Self::cash(OrderType::Deposit, None, settlement, amount)
    }

    pub fn withdrawal(settlement: NaiveDateTime, amount: Decimal) -> Result<Self, FolioError> {
        Self::cash(OrderType::Withdrawal, None, settlement, amount)
    }

    pub fn dividend_receipt(
        ticker: &str,
        settlement: NaiveDateTime,
        amount: Decimal,
    ) -> Result<Self, FolioError> {
        Self::cash(OrderType::DividendReceipt, Some(ticker), settlement, amount)
    }

    pub fn order_type(&self) -> OrderType {
        match self {
            Transaction::Buy(_) => OrderType::Buy,
            Transaction::Sell(_) => OrderType::Sell,
            Transaction::SellShort(_) => OrderType::SellShort,
            Transaction::BuyToCover(_) => OrderType::BuyToCover,
            Transaction::DividendReinvestment(_) => OrderType::DividendReinvestment,
            Transaction::DividendReceipt(_) => OrderType::DividendReceipt,
            Transaction::Deposit(_) => OrderType::Deposit,
            Transaction::Withdrawal(_) => OrderType::Withdrawal,
        }
    }

    pub fn as_share(&self) -> Option<&ShareTrade> {
        match self {
            Transaction::Buy(t)
            | Transaction::Sell(t)
            | Transaction::SellShort(t)
            | Transaction::BuyToCover(t)
            | Transaction::DividendReinvestment(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_cash(&self) -> Option<&CashFlow> {
        match self {
            Transaction::DividendReceipt(c) | Transaction::Deposit(c) | Transaction::Withdrawal(c) => {
                Some(c)
            }
            _ => None,
        }
    }

    pub fn settlement(&self) -> NaiveDateTime {
        match self {
            Transaction::Buy(t)
            | Transaction::Sell(t)
            | Transaction::SellShort(t)
            | Transaction::BuyToCover(t)
            | Transaction::DividendReinvestment(t) => t.settlement(),
            Transaction::DividendReceipt(c) | Transaction::Deposit(c) | Transaction::Withdrawal(c) => {
                c.settlement()
            }
        }
    }

    pub fn ticker(&self) -> Option<&str> {
        match (self.as_share(), self.as_cash()) {
            (Some(t), _) => Some(t.ticker()),
            (_, Some(c)) => c.ticker(),
            _ => None,
        }
    }

    pub fn shares(&self) -> Option<Decimal> {
        self.as_share().map(ShareTrade::shares)
    }

    pub fn price(&self) -> Option<Decimal> {
        self.as_share().map(ShareTrade::price)
    }

    /// Price with the matching sign convention: positive for opening
    /// trades, negative for closing ones.
    pub fn signed_price(&self) -> Option<Decimal> {
        let price = self.price()?;
        Some(if self.order_type().is_closing() {
            -price
        } else {
            price
        })
    }

    pub fn commission(&self) -> Option<Decimal> {
        self.as_share().map(ShareTrade::commission)
    }

    /// Signed amount of a cash transaction.
    pub fn amount(&self) -> Option<Decimal> {
        self.as_cash().map(CashFlow::amount)
    }

    /// Effect on the cash ledger: negative when cash leaves the account.
    pub fn cash_flow(&self) -> Decimal {
        match self {
            Transaction::Buy(t) | Transaction::BuyToCover(t) => -(t.gross() + t.commission()),
            Transaction::Sell(t) | Transaction::SellShort(t) => t.gross() - t.commission(),
            Transaction::DividendReinvestment(_) => Decimal::ZERO,
            Transaction::DividendReceipt(c) | Transaction::Deposit(c) | Transaction::Withdrawal(c) => {
                c.amount()
            }
        }
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawShareTrade {
    ticker: String,
    settlement: NaiveDateTime,
    shares: Decimal,
    price: Decimal,
    commission: Decimal,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawCashFlow {
    ticker: Option<String>,
    settlement: NaiveDateTime,
    amount: Decimal,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
enum RawTransaction {
    Buy(RawShareTrade),
    Sell(RawShareTrade),
    SellShort(RawShareTrade),
    BuyToCover(RawShareTrade),
    DividendReinvestment(RawShareTrade),
    DividendReceipt(RawCashFlow),
    Deposit(RawCashFlow),
    Withdrawal(RawCashFlow),
}

#[cfg(feature = "serde")]
impl TryFrom<RawTransaction> for Transaction {
    type Error = FolioError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        let share = |order_type, t: RawShareTrade| {
            Transaction::share(order_type, &t.ticker, t.settlement, t.shares, t.price, t.commission)
        };
        let cash = |order_type, c: RawCashFlow| {
            Transaction::cash(order_type, c.ticker.as_deref(), c.settlement, c.amount)
        };
        match raw {
            RawTransaction::Buy(t) => share(OrderType::Buy, t),
            RawTransaction::Sell(t) => share(OrderType::Sell, t),
            RawTransaction::SellShort(t) => share(OrderType::SellShort, t),
            RawTransaction::BuyToCover(t) => share(OrderType::BuyToCover, t),
            RawTransaction::DividendReinvestment(t) => share(OrderType::DividendReinvestment, t),
            RawTransaction::DividendReceipt(c) => cash(OrderType::DividendReceipt, c),
            RawTransaction::Deposit(c) => cash(OrderType::Deposit, c),
            // Stored negated.
            RawTransaction::Withdrawal(c) => {
                if c.amount > Decimal::ZERO {
                    return Err(FolioError::invalid(
                        "amount",
                        format!("withdrawal amount {} must be recorded negative", c.amount),
                    ));
                }
                let amount = -c.amount;
                cash(OrderType::Withdrawal, RawCashFlow { amount, ..c })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn hash_of(t: &Transaction) -> u64 {
        let mut h = DefaultHasher::new();
        t.hash(&mut h);
        h.finish()
    }

    #[test]
    fn buy_fields() {
        let t = Transaction::buy("de", date(2011, 7, 26), dec!(2), dec!(50), dec!(7.95)).unwrap();
        assert_eq!(t.order_type(), OrderType::Buy);
        assert_eq!(t.ticker(), Some("DE"));
        assert_eq!(t.settlement(), date(2011, 7, 26));
        assert_eq!(t.shares(), Some(dec!(2)));
        assert_eq!(t.price(), Some(dec!(50)));
        assert_eq!(t.signed_price(), Some(dec!(50)));
        assert_eq!(t.commission(), Some(dec!(7.95)));
        assert_eq!(t.amount(), None);
    }

    #[test]
    fn identical_buys_equal_and_hash_equal() {
        let a = Transaction::buy("DE", date(2011, 7, 26), dec!(2), dec!(50), dec!(7.95)).unwrap();
        let b = Transaction::buy("DE", date(2011, 7, 26), dec!(2), dec!(50), dec!(7.95)).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn differing_in_any_field_is_unequal() {
        let base = Transaction::buy("DE", date(2011, 7, 26), dec!(2), dec!(50), dec!(7.95)).unwrap();
        let variants = vec![
            Transaction::buy("IBM", date(2011, 7, 26), dec!(2), dec!(50), dec!(7.95)).unwrap(),
            Transaction::buy("DE", date(2011, 7, 27), dec!(2), dec!(50), dec!(7.95)).unwrap(),
            Transaction::buy("DE", date(2011, 7, 26), dec!(3), dec!(50), dec!(7.95)).unwrap(),
            Transaction::buy("DE", date(2011, 7, 26), dec!(2), dec!(51), dec!(7.95)).unwrap(),
            Transaction::buy("DE", date(2011, 7, 26), dec!(2), dec!(50), dec!(0)).unwrap(),
            Transaction::sell("DE", date(2011, 7, 26), dec!(2), dec!(50), dec!(7.95)).unwrap(),
        ];
        for v in variants {
            assert_ne!(base, v);
        }
    }

    #[test]
    fn non_positive_shares_rejected() {
        for shares in [dec!(0), dec!(-1)] {
            let err = Transaction::buy("DE", date(2011, 7, 26), shares, dec!(50), dec!(0)).unwrap_err();
            assert!(matches!(err, FolioError::InvalidArgument { field: "shares", .. }));
        }
    }

    #[test]
    fn negative_price_rejected_for_every_share_kind() {
        for ot in OrderType::ALL.into_iter().filter(|o| o.is_share()) {
            let err = Transaction::share(ot, "DE", date(2011, 7, 26), dec!(1), dec!(-50), dec!(0))
                .unwrap_err();
            assert!(matches!(err, FolioError::InvalidArgument { field: "price", .. }), "{ot}");
        }
    }

    #[test]
    fn negative_commission_rejected() {
        let err = Transaction::sell("DE", date(2011, 7, 26), dec!(1), dec!(50), dec!(-1)).unwrap_err();
        assert!(matches!(err, FolioError::InvalidArgument { field: "commission", .. }));
    }

    #[test]
    fn reinvestment_must_be_commission_free() {
        assert!(Transaction::dividend_reinvestment("DE", date(2011, 7, 26), dec!(0.5), dec!(50)).is_ok());
        let err = Transaction::share(
            OrderType::DividendReinvestment,
            "DE",
            date(2011, 7, 26),
            dec!(0.5),
            dec!(50),
            dec!(1),
        )
        .unwrap_err();
        assert!(matches!(err, FolioError::InvalidArgument { field: "commission", .. }));
    }

    #[test]
    fn empty_ticker_rejected() {
        assert!(Transaction::buy("  ", date(2011, 7, 26), dec!(1), dec!(1), dec!(0)).is_err());
    }

    #[test]
    fn closing_trades_have_negative_signed_price() {
        let sell = Transaction::sell("DE", date(2011, 9, 26), dec!(2), dec!(75), dec!(0)).unwrap();
        let cover = Transaction::buy_to_cover("DE", date(2011, 9, 26), dec!(2), dec!(75), dec!(0)).unwrap();
        let short = Transaction::sell_short("DE", date(2011, 9, 26), dec!(2), dec!(75), dec!(0)).unwrap();
        assert_eq!(sell.signed_price(), Some(dec!(-75)));
        assert_eq!(cover.signed_price(), Some(dec!(-75)));
        assert_eq!(short.signed_price(), Some(dec!(75)));
        assert_eq!(sell.price(), Some(dec!(75)));
    }

    #[test]
    fn withdrawal_stored_negative() {
        let w = Transaction::withdrawal(date(2011, 7, 26), dec!(500)).unwrap();
        assert_eq!(w.amount(), Some(dec!(-500)));
        assert_eq!(w.cash_flow(), dec!(-500));
        assert_eq!(w.ticker(), None);
    }

    #[test]
    fn negative_cash_amounts_rejected() {
        assert!(Transaction::deposit(date(2011, 7, 26), dec!(-1)).is_err());
        assert!(Transaction::withdrawal(date(2011, 7, 26), dec!(-1)).is_err());
        assert!(Transaction::dividend_receipt("DE", date(2011, 7, 26), dec!(-1)).is_err());
        assert!(Transaction::deposit(date(2011, 7, 26), dec!(0)).is_ok());
    }

    #[test]
    fn cash_constructor_rejects_share_kinds() {
        assert!(Transaction::cash(OrderType::Buy, None, date(2011, 7, 26), dec!(1)).is_err());
        assert!(
            Transaction::share(OrderType::Deposit, "DE", date(2011, 7, 26), dec!(1), dec!(1), dec!(0))
                .is_err()
        );
    }

    #[test]
    fn dividend_receipt_needs_ticker() {
        assert!(Transaction::cash(OrderType::DividendReceipt, None, date(2011, 7, 26), dec!(1)).is_err());
        let d = Transaction::dividend_receipt("de", date(2011, 7, 26), dec!(1.25)).unwrap();
        assert_eq!(d.ticker(), Some("DE"));
        assert_eq!(d.cash_flow(), dec!(1.25));
    }

    #[test]
    fn cash_flows_by_kind() {
        let d = date(2011, 7, 26);
        let buy = Transaction::buy("DE", d, dec!(5), dec!(100), dec!(5)).unwrap();
        let sell = Transaction::sell("DE", d, dec!(5), dec!(112), dec!(5)).unwrap();
        let short = Transaction::sell_short("DE", d, dec!(5), dec!(100), dec!(5)).unwrap();
        let cover = Transaction::buy_to_cover("DE", d, dec!(5), dec!(90), dec!(5)).unwrap();
        let drip = Transaction::dividend_reinvestment("DE", d, dec!(0.1), dec!(100)).unwrap();
        assert_eq!(buy.cash_flow(), dec!(-505));
        assert_eq!(sell.cash_flow(), dec!(555));
        assert_eq!(short.cash_flow(), dec!(495));
        assert_eq!(cover.cash_flow(), dec!(-455));
        assert_eq!(drip.cash_flow(), dec!(0));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip_preserves_every_field() {
        let txs = vec![
            Transaction::buy("DE", date(2011, 7, 26), dec!(2), dec!(50.125), dec!(7.95)).unwrap(),
            Transaction::withdrawal(date(2011, 7, 27), dec!(12.34)).unwrap(),
            Transaction::dividend_receipt("DE", date(2011, 8, 1), dec!(0.41)).unwrap(),
        ];
        let json = serde_json::to_string(&txs).unwrap();
        let back: Vec<Transaction> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, txs);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializing_applies_constructor_rules() {
        let bad = [
            r#"{"Buy":{"ticker":"DE","settlement":"2011-07-26T00:00:00","shares":"-5","price":"50","commission":"0"}}"#,
            r#"{"Buy":{"ticker":"DE","settlement":"2011-07-26T00:00:00","shares":"0","price":"50","commission":"0"}}"#,
            r#"{"Sell":{"ticker":"DE","settlement":"2011-07-26T00:00:00","shares":"5","price":"-50","commission":"0"}}"#,
            r#"{"Sell":{"ticker":"DE","settlement":"2011-07-26T00:00:00","shares":"5","price":"50","commission":"-1"}}"#,
            r#"{"Buy":{"ticker":" ","settlement":"2011-07-26T00:00:00","shares":"5","price":"50","commission":"0"}}"#,
            r#"{"DividendReinvestment":{"ticker":"DE","settlement":"2011-07-26T00:00:00","shares":"1","price":"50","commission":"1"}}"#,
            r#"{"Deposit":{"ticker":null,"settlement":"2011-07-26T00:00:00","amount":"-10"}}"#,
            r#"{"Withdrawal":{"ticker":null,"settlement":"2011-07-26T00:00:00","amount":"10"}}"#,
            r#"{"DividendReceipt":{"ticker":null,"settlement":"2011-07-26T00:00:00","amount":"1"}}"#,
        ];
        for json in bad {
            assert!(serde_json::from_str::<Transaction>(json).is_err(), "{json}");
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializing_normalizes_ticker() {
        let json = r#"{"Buy":{"ticker":" de ","settlement":"2011-07-26T00:00:00","shares":"5","price":"50","commission":"0"}}"#;
        let t: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(
            t,
            Transaction::buy("DE", date(2011, 7, 26), dec!(5), dec!(50), dec!(0)).unwrap()
        );
    }

    #[test]
    fn unvaluable_trade_rejected() {
        let err = Transaction::buy("DE", date(2011, 7, 26), Decimal::MAX, dec!(10), dec!(0))
            .unwrap_err();
        assert!(matches!(err, FolioError::InvalidArgument { field: "shares", .. }));
        let err = Transaction::sell("DE", date(2011, 7, 26), Decimal::MAX, dec!(1), dec!(1))
            .unwrap_err();
        assert!(matches!(err, FolioError::InvalidArgument { field: "shares", .. }));
        assert!(Transaction::buy("DE", date(2011, 7, 26), Decimal::MAX, dec!(1), dec!(0)).is_ok());
    }
}
