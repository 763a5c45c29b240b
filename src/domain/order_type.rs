//! Transaction kinds and their classifications.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::FolioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum OrderType {
    Buy = 0,
    Sell = 1,
    SellShort = 2,
    BuyToCover = 3,
    DividendReceipt = 4,
    DividendReinvestment = 5,
    Deposit = 6,
    Withdrawal = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    Accumulation,
    Distribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Opening,
    Closing,
}

#[derive(Debug, Clone, Copy)]
struct Traits {
    shares: bool,
    side: Option<Side>,
    flow: Option<Flow>,
    role: Option<Role>,
}

const fn share(side: Side, flow: Flow, role: Role) -> Traits {
    Traits {
        shares: true,
        side: Some(side),
        flow: Some(flow),
        role: Some(role),
    }
}

const CASH: Traits = Traits {
    shares: false,
    side: None,
    flow: None,
    role: None,
};

/// Indexed by discriminant.
const TRAITS: [Traits; 8] = [
    share(Side::Long, Flow::Accumulation, Role::Opening),
    share(Side::Long, Flow::Distribution, Role::Closing),
    share(Side::Short, Flow::Distribution, Role::Opening),
    share(Side::Short, Flow::Accumulation, Role::Closing),
    CASH,
    share(Side::Long, Flow::Accumulation, Role::Opening),
    CASH,
    CASH,
];

impl OrderType {
    pub const ALL: [OrderType; 8] = [
        OrderType::Buy,
        OrderType::Sell,
        OrderType::SellShort,
        OrderType::BuyToCover,
        OrderType::DividendReceipt,
        OrderType::DividendReinvestment,
        OrderType::Deposit,
        OrderType::Withdrawal,
    ];

    fn traits(self) -> Traits {
        TRAITS[self as usize]
    }

    /// Whether this kind moves shares (and so carries ticker, price, shares
    /// and commission) rather than only cash.
    pub fn is_share(self) -> bool {
        self.traits().shares
    }

    pub fn is_cash(self) -> bool {
        !self.is_share()
    }

    pub fn side(self) -> Option<Side> {
        self.traits().side
    }

    pub fn flow(self) -> Option<Flow> {
        self.traits().flow
    }

    pub fn role(self) -> Option<Role> {
        self.traits().role
    }

    pub fn is_long(self) -> bool {
        self.side() == Some(Side::Long)
    }

    pub fn is_short(self) -> bool {
        self.side() == Some(Side::Short)
    }

    pub fn is_opening(self) -> bool {
        self.role() == Some(Role::Opening)
    }

    pub fn is_closing(self) -> bool {
        self.role() == Some(Role::Closing)
    }

    pub fn name(self) -> &'static str {
        match self {
            OrderType::Buy => "buy",
            OrderType::Sell => "sell",
            OrderType::SellShort => "sell short",
            OrderType::BuyToCover => "buy to cover",
            OrderType::DividendReceipt => "dividend",
            OrderType::DividendReinvestment => "reinvestment",
            OrderType::Deposit => "deposit",
            OrderType::Withdrawal => "withdrawal",
        }
    }
}

impl TryFrom<u8> for OrderType {
    type Error = FolioError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        OrderType::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| FolioError::UnknownOrderType(value.to_string()))
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OrderType {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "buy" | "b" | "bought" => Ok(OrderType::Buy),
            "sell" | "s" | "sold" => Ok(OrderType::Sell),
            "sellshort" | "short" | "ss" => Ok(OrderType::SellShort),
            "buytocover" | "cover" | "btc" => Ok(OrderType::BuyToCover),
            "dividend" | "dividendreceipt" | "div" => Ok(OrderType::DividendReceipt),
            "reinvestment" | "dividendreinvestment" | "reinvest" | "drip" => {
                Ok(OrderType::DividendReinvestment)
            }
            "deposit" | "dep" => Ok(OrderType::Deposit),
            "withdrawal" | "withdraw" | "wd" => Ok(OrderType::Withdrawal),
            _ => Err(FolioError::UnknownOrderType(s.to_string())),
        }
    }
}
