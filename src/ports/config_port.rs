//! Configuration access port trait.

use chrono::NaiveDate;
use rust_decimal::Decimal;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_decimal(&self, section: &str, key: &str, default: Decimal) -> Decimal;
    fn get_date(&self, section: &str, key: &str) -> Option<NaiveDate>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
