//! Core domain types and logic.

pub mod resolution;
pub mod calendar;
pub mod price_period;
pub mod price_series;
pub mod order_type;
pub mod transaction;
pub mod order;
pub mod holding;
pub mod position;
pub mod cash_account;
pub mod portfolio;
pub mod config_validation;
pub mod error;
