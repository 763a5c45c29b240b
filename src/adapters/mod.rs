//! Concrete adapter implementations for ports.

pub mod csv_price_adapter;
pub mod csv_transaction_adapter;
pub mod file_config_adapter;
