//! Configuration validation.
//!
//! Validates every config field before any history is loaded.

use crate::domain::error::FolioError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use rust_decimal::Decimal;

pub const SECTION: &str = "portfolio";
pub const PRICES_SECTION: &str = "prices";

pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), FolioError> {
    validate_transactions(config)?;
    validate_cash_ticker(config)?;
    validate_opening_cash(config)?;
    validate_as_of(config)?;
    validate_strict(config)?;
    validate_price_directory(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> FolioError {
    FolioError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_transactions(config: &dyn ConfigPort) -> Result<(), FolioError> {
    match config.get_string(SECTION, "transactions") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(FolioError::ConfigMissing {
            section: SECTION.to_string(),
            key: "transactions".to_string(),
        }),
    }
}

fn validate_cash_ticker(config: &dyn ConfigPort) -> Result<(), FolioError> {
    match config.get_string(SECTION, "cash_ticker") {
        Some(s) if s.trim().is_empty() => Err(invalid(
            SECTION,
            "cash_ticker",
            "cash_ticker must not be blank",
        )),
        _ => Ok(()),
    }
}

fn validate_opening_cash(config: &dyn ConfigPort) -> Result<(), FolioError> {
    let Some(raw) = config.get_string(SECTION, "opening_cash") else {
        return Ok(());
    };
    match raw.trim().parse::<Decimal>() {
        Ok(v) if v >= Decimal::ZERO => Ok(()),
        Ok(_) => Err(invalid(
            SECTION,
            "opening_cash",
            "opening_cash must be non-negative",
        )),
        Err(_) => Err(invalid(
            SECTION,
            "opening_cash",
            "opening_cash must be a decimal number",
        )),
    }
}

fn validate_as_of(config: &dyn ConfigPort) -> Result<(), FolioError> {
    let Some(raw) = config.get_string(SECTION, "as_of") else {
        return Ok(());
    };
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| invalid(SECTION, "as_of", "invalid as_of format, expected YYYY-MM-DD"))
}

fn validate_strict(config: &dyn ConfigPort) -> Result<(), FolioError> {
    let Some(raw) = config.get_string(SECTION, "strict") else {
        return Ok(());
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "false" | "no" | "0" => Ok(()),
        _ => Err(invalid(
            SECTION,
            "strict",
            "strict must be true/false, yes/no or 1/0",
        )),
    }
}

fn validate_price_directory(config: &dyn ConfigPort) -> Result<(), FolioError> {
    match config.get_string(PRICES_SECTION, "directory") {
        Some(s) if s.trim().is_empty() => Err(invalid(
            PRICES_SECTION,
            "directory",
            "directory must not be blank",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_portfolio_config_passes() {
        let config = make_config(
            r#"
[portfolio]
cash_ticker = USD
transactions = history.csv
opening_cash = 2500.00
as_of = 2011-12-31
strict = false

[prices]
directory = prices
"#,
        );
        assert!(validate_portfolio_config(&config).is_ok());
    }

    #[test]
    fn minimal_config_passes() {
        let config = make_config("[portfolio]\ntransactions = history.csv\n");
        assert!(validate_portfolio_config(&config).is_ok());
    }

    #[test]
    fn transactions_required() {
        let config = make_config("[portfolio]\ncash_ticker = $\n");
        let err = validate_portfolio_config(&config).unwrap_err();
        assert!(matches!(err, FolioError::ConfigMissing { key, .. } if key == "transactions"));
    }

    #[test]
    fn misspelled_strict_rejected() {
        let config = make_config("[portfolio]\ntransactions = h.csv\nstrict = flase\n");
        let err = validate_portfolio_config(&config).unwrap_err();
        assert!(matches!(err, FolioError::ConfigInvalid { key, .. } if key == "strict"));
    }

    #[test]
    fn strict_accepts_every_boolean_spelling() {
        for value in ["true", "False", "YES", "no", "1", "0"] {
            let config = make_config(&format!("[portfolio]\ntransactions = h.csv\nstrict = {value}\n"));
            assert!(validate_portfolio_config(&config).is_ok(), "{value}");
        }
    }

    #[test]
    fn negative_opening_cash_rejected() {
        let config = make_config("[portfolio]\ntransactions = h.csv\nopening_cash = -1\n");
        let err = validate_portfolio_config(&config).unwrap_err();
        assert!(matches!(err, FolioError::ConfigInvalid { key, .. } if key == "opening_cash"));
    }

    #[test]
    fn non_numeric_opening_cash_rejected() {
        let config = make_config("[portfolio]\ntransactions = h.csv\nopening_cash = plenty\n");
        assert!(validate_portfolio_config(&config).is_err());
    }

    #[test]
    fn bad_as_of_rejected() {
        let config = make_config("[portfolio]\ntransactions = h.csv\nas_of = 12/31/2011\n");
        let err = validate_portfolio_config(&config).unwrap_err();
        assert!(matches!(err, FolioError::ConfigInvalid { key, .. } if key == "as_of"));
    }
}
