//! INI file configuration adapter.

use crate::domain::error::FolioError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use configparser::ini::Ini;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FolioError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| FolioError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, FolioError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| FolioError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_decimal(&self, section: &str, key: &str, default: Decimal) -> Decimal {
        self.config
            .get(section, key)
            .and_then(|v| Decimal::from_str(v.trim()).ok())
            .unwrap_or(default)
    }

    fn get_date(&self, section: &str, key: &str) -> Option<NaiveDate> {
        self.config
            .get(section, key)
            .and_then(|v| NaiveDate::parse_from_str(v.trim(), DATE_FORMAT).ok())
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[portfolio]
cash_ticker = USD
transactions = /data/history.csv

[prices]
directory = /data/prices
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("portfolio", "cash_ticker"),
            Some("USD".to_string())
        );
        assert_eq!(
            adapter.get_string("prices", "directory"),
            Some("/data/prices".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[portfolio]\ncash_ticker = $\n").unwrap();
        assert_eq!(adapter.get_string("portfolio", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_decimal_returns_exact_value() {
        let adapter =
            FileConfigAdapter::from_string("[portfolio]\nopening_cash = 10000.05\n").unwrap();
        assert_eq!(
            adapter.get_decimal("portfolio", "opening_cash", Decimal::ZERO),
            dec!(10000.05)
        );
    }

    #[test]
    fn get_decimal_returns_default_for_missing_or_garbage() {
        let adapter =
            FileConfigAdapter::from_string("[portfolio]\nopening_cash = lots\n").unwrap();
        assert_eq!(adapter.get_decimal("portfolio", "opening_cash", dec!(7)), dec!(7));
        assert_eq!(adapter.get_decimal("portfolio", "missing", dec!(7)), dec!(7));
    }

    #[test]
    fn get_date_parses_iso_dates() {
        let adapter =
            FileConfigAdapter::from_string("[portfolio]\nas_of = 2011-09-26\nbad = 26/09/2011\n")
                .unwrap();
        assert_eq!(
            adapter.get_date("portfolio", "as_of"),
            NaiveDate::from_ymd_opt(2011, 9, 26)
        );
        assert_eq!(adapter.get_date("portfolio", "bad"), None);
        assert_eq!(adapter.get_date("portfolio", "missing"), None);
    }

    #[test]
    fn get_bool_returns_true_values() {
        let adapter =
            FileConfigAdapter::from_string("[portfolio]\na = true\nb = yes\nc = 1\n").unwrap();
        assert!(adapter.get_bool("portfolio", "a", false));
        assert!(adapter.get_bool("portfolio", "b", false));
        assert!(adapter.get_bool("portfolio", "c", false));
    }

    #[test]
    fn get_bool_returns_false_values() {
        let adapter =
            FileConfigAdapter::from_string("[portfolio]\na = false\nb = no\nc = 0\n").unwrap();
        assert!(!adapter.get_bool("portfolio", "a", true));
        assert!(!adapter.get_bool("portfolio", "b", true));
        assert!(!adapter.get_bool("portfolio", "c", true));
    }

    #[test]
    fn get_bool_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[portfolio]\n").unwrap();
        assert!(adapter.get_bool("portfolio", "strict", true));
        assert!(!adapter.get_bool("portfolio", "strict", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[portfolio]\ntransactions = /tmp/history.csv\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("portfolio", "transactions"),
            Some("/tmp/history.csv".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").err().unwrap();
        assert!(matches!(err, FolioError::ConfigParse { .. }));
    }
}
