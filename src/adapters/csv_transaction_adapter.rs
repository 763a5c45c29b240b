//! Brokerage history CSV adapter.
//!
//! Expected header: `date,type,ticker,shares,price,commission,amount`.
//! Share rows fill `ticker`, `shares`, `price` and optionally `commission`;
//! cash rows fill `amount` (and `ticker` for dividends). Withdrawal amounts
//! may be written signed, as most brokers export them.

use crate::domain::error::FolioError;
use crate::domain::order_type::OrderType;
use crate::domain::transaction::Transaction;
use crate::ports::transaction_port::TransactionPort;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

const COLUMNS: [&str; 7] = ["date", "type", "ticker", "shares", "price", "commission", "amount"];

pub struct CsvTransactionAdapter {
    path: PathBuf,
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

impl CsvTransactionAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn parse_row(
        record: &csv::StringRecord,
        index: &[usize; 7],
    ) -> Result<Transaction, String> {
        let get = |col: usize| record.get(index[col]).map(str::trim).unwrap_or("");
        let decimal = |col: usize| -> Result<Option<Decimal>, String> {
            match get(col) {
                "" => Ok(None),
                v => Decimal::from_str(v)
                    .map(Some)
                    .map_err(|e| format!("invalid {} value {v:?}: {e}", COLUMNS[col])),
            }
        };
        let required = |col: usize| -> Result<Decimal, String> {
            decimal(col)?.ok_or_else(|| format!("missing {}", COLUMNS[col]))
        };

        let settlement =
            parse_timestamp(get(0)).ok_or_else(|| format!("invalid date {:?}", get(0)))?;
        let order_type = OrderType::from_str(get(1)).map_err(|e| e.to_string())?;
        let ticker = get(2);

        let tx = if order_type.is_share() {
            Transaction::share(
                order_type,
                ticker,
                settlement,
                required(3)?,
                required(4)?,
                decimal(5)?.unwrap_or(Decimal::ZERO),
            )
        } else {
            let mut amount = required(6)?;
            if order_type == OrderType::Withdrawal {
                amount = amount.abs();
            }
            let ticker = (!ticker.is_empty()).then_some(ticker);
            Transaction::cash(order_type, ticker, settlement, amount)
        };
        tx.map_err(|e| e.to_string())
    }
}

impl TransactionPort for CsvTransactionAdapter {
    fn load_transactions(&self) -> Result<Vec<Transaction>, FolioError> {
        let file = self.path.display().to_string();
        let content = fs::read_to_string(&self.path).map_err(|e| FolioError::Csv {
            file: file.clone(),
            reason: format!("failed to read: {e}"),
        })?;
        let csv_err = |line: usize, reason: String| FolioError::Csv {
            file: file.clone(),
            reason: format!("line {line}: {reason}"),
        };

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| csv_err(1, e.to_string()))?.clone();
        let mut index = [0usize; 7];
        for (slot, name) in index.iter_mut().zip(COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| csv_err(1, format!("missing {name} column")))?;
        }

        let mut transactions = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let line = i + 2;
            let record = result.map_err(|e| csv_err(line, e.to_string()))?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            let tx = Self::parse_row(&record, &index).map_err(|reason| csv_err(line, reason))?;
            transactions.push(tx);
        }
        tracing::info!(%file, count = transactions.len(), "loaded transactions");
        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn write_history(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_every_kind() {
        let (_dir, path) = write_history(
            "date,type,ticker,shares,price,commission,amount\n\
             2011-07-25,Deposit,,,,,1000\n\
             2011-07-26,Buy,de,2,50,7.95,\n\
             2011-08-15,Dividend,DE,,,,0.82\n\
             2011-08-15,Reinvest,DE,0.01,51,,\n\
             2011-09-26,Sell,DE,2,75,7.95,\n\
             2011-09-27,Sell Short,IBM,1,170,7.95,\n\
             2011-09-30,Buy to Cover,IBM,1,165,7.95,\n\
             2011-10-03,Withdrawal,,,,,-250\n",
        );
        let txs = CsvTransactionAdapter::new(path).load_transactions().unwrap();
        assert_eq!(txs.len(), 8);
        assert_eq!(
            txs[1],
            Transaction::buy("DE", date(2011, 7, 26), dec!(2), dec!(50), dec!(7.95)).unwrap()
        );
        assert_eq!(txs[3].commission(), Some(Decimal::ZERO));
        assert_eq!(txs[5].order_type(), OrderType::SellShort);
        assert_eq!(txs[7].amount(), Some(dec!(-250)));
    }

    #[test]
    fn columns_found_by_name() {
        let (_dir, path) = write_history(
            "type,date,amount,ticker,shares,price,commission\n\
             deposit,2011-07-25,100,,,,\n",
        );
        let txs = CsvTransactionAdapter::new(path).load_transactions().unwrap();
        assert_eq!(txs, vec![Transaction::deposit(date(2011, 7, 25), dec!(100)).unwrap()]);
    }

    #[test]
    fn timestamps_with_time_of_day() {
        let (_dir, path) = write_history(
            "date,type,ticker,shares,price,commission,amount\n\
             2011-07-25 09:30:00,deposit,,,,,100\n",
        );
        let txs = CsvTransactionAdapter::new(path).load_transactions().unwrap();
        assert_eq!(
            txs[0].settlement(),
            NaiveDate::from_ymd_opt(2011, 7, 25)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn unknown_type_reports_line() {
        let (_dir, path) = write_history(
            "date,type,ticker,shares,price,commission,amount\n\
             2011-07-25,deposit,,,,,100\n\
             2011-07-26,transfer,,,,,100\n",
        );
        match CsvTransactionAdapter::new(path).load_transactions() {
            Err(FolioError::Csv { reason, .. }) => {
                assert!(reason.contains("line 3"), "{reason}");
                assert!(reason.contains("transfer"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn negative_shares_rejected() {
        let (_dir, path) = write_history(
            "date,type,ticker,shares,price,commission,amount\n\
             2011-07-26,buy,DE,-2,50,0,\n",
        );
        assert!(CsvTransactionAdapter::new(path).load_transactions().is_err());
    }

    #[test]
    fn missing_price_rejected() {
        let (_dir, path) = write_history(
            "date,type,ticker,shares,price,commission,amount\n\
             2011-07-26,buy,DE,2,,0,\n",
        );
        assert!(CsvTransactionAdapter::new(path).load_transactions().is_err());
    }

    #[test]
    fn missing_column_rejected() {
        let (_dir, path) = write_history("date,type,ticker,shares,price\n");
        assert!(matches!(
            CsvTransactionAdapter::new(path).load_transactions(),
            Err(FolioError::Csv { .. })
        ));
    }

    #[test]
    fn blank_lines_skipped() {
        let (_dir, path) = write_history(
            "date,type,ticker,shares,price,commission,amount\n\
             ,,,,,,\n\
             2011-07-25,deposit,,,,,100\n",
        );
        assert_eq!(CsvTransactionAdapter::new(path).load_transactions().unwrap().len(), 1);
    }
}
