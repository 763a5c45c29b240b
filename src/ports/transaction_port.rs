//! Transaction history port trait.

use crate::domain::error::FolioError;
use crate::domain::transaction::Transaction;

pub trait TransactionPort {
    fn load_transactions(&self) -> Result<Vec<Transaction>, FolioError>;
}
