//! Domain error types.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::resolution::Resolution;

/// Broad failure category, used for exit codes and for callers that only
/// care about what kind of thing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidOperation,
    Data,
    Config,
    Io,
}

/// Top-level error type for folio.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    #[error("invalid price period {head} .. {tail}: {reason}")]
    InvalidPeriod {
        head: NaiveDateTime,
        tail: NaiveDateTime,
        reason: String,
    },

    #[error("insufficient funds on {date}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        date: NaiveDateTime,
        balance: Decimal,
        requested: Decimal,
    },

    #[error("cannot close {requested} shares of {ticker} on {date}: only {available} open")]
    InsufficientShares {
        ticker: String,
        date: NaiveDateTime,
        available: Decimal,
        requested: Decimal,
    },

    #[error("transaction for {got} does not belong to position {expected}")]
    TickerMismatch { expected: String, got: String },

    #[error("cannot resample {from} data to {to}")]
    Resample { from: Resolution, to: Resolution },

    #[error("price period {head} .. {tail} overlaps existing data for {ticker}")]
    OverlappingPeriod {
        ticker: String,
        head: NaiveDateTime,
        tail: NaiveDateTime,
    },

    #[error("price series for {ticker} is empty")]
    EmptySeries { ticker: String },

    #[error("invalid operation: {reason}")]
    InvalidOperation { reason: String },

    #[error("unknown order type: {0}")]
    UnknownOrderType(String),

    #[error("no price for {ticker} at {at}")]
    NoPriceData { ticker: String, at: NaiveDateTime },

    #[error("CSV error in {file}: {reason}")]
    Csv { file: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FolioError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        FolioError::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn operation(reason: impl Into<String>) -> Self {
        FolioError::InvalidOperation {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FolioError::InvalidArgument { .. } | FolioError::InvalidPeriod { .. } => {
                ErrorKind::InvalidArgument
            }
            FolioError::InsufficientFunds { .. }
            | FolioError::InsufficientShares { .. }
            | FolioError::TickerMismatch { .. }
            | FolioError::Resample { .. }
            | FolioError::OverlappingPeriod { .. }
            | FolioError::EmptySeries { .. }
            | FolioError::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            FolioError::UnknownOrderType(_)
            | FolioError::NoPriceData { .. }
            | FolioError::Csv { .. } => ErrorKind::Data,
            FolioError::ConfigParse { .. }
            | FolioError::ConfigMissing { .. }
            | FolioError::ConfigInvalid { .. } => ErrorKind::Config,
            FolioError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<&FolioError> for std::process::ExitCode {
    fn from(err: &FolioError) -> Self {
        let code: u8 = match err.kind() {
            ErrorKind::Io => 1,
            ErrorKind::Config => 2,
            ErrorKind::Data => 3,
            ErrorKind::InvalidArgument => 4,
            ErrorKind::InvalidOperation => 5,
        };
        std::process::ExitCode::from(code)
    }
}
