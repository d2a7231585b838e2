//! Domain error types.
//!
//! Order-level failures (over-budget buy, sell of an unheld code) are plain
//! `bool` returns on the ledger and never surface here; this type covers the
//! conditions that abort a run before or after the day loop.

/// Top-level error type for duotrader.
#[derive(Debug, thiserror::Error)]
pub enum DuotraderError {
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

    #[error("data error: {reason}")]
    Data { reason: String },

    /// The only fatal condition inside a composed dual-market run: without a
    /// single exchange-rate observation there is no value to fall back to.
    #[error("exchange rate series is empty")]
    EmptyExchangeRate,

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&DuotraderError> for std::process::ExitCode {
    fn from(err: &DuotraderError) -> Self {
        let code: u8 = match err {
            DuotraderError::Io(_) => 1,
            DuotraderError::ConfigParse { .. }
            | DuotraderError::ConfigMissing { .. }
            | DuotraderError::ConfigInvalid { .. } => 2,
            DuotraderError::Data { .. } => 3,
            DuotraderError::EmptyExchangeRate => 4,
            DuotraderError::Report { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
