//! Domain error types.

/// Top-level error type for spotsim.
#[derive(Debug, thiserror::Error)]
pub enum SpotsimError {
    #[error("market data error for {symbol}: {reason}")]
    Gateway { symbol: String, reason: String },

    #[error("persistence error: {reason}")]
    Persistence { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid symbol {symbol:?}: expected BASE/QUOTE")]
    InvalidSymbol { symbol: String },

    #[error("invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("no open order at position {index}")]
    OrderNotFound { index: usize },

    #[error("render error: {reason}")]
    Render { reason: String },

    #[error("terminal error: {reason}")]
    Terminal { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SpotsimError {
    pub fn gateway(symbol: &str, reason: impl std::fmt::Display) -> Self {
        SpotsimError::Gateway {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn persistence(reason: impl std::fmt::Display) -> Self {
        SpotsimError::Persistence {
            reason: reason.to_string(),
        }
    }
}

impl From<&SpotsimError> for std::process::ExitCode {
    fn from(err: &SpotsimError) -> Self {
        let code: u8 = match err {
            SpotsimError::Io(_) | SpotsimError::Terminal { .. } => 1,
            SpotsimError::ConfigParse { .. } | SpotsimError::ConfigInvalid { .. } => 2,
            SpotsimError::Persistence { .. } => 3,
            SpotsimError::Gateway { .. } => 4,
            SpotsimError::InvalidSymbol { .. }
            | SpotsimError::InvalidOrder { .. }
            | SpotsimError::OrderNotFound { .. }
            | SpotsimError::Render { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
