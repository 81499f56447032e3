use thiserror::Error;

/// Application error types.
///
/// Malformed market data never produces one of these; it propagates as an
/// undefined indicator value instead. Only invalid caller input and
/// configuration problems fail loudly.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Percent out of range [0, 1]: {0}")]
    PercentOutOfRange(f64),

    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("Unknown period: {0}")]
    UnknownPeriod(String),

    #[error("Unknown market: {0}")]
    UnknownMarket(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
