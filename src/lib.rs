//! kline-signals - technical indicator, trend-state and backtest core for
//! equity candle series

pub mod config;
pub mod error;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use config::{Config, IndicatorParams, RsiLine};
pub use error::{AppError, Result};
pub use services::{analyze, analyze_batch, AnalysisContext, StockInput, StockReport};
pub use types::*;
