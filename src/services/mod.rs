pub mod backtester;
pub mod normalizer;
pub mod pipeline;
pub mod signals;

pub use backtester::{evaluate, BacktestResult};
pub use normalizer::{normalize, normalize_series};
pub use pipeline::{analyze, analyze_batch, AnalysisContext, StockInput, StockReport};
pub use signals::{
    classify, detect_ma55_breakthrough, IndicatorKind, IndicatorSet, SignalClassifier, TimeWindow,
    TrendStateDetector,
};
