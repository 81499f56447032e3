pub mod candle;
pub mod indicator;
pub mod signals;

pub use candle::*;
pub use indicator::*;
pub use signals::*;
