pub mod stats;
pub mod trend_row;
pub mod window;

pub use stats::{PriceStats, Stats};
pub use trend_row::{TrendGranularity, TrendKey, TrendRow, round_output};
pub use window::{DEFAULT_ROLLING_MONTHS, RollingWindow, WindowAnchor};
