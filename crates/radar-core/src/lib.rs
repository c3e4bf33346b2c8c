pub mod error;
pub mod traits;
pub mod types;

pub use error::RadarError;
pub use traits::SnapshotSource;
pub use types::{
    normalize_ticker, FireLevel, RankCategory, ScanProgress, ScanStatus, SnapshotState,
    StockSnapshot,
};
