pub mod alerts;
pub mod cache;
pub mod db;
pub mod error;
pub mod models;
pub mod tickers;

pub use alerts::AlertManager;
pub use cache::SnapshotCache;
pub use db::TrackerDb;
pub use error::StoreError;
pub use models::*;
pub use tickers::UniverseManager;
