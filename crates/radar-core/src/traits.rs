use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::RadarError;
use crate::types::StockSnapshot;

/// Source of per-ticker snapshots.
///
/// Batch fetches return a partial map: a ticker that fails enrichment is
/// omitted, it never aborts the rest of the batch.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn get_snapshot(&self, ticker: &str) -> Result<StockSnapshot, RadarError>;

    async fn get_snapshots(&self, tickers: &[String]) -> HashMap<String, StockSnapshot>;
}
