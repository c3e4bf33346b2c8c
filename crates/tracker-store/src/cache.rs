use std::collections::HashMap;

use radar_core::{normalize_ticker, SnapshotState, StockSnapshot};
use tokio::sync::RwLock;

/// The single owned snapshot cache, keyed by uppercase ticker.
///
/// Every consumer reads through this store; there are no per-view copies.
/// Entries are replaced wholesale on refresh (last write wins per ticker),
/// and derived tiers are never stored here.
#[derive(Default)]
pub struct SnapshotCache {
    inner: RwLock<HashMap<String, StockSnapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for the snapshot's ticker.
    pub async fn insert(&self, mut snapshot: StockSnapshot) {
        snapshot.ticker = normalize_ticker(&snapshot.ticker);
        let mut inner = self.inner.write().await;
        inner.insert(snapshot.ticker.clone(), snapshot);
    }

    pub async fn get(&self, ticker: &str) -> Option<StockSnapshot> {
        let inner = self.inner.read().await;
        inner.get(&normalize_ticker(ticker)).cloned()
    }

    /// Drop a ticker's entry, if any.
    pub async fn remove(&self, ticker: &str) {
        let mut inner = self.inner.write().await;
        inner.remove(&normalize_ticker(ticker));
    }

    /// A ticker's tagged state: enriched data or still pending.
    pub async fn state(&self, ticker: &str) -> SnapshotState {
        let ticker = normalize_ticker(ticker);
        let inner = self.inner.read().await;
        match inner.get(&ticker) {
            Some(snapshot) => SnapshotState::Ready(snapshot.clone()),
            None => SnapshotState::Pending { ticker },
        }
    }

    /// States for a set of tickers, in input order.
    pub async fn view(&self, tickers: &[String]) -> Vec<SnapshotState> {
        let inner = self.inner.read().await;
        tickers
            .iter()
            .map(|raw| {
                let ticker = normalize_ticker(raw);
                match inner.get(&ticker) {
                    Some(snapshot) => SnapshotState::Ready(snapshot.clone()),
                    None => SnapshotState::Pending { ticker },
                }
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(ticker: &str, price: f64) -> StockSnapshot {
        StockSnapshot {
            ticker: ticker.to_string(),
            price,
            blackrock_pct: 0.0,
            vanguard_pct: 0.0,
            market_cap: None,
            rank_category: None,
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_replaces_wholesale() {
        let cache = SnapshotCache::new();
        cache.insert(snapshot("aapl", 1.0)).await;
        cache.insert(snapshot("AAPL", 2.0)).await;

        assert_eq!(cache.len().await, 1);
        let snap = cache.get("AAPL").await.unwrap();
        assert_eq!(snap.price, 2.0);
    }

    #[tokio::test]
    async fn test_state_tags_missing_as_pending() {
        let cache = SnapshotCache::new();
        cache.insert(snapshot("AAPL", 1.0)).await;

        assert!(cache.state("AAPL").await.is_ready());
        let missing = cache.state("tsla").await;
        assert!(!missing.is_ready());
        assert_eq!(missing.ticker(), "TSLA");
    }

    #[tokio::test]
    async fn test_view_preserves_input_order() {
        let cache = SnapshotCache::new();
        cache.insert(snapshot("BBB", 1.0)).await;

        let view = cache
            .view(&["AAA".to_string(), "BBB".to_string(), "CCC".to_string()])
            .await;
        assert_eq!(view.len(), 3);
        assert_eq!(view[0].ticker(), "AAA");
        assert!(!view[0].is_ready());
        assert!(view[1].is_ready());
        assert!(!view[2].is_ready());
    }
}
