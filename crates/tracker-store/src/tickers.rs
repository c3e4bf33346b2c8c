use std::collections::HashSet;

use radar_core::normalize_ticker;

use crate::db::TrackerDb;
use crate::error::StoreError;
use crate::models::{UniverseRow, Watchlist};

/// Universe, watchlists, and the holdings tag.
///
/// All three share the set semantics: uppercase-normalized membership,
/// idempotent add, no-op remove, wholesale bulk replace.
pub struct UniverseManager {
    db: TrackerDb,
}

impl UniverseManager {
    pub fn new(db: TrackerDb) -> Self {
        Self { db }
    }

    // ======== Universe ========

    /// Add a ticker to the universe. Returns whether it was actually
    /// inserted (false = already present).
    pub async fn add_ticker(&self, ticker: &str) -> Result<bool, StoreError> {
        let ticker = normalize_ticker(ticker);
        if ticker.is_empty() {
            return Err(StoreError::Validation("ticker is empty".to_string()));
        }

        let result = sqlx::query("INSERT OR IGNORE INTO universe (ticker, added_at) VALUES (?, ?)")
            .bind(&ticker)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Add a batch of tickers. Blank entries and duplicates within the
    /// batch are dropped; returns the count actually inserted.
    pub async fn add_tickers(&self, tickers: &[String]) -> Result<usize, StoreError> {
        let mut seen = HashSet::new();
        let mut added = 0;

        for raw in tickers {
            let ticker = normalize_ticker(raw);
            if ticker.is_empty() || !seen.insert(ticker.clone()) {
                continue;
            }
            if self.add_ticker(&ticker).await? {
                added += 1;
            }
        }

        Ok(added)
    }

    /// Remove a ticker. No-op success if it was never tracked.
    pub async fn remove_ticker(&self, ticker: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM universe WHERE ticker = ?")
            .bind(normalize_ticker(ticker))
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Wholesale swap of the universe: members missing from `tickers` are
    /// removed, new ones inserted, retained rows keep their metadata
    /// (holdings tag, scan stamp). Returns (added, removed).
    pub async fn replace_universe(&self, tickers: &[String]) -> Result<(usize, usize), StoreError> {
        let mut wanted = Vec::new();
        let mut wanted_set = HashSet::new();
        for raw in tickers {
            let ticker = normalize_ticker(raw);
            if !ticker.is_empty() && wanted_set.insert(ticker.clone()) {
                wanted.push(ticker);
            }
        }

        let mut tx = self.db.pool().begin().await?;

        let existing: Vec<(String,)> = sqlx::query_as("SELECT ticker FROM universe")
            .fetch_all(&mut *tx)
            .await?;
        let existing_set: HashSet<String> = existing.into_iter().map(|(t,)| t).collect();

        let mut removed = 0;
        for ticker in existing_set.difference(&wanted_set) {
            sqlx::query("DELETE FROM universe WHERE ticker = ?")
                .bind(ticker)
                .execute(&mut *tx)
                .await?;
            removed += 1;
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut added = 0;
        for ticker in &wanted {
            if !existing_set.contains(ticker) {
                sqlx::query("INSERT INTO universe (ticker, added_at) VALUES (?, ?)")
                    .bind(ticker)
                    .bind(&now)
                    .execute(&mut *tx)
                    .await?;
                added += 1;
            }
        }

        tx.commit().await?;

        Ok((added, removed))
    }

    /// Membership test (primary-key lookup).
    pub async fn contains(&self, ticker: &str) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM universe WHERE ticker = ?")
            .bind(normalize_ticker(ticker))
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.is_some())
    }

    /// All universe rows in insertion order.
    pub async fn universe(&self) -> Result<Vec<UniverseRow>, StoreError> {
        let rows = sqlx::query_as::<_, UniverseRow>(
            "SELECT ticker, is_holding, added_at, scanned_at FROM universe ORDER BY rowid",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows)
    }

    /// All universe tickers in insertion order.
    pub async fn tickers(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT ticker FROM universe ORDER BY rowid")
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    /// Universe tickers never touched by a scan.
    pub async fn unscanned_tickers(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT ticker FROM universe WHERE scanned_at IS NULL ORDER BY rowid")
                .fetch_all(self.db.pool())
                .await?;

        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    /// Stamp a ticker as scanned.
    pub async fn mark_scanned(&self, ticker: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE universe SET scanned_at = ? WHERE ticker = ?")
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(normalize_ticker(ticker))
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    // ======== Holdings tag ========

    /// Tag (or untag) a universe ticker as currently held. The tag lives
    /// on the universe row, so an unknown ticker is an error.
    pub async fn set_holding(&self, ticker: &str, held: bool) -> Result<(), StoreError> {
        let ticker = normalize_ticker(ticker);
        let result = sqlx::query("UPDATE universe SET is_holding = ? WHERE ticker = ?")
            .bind(held)
            .bind(&ticker)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "ticker {} is not in the universe",
                ticker
            )));
        }

        Ok(())
    }

    /// Tickers currently tagged as held.
    pub async fn holdings(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT ticker FROM universe WHERE is_holding = 1 ORDER BY rowid")
                .fetch_all(self.db.pool())
                .await?;

        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    // ======== Watchlists ========

    /// Create a watchlist. Idempotent: an existing name returns its id.
    pub async fn create_watchlist(&self, name: &str) -> Result<i64, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("watchlist name is empty".to_string()));
        }

        sqlx::query("INSERT OR IGNORE INTO watchlists (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(self.db.pool())
            .await?;

        let (id,): (i64,) = sqlx::query_as("SELECT id FROM watchlists WHERE name = ?")
            .bind(name)
            .fetch_one(self.db.pool())
            .await?;

        Ok(id)
    }

    pub async fn list_watchlists(&self) -> Result<Vec<Watchlist>, StoreError> {
        let lists = sqlx::query_as::<_, Watchlist>(
            "SELECT id, name, created_at FROM watchlists ORDER BY name",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(lists)
    }

    /// Delete a watchlist and its items. No-op success on an unknown name.
    pub async fn delete_watchlist(&self, name: &str) -> Result<(), StoreError> {
        let Some(id) = self.watchlist_id(name).await? else {
            return Ok(());
        };

        let mut tx = self.db.pool().begin().await?;
        sqlx::query("DELETE FROM watchlist_items WHERE watchlist_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM watchlists WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Add a ticker to a named watchlist. Returns whether it was inserted.
    pub async fn add_to_watchlist(&self, name: &str, ticker: &str) -> Result<bool, StoreError> {
        let id = self.require_watchlist(name).await?;
        let ticker = normalize_ticker(ticker);
        if ticker.is_empty() {
            return Err(StoreError::Validation("ticker is empty".to_string()));
        }

        let result = sqlx::query(
            "INSERT OR IGNORE INTO watchlist_items (watchlist_id, ticker, added_at) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(&ticker)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Batch add with the same dedup accounting as the universe.
    pub async fn add_many_to_watchlist(
        &self,
        name: &str,
        tickers: &[String],
    ) -> Result<usize, StoreError> {
        self.require_watchlist(name).await?;

        let mut seen = HashSet::new();
        let mut added = 0;
        for raw in tickers {
            let ticker = normalize_ticker(raw);
            if ticker.is_empty() || !seen.insert(ticker.clone()) {
                continue;
            }
            if self.add_to_watchlist(name, &ticker).await? {
                added += 1;
            }
        }

        Ok(added)
    }

    /// Remove a ticker from a watchlist. No-op success if absent.
    pub async fn remove_from_watchlist(&self, name: &str, ticker: &str) -> Result<(), StoreError> {
        let id = self.require_watchlist(name).await?;

        sqlx::query("DELETE FROM watchlist_items WHERE watchlist_id = ? AND ticker = ?")
            .bind(id)
            .bind(normalize_ticker(ticker))
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Watchlist members in insertion order.
    pub async fn watchlist_tickers(&self, name: &str) -> Result<Vec<String>, StoreError> {
        let id = self.require_watchlist(name).await?;

        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT ticker FROM watchlist_items WHERE watchlist_id = ? ORDER BY rowid",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    /// Wholesale swap of a watchlist's members. Returns (added, removed).
    pub async fn replace_watchlist(
        &self,
        name: &str,
        tickers: &[String],
    ) -> Result<(usize, usize), StoreError> {
        let id = self.require_watchlist(name).await?;

        let mut wanted = Vec::new();
        let mut wanted_set = HashSet::new();
        for raw in tickers {
            let ticker = normalize_ticker(raw);
            if !ticker.is_empty() && wanted_set.insert(ticker.clone()) {
                wanted.push(ticker);
            }
        }

        let mut tx = self.db.pool().begin().await?;

        let existing: Vec<(String,)> =
            sqlx::query_as("SELECT ticker FROM watchlist_items WHERE watchlist_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        let existing_set: HashSet<String> = existing.into_iter().map(|(t,)| t).collect();

        let mut removed = 0;
        for ticker in existing_set.difference(&wanted_set) {
            sqlx::query("DELETE FROM watchlist_items WHERE watchlist_id = ? AND ticker = ?")
                .bind(id)
                .bind(ticker)
                .execute(&mut *tx)
                .await?;
            removed += 1;
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut added = 0;
        for ticker in &wanted {
            if !existing_set.contains(ticker) {
                sqlx::query(
                    "INSERT INTO watchlist_items (watchlist_id, ticker, added_at) VALUES (?, ?, ?)",
                )
                .bind(id)
                .bind(ticker)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
                added += 1;
            }
        }

        tx.commit().await?;

        Ok((added, removed))
    }

    async fn watchlist_id(&self, name: &str) -> Result<Option<i64>, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM watchlists WHERE name = ?")
            .bind(name.trim())
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|(id,)| id))
    }

    async fn require_watchlist(&self, name: &str) -> Result<i64, StoreError> {
        self.watchlist_id(name)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("watchlist {} does not exist", name.trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> UniverseManager {
        let db = TrackerDb::new("sqlite::memory:").await.unwrap();
        UniverseManager::new(db)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_is_idempotent_and_normalizes() {
        let manager = setup().await;

        assert!(manager.add_ticker("aapl").await.unwrap());
        assert!(!manager.add_ticker("AAPL").await.unwrap());
        assert!(!manager.add_ticker(" Aapl ").await.unwrap());

        assert_eq!(manager.tickers().await.unwrap(), vec!["AAPL"]);
        assert!(manager.contains("aapl").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_rejects_blank() {
        let manager = setup().await;
        let err = manager.add_ticker("   ").await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_add_many_reports_actual_additions() {
        let manager = setup().await;
        manager.add_ticker("AAPL").await.unwrap();

        // One already present, one duplicated in the batch, one blank.
        let added = manager
            .add_tickers(&strings(&["aapl", "TSLA", "tsla", "MSFT", ""]))
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(manager.tickers().await.unwrap(), vec!["AAPL", "TSLA", "MSFT"]);
    }

    #[tokio::test]
    async fn test_remove_is_noop_when_absent() {
        let manager = setup().await;
        manager.add_ticker("AAPL").await.unwrap();

        manager.remove_ticker("TSLA").await.unwrap();
        manager.remove_ticker("AAPL").await.unwrap();
        assert!(manager.tickers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_universe_swaps_and_preserves_metadata() {
        let manager = setup().await;
        manager
            .add_tickers(&strings(&["AAPL", "TSLA", "MSFT"]))
            .await
            .unwrap();
        manager.set_holding("TSLA", true).await.unwrap();

        let (added, removed) = manager
            .replace_universe(&strings(&["TSLA", "NVDA"]))
            .await
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(removed, 2);

        let mut tickers = manager.tickers().await.unwrap();
        tickers.sort();
        assert_eq!(tickers, vec!["NVDA", "TSLA"]);

        // The retained row kept its holdings tag.
        assert_eq!(manager.holdings().await.unwrap(), vec!["TSLA"]);
    }

    #[tokio::test]
    async fn test_holdings_tag() {
        let manager = setup().await;
        manager.add_tickers(&strings(&["AAPL", "TSLA"])).await.unwrap();

        manager.set_holding("aapl", true).await.unwrap();
        assert_eq!(manager.holdings().await.unwrap(), vec!["AAPL"]);

        manager.set_holding("AAPL", false).await.unwrap();
        assert!(manager.holdings().await.unwrap().is_empty());

        let err = manager.set_holding("NVDA", true).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_watchlists_are_independent_and_may_overlap() {
        let manager = setup().await;
        manager.create_watchlist("biotech").await.unwrap();
        manager.create_watchlist("value").await.unwrap();

        manager.add_to_watchlist("biotech", "XYZ").await.unwrap();
        manager.add_to_watchlist("value", "xyz").await.unwrap();
        manager.add_to_watchlist("value", "ABC").await.unwrap();

        assert_eq!(manager.watchlist_tickers("biotech").await.unwrap(), vec!["XYZ"]);
        assert_eq!(
            manager.watchlist_tickers("value").await.unwrap(),
            vec!["XYZ", "ABC"]
        );

        manager.remove_from_watchlist("value", "XYZ").await.unwrap();
        assert_eq!(manager.watchlist_tickers("biotech").await.unwrap(), vec!["XYZ"]);
    }

    #[tokio::test]
    async fn test_create_watchlist_is_idempotent() {
        let manager = setup().await;
        let first = manager.create_watchlist("core").await.unwrap();
        let second = manager.create_watchlist("core").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.list_watchlists().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_watchlist_not_found() {
        let manager = setup().await;
        let err = manager.add_to_watchlist("ghost", "AAPL").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_replace_watchlist() {
        let manager = setup().await;
        manager.create_watchlist("core").await.unwrap();
        manager
            .add_many_to_watchlist("core", &strings(&["AAPL", "TSLA"]))
            .await
            .unwrap();

        let (added, removed) = manager
            .replace_watchlist("core", &strings(&["TSLA", "NVDA", "nvda"]))
            .await
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(removed, 1);

        let mut tickers = manager.watchlist_tickers("core").await.unwrap();
        tickers.sort();
        assert_eq!(tickers, vec!["NVDA", "TSLA"]);
    }

    #[tokio::test]
    async fn test_delete_watchlist_noop_when_absent() {
        let manager = setup().await;
        manager.create_watchlist("core").await.unwrap();
        manager.add_to_watchlist("core", "AAPL").await.unwrap();

        manager.delete_watchlist("core").await.unwrap();
        manager.delete_watchlist("core").await.unwrap();

        assert!(manager.list_watchlists().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_bookkeeping() {
        let manager = setup().await;
        manager.add_tickers(&strings(&["AAPL", "TSLA"])).await.unwrap();

        assert_eq!(manager.unscanned_tickers().await.unwrap().len(), 2);
        manager.mark_scanned("AAPL").await.unwrap();
        assert_eq!(manager.unscanned_tickers().await.unwrap(), vec!["TSLA"]);
    }
}
