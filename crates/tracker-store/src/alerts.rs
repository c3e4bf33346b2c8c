use radar_core::normalize_ticker;

use crate::db::TrackerDb;
use crate::error::StoreError;
use crate::models::{AlertFilter, AlertInput, PriceAlert};

pub struct AlertManager {
    db: TrackerDb,
}

impl AlertManager {
    pub fn new(db: TrackerDb) -> Self {
        Self { db }
    }

    /// Create a new alert. Rejects non-positive targets and blank tickers
    /// before anything touches the database.
    pub async fn create_alert(&self, input: AlertInput) -> Result<i64, StoreError> {
        let ticker = normalize_ticker(&input.ticker);
        if ticker.is_empty() {
            return Err(StoreError::Validation("alert ticker is empty".to_string()));
        }
        if !(input.target_price > 0.0) {
            return Err(StoreError::Validation(format!(
                "alert target price must be positive, got {}",
                input.target_price
            )));
        }

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO price_alerts (ticker, target_price, condition, active, triggered, created_at)
            VALUES (?, ?, ?, 1, 0, ?)
            RETURNING id
            "#,
        )
        .bind(&ticker)
        .bind(input.target_price)
        .bind(input.condition)
        .bind(chrono::Utc::now().to_rfc3339())
        .fetch_one(self.db.pool())
        .await?;

        Ok(id)
    }

    /// Get alert by ID
    pub async fn get_alert(&self, id: i64) -> Result<Option<PriceAlert>, StoreError> {
        let alert = sqlx::query_as::<_, PriceAlert>("SELECT * FROM price_alerts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(alert)
    }

    /// List alerts. Triggered-only is ordered by trigger time (falling back
    /// to creation time) descending; the others newest-created first.
    pub async fn list_alerts(&self, filter: AlertFilter) -> Result<Vec<PriceAlert>, StoreError> {
        let query = match filter {
            AlertFilter::All => "SELECT * FROM price_alerts ORDER BY created_at DESC",
            AlertFilter::ActiveOnly => {
                "SELECT * FROM price_alerts WHERE active = 1 AND triggered = 0 ORDER BY created_at DESC"
            }
            AlertFilter::TriggeredOnly => {
                "SELECT * FROM price_alerts WHERE triggered = 1 ORDER BY COALESCE(triggered_at, created_at) DESC"
            }
        };

        let alerts = sqlx::query_as::<_, PriceAlert>(query)
            .fetch_all(self.db.pool())
            .await?;

        Ok(alerts)
    }

    /// Alerts still waiting for a crossing on a specific ticker.
    pub async fn open_alerts_for_ticker(&self, ticker: &str) -> Result<Vec<PriceAlert>, StoreError> {
        let alerts = sqlx::query_as::<_, PriceAlert>(
            "SELECT * FROM price_alerts WHERE ticker = ? AND active = 1 AND triggered = 0 ORDER BY created_at DESC",
        )
        .bind(normalize_ticker(ticker))
        .fetch_all(self.db.pool())
        .await?;

        Ok(alerts)
    }

    /// Record a trigger observation. Compare-and-set on the `triggered`
    /// flag: returns true only for the call that wins the transition, so a
    /// second crossing can never overwrite `triggered_at`/`triggered_price`.
    pub async fn record_trigger(&self, id: i64, observed_price: f64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE price_alerts
            SET triggered = 1, active = 0, triggered_at = ?, triggered_price = ?
            WHERE id = ? AND triggered = 0
            "#,
        )
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(observed_price)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete an alert. Idempotent: deleting an id that is already gone is
    /// a no-op success.
    pub async fn delete_alert(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM price_alerts WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }
}
