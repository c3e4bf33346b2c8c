use std::sync::Arc;

use anyhow::Result;
use tracker_store::{AlertFilter, AlertManager, SnapshotCache};

/// Advances price alerts against the latest cached prices.
///
/// The evaluator holds no trigger state of its own: the strict crossing
/// check lives on `AlertCondition`, and the exactly-once transition is the
/// registry's compare-and-set. A ticker with no cached snapshot is simply
/// skipped until a scan fills the gap.
pub struct AlertEvaluator {
    alerts: AlertManager,
    cache: Arc<SnapshotCache>,
}

impl AlertEvaluator {
    pub fn new(alerts: AlertManager, cache: Arc<SnapshotCache>) -> Self {
        Self { alerts, cache }
    }

    /// Evaluate every open alert once. Returns how many fired.
    pub async fn evaluate_once(&self) -> Result<usize> {
        let open = self.alerts.list_alerts(AlertFilter::ActiveOnly).await?;
        let mut fired = 0;

        for alert in open {
            let Some(id) = alert.id else { continue };

            let Some(snapshot) = self.cache.get(&alert.ticker).await else {
                continue;
            };

            if !alert.condition.is_crossed(snapshot.price, alert.target_price) {
                continue;
            }

            if self.alerts.record_trigger(id, snapshot.price).await? {
                tracing::info!(
                    "Alert {} fired: {} {} {:.2} (observed {:.2})",
                    id,
                    alert.ticker,
                    alert.condition.as_str(),
                    alert.target_price,
                    snapshot.price
                );
                fired += 1;
            }
        }

        Ok(fired)
    }
}
