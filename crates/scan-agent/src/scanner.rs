use std::sync::Arc;

use anyhow::Result;
use futures_util::stream::{self, StreamExt};
use radar_core::{ScanProgress, ScanStatus, SnapshotSource, SnapshotState};
use screener::{rank_category, summarize, QualifyRule, ScanSummary};
use tokio::sync::RwLock;
use tracker_store::{SnapshotCache, UniverseManager};

/// Runs enrichment passes over the tracked universe.
///
/// Each ticker is fetched independently; a failure is logged and leaves a
/// gap, it never aborts the pass. Scan state is published through a shared
/// `ScanStatus` for display gating.
pub struct UniverseScanner {
    source: Arc<dyn SnapshotSource>,
    universe: Arc<UniverseManager>,
    cache: Arc<SnapshotCache>,
    rule: QualifyRule,
    concurrency: usize,
    status: Arc<RwLock<ScanStatus>>,
}

impl UniverseScanner {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        universe: Arc<UniverseManager>,
        cache: Arc<SnapshotCache>,
        rule: QualifyRule,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            universe,
            cache,
            rule,
            concurrency: concurrency.max(1),
            status: Arc::new(RwLock::new(ScanStatus::default())),
        }
    }

    /// Shared handle for status readers (progress loggers, display layers).
    pub fn status_handle(&self) -> Arc<RwLock<ScanStatus>> {
        Arc::clone(&self.status)
    }

    pub async fn status(&self) -> ScanStatus {
        self.status.read().await.clone()
    }

    /// Run one enrichment pass. `new_only` restricts the pass to tickers
    /// never scanned before.
    pub async fn run_scan(&self, new_only: bool) -> Result<ScanSummary> {
        let tickers = if new_only {
            self.universe.unscanned_tickers().await
        } else {
            self.universe.tickers().await
        };

        let tickers = match tickers {
            Ok(tickers) => tickers,
            Err(e) => {
                let mut status = self.status.write().await;
                status.scanning = false;
                status.progress = None;
                status.error = Some(e.to_string());
                return Err(e.into());
            }
        };

        let total = tickers.len();
        {
            let mut status = self.status.write().await;
            status.scanning = true;
            status.progress = Some(ScanProgress::new(0, total));
            status.error = None;
        }

        tracing::info!(
            "Starting {} scan of {} tickers",
            if new_only { "new-only" } else { "full" },
            total
        );

        let mut rows: Vec<SnapshotState> = Vec::with_capacity(total);
        let mut completed = 0usize;
        let mut failures = 0usize;

        let mut fetches = stream::iter(tickers.iter().cloned())
            .map(|ticker| {
                let source = Arc::clone(&self.source);
                async move {
                    let result = source.get_snapshot(&ticker).await;
                    (ticker, result)
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some((ticker, result)) = fetches.next().await {
            match result {
                Ok(mut snapshot) => {
                    snapshot.rank_category =
                        Some(rank_category(snapshot.blackrock_pct, snapshot.vanguard_pct));

                    if self.rule.qualifies(&snapshot) {
                        tracing::debug!(
                            "{} qualifies: ${:.2} BR {:.1}% VG {:.1}%",
                            snapshot.ticker,
                            snapshot.price,
                            snapshot.blackrock_pct,
                            snapshot.vanguard_pct
                        );
                        rows.push(SnapshotState::Ready(snapshot.clone()));
                        self.cache.insert(snapshot).await;
                    } else {
                        // A stale entry from an earlier pass must not
                        // outlive a refresh that disqualified it.
                        self.cache.remove(&ticker).await;
                        rows.push(SnapshotState::Pending { ticker });
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to enrich {}: {}", ticker, e);
                    failures += 1;
                    rows.push(SnapshotState::Pending { ticker });
                }
            }

            // Attempted tickers are stamped either way; new-only mode
            // skips them next pass, matching the processed-set behavior.
            if let Err(e) = self.universe.mark_scanned(rows[rows.len() - 1].ticker()).await {
                tracing::warn!("Failed to stamp scan time: {}", e);
            }

            completed += 1;
            let mut status = self.status.write().await;
            status.progress = Some(ScanProgress::new(completed, total));
        }

        let summary = summarize(&rows);

        {
            let mut status = self.status.write().await;
            status.scanning = false;
            status.progress = None;
            status.last_scan = Some(chrono::Utc::now());
        }

        tracing::info!(
            "Scan complete: {}/{} processed, {} qualified, {} failed",
            completed,
            total,
            summary.qualifying,
            failures
        );

        Ok(summary)
    }
}
