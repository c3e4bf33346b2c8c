use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use holdings_client::HoldingsClient;
use tokio::signal::unix::SignalKind;
use tokio::time;
use tracker_store::{AlertManager, SnapshotCache, TrackerDb, UniverseManager};

mod config;
mod evaluator;
mod scanner;

use config::RadarConfig;
use evaluator::AlertEvaluator;
use scanner::UniverseScanner;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    tracing::info!("Starting Holdings Radar scan agent");

    // 2. Load configuration
    let config = RadarConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Scan interval: {}s", config.scan_interval_seconds);
    tracing::info!("  Alert poll: {}s", config.alert_poll_seconds);
    tracing::info!(
        "  Qualification: price < ${}, holding >= {}% ({})",
        config.price_threshold,
        config.hold_threshold,
        if config.require_both_holders {
            "both holders"
        } else {
            "either holder"
        }
    );

    // 3. Initialize database and stores
    let db = TrackerDb::new(&config.database_url).await?;
    let universe = Arc::new(UniverseManager::new(db.clone()));
    let cache = Arc::new(SnapshotCache::new());
    tracing::info!("Tracker store initialized ({})", config.database_url);

    // 4. Initialize the Nasdaq client and scanner
    let client = Arc::new(HoldingsClient::new().with_concurrency(config.fetch_concurrency));
    let scanner = Arc::new(UniverseScanner::new(
        client,
        Arc::clone(&universe),
        Arc::clone(&cache),
        config.qualify_rule(),
        config.fetch_concurrency,
    ));
    tracing::info!("Universe scanner initialized");

    let evaluator = AlertEvaluator::new(AlertManager::new(db.clone()), Arc::clone(&cache));
    tracing::info!("Alert evaluator initialized");

    let tracked = universe.tickers().await?.len();
    tracing::info!(
        "Agent is now running with {} tracked tickers. Press Ctrl+C to stop.",
        tracked
    );

    // Main loop with graceful shutdown (SIGINT + SIGTERM)
    let mut scan_interval = time::interval(Duration::from_secs(config.scan_interval_seconds));
    let mut alert_interval = time::interval(Duration::from_secs(config.alert_poll_seconds));
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = scan_interval.tick() => {
                // Fast progress tick, alive only while this scan runs.
                let status = scanner.status_handle();
                let poll = Duration::from_secs(config.progress_poll_seconds);
                let progress_task = tokio::spawn(async move {
                    let mut tick = time::interval(poll);
                    loop {
                        tick.tick().await;
                        let status = status.read().await.clone();
                        if let Some(progress) = status.progress {
                            tracing::info!(
                                "Scan progress: {}/{} ({:.0}%)",
                                progress.current,
                                progress.total,
                                progress.percentage
                            );
                        }
                    }
                });

                match scanner.run_scan(config.scan_new_only).await {
                    Ok(summary) => {
                        tracing::info!(
                            "Scan summary: {} qualifying ({} high / {} medium / {} low), {} under $1, {} premium",
                            summary.qualifying,
                            summary.high_tier,
                            summary.medium_tier,
                            summary.low_tier,
                            summary.under_dollar,
                            summary.premium
                        );
                    }
                    Err(e) => {
                        tracing::error!("Scan failed: {}", e);
                    }
                }

                progress_task.abort();
            }
            _ = alert_interval.tick() => {
                match evaluator.evaluate_once().await {
                    Ok(0) => {}
                    Ok(fired) => tracing::info!("{} alert(s) fired", fired),
                    Err(e) => tracing::error!("Alert evaluation failed: {}", e),
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received, exiting gracefully...");
                break;
            }
        }
    }

    Ok(())
}
