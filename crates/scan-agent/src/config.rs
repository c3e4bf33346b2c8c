use std::env;

use anyhow::Result;
use screener::QualifyRule;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarConfig {
    // Scan parameters
    pub scan_interval_seconds: u64,   // full enrichment pass cadence
    pub scan_new_only: bool,          // only tickers never scanned before
    pub fetch_concurrency: usize,

    // Polling cadences
    pub progress_poll_seconds: u64,   // fast tick while a scan is in flight
    pub alert_poll_seconds: u64,      // slow tick for alert evaluation

    // Qualification gate
    pub price_threshold: f64,
    pub hold_threshold: f64,
    pub require_both_holders: bool,

    // Database
    pub database_url: String,
}

impl RadarConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            scan_interval_seconds: env::var("SCAN_INTERVAL")
                .unwrap_or_else(|_| "900".to_string())
                .parse()?,
            scan_new_only: env::var("SCAN_NEW_ONLY")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            fetch_concurrency: env::var("FETCH_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse()?,

            progress_poll_seconds: env::var("PROGRESS_POLL_INTERVAL")
                .unwrap_or_else(|_| "2".to_string())
                .parse()?,
            alert_poll_seconds: env::var("ALERT_POLL_INTERVAL")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,

            price_threshold: env::var("PRICE_THRESHOLD")
                .unwrap_or_else(|_| "2.0".to_string())
                .parse()?,
            hold_threshold: env::var("HOLD_THRESHOLD")
                .unwrap_or_else(|_| "3.0".to_string())
                .parse()?,
            require_both_holders: env::var("REQUIRE_BOTH_HOLDERS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:radar.db".to_string()),
        };

        Ok(config)
    }

    pub fn qualify_rule(&self) -> QualifyRule {
        QualifyRule {
            price_threshold: self.price_threshold,
            hold_threshold: self.hold_threshold,
            require_both: self.require_both_holders,
        }
    }
}
