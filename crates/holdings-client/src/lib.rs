//! Nasdaq quote and institutional-holdings client.
//!
//! Enriches a ticker with its last sale price, market cap, and the
//! BlackRock/Vanguard ownership percentages derived from the
//! institutional-holdings table.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use radar_core::{normalize_ticker, RadarError, SnapshotSource, StockSnapshot};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.nasdaq.com/api";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Minimum-spacing pacer: consecutive requests are at least `spacing` apart.
struct RequestPacer {
    next_slot: Mutex<Instant>,
    spacing: Duration,
}

impl RequestPacer {
    fn new(spacing: Duration) -> Self {
        Self {
            next_slot: Mutex::new(Instant::now()),
            spacing,
        }
    }

    async fn acquire(&self) {
        let delay = {
            let mut slot = self.next_slot.lock().await;
            let now = Instant::now();
            let wait_from = (*slot).max(now);
            *slot = wait_from + self.spacing;
            wait_from - now
        };
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Clone)]
pub struct HoldingsClient {
    client: Client,
    base_url: String,
    pacer: Arc<RequestPacer>,
    concurrency: usize,
}

impl Default for HoldingsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HoldingsClient {
    pub fn new() -> Self {
        // Nasdaq publishes no rate limit; half a second between requests
        // keeps a full-universe scan polite.
        let spacing_ms: u64 = std::env::var("NASDAQ_REQUEST_SPACING_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: BASE_URL.to_string(),
            pacer: Arc::new(RequestPacer::new(Duration::from_millis(spacing_ms))),
            concurrency: 4,
        }
    }

    /// Point the client at a different host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Bound on in-flight batch requests.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RadarError> {
        self.pacer.acquire().await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RadarError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RadarError::Fetch(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RadarError::Parse(e.to_string()))
    }

    async fn fetch_quote(&self, ticker: &str) -> Result<(f64, Option<f64>), RadarError> {
        let url = format!(
            "{}/quote/{}/info?assetclass=stocks",
            self.base_url, ticker
        );
        let quote: QuoteResponse = self.get_json(&url).await?;

        let data = quote
            .data
            .ok_or_else(|| RadarError::NotFound(format!("no quote data for {}", ticker)))?;

        let price = data
            .primary_data
            .as_ref()
            .and_then(|p| p.last_sale_price.as_deref())
            .and_then(parse_numeric)
            .ok_or_else(|| RadarError::Parse(format!("no last sale price for {}", ticker)))?;

        let market_cap = data
            .key_stats
            .as_ref()
            .and_then(|k| k.market_cap.as_ref())
            .and_then(|v| v.value.as_deref())
            .and_then(parse_numeric);

        Ok((price, market_cap))
    }

    async fn fetch_ownership(&self, ticker: &str) -> Result<(f64, f64), RadarError> {
        let url = format!(
            "{}/company/{}/institutional-holdings?limit=50&type=TOTAL&sortColumn=marketValue",
            self.base_url, ticker
        );
        let holdings: HoldingsResponse = self.get_json(&url).await?;

        let data = holdings
            .data
            .ok_or_else(|| RadarError::NotFound(format!("no holdings data for {}", ticker)))?;

        Ok(ownership_percentages(&data))
    }
}

#[async_trait]
impl SnapshotSource for HoldingsClient {
    async fn get_snapshot(&self, ticker: &str) -> Result<StockSnapshot, RadarError> {
        let ticker = normalize_ticker(ticker);
        if ticker.is_empty() {
            return Err(RadarError::Validation("ticker is empty".to_string()));
        }

        let (price, market_cap) = self.fetch_quote(&ticker).await?;
        let (blackrock_pct, vanguard_pct) = self.fetch_ownership(&ticker).await?;

        Ok(StockSnapshot {
            ticker,
            price,
            blackrock_pct,
            vanguard_pct,
            market_cap,
            rank_category: None,
            fetched_at: Utc::now(),
        })
    }

    /// Batch fetch with bounded concurrency. Failures are isolated: a
    /// ticker that errors is logged and left out of the map, the rest of
    /// the batch proceeds.
    async fn get_snapshots(&self, tickers: &[String]) -> HashMap<String, StockSnapshot> {
        let results: Vec<Option<StockSnapshot>> = stream::iter(tickers.iter().cloned())
            .map(|ticker| {
                async move {
                    match self.get_snapshot(&ticker).await {
                        Ok(snapshot) => Some(snapshot),
                        Err(e) => {
                            tracing::warn!("Failed to enrich {}: {}", ticker, e);
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        results
            .into_iter()
            .flatten()
            .map(|snapshot| (snapshot.ticker.clone(), snapshot))
            .collect()
    }
}

/// Parse a display number: dollar signs, commas, and whitespace stripped.
fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Derive (blackrock_pct, vanguard_pct) from the holdings table.
///
/// Shares outstanding is reported in millions; each matching row's
/// percentage is shares held over shares outstanding, and the largest
/// matching row wins per holder.
fn ownership_percentages(data: &HoldingsData) -> (f64, f64) {
    let rows = match data
        .holdings_transactions
        .as_ref()
        .and_then(|t| t.table.as_ref())
        .and_then(|t| t.rows.as_ref())
    {
        Some(rows) => rows,
        None => return (0.0, 0.0),
    };

    let total_shares = data
        .ownership_summary
        .as_ref()
        .and_then(|s| s.shares_outstanding_total.as_ref())
        .and_then(|v| v.value.as_deref())
        .and_then(parse_numeric)
        .map(|millions| millions * 1_000_000.0)
        .unwrap_or(0.0);

    if total_shares <= 0.0 {
        return (0.0, 0.0);
    }

    let mut blackrock_pct: f64 = 0.0;
    let mut vanguard_pct: f64 = 0.0;

    for row in rows {
        let owner = match row.owner_name.as_deref() {
            Some(name) => name.to_uppercase(),
            None => continue,
        };
        let shares_held = match row.shares_held.as_deref().and_then(parse_numeric) {
            Some(shares) => shares,
            None => continue,
        };

        let pct = shares_held / total_shares * 100.0;

        if owner.contains("BLACKROCK") || owner.contains("BLACK ROCK") {
            blackrock_pct = blackrock_pct.max(pct);
        } else if owner.contains("VANGUARD") {
            vanguard_pct = vanguard_pct.max(pct);
        }
    }

    (blackrock_pct, vanguard_pct)
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    data: Option<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(rename = "primaryData")]
    primary_data: Option<PrimaryData>,
    #[serde(rename = "keyStats")]
    key_stats: Option<KeyStats>,
}

#[derive(Debug, Deserialize)]
struct PrimaryData {
    #[serde(rename = "lastSalePrice")]
    last_sale_price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyStats {
    #[serde(rename = "MarketCap")]
    market_cap: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HoldingsResponse {
    data: Option<HoldingsData>,
}

#[derive(Debug, Deserialize)]
struct HoldingsData {
    #[serde(rename = "holdingsTransactions")]
    holdings_transactions: Option<HoldingsTransactions>,
    #[serde(rename = "ownershipSummary")]
    ownership_summary: Option<OwnershipSummary>,
}

#[derive(Debug, Deserialize)]
struct HoldingsTransactions {
    table: Option<HoldingsTable>,
}

#[derive(Debug, Deserialize)]
struct HoldingsTable {
    rows: Option<Vec<HoldingRow>>,
}

#[derive(Debug, Deserialize)]
struct HoldingRow {
    #[serde(rename = "ownerName")]
    owner_name: Option<String>,
    #[serde(rename = "sharesHeld")]
    shares_held: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwnershipSummary {
    #[serde(rename = "ShareoutstandingTotal")]
    shares_outstanding_total: Option<ValueField>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_strips_display_formatting() {
        assert_eq!(parse_numeric("$1.23"), Some(1.23));
        assert_eq!(parse_numeric("1,663,558"), Some(1_663_558.0));
        assert_eq!(parse_numeric("  37 "), Some(37.0));
        assert_eq!(parse_numeric("N/A"), None);
        assert_eq!(parse_numeric(""), None);
    }

    #[test]
    fn test_ownership_percentages_takes_max_matching_row() {
        let payload = serde_json::json!({
            "holdingsTransactions": {
                "table": {
                    "rows": [
                        {"ownerName": "BLACKROCK INC.", "sharesHeld": "2,000,000"},
                        {"ownerName": "BlackRock Fund Advisors", "sharesHeld": "1,000,000"},
                        {"ownerName": "Vanguard Group Inc", "sharesHeld": "1,850,000"},
                        {"ownerName": "State Street Corp", "sharesHeld": "9,000,000"}
                    ]
                }
            },
            "ownershipSummary": {
                "ShareoutstandingTotal": {"value": "37"}
            }
        });
        let data: HoldingsData = serde_json::from_value(payload).unwrap();

        let (br, vg) = ownership_percentages(&data);
        // 2,000,000 / 37,000,000 and 1,850,000 / 37,000,000
        assert!((br - 5.405).abs() < 0.01);
        assert!((vg - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_ownership_percentages_handles_black_rock_spelling() {
        let payload = serde_json::json!({
            "holdingsTransactions": {
                "table": {
                    "rows": [
                        {"ownerName": "BLACK ROCK ADVISORS", "sharesHeld": "500,000"}
                    ]
                }
            },
            "ownershipSummary": {
                "ShareoutstandingTotal": {"value": "10"}
            }
        });
        let data: HoldingsData = serde_json::from_value(payload).unwrap();

        let (br, vg) = ownership_percentages(&data);
        assert!((br - 5.0).abs() < f64::EPSILON);
        assert_eq!(vg, 0.0);
    }

    #[test]
    fn test_ownership_percentages_without_shares_outstanding() {
        let payload = serde_json::json!({
            "holdingsTransactions": {
                "table": {
                    "rows": [
                        {"ownerName": "BLACKROCK INC.", "sharesHeld": "2,000,000"}
                    ]
                }
            }
        });
        let data: HoldingsData = serde_json::from_value(payload).unwrap();
        assert_eq!(ownership_percentages(&data), (0.0, 0.0));
    }

    #[test]
    fn test_quote_payload_parses() {
        let payload = serde_json::json!({
            "data": {
                "primaryData": {"lastSalePrice": "$0.8512"},
                "keyStats": {"MarketCap": {"value": "31,491,018"}}
            },
            "status": {"rCode": 200}
        });
        let quote: QuoteResponse = serde_json::from_value(payload).unwrap();
        let data = quote.data.unwrap();
        let price = data
            .primary_data
            .unwrap()
            .last_sale_price
            .as_deref()
            .and_then(parse_numeric)
            .unwrap();
        assert!((price - 0.8512).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_spaces_requests() {
        let pacer = RequestPacer::new(Duration::from_millis(100));
        let start = Instant::now();
        pacer.acquire().await;
        pacer.acquire().await;
        pacer.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
