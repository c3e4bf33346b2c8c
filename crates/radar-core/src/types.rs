use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalize a raw ticker string to its canonical uppercase form.
pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Coarse priority bucket assigned to a stock during a scan.
///
/// Wire format is the integer the dashboard payload always carried:
/// 1 = high, 2 = medium, 3 = low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RankCategory {
    High,
    Medium,
    Low,
}

impl RankCategory {
    pub fn as_u8(&self) -> u8 {
        match self {
            RankCategory::High => 1,
            RankCategory::Medium => 2,
            RankCategory::Low => 3,
        }
    }
}

impl TryFrom<u8> for RankCategory {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RankCategory::High),
            2 => Ok(RankCategory::Medium),
            3 => Ok(RankCategory::Low),
            other => Err(format!("invalid rank category: {}", other)),
        }
    }
}

impl From<RankCategory> for u8 {
    fn from(value: RankCategory) -> Self {
        value.as_u8()
    }
}

/// Fire level derived from a snapshot. Never stored; always recomputed.
///
/// The numeric value doubles as the sort weight and as the wire format
/// (the legacy display rendered it as that many fire marks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FireLevel {
    None,
    Standard,
    Super,
    Premium,
}

impl FireLevel {
    pub fn as_u8(&self) -> u8 {
        match self {
            FireLevel::None => 0,
            FireLevel::Standard => 1,
            FireLevel::Super => 3,
            FireLevel::Premium => 5,
        }
    }
}

impl TryFrom<u8> for FireLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FireLevel::None),
            1 => Ok(FireLevel::Standard),
            3 => Ok(FireLevel::Super),
            5 => Ok(FireLevel::Premium),
            other => Err(format!("invalid fire level: {}", other)),
        }
    }
}

impl From<FireLevel> for u8 {
    fn from(value: FireLevel) -> Self {
        value.as_u8()
    }
}

/// Latest known per-ticker metrics. Owned by the snapshot cache and
/// replaced wholesale on each refresh (last write wins per ticker).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub ticker: String,
    pub price: f64,
    pub blackrock_pct: f64,
    pub vanguard_pct: f64,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub rank_category: Option<RankCategory>,
    pub fetched_at: DateTime<Utc>,
}

impl StockSnapshot {
    /// Combined institutional ownership across both tracked holders.
    pub fn combined_pct(&self) -> f64 {
        self.blackrock_pct + self.vanguard_pct
    }
}

/// A ticker's place in the cache: enriched data, or nothing fetched yet.
///
/// Consumers match on the variant instead of probing optional fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SnapshotState {
    Ready(StockSnapshot),
    Pending { ticker: String },
}

impl SnapshotState {
    pub fn ticker(&self) -> &str {
        match self {
            SnapshotState::Ready(snap) => &snap.ticker,
            SnapshotState::Pending { ticker } => ticker,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SnapshotState::Ready(_))
    }
}

/// Progress of an in-flight scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    pub current: usize,
    pub total: usize,
    pub percentage: f64,
}

impl ScanProgress {
    pub fn new(current: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            current as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            current,
            total,
            percentage,
        }
    }
}

/// Scan state consumed by display layers for gating.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStatus {
    pub scanning: bool,
    #[serde(default)]
    pub progress: Option<ScanProgress>,
    #[serde(default)]
    pub last_scan: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl "), "AAPL");
        assert_eq!(normalize_ticker("Brk.a"), "BRK.A");
    }

    #[test]
    fn test_rank_category_round_trip() {
        assert_eq!(RankCategory::try_from(1).unwrap(), RankCategory::High);
        assert_eq!(u8::from(RankCategory::Medium), 2);
        assert!(RankCategory::try_from(4).is_err());
    }

    #[test]
    fn test_fire_level_ordering() {
        assert!(FireLevel::Premium > FireLevel::Super);
        assert!(FireLevel::Super > FireLevel::Standard);
        assert!(FireLevel::Standard > FireLevel::None);
        assert_eq!(FireLevel::Premium.as_u8(), 5);
        assert!(FireLevel::try_from(2).is_err());
    }

    #[test]
    fn test_scan_progress_percentage() {
        let progress = ScanProgress::new(25, 100);
        assert!((progress.percentage - 25.0).abs() < f64::EPSILON);

        let empty = ScanProgress::new(0, 0);
        assert_eq!(empty.percentage, 0.0);
    }
}
