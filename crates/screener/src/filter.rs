//! Compound filtering and ordering over snapshot collections.

use std::cmp::Ordering;

use radar_core::{FireLevel, RankCategory, SnapshotState, StockSnapshot};
use serde::{Deserialize, Serialize};

use crate::classifier::{clamp_metric, fire_level};

/// Price bucket used by the range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceRange {
    UnderOne,
    OneToTwo,
    OverTwo,
}

impl PriceRange {
    fn contains(&self, price: f64) -> bool {
        match self {
            PriceRange::UnderOne => price < 1.0,
            PriceRange::OneToTwo => (1.0..2.0).contains(&price),
            PriceRange::OverTwo => price >= 2.0,
        }
    }
}

/// Immutable filter criteria. All set fields must hold (AND); an unset
/// field passes everything through. Replaced wholesale on each change,
/// never mutated in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub priority_tier: Option<RankCategory>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub min_blackrock: f64,
    #[serde(default)]
    pub min_vanguard: f64,
    #[serde(default)]
    pub fire_level: Option<FireLevel>,
    #[serde(default)]
    pub under_dollar: bool,
    #[serde(default)]
    pub premium_only: bool,
    #[serde(default)]
    pub search_text: Option<String>,
    #[serde(default)]
    pub price_range: Option<PriceRange>,
}

impl FilterSpec {
    /// Whether a snapshot satisfies every set predicate.
    pub fn matches(&self, snapshot: &StockSnapshot) -> bool {
        let price = clamp_metric(snapshot.price);
        let br = clamp_metric(snapshot.blackrock_pct);
        let vg = clamp_metric(snapshot.vanguard_pct);

        if let Some(tier) = self.priority_tier {
            if snapshot.rank_category != Some(tier) {
                return false;
            }
        }

        if let Some(max_price) = self.max_price {
            if price > max_price {
                return false;
            }
        }

        if self.under_dollar && price >= 1.0 {
            return false;
        }

        if self.premium_only && fire_level(snapshot) != FireLevel::Premium {
            return false;
        }

        if let Some(level) = self.fire_level {
            if fire_level(snapshot) != level {
                return false;
            }
        }

        if br < self.min_blackrock || vg < self.min_vanguard {
            return false;
        }

        if let Some(ref needle) = self.search_text {
            let needle = needle.trim().to_uppercase();
            if !needle.is_empty() && !snapshot.ticker.to_uppercase().contains(&needle) {
                return false;
            }
        }

        if let Some(range) = self.price_range {
            if !range.contains(price) {
                return false;
            }
        }

        true
    }
}

/// Filter a collection and return it in priority order.
///
/// Pending entries are skipped; they carry nothing to filter on. Ordering
/// is stable two-key descending: recomputed fire level first, combined
/// ownership percentage second. This is the one sort discipline used for
/// every collection view; callers wanting a price ordering re-sort the
/// returned vector. The input is never mutated.
pub fn apply(rows: &[SnapshotState], spec: &FilterSpec) -> Vec<StockSnapshot> {
    let mut matched: Vec<(FireLevel, f64, StockSnapshot)> = rows
        .iter()
        .filter_map(|state| match state {
            SnapshotState::Ready(snap) if spec.matches(snap) => {
                Some((fire_level(snap), snap.combined_pct(), snap.clone()))
            }
            _ => None,
        })
        .collect();

    matched.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
    });

    matched.into_iter().map(|(_, _, snap)| snap).collect()
}

/// Scan-time admission gate: which enriched stocks enter the result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualifyRule {
    /// Strict upper price bound.
    pub price_threshold: f64,
    /// Minimum ownership percentage for a holder to count.
    pub hold_threshold: f64,
    /// Require both holders above the threshold instead of either.
    pub require_both: bool,
}

impl Default for QualifyRule {
    fn default() -> Self {
        Self {
            price_threshold: 2.0,
            hold_threshold: 3.0,
            require_both: false,
        }
    }
}

impl QualifyRule {
    pub fn qualifies(&self, snapshot: &StockSnapshot) -> bool {
        let price = clamp_metric(snapshot.price);
        let br = clamp_metric(snapshot.blackrock_pct);
        let vg = clamp_metric(snapshot.vanguard_pct);

        if price >= self.price_threshold {
            return false;
        }

        if self.require_both {
            br >= self.hold_threshold && vg >= self.hold_threshold
        } else {
            br >= self.hold_threshold || vg >= self.hold_threshold
        }
    }
}

/// Aggregate counts over a post-scan collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_processed: usize,
    pub qualifying: usize,
    pub high_tier: usize,
    pub medium_tier: usize,
    pub low_tier: usize,
    pub under_dollar: usize,
    pub premium: usize,
}

/// Compute summary statistics for a collection of cache rows.
pub fn summarize(rows: &[SnapshotState]) -> ScanSummary {
    let mut summary = ScanSummary {
        total_processed: rows.len(),
        ..Default::default()
    };

    for state in rows {
        let snap = match state {
            SnapshotState::Ready(snap) => snap,
            SnapshotState::Pending { .. } => continue,
        };

        summary.qualifying += 1;

        match snap.rank_category {
            Some(RankCategory::High) => summary.high_tier += 1,
            Some(RankCategory::Medium) => summary.medium_tier += 1,
            Some(RankCategory::Low) | None => summary.low_tier += 1,
        }

        if clamp_metric(snap.price) < 1.0 {
            summary.under_dollar += 1;
        }

        if fire_level(snap) == FireLevel::Premium {
            summary.premium += 1;
        }
    }

    summary
}
