//! Fire-level and rank-category classification.

use radar_core::{FireLevel, RankCategory, StockSnapshot};

/// Clamp a metric so the classifier stays total: NaN and negatives become 0.
pub(crate) fn clamp_metric(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Derive the fire level for a snapshot.
///
/// Ladder, evaluated top-down, first match wins:
/// 1. `Premium`: both holders at 5%+ and the stock trades under a dollar.
/// 2. `Super`: both holders at 5%+, any price.
/// 3. `Standard`: rank category High.
/// 4. `None` otherwise.
///
/// A price of exactly 1.00 is not under-dollar (strict `<`). Missing
/// ownership data counts as 0.
pub fn fire_level(snapshot: &StockSnapshot) -> FireLevel {
    let br = clamp_metric(snapshot.blackrock_pct);
    let vg = clamp_metric(snapshot.vanguard_pct);
    let price = clamp_metric(snapshot.price);

    if br >= 5.0 && vg >= 5.0 && price < 1.0 {
        FireLevel::Premium
    } else if br >= 5.0 && vg >= 5.0 {
        FireLevel::Super
    } else if snapshot.rank_category == Some(RankCategory::High) {
        FireLevel::Standard
    } else {
        FireLevel::None
    }
}

/// Derive the rank category from the two ownership percentages.
///
/// High needs both holders present and both at 4%+. Medium needs one
/// holder at 3%+ with the other at least present. Everything else is Low.
pub fn rank_category(blackrock_pct: f64, vanguard_pct: f64) -> RankCategory {
    let br = clamp_metric(blackrock_pct);
    let vg = clamp_metric(vanguard_pct);

    if br > 0.0 && vg > 0.0 && br >= 4.0 && vg >= 4.0 {
        RankCategory::High
    } else if (br >= 3.0 && vg > 0.0) || (vg >= 3.0 && br > 0.0) {
        RankCategory::Medium
    } else {
        RankCategory::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(price: f64, br: f64, vg: f64, rank: Option<RankCategory>) -> StockSnapshot {
        StockSnapshot {
            ticker: "TEST".to_string(),
            price,
            blackrock_pct: br,
            vanguard_pct: vg,
            market_cap: None,
            rank_category: rank,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_premium_needs_both_holders_and_sub_dollar_price() {
        let snap = snapshot(0.85, 6.0, 5.5, None);
        assert_eq!(fire_level(&snap), FireLevel::Premium);
    }

    #[test]
    fn test_super_ignores_price() {
        let snap = snapshot(3.0, 5.2, 5.1, Some(RankCategory::Medium));
        assert_eq!(fire_level(&snap), FireLevel::Super);
    }

    #[test]
    fn test_dollar_boundary_is_strict() {
        let snap = snapshot(1.0, 6.0, 6.0, None);
        assert_eq!(fire_level(&snap), FireLevel::Super);

        let under = snapshot(0.9999, 6.0, 6.0, None);
        assert_eq!(fire_level(&under), FireLevel::Premium);
    }

    #[test]
    fn test_standard_falls_back_to_rank_category() {
        let snap = snapshot(1.5, 4.5, 4.2, Some(RankCategory::High));
        assert_eq!(fire_level(&snap), FireLevel::Standard);

        let no_rank = snapshot(1.5, 4.5, 4.2, None);
        assert_eq!(fire_level(&no_rank), FireLevel::None);
    }

    #[test]
    fn test_classifier_is_deterministic() {
        let snap = snapshot(0.5, 5.0, 5.0, Some(RankCategory::High));
        let first = fire_level(&snap);
        for _ in 0..10 {
            assert_eq!(fire_level(&snap), first);
        }
    }

    #[test]
    fn test_malformed_input_clamps_to_zero() {
        // NaN ownership reads as 0, so the dual-holder rungs can't match.
        let snap = snapshot(0.5, f64::NAN, 6.0, None);
        assert_eq!(fire_level(&snap), FireLevel::None);

        let negative = snapshot(0.5, -3.0, 6.0, None);
        assert_eq!(fire_level(&negative), FireLevel::None);
    }

    #[test]
    fn test_rank_category_ladder() {
        assert_eq!(rank_category(4.0, 4.0), RankCategory::High);
        assert_eq!(rank_category(6.2, 5.8), RankCategory::High);
        assert_eq!(rank_category(3.0, 0.1), RankCategory::Medium);
        assert_eq!(rank_category(0.5, 3.5), RankCategory::Medium);
        assert_eq!(rank_category(3.0, 0.0), RankCategory::Low);
        assert_eq!(rank_category(2.9, 2.9), RankCategory::Low);
        assert_eq!(rank_category(0.0, 0.0), RankCategory::Low);
    }

    #[test]
    fn test_rank_category_clamps_nan() {
        assert_eq!(rank_category(f64::NAN, 5.0), RankCategory::Low);
    }
}
