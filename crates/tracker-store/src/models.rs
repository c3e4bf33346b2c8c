use serde::{Deserialize, Serialize};

/// Which side of the target price an alert watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

impl AlertCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCondition::Above => "above",
            AlertCondition::Below => "below",
        }
    }

    /// The trigger contract: strict crossing of the target. Equality on
    /// either side does not fire.
    pub fn is_crossed(&self, observed_price: f64, target_price: f64) -> bool {
        match self {
            AlertCondition::Above => observed_price > target_price,
            AlertCondition::Below => observed_price < target_price,
        }
    }
}

/// A one-shot price-crossing alert.
///
/// Lifecycle: created `{active, !triggered}`; transitions exactly once to
/// triggered, after which the record is immutable except for deletion.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PriceAlert {
    pub id: Option<i64>,
    pub ticker: String,
    pub target_price: f64,
    pub condition: AlertCondition,
    pub active: bool,
    pub triggered: bool,
    pub created_at: String,
    pub triggered_at: Option<String>,
    pub triggered_price: Option<f64>,
}

impl PriceAlert {
    /// Still waiting for its crossing.
    pub fn is_open(&self) -> bool {
        self.active && !self.triggered
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertInput {
    pub ticker: String,
    pub target_price: f64,
    pub condition: AlertCondition,
}

/// List selector for the alert registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertFilter {
    All,
    ActiveOnly,
    TriggeredOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UniverseRow {
    pub ticker: String,
    pub is_holding: bool,
    pub added_at: String,
    pub scanned_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Watchlist {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}
