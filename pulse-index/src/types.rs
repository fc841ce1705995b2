//! Core data types: metrics, categories, periods, indices, alerts and
//! snapshots.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::DeltaReport;

/// Neutral midpoint returned whenever there is not enough signal to score.
pub const NEUTRAL_INDEX: f64 = 50.0;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A raw observation for one store and one period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub value: f64,
    /// Prior period values for the same key, most recent last.
    #[serde(default)]
    pub history: Vec<f64>,
}

impl Metric {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<f64>) -> Self {
        self.history = history;
        self
    }
}

/// Business theme grouping several component indices.
///
/// Declaration order is the stable iteration order used everywhere
/// (weighted sums, snapshot layout, alert ordering).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Core,
    ProductProfitability,
    SeoPerformance,
    Operational,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Core,
        Category::ProductProfitability,
        Category::SeoPerformance,
        Category::Operational,
    ];

    /// Stable identifier used in persisted snapshots and alert subjects.
    pub fn id(&self) -> &'static str {
        match self {
            Category::Core => "core",
            Category::ProductProfitability => "product_profitability",
            Category::SeoPerformance => "seo_performance",
            Category::Operational => "operational",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Core => write!(f, "Core"),
            Category::ProductProfitability => write!(f, "Product Profitability"),
            Category::SeoPerformance => write!(f, "SEO Performance"),
            Category::Operational => write!(f, "Operational"),
        }
    }
}

/// Snapshot cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Week,
    Month,
}

impl Granularity {
    /// Start of the period immediately preceding the one starting at `start`.
    ///
    /// Weeks step back seven days. Months step back to the first day of the
    /// previous calendar month.
    pub fn previous_period_start(&self, start: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Week => start - Duration::days(7),
            Granularity::Month => {
                let (year, month) = if start.month() == 1 {
                    (start.year() - 1, 12)
                } else {
                    (start.year(), start.month() - 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(start)
            }
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Week => write!(f, "week"),
            Granularity::Month => write!(f, "month"),
        }
    }
}

/// Inclusive date range a snapshot covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Period of the given granularity beginning at `start`.
    ///
    /// Weekly periods span seven days. Monthly periods run to the last day
    /// of the calendar month containing `start`.
    pub fn for_granularity(start: NaiveDate, granularity: Granularity) -> Self {
        let end = match granularity {
            Granularity::Week => start + Duration::days(6),
            Granularity::Month => {
                let (year, month) = if start.month() == 12 {
                    (start.year() + 1, 1)
                } else {
                    (start.year(), start.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1)
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(start)
            }
        };
        Self { start, end }
    }
}

// ---------------------------------------------------------------------------
// Index outputs
// ---------------------------------------------------------------------------

/// One normalized metric inside a category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexComponent {
    pub name: String,
    /// Raw metric value the index was derived from.
    pub value: f64,
    /// Always within [0, 100].
    pub index: f64,
    pub weight: f64,
}

/// Weighted combination of the component indices sharing one theme.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryIndex {
    pub category: Category,
    pub components: Vec<IndexComponent>,
    /// 50 when there are no components or the total weight is zero.
    pub index: f64,
}

impl CategoryIndex {
    pub fn component(&self, name: &str) -> Option<&IndexComponent> {
        self.components.iter().find(|c| c.name == name)
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// What condition raised the alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCode {
    /// Index level below an absolute floor.
    IndexBelowFloor,
    /// Index fell by more than the drop threshold since the previous period.
    IndexDrop,
    /// Raw out-of-stock percentage above its own threshold.
    OutOfStock,
}

/// Either one category or the overall index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSubject {
    Overall,
    Core,
    ProductProfitability,
    SeoPerformance,
    Operational,
}

impl From<Category> for AlertSubject {
    fn from(category: Category) -> Self {
        match category {
            Category::Core => AlertSubject::Core,
            Category::ProductProfitability => AlertSubject::ProductProfitability,
            Category::SeoPerformance => AlertSubject::SeoPerformance,
            Category::Operational => AlertSubject::Operational,
        }
    }
}

impl fmt::Display for AlertSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSubject::Overall => write!(f, "Overall"),
            AlertSubject::Core => write!(f, "{}", Category::Core),
            AlertSubject::ProductProfitability => write!(f, "{}", Category::ProductProfitability),
            AlertSubject::SeoPerformance => write!(f, "{}", Category::SeoPerformance),
            AlertSubject::Operational => write!(f, "{}", Category::Operational),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub code: AlertCode,
    pub severity: AlertSeverity,
    pub subject: AlertSubject,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Upsert key for persisted snapshots.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub store_id: String,
    pub period_start: NaiveDate,
    pub granularity: Granularity,
}

/// All indices for one store, period and granularity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub store_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub granularity: Granularity,
    pub category_indices: Vec<CategoryIndex>,
    pub overall_index: f64,
    #[serde(default)]
    pub deltas: BTreeMap<Category, f64>,
    #[serde(default)]
    pub overall_delta: f64,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn key(&self) -> SnapshotKey {
        SnapshotKey {
            store_id: self.store_id.clone(),
            period_start: self.period_start,
            granularity: self.granularity,
        }
    }

    pub fn category(&self, category: Category) -> Option<&CategoryIndex> {
        self.category_indices.iter().find(|c| c.category == category)
    }

    pub fn category_index(&self, category: Category) -> Option<f64> {
        self.category(category).map(|c| c.index)
    }

    /// First component with the given name across all categories.
    pub fn component(&self, name: &str) -> Option<&IndexComponent> {
        self.category_indices
            .iter()
            .find_map(|c| c.component(name))
    }

    /// Back-fill deltas and alerts once the previous snapshot is known.
    ///
    /// Index values are left untouched.
    pub fn apply_delta_report(&mut self, report: DeltaReport) {
        self.deltas = report.deltas;
        self.overall_delta = report.overall_delta;
        self.alerts = report.alerts;
    }
}
