//! Weight tables: per-category component rules and the top-level
//! category weights.
//!
//! Weights are relative shares. The composite calculator divides by the sum
//! of the weights actually present, so a table does not need to add up to 1.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::{NormalizationStrategy, DEFAULT_TREND_SCALE};
use crate::types::Category;

/// How one metric contributes to its category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentRule {
    pub weight: f64,
    pub strategy: NormalizationStrategy,
}

impl ComponentRule {
    pub fn new(weight: f64, strategy: NormalizationStrategy) -> Self {
        Self { weight, strategy }
    }
}

/// Component rules for one category, keyed by metric key.
///
/// `BTreeMap` keeps iteration in sorted-name order, which the weighted
/// average relies on for bit-identical results.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTable {
    #[serde(default)]
    pub components: BTreeMap<String, ComponentRule>,
}

impl CategoryTable {
    pub fn with(mut self, key: &str, weight: f64, strategy: NormalizationStrategy) -> Self {
        self.components
            .insert(key.to_string(), ComponentRule::new(weight, strategy));
        self
    }

    pub fn total_weight(&self) -> f64 {
        self.components.values().map(|r| r.weight).sum()
    }
}

fn higher() -> NormalizationStrategy {
    NormalizationStrategy::Distribution {
        higher_is_better: true,
    }
}

fn lower() -> NormalizationStrategy {
    NormalizationStrategy::Distribution {
        higher_is_better: false,
    }
}

impl CategoryTable {
    /// Revenue, margin, basket size and loyalty.
    pub fn default_core() -> Self {
        CategoryTable::default()
            .with("revenue", 0.30, higher())
            .with("gross_margin", 0.25, higher())
            .with("average_order_value", 0.20, higher())
            .with("repeat_purchase_rate", 0.25, higher())
    }

    pub fn default_product_profitability() -> Self {
        CategoryTable::default()
            .with(
                "margin_percent",
                0.35,
                NormalizationStrategy::PercentRange {
                    optimal_min: 30.0,
                    optimal_max: 50.0,
                },
            )
            .with(
                "top_product_revenue_share",
                0.20,
                NormalizationStrategy::PercentRange {
                    optimal_min: 20.0,
                    optimal_max: 40.0,
                },
            )
            .with("return_rate", 0.25, lower())
            .with("discount_rate", 0.20, lower())
    }

    pub fn default_seo_performance() -> Self {
        CategoryTable::default()
            .with(
                "search_click_trend",
                0.35,
                NormalizationStrategy::Trend {
                    scale: DEFAULT_TREND_SCALE,
                },
            )
            .with("average_position", 0.30, NormalizationStrategy::SearchPosition)
            .with("non_brand_share", 0.20, NormalizationStrategy::NonBrandShare)
            .with("impressions", 0.15, higher())
    }

    pub fn default_operational() -> Self {
        CategoryTable::default()
            .with("out_of_stock_percent", 0.35, NormalizationStrategy::OutOfStock)
            .with("stock_days", 0.25, NormalizationStrategy::StockDays)
            .with("fulfillment_days", 0.25, NormalizationStrategy::FulfillmentTime)
            .with("order_volume", 0.15, higher())
    }
}

/// One table per category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryTables {
    pub core: CategoryTable,
    pub product_profitability: CategoryTable,
    pub seo_performance: CategoryTable,
    pub operational: CategoryTable,
}

impl CategoryTables {
    pub fn table(&self, category: Category) -> &CategoryTable {
        match category {
            Category::Core => &self.core,
            Category::ProductProfitability => &self.product_profitability,
            Category::SeoPerformance => &self.seo_performance,
            Category::Operational => &self.operational,
        }
    }
}

impl Default for CategoryTables {
    fn default() -> Self {
        Self {
            core: CategoryTable::default_core(),
            product_profitability: CategoryTable::default_product_profitability(),
            seo_performance: CategoryTable::default_seo_performance(),
            operational: CategoryTable::default_operational(),
        }
    }
}

/// Top-level table mapping each category to its share of the overall index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub core: f64,
    pub product_profitability: f64,
    pub seo_performance: f64,
    pub operational: f64,
}

impl CategoryWeights {
    pub fn weight_for(&self, category: Category) -> f64 {
        match category {
            Category::Core => self.core,
            Category::ProductProfitability => self.product_profitability,
            Category::SeoPerformance => self.seo_performance,
            Category::Operational => self.operational,
        }
    }
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            core: 0.40,
            product_profitability: 0.20,
            seo_performance: 0.20,
            operational: 0.20,
        }
    }
}
