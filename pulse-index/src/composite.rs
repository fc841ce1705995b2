//! Composite index calculator.
//!
//! Component indices roll up into a category index, and category indices
//! roll up into the overall index, through the same weighted average.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Category, CategoryIndex, IndexComponent, Metric, NEUTRAL_INDEX};
use crate::weights::{CategoryTable, CategoryWeights};

/// One entry of a weighted average.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedInput {
    pub index: f64,
    pub weight: f64,
}

impl WeightedInput {
    pub fn new(index: f64, weight: f64) -> Self {
        Self { index, weight }
    }

    fn is_valid(&self) -> bool {
        self.index.is_finite() && self.weight.is_finite() && self.weight >= 0.0
    }
}

/// Weighted average of named indices, rounded to a whole point.
///
/// Entries with a non-finite index, a non-finite weight, or a negative
/// weight are skipped. When nothing with positive weight remains the result
/// is 50. Iteration follows the map's key order, so equal inputs always
/// sum in the same order.
pub fn calculate_weighted_index<K: Ord>(components: &BTreeMap<K, WeightedInput>) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for input in components.values().filter(|c| c.is_valid()) {
        weighted_sum += input.index * input.weight;
        total_weight += input.weight;
    }

    if total_weight <= 0.0 {
        return NEUTRAL_INDEX;
    }
    (weighted_sum / total_weight).round()
}

/// Normalize every metric named in `table` and combine them.
///
/// Metrics missing from `metrics`, or with a non-finite value, are left out
/// and the remaining weights are renormalized. When the same key appears
/// more than once the last occurrence wins.
pub fn compute_category_index(
    category: Category,
    metrics: &[Metric],
    table: &CategoryTable,
) -> CategoryIndex {
    let by_key: BTreeMap<&str, &Metric> = metrics.iter().map(|m| (m.key.as_str(), m)).collect();

    let mut components = Vec::with_capacity(table.components.len());
    for (name, rule) in &table.components {
        let Some(metric) = by_key.get(name.as_str()) else {
            log::debug!("{}: no metric for component {}", category.id(), name);
            continue;
        };
        if !metric.value.is_finite() {
            log::debug!(
                "{}: skipping component {} with non-finite value",
                category.id(),
                name
            );
            continue;
        }
        components.push(IndexComponent {
            name: name.clone(),
            value: metric.value,
            index: rule.strategy.apply(metric),
            weight: rule.weight,
        });
    }

    let inputs: BTreeMap<&str, WeightedInput> = components
        .iter()
        .map(|c| (c.name.as_str(), WeightedInput::new(c.index, c.weight)))
        .collect();
    let index = calculate_weighted_index(&inputs);

    CategoryIndex {
        category,
        components,
        index,
    }
}

/// Combine category indices with the top-level weights.
pub fn compute_overall_index(categories: &[CategoryIndex], weights: &CategoryWeights) -> f64 {
    let inputs: BTreeMap<Category, WeightedInput> = categories
        .iter()
        .map(|c| {
            (
                c.category,
                WeightedInput::new(c.index, weights.weight_for(c.category)),
            )
        })
        .collect();
    calculate_weighted_index(&inputs)
}
