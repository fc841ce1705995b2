//! Engine configuration: weight tables plus alert thresholds.
//!
//! Every section is optional in the TOML document; missing sections fall
//! back to the built-in defaults. A category table that is present replaces
//! the default table for that category entirely.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::normalize::NormalizationStrategy;
use crate::thresholds::AlertThresholds;
use crate::types::Category;
use crate::weights::{CategoryTables, CategoryWeights};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub categories: CategoryTables,
    pub category_weights: CategoryWeights,
    pub thresholds: AlertThresholds,
}

impl IndexConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: IndexConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        log::debug!("loaded index config from {}", path.display());
        Ok(config)
    }

    /// Reject tables the calculators cannot score meaningfully.
    pub fn validate(&self) -> ConfigResult<()> {
        for category in Category::ALL {
            let weight = self.category_weights.weight_for(category);
            check_weight("category_weights", category.id(), weight)?;

            for (name, rule) in &self.categories.table(category).components {
                check_weight(category.id(), name, rule.weight)?;
                match rule.strategy {
                    NormalizationStrategy::PercentRange {
                        optimal_min,
                        optimal_max,
                    } if optimal_min > optimal_max => {
                        return Err(ConfigError::InvalidBand {
                            name: name.clone(),
                            min: optimal_min,
                            max: optimal_max,
                        });
                    }
                    NormalizationStrategy::Trend { scale } if !(scale.is_finite() && scale > 0.0) => {
                        return Err(ConfigError::InvalidTrendScale {
                            name: name.clone(),
                            scale,
                        });
                    }
                    _ => {}
                }
            }
        }

        let t = &self.thresholds;
        for (name, value) in [
            ("index_warning", t.index_warning),
            ("index_critical", t.index_critical),
            ("drop_warning", t.drop_warning),
            ("drop_critical", t.drop_critical),
            ("out_of_stock.warning_pct", t.out_of_stock.warning_pct),
            ("out_of_stock.critical_pct", t.out_of_stock.critical_pct),
        ] {
            check_threshold(name, value)?;
        }
        if t.index_critical > t.index_warning {
            return Err(ConfigError::InvalidThresholds(format!(
                "index_critical ({}) is above index_warning ({})",
                t.index_critical, t.index_warning
            )));
        }
        if t.drop_warning < 0.0 || t.drop_critical < t.drop_warning {
            return Err(ConfigError::InvalidThresholds(format!(
                "drops must satisfy 0 <= drop_warning ({}) <= drop_critical ({})",
                t.drop_warning, t.drop_critical
            )));
        }
        if t.out_of_stock.critical_pct < t.out_of_stock.warning_pct {
            return Err(ConfigError::InvalidThresholds(format!(
                "out_of_stock.critical_pct ({}) is below warning_pct ({})",
                t.out_of_stock.critical_pct, t.out_of_stock.warning_pct
            )));
        }

        // The stock-out rule reads the metric's scored component.
        let tracked = Category::ALL.iter().any(|category| {
            self.categories
                .table(*category)
                .components
                .contains_key(&t.out_of_stock.metric)
        });
        if !tracked {
            return Err(ConfigError::UntrackedStockOutMetric(
                t.out_of_stock.metric.clone(),
            ));
        }
        Ok(())
    }
}

fn check_weight(table: &str, name: &str, weight: f64) -> ConfigResult<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidWeight {
            table: table.to_string(),
            name: name.to_string(),
            weight,
        })
    }
}

fn check_threshold(name: &str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold {
            name: name.to_string(),
            value,
        })
    }
}
