//! Delta and alert evaluation.
//!
//! Compares a freshly computed snapshot against the previous snapshot of the
//! same store and granularity. The previous snapshot is passed in as a plain
//! value; this module performs no I/O.
//!
//! Severity policy: for each subject and each rule at most one alert is
//! emitted. A critical alert replaces the warning for the same condition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::thresholds::AlertThresholds;
use crate::types::{Alert, AlertCode, AlertSeverity, AlertSubject, Category, Snapshot};

/// Signed point changes and the alerts they raised.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaReport {
    pub deltas: BTreeMap<Category, f64>,
    pub overall_delta: f64,
    pub alerts: Vec<Alert>,
}

/// Compute deltas against `previous` and evaluate every threshold.
///
/// Without a previous snapshot every delta is 0 and only level and
/// stock-out alerts can fire. A previous snapshot for a different store or
/// granularity is ignored.
pub fn evaluate_delta_and_alerts(
    current: &Snapshot,
    previous: Option<&Snapshot>,
    thresholds: &AlertThresholds,
) -> DeltaReport {
    let previous = previous.filter(|prev| {
        let comparable =
            prev.store_id == current.store_id && prev.granularity == current.granularity;
        if !comparable {
            log::warn!(
                "ignoring previous snapshot for store={} granularity={} when evaluating store={} granularity={}",
                prev.store_id,
                prev.granularity,
                current.store_id,
                current.granularity
            );
        }
        comparable
    });

    let overall_delta = previous
        .map(|prev| current.overall_index - prev.overall_index)
        .unwrap_or(0.0);

    let mut deltas = BTreeMap::new();
    for category in &current.category_indices {
        let delta = previous
            .and_then(|prev| prev.category_index(category.category))
            .map(|prev_index| category.index - prev_index)
            .unwrap_or(0.0);
        deltas.insert(category.category, delta);
    }

    let mut alerts = Vec::new();
    evaluate_subject(
        AlertSubject::Overall,
        current.overall_index,
        previous.map(|_| overall_delta),
        thresholds,
        &mut alerts,
    );
    for category in Category::ALL {
        let Some(index) = current.category_index(category) else {
            continue;
        };
        // Drop rules only apply when the category existed last period.
        let delta = previous
            .and_then(|prev| prev.category_index(category))
            .map(|prev_index| index - prev_index);
        evaluate_subject(category.into(), index, delta, thresholds, &mut alerts);
    }
    if let Some(alert) = evaluate_out_of_stock(current, thresholds) {
        alerts.push(alert);
    }

    DeltaReport {
        deltas,
        overall_delta,
        alerts,
    }
}

/// Level and drop rules for one subject.
fn evaluate_subject(
    subject: AlertSubject,
    index: f64,
    delta: Option<f64>,
    thresholds: &AlertThresholds,
    alerts: &mut Vec<Alert>,
) {
    let floor = if index < thresholds.index_critical {
        Some((AlertSeverity::Critical, thresholds.index_critical))
    } else if index < thresholds.index_warning {
        Some((AlertSeverity::Warning, thresholds.index_warning))
    } else {
        None
    };
    if let Some((severity, limit)) = floor {
        alerts.push(Alert {
            code: AlertCode::IndexBelowFloor,
            severity,
            subject,
            message: format!(
                "{} index {:.0} is below the {} floor of {:.0}",
                subject, index, severity, limit
            ),
        });
    }

    let Some(delta) = delta else {
        return;
    };
    let drop = if delta < -thresholds.drop_critical {
        Some((AlertSeverity::Critical, thresholds.drop_critical))
    } else if delta < -thresholds.drop_warning {
        Some((AlertSeverity::Warning, thresholds.drop_warning))
    } else {
        None
    };
    if let Some((severity, limit)) = drop {
        alerts.push(Alert {
            code: AlertCode::IndexDrop,
            severity,
            subject,
            message: format!(
                "{} index dropped {:.0} points to {:.0} (more than the {} threshold of {:.0})",
                subject,
                -delta,
                index,
                severity,
                limit
            ),
        });
    }
}

/// Stock-outs are checked on the raw percentage, independent of the index.
fn evaluate_out_of_stock(current: &Snapshot, thresholds: &AlertThresholds) -> Option<Alert> {
    let oos = &thresholds.out_of_stock;
    let component = current.component(&oos.metric)?;
    let pct = component.value;
    let (severity, limit) = if pct >= oos.critical_pct {
        (AlertSeverity::Critical, oos.critical_pct)
    } else if pct >= oos.warning_pct {
        (AlertSeverity::Warning, oos.warning_pct)
    } else {
        return None;
    };
    let subject = current
        .category_indices
        .iter()
        .find(|c| c.component(&oos.metric).is_some())
        .map(|c| AlertSubject::from(c.category))
        .unwrap_or(AlertSubject::Operational);

    Some(Alert {
        code: AlertCode::OutOfStock,
        severity,
        subject,
        message: format!(
            "Out-of-stock rate {:.1}% is at or above the {} threshold of {:.1}%",
            pct, severity, limit
        ),
    })
}
