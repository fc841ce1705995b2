//! CSV metric loader.
//!
//! Parses metric CSV files into `MetricRecord` structs with store and period
//! context. Expected CSV columns:
//!   store_id, period_start, period_end, key, value, history
//!
//! `history` holds prior period values separated by `;`, oldest first. It may
//! be empty.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use pulse_index::{Metric, Period};
use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};

/// A CSV record with store and period included.
/// The engine only needs key, value and history; the rest routes the record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricRecord {
    pub store_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub key: String,
    pub value: f64,
    #[serde(default, deserialize_with = "deserialize_history")]
    pub history: Vec<f64>,
}

impl MetricRecord {
    /// Convert to an engine `Metric` (drops store and period).
    pub fn to_metric(&self) -> Metric {
        Metric::new(self.key.clone(), self.value).with_history(self.history.clone())
    }

    pub fn period(&self) -> Period {
        Period::new(self.period_start, self.period_end)
    }
}

/// Load metric records from a CSV reader.
pub fn load_metrics<R: Read>(reader: R) -> PipelineResult<Vec<MetricRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (line_num, result) in csv_reader.deserialize().enumerate() {
        let record: MetricRecord = result.map_err(|source| PipelineError::Csv {
            line: line_num + 2,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Load metric records from a CSV file path.
pub fn load_metrics_file(path: impl AsRef<Path>) -> PipelineResult<Vec<MetricRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| PipelineError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    load_metrics(file)
}

/// Group records by store_id, stores in sorted order.
pub fn group_by_store(records: &[MetricRecord]) -> Vec<(String, Vec<MetricRecord>)> {
    let mut groups: BTreeMap<String, Vec<MetricRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.store_id.clone())
            .or_default()
            .push(record.clone());
    }
    groups.into_iter().collect()
}

/// Every distinct (store, period) pair, sorted by store then period start.
///
/// When records for the same period start disagree on the end date the
/// first one seen wins.
pub fn distinct_periods(records: &[MetricRecord]) -> Vec<(String, Period)> {
    let mut periods: BTreeMap<(String, NaiveDate), Period> = BTreeMap::new();
    for record in records {
        let key = (record.store_id.clone(), record.period_start);
        let period = periods.entry(key).or_insert_with(|| record.period());
        if period.end != record.period_end {
            log::warn!(
                "store={} period_start={} has conflicting end dates, keeping the first",
                record.store_id,
                record.period_start
            );
        }
    }
    periods
        .into_iter()
        .map(|((store_id, _), period)| (store_id, period))
        .collect()
}

/// Lenient history deserializer: `"1.5; 2;;3"` -> `[1.5, 2.0, 3.0]`.
/// Blank and unparsable points are dropped.
fn deserialize_history<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let mut points = Vec::new();
    for raw in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => points.push(v),
            _ => log::debug!("dropping unparsable history point '{}'", raw),
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
store_id,period_start,period_end,key,value,history
store-7,2025-03-03,2025-03-09,revenue,52000,48000;50000;51000
store-7,2025-03-03,2025-03-09,out_of_stock_percent,1.5,
store-12,2025-03-03,2025-03-09,fulfillment_days,4.5,
store-12,2025-03-10,2025-03-16,fulfillment_days,6,
store-3,2025-03-03,2025-03-09,average_position,12.4,11; 12.5 ;x;;13
";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn load_sample_csv() {
        let records = load_metrics(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].store_id, "store-7");
        assert_eq!(records[0].key, "revenue");
        assert_eq!(records[0].period_start, date(2025, 3, 3));
        assert_eq!(records[0].history, vec![48000.0, 50000.0, 51000.0]);
        assert!(records[1].history.is_empty());
    }

    #[test]
    fn history_drops_blank_and_bad_points() {
        let records = load_metrics(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(records[4].history, vec![11.0, 12.5, 13.0]);
    }

    #[test]
    fn bad_value_reports_line_number() {
        let csv_data = "\
store_id,period_start,period_end,key,value,history
s1,2025-03-03,2025-03-09,revenue,10,
s1,2025-03-03,2025-03-09,revenue,lots,
";
        let err = load_metrics(csv_data.as_bytes()).unwrap_err();
        match err {
            PipelineError::Csv { line, .. } => assert_eq!(line, 3),
            other => panic!("expected CSV error, got {other}"),
        }
    }

    #[test]
    fn group_records_by_store() {
        let records = load_metrics(SAMPLE_CSV.as_bytes()).unwrap();
        let groups = group_by_store(&records);
        let ids: Vec<&str> = groups.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["store-12", "store-3", "store-7"]);
        assert_eq!(groups[2].1.len(), 2);
    }

    #[test]
    fn distinct_periods_are_sorted() {
        let records = load_metrics(SAMPLE_CSV.as_bytes()).unwrap();
        let periods = distinct_periods(&records);
        assert_eq!(periods.len(), 4);
        assert_eq!(periods[0].0, "store-12");
        assert_eq!(periods[0].1.start, date(2025, 3, 3));
        assert_eq!(periods[1].1.start, date(2025, 3, 10));
        assert_eq!(periods[1].1.end, date(2025, 3, 16));
    }

    #[test]
    fn to_metric_preserves_fields() {
        let records = load_metrics(SAMPLE_CSV.as_bytes()).unwrap();
        let metric = records[0].to_metric();
        assert_eq!(metric.key, "revenue");
        assert_eq!(metric.value, 52000.0);
        assert_eq!(metric.history.len(), 3);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = load_metrics_file("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Open { .. }));
    }
}
