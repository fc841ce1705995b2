pub mod alert_log_side_effect;
pub mod csv_metric_source;
