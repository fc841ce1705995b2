/// Extract a short type name from the full module path.
///
/// Given `"pulse_pipeline::store::MemorySnapshotStore"`, returns
/// `"MemorySnapshotStore"`. Used for component names in log lines.
pub fn short_type_name(full: &str) -> &str {
    full.rsplit("::").next().unwrap_or(full)
}
