pub mod snapshot_pipeline;
