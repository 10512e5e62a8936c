// ============================================
// Batch Jobs
// ============================================
//
// The prediction job is the only consumer of the engine: it runs once per
// invocation (CLI or CronJob) and exits.

pub mod predict_batch;

pub use predict_batch::{run_prediction_job, JobReport, JobStats, PredictionJob};
