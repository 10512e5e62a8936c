// ============================================
// Prediction Batch Job
// ============================================
//
// Loads a rating log, predicts every item the target user has not rated
// and keeps the best `top_k`.
//
// Workflow:
// 1. Read the CSV rating log
// 2. Build both pivot views (fails fast on malformed records)
// 3. Run the predictor on a blocking worker, bounded by the deadline
// 4. Optionally rank the items most similar to `similar_to`
//
// Usage:
//   CF_TARGET_USER=April CF_MODE=item cf-recommender

use crate::config::Config;
use crate::error::{CfError, Result};
use crate::loader;
use crate::models::{PredictionMode, PredictionResult, PredictionStats, RatingRecord, SimilarityPair};
use crate::services::{Predictor, RatingStore, SimilarityEngine};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    pub ratings: usize,
    pub users: usize,
    pub items: usize,
    pub prediction: PredictionStats,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub user_id: String,
    pub mode: PredictionMode,
    /// Best predictions first, at most `top_k`
    pub predictions: Vec<PredictionResult>,
    /// Items closest to `similar_to`, empty when not requested
    pub similar_items: Vec<SimilarityPair>,
    pub stats: JobStats,
}

pub struct PredictionJob {
    config: Config,
}

impl PredictionJob {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self) -> Result<JobReport> {
        let path = self.config.ratings_path.clone();
        let records = tokio::task::spawn_blocking(move || loader::read_ratings(path))
            .await
            .map_err(|e| CfError::Internal(format!("loader task failed: {}", e)))??;

        self.run_on_records(records).await
    }

    pub async fn run_on_records(&self, records: Vec<RatingRecord>) -> Result<JobReport> {
        let started = Instant::now();
        let store = Arc::new(RatingStore::from_records(&records)?);
        drop(records);

        let mut stats = JobStats {
            ratings: store.ratings().len(),
            users: store.by_user().len(),
            items: store.by_item().len(),
            ..Default::default()
        };

        info!(
            ratings = stats.ratings,
            users = stats.users,
            items = stats.items,
            "Pivot views built"
        );

        let cancel = Arc::new(AtomicBool::new(false));
        let predictor =
            Predictor::new(self.config.predictor_config()).with_cancellation(cancel.clone());
        let user_id = self.config.target_user.clone();
        let mode = self.config.mode;
        let similar_to = self.config.similar_to.clone();
        let top_k = self.config.top_k;

        let worker_store = store.clone();
        let worker = tokio::task::spawn_blocking(move || {
            let (mut predictions, prediction_stats) =
                predictor.predict_with_stats(&worker_store, &user_id, mode)?;
            predictions.truncate(top_k);

            let similar_items = match similar_to {
                Some(item_id) => rank_similar_items(&predictor, &worker_store, &item_id, top_k)?,
                None => Vec::new(),
            };

            Ok::<_, CfError>((predictions, prediction_stats, similar_items))
        });

        let joined = match self.config.deadline() {
            Some(deadline) => match tokio::time::timeout(deadline, worker).await {
                Ok(joined) => joined,
                Err(_) => {
                    cancel.store(true, Ordering::Relaxed);
                    warn!(?deadline, "Prediction deadline exceeded, cancelling");
                    return Err(CfError::DeadlineExceeded(deadline));
                }
            },
            None => worker.await,
        };

        let (predictions, prediction_stats, similar_items) =
            joined.map_err(|e| CfError::Internal(format!("prediction task failed: {}", e)))??;

        stats.prediction = prediction_stats;
        stats.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            user_id = %self.config.target_user,
            mode = %mode,
            reported = predictions.len(),
            similar_items = similar_items.len(),
            duration_ms = stats.duration_ms,
            "Prediction job finished"
        );

        Ok(JobReport {
            user_id: self.config.target_user.clone(),
            mode,
            predictions,
            similar_items,
            stats,
        })
    }
}

/// Items ranked by similarity to `item_id`, excluding the item itself.
fn rank_similar_items(
    predictor: &Predictor,
    store: &RatingStore,
    item_id: &str,
    limit: usize,
) -> Result<Vec<SimilarityPair>> {
    let engine = SimilarityEngine::new(store.by_item());
    let mut pool = predictor.selector().similar_pool(&engine, item_id)?;
    pool.retain(|pair| pair.peer_id != item_id);
    pool.truncate(limit);
    Ok(pool)
}

/// Load config from the environment and run one pass.
pub async fn run_prediction_job() -> Result<JobReport> {
    let config = Config::from_env()?;
    PredictionJob::new(config).run().await
}
