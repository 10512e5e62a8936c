use super::neighborhood::{compare_desc, NeighborhoodSelector, DEFAULT_MIN_SUPPORT};
use super::pivot::{PivotView, RatingStore};
use super::similarity::SimilarityEngine;
use crate::error::{CfError, Result};
use crate::models::{Neighborhood, PredictionMode, PredictionResult, PredictionStats, Row};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PredictorConfig {
    /// Maximum number of peers aggregated per prediction (N)
    pub neighborhood_size: usize,
    /// Peers need strictly more ratings than this
    pub min_support: usize,
    /// Fan out per-item predictions on the rayon pool
    pub parallel: bool,
    /// Memoize pairwise similarities for the duration of one call
    pub cache_similarities: bool,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            neighborhood_size: 10,
            min_support: DEFAULT_MIN_SUPPORT,
            parallel: false,
            cache_similarities: false,
        }
    }
}

/// Outcome of estimating a single unrated item.
#[derive(Debug, Clone, PartialEq)]
enum ItemOutcome {
    Predicted(PredictionResult),
    /// Neighborhood similarities summed to exactly zero (includes empty)
    ZeroWeight,
    NonFinite,
}

/// Everything a single item estimate reads. Shared across worker threads.
struct PredictionContext<'a> {
    mode: PredictionMode,
    user_id: &'a str,
    user_row: &'a Row,
    user_pivot: &'a PivotView,
    engine: SimilarityEngine<'a>,
}

/// Neighborhood-based rating predictor.
///
/// User mode aggregates what similar users gave the item; item mode
/// aggregates what the target user gave items similar to it. In both modes
/// an item whose neighborhood carries zero total similarity is left out of
/// the result rather than scored.
#[derive(Debug, Clone, Default)]
pub struct Predictor {
    config: PredictorConfig,
    selector: NeighborhoodSelector,
    cancel: Option<Arc<AtomicBool>>,
}

impl Predictor {
    pub fn new(config: PredictorConfig) -> Self {
        let selector = NeighborhoodSelector::new(config.min_support);
        Self {
            config,
            selector,
            cancel: None,
        }
    }

    /// Abort between items once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn selector(&self) -> &NeighborhoodSelector {
        &self.selector
    }

    pub fn user_to_user(&self, store: &RatingStore, user_id: &str) -> Result<Vec<PredictionResult>> {
        self.predict(store, user_id, PredictionMode::User)
    }

    pub fn item_to_item(&self, store: &RatingStore, user_id: &str) -> Result<Vec<PredictionResult>> {
        self.predict(store, user_id, PredictionMode::Item)
    }

    pub fn predict(
        &self,
        store: &RatingStore,
        user_id: &str,
        mode: PredictionMode,
    ) -> Result<Vec<PredictionResult>> {
        self.predict_with_stats(store, user_id, mode)
            .map(|(predictions, _)| predictions)
    }

    /// Estimate every item `user_id` has not rated, best first.
    pub fn predict_with_stats(
        &self,
        store: &RatingStore,
        user_id: &str,
        mode: PredictionMode,
    ) -> Result<(Vec<PredictionResult>, PredictionStats)> {
        let started = Instant::now();
        let user_row = store.by_user().require_row(user_id)?;

        let unrated: Vec<&String> = store
            .by_item()
            .keys()
            .filter(|item| !user_row.contains_key(item.as_str()))
            .collect();

        let neighbor_pivot = match mode {
            PredictionMode::User => store.by_user(),
            PredictionMode::Item => store.by_item(),
        };
        let engine = if self.config.cache_similarities {
            SimilarityEngine::with_cache(neighbor_pivot)
        } else {
            SimilarityEngine::new(neighbor_pivot)
        };

        let ctx = PredictionContext {
            mode,
            user_id,
            user_row,
            user_pivot: store.by_user(),
            engine,
        };

        info!(
            user_id,
            mode = %mode,
            candidates = unrated.len(),
            neighborhood_size = self.config.neighborhood_size,
            min_support = self.config.min_support,
            parallel = self.config.parallel,
            "Predicting unrated items"
        );

        let outcomes = self.evaluate(&ctx, &unrated)?;

        let mut stats = PredictionStats {
            candidate_items: unrated.len(),
            ..Default::default()
        };
        let mut predictions = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                ItemOutcome::Predicted(result) => predictions.push(result),
                ItemOutcome::ZeroWeight => stats.skipped_zero_weight += 1,
                ItemOutcome::NonFinite => stats.skipped_non_finite += 1,
            }
        }
        stats.predicted = predictions.len();

        sort_predictions(&mut predictions);

        info!(
            user_id,
            mode = %mode,
            predicted = stats.predicted,
            skipped_zero_weight = stats.skipped_zero_weight,
            skipped_non_finite = stats.skipped_non_finite,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Prediction completed"
        );

        Ok((predictions, stats))
    }

    #[cfg(feature = "parallel")]
    fn evaluate(&self, ctx: &PredictionContext<'_>, items: &[&String]) -> Result<Vec<ItemOutcome>> {
        use rayon::prelude::*;

        if self.config.parallel {
            items
                .par_iter()
                .map(|item| self.predict_item(ctx, item))
                .collect()
        } else {
            items.iter().map(|item| self.predict_item(ctx, item)).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn evaluate(&self, ctx: &PredictionContext<'_>, items: &[&String]) -> Result<Vec<ItemOutcome>> {
        if self.config.parallel {
            warn!("Built without the `parallel` feature, predicting sequentially");
        }
        items.iter().map(|item| self.predict_item(ctx, item)).collect()
    }

    fn predict_item(&self, ctx: &PredictionContext<'_>, item_id: &str) -> Result<ItemOutcome> {
        if self.is_cancelled() {
            return Err(CfError::Cancelled);
        }

        let n = self.config.neighborhood_size;
        let neighborhood = match ctx.mode {
            PredictionMode::User => {
                self.selector
                    .top_n_similar(&ctx.engine, ctx.user_id, item_id, n)?
            }
            PredictionMode::Item => {
                self.selector
                    .top_n_similar(&ctx.engine, item_id, ctx.user_id, n)?
            }
        };

        let (numerator, denominator) = aggregate(ctx, item_id, &neighborhood)?;

        if denominator == 0.0 {
            warn!(item_id, peers = neighborhood.len(), "Zero similarity weight, skipping");
            return Ok(ItemOutcome::ZeroWeight);
        }

        let estimated_score = numerator / denominator;
        if !estimated_score.is_finite() {
            warn!(item_id, "Non-finite estimate, skipping");
            return Ok(ItemOutcome::NonFinite);
        }

        Ok(ItemOutcome::Predicted(PredictionResult {
            item_id: item_id.to_string(),
            estimated_score,
        }))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Σ value·sim and Σ sim over the neighborhood.
fn aggregate(
    ctx: &PredictionContext<'_>,
    item_id: &str,
    neighborhood: &Neighborhood,
) -> Result<(f64, f64)> {
    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for pair in neighborhood.iter() {
        let value = match ctx.mode {
            // what the similar user gave this item
            PredictionMode::User => ctx
                .user_pivot
                .row(&pair.peer_id)
                .and_then(|row| row.get(item_id)),
            // what the target user gave the similar item
            PredictionMode::Item => ctx.user_row.get(&pair.peer_id),
        };

        let value = value.copied().ok_or_else(|| {
            CfError::Internal(format!(
                "pivot views disagree: no rating linking {} and {}",
                pair.peer_id, item_id
            ))
        })?;

        numerator += value * pair.score;
        denominator += pair.score;
    }

    Ok((numerator, denominator))
}

/// Descending estimated score, ascending item id among equal scores.
pub fn sort_predictions(predictions: &mut [PredictionResult]) {
    predictions.sort_by(|a, b| {
        compare_desc(a.estimated_score, b.estimated_score).then_with(|| a.item_id.cmp(&b.item_id))
    });
}
