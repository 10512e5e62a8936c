use super::similarity::SimilarityEngine;
use crate::error::Result;
use crate::models::{Neighborhood, SimilarityPair};
use std::cmp::Ordering;
use tracing::debug;

/// Rows with this many ratings or fewer are never used as peers.
pub const DEFAULT_MIN_SUPPORT: usize = 100;

/// Picks the peers whose ratings feed a single prediction.
///
/// Peers must have more than `min_support` ratings: similarities computed
/// from a handful of co-ratings swing too much to be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborhoodSelector {
    min_support: usize,
}

impl Default for NeighborhoodSelector {
    fn default() -> Self {
        Self {
            min_support: DEFAULT_MIN_SUPPORT,
        }
    }
}

impl NeighborhoodSelector {
    pub fn new(min_support: usize) -> Self {
        Self { min_support }
    }

    pub fn min_support(&self) -> usize {
        self.min_support
    }

    /// Every eligible row ranked by similarity to `target`, undefined
    /// similarities dropped. The target itself is not excluded.
    pub fn similar_pool(
        &self,
        engine: &SimilarityEngine<'_>,
        target: &str,
    ) -> Result<Vec<SimilarityPair>> {
        self.ranked_peers(engine, target, None)
    }

    /// Up to `n` most similar eligible peers whose own row contains
    /// `required_counterpart`.
    ///
    /// An empty neighborhood is a valid answer: nothing similar enough has
    /// rated (or been rated by) the counterpart.
    pub fn top_n_similar(
        &self,
        engine: &SimilarityEngine<'_>,
        target: &str,
        required_counterpart: &str,
        n: usize,
    ) -> Result<Neighborhood> {
        let mut peers = self.ranked_peers(engine, target, Some(required_counterpart))?;
        peers.truncate(n);

        debug!(
            target_id = target,
            required_counterpart,
            size = peers.len(),
            "Neighborhood selected"
        );

        Ok(Neighborhood { peers })
    }

    fn ranked_peers(
        &self,
        engine: &SimilarityEngine<'_>,
        target: &str,
        required_counterpart: Option<&str>,
    ) -> Result<Vec<SimilarityPair>> {
        let pivot = engine.pivot();
        pivot.require_row(target)?;

        let mut pairs = Vec::new();
        for (peer_id, row) in pivot.iter() {
            if row.len() <= self.min_support {
                continue;
            }
            // Filtering before scoring keeps the result identical while
            // skipping similarities that would be discarded anyway.
            if let Some(counterpart) = required_counterpart {
                if !row.contains_key(counterpart) {
                    continue;
                }
            }
            if let Some(score) = engine.similarity(target, peer_id)? {
                pairs.push(SimilarityPair {
                    peer_id: peer_id.clone(),
                    score,
                });
            }
        }

        sort_by_similarity(&mut pairs);
        Ok(pairs)
    }
}

/// Descending similarity, ascending peer id among equal scores.
pub fn sort_by_similarity(pairs: &mut [SimilarityPair]) {
    pairs.sort_by(|a, b| compare_desc(a.score, b.score).then_with(|| a.peer_id.cmp(&b.peer_id)));
}

pub(crate) fn compare_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
