use super::normalize::normalize;
use super::pivot::PivotView;
use crate::error::Result;
use crate::models::Row;
use dashmap::DashMap;
use tracing::trace;

/// Cosine similarity of two rows after each is centered on its own mean.
///
/// The numerator runs over the keys both rows share while each norm runs
/// over the row's full key set. Returns `None` when either norm is zero,
/// which callers treat as "no signal" rather than as zero similarity.
pub fn cosine(row_a: &Row, row_b: &Row) -> Option<f64> {
    let centered_a = normalize(row_a);
    let centered_b = normalize(row_b);

    let numerator: f64 = centered_a
        .iter()
        .filter_map(|(key, a)| centered_b.get(key).map(|b| a * b))
        .sum();

    let norm_a = centered_a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = centered_b.values().map(|v| v * v).sum::<f64>().sqrt();
    let denominator = norm_a * norm_b;

    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }

    let similarity = numerator / denominator;
    similarity.is_finite().then_some(similarity)
}

/// Similarity between two rows of the same pivot. Unknown ids are errors.
pub fn cosine_similarity(pivot: &PivotView, id_a: &str, id_b: &str) -> Result<Option<f64>> {
    let row_a = pivot.require_row(id_a)?;
    let row_b = pivot.require_row(id_b)?;
    Ok(cosine(row_a, row_b))
}

/// Memoized similarities keyed by the unordered id pair.
#[derive(Debug, Default)]
pub struct SimilarityCache {
    entries: DashMap<(String, String), Option<f64>>,
}

impl SimilarityCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(id_a: &str, id_b: &str) -> (String, String) {
        if id_a <= id_b {
            (id_a.to_string(), id_b.to_string())
        } else {
            (id_b.to_string(), id_a.to_string())
        }
    }

    /// Outer `None` is a miss; inner `None` is a cached undefined similarity.
    pub fn get(&self, id_a: &str, id_b: &str) -> Option<Option<f64>> {
        self.entries
            .get(&Self::key(id_a, id_b))
            .map(|entry| *entry.value())
    }

    pub fn insert(&self, id_a: &str, id_b: &str, similarity: Option<f64>) {
        self.entries.insert(Self::key(id_a, id_b), similarity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn invalidate(&self) {
        self.entries.clear();
    }
}

/// Similarity lookups over one immutable pivot, optionally memoized.
///
/// The cache lives exactly as long as the borrow of the pivot, so it can
/// never serve values computed from a different set of ratings.
#[derive(Debug)]
pub struct SimilarityEngine<'a> {
    pivot: &'a PivotView,
    cache: Option<SimilarityCache>,
}

impl<'a> SimilarityEngine<'a> {
    pub fn new(pivot: &'a PivotView) -> Self {
        Self { pivot, cache: None }
    }

    pub fn with_cache(pivot: &'a PivotView) -> Self {
        Self {
            pivot,
            cache: Some(SimilarityCache::new()),
        }
    }

    pub fn pivot(&self) -> &'a PivotView {
        self.pivot
    }

    pub fn cache(&self) -> Option<&SimilarityCache> {
        self.cache.as_ref()
    }

    pub fn similarity(&self, id_a: &str, id_b: &str) -> Result<Option<f64>> {
        let Some(cache) = &self.cache else {
            return cosine_similarity(self.pivot, id_a, id_b);
        };

        if let Some(hit) = cache.get(id_a, id_b) {
            trace!(id_a, id_b, "Similarity cache hit");
            return Ok(hit);
        }

        let similarity = cosine_similarity(self.pivot, id_a, id_b)?;
        cache.insert(id_a, id_b, similarity);
        Ok(similarity)
    }

    /// Drop every memoized similarity.
    pub fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate();
        }
    }
}
