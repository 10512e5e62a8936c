use crate::error::{CfError, Result};
use crate::models::{Axis, Rating, RatingRecord, Row};
use std::collections::BTreeMap;
use tracing::debug;

/// Sparse ratings matrix indexed by one of its two dimensions.
///
/// Rows and columns are ordered maps, so every scan over a pivot visits ids
/// in the same order regardless of how the rating log was laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotView {
    axis: Axis,
    rows: BTreeMap<String, Row>,
}

impl PivotView {
    /// Validate raw records and pivot them along `axis`.
    ///
    /// A repeated (row, column) pair keeps the last score seen.
    pub fn build(records: &[RatingRecord], axis: Axis) -> Result<Self> {
        let ratings = validate_records(records)?;
        Ok(Self::from_ratings(&ratings, axis))
    }

    pub fn from_ratings(ratings: &[Rating], axis: Axis) -> Self {
        let mut rows: BTreeMap<String, Row> = BTreeMap::new();

        for rating in ratings {
            let (row_key, col_key) = match axis {
                Axis::ByUser => (&rating.user_id, &rating.item_id),
                Axis::ByItem => (&rating.item_id, &rating.user_id),
            };
            rows.entry(row_key.clone())
                .or_default()
                .insert(col_key.clone(), rating.score);
        }

        Self { axis, rows }
    }

    /// Assemble a pivot directly from rows.
    pub fn from_rows<I, K>(axis: Axis, rows: I) -> Self
    where
        I: IntoIterator<Item = (K, Row)>,
        K: Into<String>,
    {
        Self {
            axis,
            rows: rows.into_iter().map(|(k, row)| (k.into(), row)).collect(),
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn row(&self, id: &str) -> Option<&Row> {
        self.rows.get(id)
    }

    /// Like [`PivotView::row`] but an absent id is a `NotFound` error.
    pub fn require_row(&self, id: &str) -> Result<&Row> {
        self.rows
            .get(id)
            .ok_or_else(|| CfError::not_found(self.axis.as_str(), id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    /// Number of ratings in a row; zero for unknown ids.
    pub fn support(&self, id: &str) -> usize {
        self.rows.get(id).map_or(0, Row::len)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.rows.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Row)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rating log held in memory with both pivot views built over the same facts.
#[derive(Debug, Clone)]
pub struct RatingStore {
    ratings: Vec<Rating>,
    by_user: PivotView,
    by_item: PivotView,
}

impl RatingStore {
    pub fn from_records(records: &[RatingRecord]) -> Result<Self> {
        let ratings = validate_records(records)?;
        Ok(Self::from_ratings(ratings))
    }

    pub fn from_ratings(ratings: Vec<Rating>) -> Self {
        let by_user = PivotView::from_ratings(&ratings, Axis::ByUser);
        let by_item = PivotView::from_ratings(&ratings, Axis::ByItem);

        debug!(
            ratings = ratings.len(),
            users = by_user.len(),
            items = by_item.len(),
            "Rating store built"
        );

        Self {
            ratings,
            by_user,
            by_item,
        }
    }

    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// user -> {item: score}
    pub fn by_user(&self) -> &PivotView {
        &self.by_user
    }

    /// item -> {user: score}
    pub fn by_item(&self) -> &PivotView {
        &self.by_item
    }
}

/// Validate a single raw record. `position` is 1-based and only used for
/// error reporting.
pub fn validate_record(record: &RatingRecord, position: usize) -> Result<Rating> {
    let user_id = required_field(record.user_id.as_deref(), "userId", position)?;
    let item_id = required_field(record.movie_id.as_deref(), "movieId", position)?;
    let raw_rating = required_field(record.rating.as_deref(), "rating", position)?;

    let score: f64 = raw_rating.parse().map_err(|_| {
        CfError::malformed(position, format!("rating `{}` is not a number", raw_rating))
    })?;
    if !score.is_finite() {
        return Err(CfError::malformed(
            position,
            format!("rating `{}` is not finite", raw_rating),
        ));
    }

    Ok(Rating {
        user_id,
        item_id,
        score,
        timestamp: record.timestamp.clone(),
    })
}

pub fn validate_records(records: &[RatingRecord]) -> Result<Vec<Rating>> {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| validate_record(record, idx + 1))
        .collect()
}

fn required_field(value: Option<&str>, name: &str, position: usize) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CfError::malformed(
            position,
            format!("missing field `{}`", name),
        )),
    }
}
