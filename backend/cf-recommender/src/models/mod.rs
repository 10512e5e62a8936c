use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One sparse row of a pivot view: counterpart id -> score.
pub type Row = BTreeMap<String, f64>;

/// Raw record as read from the rating log. Every field is optional so that
/// missing columns surface as `MalformedRecord` at pivot-build time instead
/// of as a CSV decoding failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "movieId", default)]
    pub movie_id: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl RatingRecord {
    pub fn new(user_id: &str, movie_id: &str, rating: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            movie_id: Some(movie_id.to_string()),
            rating: Some(rating.to_string()),
            timestamp: None,
        }
    }
}

/// Validated (user, item, score) fact.
#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    pub user_id: String,
    pub item_id: String,
    pub score: f64,
    pub timestamp: Option<String>, // opaque, never interpreted
}

/// Which dimension of the ratings matrix keys the rows of a pivot view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// user -> {item: score}
    ByUser,
    /// item -> {user: score}
    ByItem,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::ByUser => "user",
            Axis::ByItem => "item",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionMode {
    /// Aggregate ratings of similar users
    #[default]
    User,
    /// Aggregate the target user's own ratings of similar items
    Item,
}

impl PredictionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionMode::User => "user",
            PredictionMode::Item => "item",
        }
    }
}

impl fmt::Display for PredictionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A peer with a defined similarity to some target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityPair {
    pub peer_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighborhood {
    pub peers: Vec<SimilarityPair>,
}

impl Neighborhood {
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimilarityPair> {
        self.peers.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub item_id: String,
    pub estimated_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictionStats {
    pub candidate_items: usize,
    pub predicted: usize,
    pub skipped_zero_weight: usize,
    pub skipped_non_finite: usize,
}
