pub mod neighborhood;
pub mod normalize;
pub mod pivot;
pub mod predictor;
pub mod similarity;

pub use neighborhood::{NeighborhoodSelector, DEFAULT_MIN_SUPPORT};
pub use normalize::normalize;
pub use pivot::{PivotView, RatingStore};
pub use predictor::{Predictor, PredictorConfig};
pub use similarity::{cosine_similarity, SimilarityCache, SimilarityEngine};
