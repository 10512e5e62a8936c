//! Neighborhood collaborative filtering over a sparse rating log.
//!
//! A [`RatingStore`] keeps two pivot views of the same ratings (by user and
//! by item). The [`Predictor`] estimates every item a user has not rated from
//! mean-centered cosine similarities, either between users or between items,
//! and returns the estimates best first.

pub mod config;
pub mod error;
pub mod jobs;
pub mod loader;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{CfError, Result};
pub use jobs::{JobReport, PredictionJob};
pub use models::{PredictionMode, PredictionResult, Rating, RatingRecord};
pub use services::{NeighborhoodSelector, Predictor, PredictorConfig, RatingStore};
