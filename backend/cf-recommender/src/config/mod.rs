use crate::error::{CfError, Result};
use crate::models::PredictionMode;
use crate::services::{PredictorConfig, DEFAULT_MIN_SUPPORT};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "CF_";

/// Batch job configuration, read from `CF_*` environment variables
/// (a `.env` file is honored).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default = "default_ratings_path")]
    pub ratings_path: PathBuf,

    /// User whose unrated items are predicted
    pub target_user: String,

    #[serde(default)]
    pub mode: PredictionMode,

    #[serde(default = "default_neighborhood_size")]
    pub neighborhood_size: usize,

    #[serde(default = "default_min_support")]
    pub min_support: usize,

    /// How many predictions the job reports
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub parallel: bool,

    #[serde(default)]
    pub cache_similarities: bool,

    /// Whole-batch deadline in seconds; 0 disables it
    #[serde(default)]
    pub deadline_secs: u64,

    /// Also report the items most similar to this one
    #[serde(default)]
    pub similar_to: Option<String>,

    /// Emit logs as JSON; read by the binary before tracing is installed
    #[serde(default)]
    pub log_json: bool,
}

fn default_ratings_path() -> PathBuf {
    PathBuf::from("ratings.csv")
}

fn default_neighborhood_size() -> usize {
    10
}

fn default_min_support() -> usize {
    DEFAULT_MIN_SUPPORT
}

fn default_top_k() -> usize {
    10
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config: Config = envy::prefixed(ENV_PREFIX).from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Same as [`Config::from_env`] over an explicit set of `CF_*` pairs.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::prefixed(ENV_PREFIX).from_iter(pairs)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_user.trim().is_empty() {
            return Err(CfError::Config("CF_TARGET_USER must not be empty".to_string()));
        }
        if self.neighborhood_size == 0 {
            return Err(CfError::Config(
                "CF_NEIGHBORHOOD_SIZE must be at least 1".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(CfError::Config("CF_TOP_K must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            neighborhood_size: self.neighborhood_size,
            min_support: self.min_support,
            parallel: self.parallel,
            cache_similarities: self.cache_similarities,
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_secs > 0).then(|| Duration::from_secs(self.deadline_secs))
    }
}
