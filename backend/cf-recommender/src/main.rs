use anyhow::Context;
use cf_recommender::{Config, PredictionJob};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load config")?;

    // Initialize tracing
    let (json_layer, text_layer) = if config.log_json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(fmt::layer().with_writer(std::io::stderr)))
    };
    tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(
        ratings_path = %config.ratings_path.display(),
        target_user = %config.target_user,
        mode = %config.mode,
        neighborhood_size = config.neighborhood_size,
        min_support = config.min_support,
        "Starting cf-recommender"
    );

    let report = PredictionJob::new(config)
        .run()
        .await
        .map_err(|e| {
            error!("Prediction job failed: {}", e);
            e
        })
        .context("Prediction job failed")?;

    // Predictions go to stdout, one JSON object per line; logs stay on stderr
    for prediction in &report.predictions {
        println!("{}", serde_json::to_string(prediction)?);
    }
    for pair in &report.similar_items {
        println!(
            "{}",
            json!({ "similar_item_id": pair.peer_id, "similarity": pair.score })
        );
    }

    Ok(())
}
