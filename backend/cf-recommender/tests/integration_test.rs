use cf_recommender::models::{Axis, Row};
use cf_recommender::services::{cosine_similarity, normalize, PivotView, SimilarityEngine};
use cf_recommender::{
    CfError, Config, NeighborhoodSelector, PredictionJob, PredictionMode, Predictor,
    PredictorConfig, RatingRecord, RatingStore,
};
use std::collections::HashSet;
use std::io::Write;
use tempfile::NamedTempFile;

/// Deterministic synthetic log: 40 users, 30 items, ~60% density, two
/// taste clusters so that similarities are spread across [-1, 1].
fn synthetic_records() -> Vec<RatingRecord> {
    let mut records = Vec::new();
    for u in 0..40u32 {
        for m in 0..30u32 {
            if (u * 7 + m * 13) % 5 < 2 {
                continue;
            }
            let base = if (u % 2 == 0) == (m % 3 == 0) { 4.0 } else { 2.0 };
            let jitter = ((u * 31 + m * 17) % 5) as f64 * 0.25;
            let rating = f64::min(5.0, base + jitter - 0.5);
            records.push(RatingRecord::new(
                &format!("u{}", u),
                &format!("m{}", m),
                &format!("{:.2}", rating),
            ));
        }
    }
    // a user with gaps to predict
    for m in 0..6u32 {
        records.push(RatingRecord::new("April", &format!("m{}", m), "4.5"));
    }
    records.push(RatingRecord::new("April", "m1", "1.0"));
    records
}

fn row(entries: &[(&str, f64)]) -> Row {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[test]
fn test_reference_scenario() {
    let pivot = PivotView::from_rows(
        Axis::ByUser,
        vec![
            ("u1", row(&[("m1", 5.0), ("m2", 3.0)])),
            ("u2", row(&[("m1", 4.0), ("m2", 3.0)])),
            ("u3", row(&[("m1", 1.0)])),
            ("u4", row(&[("m1", 3.0), ("m2", 5.0)])),
        ],
    );

    assert_eq!(
        normalize(pivot.row("u1").unwrap()),
        row(&[("m1", 1.0), ("m2", -1.0)])
    );

    let aligned = cosine_similarity(&pivot, "u1", "u2").unwrap().unwrap();
    let opposed = cosine_similarity(&pivot, "u1", "u4").unwrap().unwrap();
    assert!(aligned.is_finite());
    assert!(aligned > opposed);
}

#[test]
fn test_predictions_respect_invariants() {
    let store = RatingStore::from_records(&synthetic_records()).unwrap();
    let rated: HashSet<&String> = store.by_user().row("April").unwrap().keys().collect();

    for mode in [PredictionMode::User, PredictionMode::Item] {
        let predictor = Predictor::new(PredictorConfig {
            neighborhood_size: 5,
            min_support: 10,
            ..Default::default()
        });
        let (results, stats) = predictor.predict_with_stats(&store, "April", mode).unwrap();

        assert_eq!(stats.candidate_items, 30 - rated.len());
        assert_eq!(
            stats.predicted + stats.skipped_zero_weight + stats.skipped_non_finite,
            stats.candidate_items
        );
        assert!(!results.is_empty(), "{mode} mode predicted nothing");

        for result in &results {
            assert!(!rated.contains(&result.item_id));
            assert!(result.estimated_score.is_finite());
        }
        for pair in results.windows(2) {
            assert!(pair[0].estimated_score >= pair[1].estimated_score);
        }
    }
}

#[test]
fn test_neighborhoods_are_bounded_and_relevant() {
    let store = RatingStore::from_records(&synthetic_records()).unwrap();
    let engine = SimilarityEngine::new(store.by_user());
    let selector = NeighborhoodSelector::new(10);

    for item in ["m7", "m12", "m29"] {
        let hood = selector.top_n_similar(&engine, "u3", item, 4).unwrap();
        assert!(hood.len() <= 4);
        for pair in hood.iter() {
            let peer_row = store.by_user().row(&pair.peer_id).unwrap();
            assert!(peer_row.contains_key(item));
            assert!(peer_row.len() > 10);
        }
    }
}

#[test]
fn test_fan_out_and_cache_match_sequential() {
    let store = RatingStore::from_records(&synthetic_records()).unwrap();
    let sequential = Predictor::new(PredictorConfig {
        neighborhood_size: 8,
        min_support: 5,
        ..Default::default()
    });
    let tuned = Predictor::new(PredictorConfig {
        neighborhood_size: 8,
        min_support: 5,
        parallel: true,
        cache_similarities: true,
    });

    for mode in [PredictionMode::User, PredictionMode::Item] {
        assert_eq!(
            sequential.predict(&store, "April", mode).unwrap(),
            tuned.predict(&store, "April", mode).unwrap()
        );
    }
}

#[test]
fn test_fully_rated_single_user() {
    let records = vec![RatingRecord::new("only", "film", "3.5")];
    let store = RatingStore::from_records(&records).unwrap();
    let predictor = Predictor::new(PredictorConfig {
        min_support: 0,
        ..Default::default()
    });

    assert!(predictor.user_to_user(&store, "only").unwrap().is_empty());
    assert!(predictor.item_to_item(&store, "only").unwrap().is_empty());
}

#[tokio::test]
async fn test_job_end_to_end_from_csv() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "userId,movieId,rating,timestamp").expect("write header");
    for (idx, record) in synthetic_records().iter().enumerate() {
        writeln!(
            file,
            "{},{},{},{}",
            record.user_id.as_deref().unwrap(),
            record.movie_id.as_deref().unwrap(),
            record.rating.as_deref().unwrap(),
            1_260_759_144 + idx
        )
        .expect("write row");
    }

    let config = Config::from_pairs(vec![
        ("CF_TARGET_USER".to_string(), "April".to_string()),
        (
            "CF_RATINGS_PATH".to_string(),
            file.path().display().to_string(),
        ),
        ("CF_MIN_SUPPORT".to_string(), "10".to_string()),
        ("CF_TOP_K".to_string(), "3".to_string()),
        ("CF_MODE".to_string(), "item".to_string()),
        ("CF_DEADLINE_SECS".to_string(), "120".to_string()),
    ])
    .unwrap();

    let report = PredictionJob::new(config).run().await.unwrap();

    assert_eq!(report.user_id, "April");
    assert_eq!(report.mode, PredictionMode::Item);
    assert!(!report.predictions.is_empty());
    assert!(report.predictions.len() <= 3);
    assert_eq!(report.stats.users, 41);
    assert_eq!(report.stats.items, 30);
}

#[tokio::test]
async fn test_job_rejects_malformed_csv() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "userId,movieId,rating,timestamp").expect("write header");
    writeln!(file, "April,1,4.0,0").expect("write row");
    writeln!(file, "April,2,n/a,0").expect("write row");

    let config = Config::from_pairs(vec![
        ("CF_TARGET_USER".to_string(), "April".to_string()),
        (
            "CF_RATINGS_PATH".to_string(),
            file.path().display().to_string(),
        ),
    ])
    .unwrap();

    let err = PredictionJob::new(config).run().await.unwrap_err();
    assert!(matches!(err, CfError::MalformedRecord { record: 2, .. }));
}
