use crate::models::Row;

/// Mean-center a sparse row.
///
/// Only present entries are centered; absent counterparts stay absent rather
/// than being filled with zero. A single-entry row centers to `0.0`.
pub fn normalize(row: &Row) -> Row {
    if row.is_empty() {
        return Row::new();
    }

    let mean = row.values().sum::<f64>() / row.len() as f64;

    row.iter()
        .map(|(key, score)| (key.clone(), score - mean))
        .collect()
}
