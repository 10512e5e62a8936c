// ============================================
// Rating Log Loader
// ============================================
//
// Reads `userId,movieId,rating,timestamp` CSV into raw records.
// Field validation is deferred to pivot building so that a record with a
// missing or non-numeric rating is reported as MalformedRecord with its
// position, while only framing/I-O problems fail here.

use crate::error::Result;
use crate::models::RatingRecord;
use std::io::Read;
use std::path::Path;
use tracing::info;

pub fn read_ratings(path: impl AsRef<Path>) -> Result<Vec<RatingRecord>> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let records = collect(reader)?;
    info!(
        path = %path.display(),
        records = records.len(),
        "Rating log loaded"
    );
    Ok(records)
}

pub fn read_ratings_from<R: Read>(input: R) -> Result<Vec<RatingRecord>> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);
    collect(reader)
}

fn collect<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<RatingRecord>> {
    let mut records = Vec::new();
    for row in reader.deserialize::<RatingRecord>() {
        records.push(row?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CfError;
    use crate::services::RatingStore;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_ratings_from_file() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "userId,movieId,rating,timestamp").expect("write header");
        writeln!(file, "1,31,2.5,1260759144").expect("write row");
        writeln!(file, "1,1029,3.0,1260759179").expect("write row");
        writeln!(file, "April,260,5.0,1260759182").expect("write row");

        let records = read_ratings(file.path()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[2].user_id.as_deref(), Some("April"));
        assert_eq!(records[2].movie_id.as_deref(), Some("260"));
        assert_eq!(records[2].rating.as_deref(), Some("5.0"));
        assert_eq!(records[0].timestamp.as_deref(), Some("1260759144"));
    }

    #[test]
    fn test_column_order_is_irrelevant() {
        let csv = "rating,timestamp,movieId,userId\n4.0,0,m1,u1\n";
        let records = read_ratings_from(csv.as_bytes()).unwrap();
        assert_eq!(records, vec![RatingRecord {
            user_id: Some("u1".to_string()),
            movie_id: Some("m1".to_string()),
            rating: Some("4.0".to_string()),
            timestamp: Some("0".to_string()),
        }]);
    }

    #[test]
    fn test_gaps_surface_at_pivot_time() {
        let csv = "userId,movieId,rating,timestamp\nu1,m1,4.0,0\nu2,m1,,0\n";
        let records = read_ratings_from(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let err = RatingStore::from_records(&records).unwrap_err();
        assert!(matches!(err, CfError::MalformedRecord { record: 2, .. }));
    }

    #[test]
    fn test_missing_column() {
        let csv = "userId,movieId\nu1,m1\n";
        let records = read_ratings_from(csv.as_bytes()).unwrap();
        assert_eq!(records[0].rating, None);
        assert!(RatingStore::from_records(&records).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = read_ratings("/nonexistent/ratings.csv").unwrap_err();
        assert!(matches!(err, CfError::Csv(_)));
    }
}
