use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CfError>;

#[derive(Debug, Error)]
pub enum CfError {
    /// A rating record lacks a required field or carries a non-numeric rating.
    /// `record` is the 1-based position of the record in the input sequence.
    #[error("Malformed record #{record}: {reason}")]
    MalformedRecord { record: usize, reason: String },

    #[error("Unknown {kind}: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prediction cancelled")]
    Cancelled,

    #[error("Prediction deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CfError {
    pub fn malformed(record: usize, reason: impl Into<String>) -> Self {
        CfError::MalformedRecord {
            record,
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CfError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<envy::Error> for CfError {
    fn from(err: envy::Error) -> Self {
        CfError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CfError::malformed(3, "missing field `rating`");
        assert_eq!(err.to_string(), "Malformed record #3: missing field `rating`");

        let err = CfError::not_found("user", "April");
        assert_eq!(err.to_string(), "Unknown user: April");

        let err = CfError::DeadlineExceeded(Duration::from_secs(2));
        assert_eq!(err.to_string(), "Prediction deadline exceeded after 2s");
    }
}
