use thiserror::Error;

/// Failure to interpret a benchmark results document.
///
/// Only structural problems are errors. A record that simply lacks an
/// algorithm, or a dataset with no reference record, is valid sparse data and
/// never produces one of these.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected an array of records or an object with a `results` array, found {0}")]
    UnexpectedShape(&'static str),
    #[error("record {index} is not an object")]
    NotAnObject { index: usize },
    #[error("record {index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("record {index} has an invalid `{field}`: {reason}")]
    InvalidField {
        index: usize,
        field: String,
        reason: String,
    },
}
