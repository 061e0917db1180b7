//! Error types for valuation requests and row-level ingestion

use thiserror::Error;

/// Failures reported back to a caller of the query interface.
///
/// Each variant is a distinct outcome: a rejected request, a data-coverage
/// gap, or a model that cannot score. None of them should take the process
/// down.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    /// Missing or non-numeric required field on a user query
    #[error("Invalid input: {0}")]
    Validation(String),

    /// No historical trims exist for the Make + Model pair
    #[error("No data available for {make} {model}")]
    NoData { make: String, model: String },

    /// Model failed to load at startup
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Model loaded but failed to score the feature rows
    #[error("Model failed to score: {0}")]
    Scoring(String),
}

impl ValuationError {
    /// Stable machine-readable tag for the outcome
    pub fn kind(&self) -> &'static str {
        match self {
            ValuationError::Validation(_) => "validation",
            ValuationError::NoData { .. } => "insufficient_data",
            ValuationError::ModelUnavailable(_) => "model_unavailable",
            ValuationError::Scoring(_) => "scoring",
        }
    }
}

/// A single source row that could not be normalized.
/// Logged and dropped; never aborts the batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("row has no identifier")]
    MissingId,

    #[error("missing required field {0}")]
    MissingField(&'static str),

    #[error("field {field} is not numeric: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("filtered out: {0}")]
    Filtered(&'static str),
}

pub type ValuationResult<T> = std::result::Result<T, ValuationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_is_distinct_from_model_failure() {
        let gap = ValuationError::NoData {
            make: "Toyota".to_string(),
            model: "Supra".to_string(),
        };
        let failure = ValuationError::ModelUnavailable("file not found".to_string());

        assert_eq!(gap.kind(), "insufficient_data");
        assert_eq!(failure.kind(), "model_unavailable");
        assert_eq!(gap.to_string(), "No data available for Toyota Supra");
    }

    #[test]
    fn test_row_error_messages() {
        let err = RowError::InvalidNumber {
            field: "Price",
            value: "call me".to_string(),
        };
        assert_eq!(err.to_string(), "field Price is not numeric: \"call me\"");
    }
}
