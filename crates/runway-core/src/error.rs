use thiserror::Error;

use crate::period::YearMonth;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunwayError {
    #[error("Invalid month format: '{0}' (expected YYYY-MM)")]
    InvalidMonthFormat(String),

    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: String, found: String },

    #[error("{entity} '{id}' not found")]
    EntityNotFound { entity: String, id: String },

    #[error("{entity} '{id}' already exists")]
    DuplicateEntity { entity: String, id: String },

    #[error("Invalid period: start {start} is after end {end}")]
    InvalidPeriod { start: String, end: String },

    #[error("Projection is empty")]
    EmptyProjection,

    #[error("No cashflow for month {0}")]
    MonthNotFound(YearMonth),

    #[error("Invalid field path '{path}': {reason}")]
    InvalidFieldPath { path: String, reason: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for RunwayError {
    fn from(e: serde_json::Error) -> Self {
        RunwayError::SerializationError(e.to_string())
    }
}

impl RunwayError {
    pub(crate) fn not_found(entity: &str, id: &str) -> Self {
        RunwayError::EntityNotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        RunwayError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
