use thiserror::Error;

/// Why a model response could not be turned into categories.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed model response: {reason}")]
    Malformed { reason: String },

    #[error("model returned {actual} items for a batch of {expected}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("model returned unknown client id '{id}'")]
    UnknownId { id: String },

    #[error("model returned client id '{id}' more than once")]
    DuplicateId { id: String },

    #[error("invalid value '{value}' for {field} of '{id}' (expected {expected})")]
    InvalidEnumValue {
        id: String,
        field: &'static str,
        value: String,
        expected: String,
    },
}

impl ParseError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ParseError::Malformed {
            reason: reason.into(),
        }
    }
}
