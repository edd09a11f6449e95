use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("validation error: {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TypeError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

pub type TypeResult<T> = Result<T, TypeError>;
