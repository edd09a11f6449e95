use thiserror::Error;

use catalog_store::StoreError;
use catalog_types::TypeError;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} already exists: {key}")]
    AlreadyExists { kind: &'static str, key: String },

    #[error("invalid request: {0}")]
    Invalid(#[from] TypeError),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Store(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Translate store-level identity errors into domain terms.
    pub(crate) fn from_store(kind: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { key } => Self::NotFound { kind, key },
            StoreError::AlreadyExists { key } => Self::AlreadyExists { kind, key },
            other => Self::Store(other),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
