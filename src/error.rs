use thiserror::Error;

/// Failure reported by a [`Backend`](crate::backend::Backend) implementation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// The diagnostic text without the variant prefix
    pub fn diagnostic(&self) -> &str {
        match self {
            BackendError::Unreachable(message)
            | BackendError::Rejected { message, .. }
            | BackendError::Decode(message) => message,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("query failed: {0}")]
    QueryFailure(String),

    #[error("mutation failed: {0}")]
    MutationFailure(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn query(err: BackendError) -> Self {
        AppError::QueryFailure(err.diagnostic().to_string())
    }

    pub fn mutation(err: BackendError) -> Self {
        AppError::MutationFailure(err.diagnostic().to_string())
    }
}
