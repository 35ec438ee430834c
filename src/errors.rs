use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    Validation(String),

    #[error("Unexpected state: {0}")]
    Internal(String),
}

/// Coarse error class exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidData,
    Unauthorized,
    UnexpectedState,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Validation(_) => ErrorKind::InvalidData,
            AppError::Unauthorized(_) | AppError::Forbidden(_) => ErrorKind::Unauthorized,
            AppError::Database(_) | AppError::Internal(_) => ErrorKind::UnexpectedState,
        }
    }

    /// HTTP-equivalent status for the host's response layer.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Validation(_) => 400,
            AppError::Unauthorized(_) => 401,
            AppError::Forbidden(_) => 403,
            AppError::Database(_) | AppError::Internal(_) => 500,
        }
    }

    /// Wraps a collaborator failure with the operation it happened in.
    pub fn context(self, what: &str) -> AppError {
        match self {
            AppError::Database(e) => AppError::Internal(format!("{}: {}", what, e)),
            AppError::Internal(msg) => AppError::Internal(format!("{}: {}", what, msg)),
            other => other,
        }
    }
}

impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}

pub type AppResult<T> = Result<T, AppError>;
