// src/error/types.rs
use crate::domain::DomainError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Crawl cycle already recorded for {crawl_time}")]
    DuplicateCycle { crawl_time: DateTime<Utc> },

    #[error("Resource not found")]
    NotFound,

    #[error("Other error: {0}")]
    Other(String),
}

/// Coarse classification of failures, mirrored by callers when deciding
/// whether to retry a cycle, skip an observation, or give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, rejected before touching storage
    Validation,

    /// Business rule violation (invalid state transition, invariant)
    Domain,

    /// I/O or transaction failure; the caller may retry
    Storage,

    /// A cycle with the same logical time already exists
    DuplicateCycle,

    /// Bad configuration, fatal at startup
    Config,

    NotFound,

    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Database(e) if is_constraint_violation(e) => ErrorKind::Domain,
            AppError::Database(_) | AppError::Pool(_) | AppError::Io(_) => ErrorKind::Storage,
            AppError::Domain(_) => ErrorKind::Domain,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::DuplicateCycle { .. } => ErrorKind::DuplicateCycle,
            AppError::Config(_) => ErrorKind::Config,
            AppError::NotFound => ErrorKind::NotFound,
            AppError::Serialization(_) | AppError::Other(_) => ErrorKind::Internal,
        }
    }

    /// Storage failures are retryable by the caller. The core never retries on its own.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }
}

/// True when SQLite rejected a write because of a UNIQUE / PRIMARY KEY / FOREIGN KEY / CHECK
/// constraint.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::Pool(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::Config(format!("Invalid pattern: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
