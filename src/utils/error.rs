use thiserror::Error;

use crate::models::{ChurchValidationError, MemberValidationError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Databasfel: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO-fel: {0}")]
    Io(#[from] std::io::Error),

    #[error("Konfigurationsfel: {0}")]
    Config(String),

    #[error("Valideringsfel: {0}")]
    Validation(String),

    #[error("Hittades inte: {0}")]
    NotFound(String),

    #[error("Ogiltig operation: {0}")]
    InvalidOperation(String),

    #[error("Relationen finns redan: {0}")]
    DuplicateEdge(String),

    #[error("Medlemsnummerserien är slut: {0}")]
    ExhaustedSequence(String),

    #[error("Villkor bröts: {0}")]
    ConstraintViolation(String),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn duplicate_edge(msg: impl Into<String>) -> Self {
        Self::DuplicateEdge(msg.into())
    }

    pub fn exhausted_sequence(msg: impl Into<String>) -> Self {
        Self::ExhaustedSequence(msg.into())
    }

    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Översätt SQLite-villkorsfel (UNIQUE, CHECK, FOREIGN KEY) till
    /// `ConstraintViolation`, övriga fel lämnas som databasfel
    pub fn from_store(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => Self::Database(err),
        }
    }
}

impl From<MemberValidationError> for AppError {
    fn from(err: MemberValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ChurchValidationError> for AppError {
    fn from(err: ChurchValidationError) -> Self {
        match err {
            ChurchValidationError::MissingName => Self::Validation(err.to_string()),
            _ => Self::InvalidOperation(err.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_constraint() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER UNIQUE); INSERT INTO t VALUES (1);")
            .unwrap();

        let err = conn.execute("INSERT INTO t VALUES (1)", []).unwrap_err();
        assert!(matches!(
            AppError::from_store(err),
            AppError::ConstraintViolation(_)
        ));
    }

    #[test]
    fn test_hierarchy_errors_are_invalid_operations() {
        let err: AppError = ChurchValidationError::SelfParent.into();
        assert!(matches!(err, AppError::InvalidOperation(_)));

        let err: AppError = ChurchValidationError::MissingName.into();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
