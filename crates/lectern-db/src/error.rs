use lectern_core::AppError;
use thiserror::Error;

/// Failure of an identity or role-graph store call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("unknown {0}")]
    InvalidReference(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Unique-key violations become [`StoreError::Conflict`] naming `what`.
    pub fn from_sqlx(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Conflict(what.to_string());
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::InvalidReference("referenced record".to_string());
            }
        }
        StoreError::Database(err)
    }

    /// Maps to the HTTP error used by the admin and directory endpoints.
    ///
    /// Internal details are not returned for database or availability faults.
    pub fn into_app_error(self) -> AppError {
        match self {
            StoreError::Conflict(_) => AppError::conflict(self),
            StoreError::InvalidReference(_) => AppError::bad_request(self),
            StoreError::Database(_) | StoreError::Corrupt(_) | StoreError::Unavailable(_) => {
                tracing::error!(error = %self, "store failure");
                AppError::internal_error("Internal server error".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_app_error_statuses() {
        assert_eq!(
            StoreError::Conflict("role key".into())
                .into_app_error()
                .status
                .as_u16(),
            409
        );
        assert_eq!(
            StoreError::InvalidReference("permission id".into())
                .into_app_error()
                .status
                .as_u16(),
            400
        );
        let err = StoreError::Unavailable("pool timed out".into()).into_app_error();
        assert_eq!(err.status.as_u16(), 500);
        assert!(!err.error.to_string().contains("pool"));
    }
}
