//! Error types for repository operations.

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Connection pool or database connection errors.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution errors.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Data validation failed before or after a database operation.
    #[error("Data validation error: {0}")]
    ValidationError(String),

    /// A write referenced a course or lesson that is not registered.
    ///
    /// Maps the database's foreign key violations; always surfaced to the
    /// invoking caller, never swallowed.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Internal/unexpected errors.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl RepositoryError {
    /// True when the error means a referenced entity simply does not exist,
    /// letting callers skip that unit of work instead of failing the tick.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}

impl From<String> for RepositoryError {
    fn from(s: String) -> Self {
        RepositoryError::InternalError(s)
    }
}

impl From<&str> for RepositoryError {
    fn from(s: &str) -> Self {
        RepositoryError::InternalError(s.to_string())
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::DatabaseErrorKind;

        match err {
            diesel::result::Error::NotFound => RepositoryError::NotFound("Record not found".into()),
            diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                RepositoryError::ConfigurationError(info.message().to_string())
            }
            diesel::result::Error::DatabaseError(_, info) => {
                RepositoryError::QueryError(info.message().to_string())
            }
            other => RepositoryError::QueryError(other.to_string()),
        }
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::r2d2::PoolError> for RepositoryError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        RepositoryError::ConnectionError(err.to_string())
    }
}
