use thiserror::Error;

#[cfg(feature = "postgres")]
use deadpool_postgres;
#[cfg(feature = "mssql")]
use tiberius;
#[cfg(feature = "postgres")]
use tokio_postgres;

#[derive(Debug, Error)]
pub enum SprocError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PoolErrorPostgres(#[from] deadpool_postgres::PoolError),

    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Result mapping error: {0}")]
    MappingError(String),

    /// The procedure reported a non-success code through its status fields.
    #[error("Procedure returned status {code}: {message}")]
    Status { code: i16, message: String },
}

impl SprocError {
    /// True when the failure came from the status-field convention rather than the driver.
    #[must_use]
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    /// The `(code, message)` pair of a status failure.
    #[must_use]
    pub fn status(&self) -> Option<(i16, &str)> {
        match self {
            Self::Status { code, message } => Some((*code, message.as_str())),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SprocError {
    fn from(err: serde_json::Error) -> Self {
        SprocError::ConfigError(format!("invalid JSON configuration: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accessors() {
        let err = SprocError::Status {
            code: 1,
            message: "duplicate key".into(),
        };
        assert!(err.is_status());
        assert_eq!(err.status(), Some((1, "duplicate key")));
        assert_eq!(err.to_string(), "Procedure returned status 1: duplicate key");

        let err = SprocError::ExecutionError("boom".into());
        assert!(!err.is_status());
        assert_eq!(err.status(), None);
    }
}
