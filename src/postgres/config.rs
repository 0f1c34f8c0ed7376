use async_trait::async_trait;
use deadpool_postgres::{Config as PgConfig, Pool};
use tokio_postgres::NoTls;

use super::executor::{PgClient, PgConnection};
use crate::caller::Caller;
use crate::config::CallerConfig;
use crate::driver::{CallConnection, ConnectionSource};
use crate::error::SprocError;
use crate::types::DatabaseType;

/// Where Postgres connections come from.
#[derive(Clone, Debug)]
pub enum PgSource {
    /// Check connections out of a deadpool pool.
    Pool(Pool),
    /// Open a fresh connection per call with stored credentials.
    Direct(tokio_postgres::Config),
}

impl PgSource {
    /// Validate a deadpool config and build a pool from it.
    ///
    /// # Errors
    /// Returns `SprocError::ConfigError` if required config fields are missing or
    /// `SprocError::ConnectionError` if pool creation fails.
    pub fn from_config(pg_config: PgConfig) -> Result<Self, SprocError> {
        if pg_config.dbname.is_none() {
            return Err(SprocError::ConfigError("dbname is required".to_string()));
        }
        if pg_config.host.is_none() {
            return Err(SprocError::ConfigError("host is required".to_string()));
        }
        if pg_config.port.is_none() {
            return Err(SprocError::ConfigError("port is required".to_string()));
        }
        if pg_config.user.is_none() {
            return Err(SprocError::ConfigError("user is required".to_string()));
        }
        if pg_config.password.is_none() {
            return Err(SprocError::ConfigError("password is required".to_string()));
        }

        let pool = pg_config
            .create_pool(Some(deadpool_postgres::Runtime::Tokio1), NoTls)
            .map_err(|e| {
                SprocError::ConnectionError(format!("Failed to create Postgres pool: {e}"))
            })?;
        Ok(PgSource::Pool(pool))
    }

    /// Connect per call to `url` (URL or key=value form) as `user`.
    ///
    /// # Errors
    /// Returns `SprocError::PostgresError` if `url` does not parse.
    pub fn from_credentials(url: &str, user: &str, password: &str) -> Result<Self, SprocError> {
        let mut config: tokio_postgres::Config = url.parse()?;
        config.user(user);
        config.password(password);
        Ok(PgSource::Direct(config))
    }
}

#[async_trait]
impl ConnectionSource for PgSource {
    async fn acquire(&self) -> Result<Box<dyn CallConnection>, SprocError> {
        let client = match self {
            PgSource::Pool(pool) => PgClient::Pooled(pool.get().await?),
            PgSource::Direct(config) => {
                let (client, connection) = config.connect(NoTls).await?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::warn!(error = %e, "postgres connection closed with error");
                    }
                });
                PgClient::Direct(client)
            }
        };
        Ok(Box::new(PgConnection::new(client)))
    }

    fn database_type(&self) -> Option<DatabaseType> {
        Some(DatabaseType::Postgres)
    }
}

impl Caller {
    /// Caller over an existing deadpool-postgres pool.
    #[must_use]
    pub fn postgres_pool(pool: Pool, config: CallerConfig) -> Self {
        Caller::new(PgSource::Pool(pool), config)
    }

    /// Caller over a pool built from a deadpool config.
    ///
    /// # Errors
    /// See [`PgSource::from_config`].
    pub fn postgres_config(pg_config: PgConfig, config: CallerConfig) -> Result<Self, SprocError> {
        Ok(Caller::new(PgSource::from_config(pg_config)?, config))
    }

    /// Caller that opens a connection per call with the given credentials.
    ///
    /// Prefer [`Caller::postgres_pool`] when possible.
    ///
    /// # Errors
    /// See [`PgSource::from_credentials`].
    pub fn postgres_credentials(
        url: &str,
        user: &str,
        password: &str,
        config: CallerConfig,
    ) -> Result<Self, SprocError> {
        Ok(Caller::new(
            PgSource::from_credentials(url, user, password)?,
            config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_config_errors() {
        let mut cfg = PgConfig::new();
        cfg.dbname = Some("db".into());
        let err = PgSource::from_config(cfg).unwrap_err();
        assert!(matches!(err, SprocError::ConfigError(ref m) if m == "host is required"));
    }

    #[test]
    fn credentials_are_stored_on_the_config() {
        let source = PgSource::from_credentials("postgresql://localhost:5432/app", "u", "p").unwrap();
        let PgSource::Direct(config) = source else {
            panic!("expected a direct source");
        };
        assert_eq!(config.get_user(), Some("u"));
        assert_eq!(config.get_dbname(), Some("app"));
        assert_eq!(config.get_password(), Some(&b"p"[..]));
    }
}
