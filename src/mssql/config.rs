use std::fmt;
use std::net::ToSocketAddrs;

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config as TiberiusConfig, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::executor::MssqlConnection;
use crate::caller::Caller;
use crate::config::CallerConfig;
use crate::driver::{CallConnection, ConnectionSource};
use crate::error::SprocError;
use crate::types::DatabaseType;

/// Type alias for SQL Server client
pub type MssqlClient = Client<Compat<TcpStream>>;

const DEFAULT_PORT: u16 = 1433;

/// Options for connecting to SQL Server.
#[derive(Debug, Clone)]
pub struct MssqlOptions {
    pub server: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
}

impl MssqlOptions {
    #[must_use]
    pub fn new(server: String, database: String, user: String, password: String) -> Self {
        Self {
            server,
            database,
            user,
            password,
            port: None,
            instance_name: None,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Named instances are resolved through the SQL Browser service on direct connections.
    #[must_use]
    pub fn with_instance_name(mut self, instance_name: Option<String>) -> Self {
        self.instance_name = instance_name;
        self
    }

    fn tiberius_config(&self) -> TiberiusConfig {
        let mut config = TiberiusConfig::new();
        config.host(&self.server);
        config.database(&self.database);
        config.port(self.port.unwrap_or(DEFAULT_PORT));
        config.authentication(AuthMethod::sql_server(&self.user, &self.password));
        if let Some(instance) = &self.instance_name {
            config.instance_name(instance);
        }
        config.trust_cert();
        config
    }
}

/// Where SQL Server connections come from.
#[derive(Clone)]
pub enum MssqlSource {
    /// Open a fresh connection per call.
    Direct(MssqlOptions),
    /// Check connections out of a deadpool-tiberius pool.
    Pool(deadpool_tiberius::Pool),
}

impl fmt::Debug for MssqlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MssqlSource::Direct(opts) => f
                .debug_struct("Direct")
                .field("server", &opts.server)
                .field("database", &opts.database)
                .field("user", &opts.user)
                .finish_non_exhaustive(),
            MssqlSource::Pool(_) => f.write_str("Pool"),
        }
    }
}

impl MssqlSource {
    /// Build a pool of at most `max_size` connections.
    ///
    /// # Errors
    /// Returns `SprocError::ConnectionError` if the pool cannot be created.
    pub fn pool(opts: &MssqlOptions, max_size: usize) -> Result<Self, SprocError> {
        let pool = deadpool_tiberius::Manager::new()
            .host(&opts.server)
            .port(opts.port.unwrap_or(DEFAULT_PORT))
            .basic_authentication(&opts.user, &opts.password)
            .database(&opts.database)
            .trust_cert()
            .max_size(max_size)
            .create_pool()
            .map_err(|e| {
                SprocError::ConnectionError(format!("Failed to create SQL Server pool: {e}"))
            })?;
        Ok(MssqlSource::Pool(pool))
    }
}

/// Open a single connection.
///
/// # Errors
/// Returns `SprocError::ConnectionError` if the address cannot be resolved or the TCP
/// connection fails, and `SprocError::MssqlError` if the login fails.
pub async fn create_mssql_client(opts: &MssqlOptions) -> Result<MssqlClient, SprocError> {
    let config = opts.tiberius_config();

    let tcp = if opts.instance_name.is_some() {
        TcpStream::connect_named(&config).await?
    } else {
        let port = opts.port.unwrap_or(DEFAULT_PORT);
        let server_addr = (opts.server.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| {
                SprocError::ConnectionError(format!("Failed to resolve server address: {e}"))
            })?
            .next()
            .ok_or_else(|| {
                SprocError::ConnectionError(format!("No valid address found for {}", opts.server))
            })?;
        TcpStream::connect(server_addr)
            .await
            .map_err(|e| SprocError::ConnectionError(format!("TCP connection error: {e}")))?
    };
    tcp.set_nodelay(true)
        .map_err(|e| SprocError::ConnectionError(format!("TCP connection error: {e}")))?;

    Ok(Client::connect(config, tcp.compat_write()).await?)
}

#[async_trait]
impl ConnectionSource for MssqlSource {
    async fn acquire(&self) -> Result<Box<dyn CallConnection>, SprocError> {
        match self {
            MssqlSource::Direct(opts) => {
                let client = create_mssql_client(opts).await?;
                Ok(Box::new(MssqlConnection::new(Box::new(client))))
            }
            MssqlSource::Pool(pool) => {
                let client = pool.get().await.map_err(|e| {
                    SprocError::ConnectionError(format!("SQL Server pool checkout failed: {e}"))
                })?;
                Ok(Box::new(MssqlConnection::new(client)))
            }
        }
    }

    fn database_type(&self) -> Option<DatabaseType> {
        Some(DatabaseType::Mssql)
    }
}

impl Caller {
    /// Caller that opens a SQL Server connection per call.
    #[must_use]
    pub fn mssql_direct(opts: MssqlOptions, config: CallerConfig) -> Self {
        Caller::new(MssqlSource::Direct(opts), config)
    }

    /// Caller over a SQL Server pool of at most `max_size` connections.
    ///
    /// # Errors
    /// See [`MssqlSource::pool`].
    pub fn mssql_pool(
        opts: &MssqlOptions,
        max_size: usize,
        config: CallerConfig,
    ) -> Result<Self, SprocError> {
        Ok(Caller::new(MssqlSource::pool(opts, max_size)?, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_the_password() {
        let opts = MssqlOptions::new(
            "localhost".into(),
            "app".into(),
            "sa".into(),
            "secret".into(),
        )
        .with_port(Some(14330));
        let rendered = format!("{:?}", MssqlSource::Direct(opts.clone()));
        assert!(rendered.contains("localhost"));
        assert!(!rendered.contains("secret"));
        assert_eq!(opts.port, Some(14330));
        assert!(opts.instance_name.is_none());
    }
}
