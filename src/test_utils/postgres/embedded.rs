use postgresql_embedded::PostgreSQL;

use super::super::SHARED_RUNTIME;
use crate::postgres::PgSource;
use crate::driver::ConnectionSource;

/// Represents a running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub port: u16,
    pub database_url: String,
    /// The actual working configuration with correct credentials
    pub config: deadpool_postgres::Config,
}

/// Set up an embedded `PostgreSQL` instance with database `db_name`.
///
/// The server's own superuser credentials are used; they are reported back in `config`.
///
/// # Errors
/// Returns an error if the embedded server cannot be set up or started, if the database
/// cannot be created, or if the post-start connectivity check fails.
pub fn setup_postgres_embedded(
    db_name: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    SHARED_RUNTIME.block_on(async {
        let mut postgresql = PostgreSQL::default();

        // Setup PostgreSQL binaries (bundled, so no download conflicts)
        postgresql.setup().await?;
        postgresql.start().await?;

        let settings = postgresql.settings();
        let port = settings.port;
        let host = settings.host.clone();
        let user = settings.username.clone();
        let password = settings.password.clone();

        postgresql.create_database(db_name).await?;

        let database_url = format!("postgres://{user}:{password}@{host}:{port}/{db_name}");
        tracing::info!(port, %database_url, "embedded postgres started");

        let mut cfg = deadpool_postgres::Config::new();
        cfg.dbname = Some(db_name.to_string());
        cfg.host = Some(host);
        cfg.port = Some(port);
        cfg.user = Some(user);
        cfg.password = Some(password);

        // Quick connection test
        let source = PgSource::from_config(cfg.clone())?;
        drop(source.acquire().await?);

        Ok(EmbeddedPostgres {
            postgresql,
            port,
            database_url,
            config: cfg,
        })
    })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    SHARED_RUNTIME.block_on(async move {
        let _ = postgresql.stop().await;
    });
}
