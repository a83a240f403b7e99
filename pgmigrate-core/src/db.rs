//! Connection setup.
//!
//! One connection per invocation, opened once. There are no retries: a
//! failed connect is reported to the operator as is.

use std::sync::Arc;
use std::time::Duration;

use tokio_postgres::Client;

use crate::config::{DatabaseConfig, SslMode};
use crate::error::{PgMigrateError, Result};

/// Build a rustls ClientConfig using the Mozilla CA bundle and ring crypto provider.
fn make_rustls_config() -> Result<rustls::ClientConfig> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(root_store)
    .with_no_client_auth();
    Ok(config)
}

/// Inject TCP keepalive parameters into a connection string if not already present.
///
/// For URL-style strings (`postgres://...`), appends `?keepalives=1&keepalives_idle=N`
/// (or `&` if `?` already exists). For key=value style, appends ` keepalives=1 keepalives_idle=N`.
/// Returns the string unchanged if `keepalive_secs == 0` or keepalive params already exist.
pub fn inject_keepalive(conn_string: &str, keepalive_secs: u32) -> String {
    if keepalive_secs == 0 || conn_string.to_lowercase().contains("keepalives") {
        return conn_string.to_string();
    }
    if conn_string.starts_with("postgres://") || conn_string.starts_with("postgresql://") {
        let sep = if conn_string.contains('?') { '&' } else { '?' };
        format!(
            "{}{}keepalives=1&keepalives_idle={}",
            conn_string, sep, keepalive_secs
        )
    } else {
        format!(
            "{} keepalives=1 keepalives_idle={}",
            conn_string, keepalive_secs
        )
    }
}

/// Run the connection driver in the background, logging how it ended.
fn spawn_connection_task<F>(connection: F)
where
    F: std::future::Future<Output = std::result::Result<(), tokio_postgres::Error>>
        + Send
        + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            log::error!("Database connection error: {}", e);
        }
    });
}

async fn connect_plain(conn_string: &str) -> std::result::Result<Client, tokio_postgres::Error> {
    let (client, connection) = tokio_postgres::connect(conn_string, tokio_postgres::NoTls).await?;
    spawn_connection_task(connection);
    Ok(client)
}

async fn connect_tls(
    conn_string: &str,
    tls_config: rustls::ClientConfig,
) -> std::result::Result<Client, tokio_postgres::Error> {
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
    let (client, connection) = tokio_postgres::connect(conn_string, tls).await?;
    spawn_connection_task(connection);
    Ok(client)
}

async fn connect_by_mode(
    conn_string: &str,
    ssl_mode: SslMode,
) -> Result<std::result::Result<Client, tokio_postgres::Error>> {
    Ok(match ssl_mode {
        SslMode::Disable => connect_plain(conn_string).await,
        SslMode::Require => connect_tls(conn_string, make_rustls_config()?).await,
        SslMode::Prefer => match connect_tls(conn_string, make_rustls_config()?).await {
            Ok(client) => Ok(client),
            Err(e) => {
                log::debug!("TLS connection failed, falling back to plaintext; error={}", e);
                connect_plain(conn_string).await
            }
        },
    })
}

/// Open a single connection described by `config`.
pub async fn connect(conn_string: &str, config: &DatabaseConfig) -> Result<Client> {
    let conn_string = inject_keepalive(conn_string, config.keepalive_secs);
    let attempt = connect_by_mode(&conn_string, config.ssl_mode);

    let connected = if config.connect_timeout_secs > 0 {
        match tokio::time::timeout(
            Duration::from_secs(u64::from(config.connect_timeout_secs)),
            attempt,
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => Err(tokio_postgres::Error::__private_api_timeout()),
        }
    } else {
        attempt.await?
    };
    let client = connected.map_err(PgMigrateError::ConnectionFailed)?;

    if config.statement_timeout_secs > 0 {
        let timeout_sql = format!(
            "SET statement_timeout = '{}s'",
            config.statement_timeout_secs
        );
        client
            .batch_execute(&timeout_sql)
            .await
            .map_err(PgMigrateError::ConnectionFailed)?;
    }

    log::debug!(
        "Connected; ssl_mode={:?}, statement_timeout_secs={}",
        config.ssl_mode,
        config.statement_timeout_secs
    );
    Ok(client)
}
