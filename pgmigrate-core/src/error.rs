//! Error types for pgmigrate operations.
//!
//! The extension surface reports every failure the same way, so each call
//! site wraps [`ExtensionError`] into the [`PgMigrateError`] variant naming
//! the phase that failed.

use thiserror::Error;

/// Extract the full error message from a tokio_postgres::Error,
/// including the underlying DbError details that Display hides.
pub fn format_db_error(e: &tokio_postgres::Error) -> String {
    if let Some(db_err) = e.as_db_error() {
        let mut msg = db_err.message().to_string();
        if let Some(detail) = db_err.detail() {
            msg.push_str(&format!("\n  Detail: {}", detail));
        }
        if let Some(hint) = db_err.hint() {
            msg.push_str(&format!("\n  Hint: {}", hint));
        }
        if let Some(position) = db_err.position() {
            msg.push_str(&format!("\n  Position: {:?}", position));
        }
        return msg;
    }
    let mut msg = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(s) = source {
        msg.push_str(&format!(": {}", s));
        source = s.source();
    }
    if e.is_closed() {
        msg.push_str("\n  Note: The database connection was closed unexpectedly.");
    }
    msg
}

/// An undifferentiated failure reported by the database-side extension.
#[derive(Error, Debug)]
pub enum ExtensionError {
    /// The SQL call itself failed.
    #[error("{}", format_db_error(.0))]
    Database(#[from] tokio_postgres::Error),

    /// The call succeeded but its JSON payload could not be decoded.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The extension answered but refused the request.
    #[error("{0}")]
    Rejected(String),

    /// A returned row did not have the expected shape.
    #[error("malformed row: {0}")]
    Malformed(String),
}

/// All error types that pgmigrate operations can produce.
#[derive(Error, Debug)]
pub enum PgMigrateError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The database connection could not be established.
    #[error("Connection failed: {}", format_db_error(.0))]
    ConnectionFailed(#[source] tokio_postgres::Error),

    /// The TLS client configuration could not be built.
    #[error("TLS setup failed: {0}")]
    TlsSetup(#[from] rustls::Error),

    /// The pg_migrate extension is not installed in the target database.
    #[error("pg_migrate extension not installed. Run: CREATE EXTENSION pg_migrate")]
    ExtensionMissing,

    /// The extension presence check itself failed.
    #[error("Cannot check extension: {0}")]
    ExtensionCheckFailed(#[source] ExtensionError),

    /// Staging the desired-schema definition failed (bad document or lost connection).
    #[error("Load failed: {0}")]
    LoadFailed(#[source] ExtensionError),

    /// Computing the plan from a loaded definition failed.
    #[error("Plan failed: {0}")]
    PlanFailed(#[source] ExtensionError),

    /// Executing the plan failed. The extension's transaction is authoritative
    /// for what, if anything, was committed.
    #[error("Apply failed: {0}")]
    ApplyFailed(#[source] ExtensionError),

    /// Serializing the live schema failed.
    #[error("Dump failed: {0}")]
    DumpFailed(#[source] ExtensionError),

    /// Reading the migration history failed or returned a malformed row.
    #[error("History failed: {0}")]
    HistoryFailed(#[source] ExtensionError),

    /// The plan contains breaking changes, which are never applied automatically.
    #[error("{count} breaking change(s) require manual intervention")]
    BreakingChangesPresent { count: usize },

    /// A local file could not be read.
    #[error("Cannot read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A local file could not be written.
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// `init` would overwrite an existing definition file.
    #[error("{path} already exists. Use --force to overwrite")]
    InitTargetExists { path: String },

    /// Machine-readable output could not be produced.
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// Convenience type alias for `Result<T, PgMigrateError>`.
pub type Result<T> = std::result::Result<T, PgMigrateError>;
