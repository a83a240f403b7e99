//! Boundary to the database-side `pg_migrate` extension.
//!
//! The extension owns diff computation, SQL generation and execution. This
//! module only issues its procedural calls and decodes their results.

use async_trait::async_trait;
use tokio_postgres::Client;

use crate::commands::apply::ApplyResult;
use crate::error::ExtensionError;
use crate::history::HistoryRow;
use crate::plan::Plan;

/// Name of the extension in `pg_extension`.
pub const EXTENSION_NAME: &str = "pg_migrate";

/// Proof that a definition was staged in the current session.
///
/// `plan` and `apply` take this by value, so a definition loaded for one
/// call can never be reused for another. Every apply must reload.
#[derive(Debug, PartialEq, Eq)]
pub struct LoadedSchema {
    checksum: u32,
    bytes: usize,
}

impl LoadedSchema {
    /// Token for a definition the extension has accepted.
    ///
    /// For `MigrateExtension` implementors only: call it from `load` once the
    /// definition is staged. Workflow code obtains tokens through `load`.
    #[doc(hidden)]
    pub fn for_definition(definition: &str) -> Self {
        Self {
            checksum: crc32fast::hash(definition.as_bytes()),
            bytes: definition.len(),
        }
    }

    /// CRC32 of the staged definition text.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Size of the staged definition in bytes.
    pub fn len(&self) -> usize {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }
}

/// The procedural surface exposed by the extension.
///
/// Failures are undifferentiated; callers attach the phase.
#[async_trait]
pub trait MigrateExtension: Send + Sync {
    /// Whether the extension is installed in the connected database.
    async fn is_installed(&self) -> Result<bool, ExtensionError>;

    /// Installed extension version, if installed.
    async fn version(&self) -> Result<Option<String>, ExtensionError>;

    /// Stage the desired-schema definition for this session.
    async fn load(&self, definition: &str) -> Result<LoadedSchema, ExtensionError>;

    /// Compute the plan for a staged definition without touching the schema.
    async fn plan(&self, loaded: LoadedSchema) -> Result<Plan, ExtensionError>;

    /// Execute safe changes, plus destructive ones when allowed.
    async fn apply(
        &self,
        loaded: LoadedSchema,
        allow_destructive: bool,
    ) -> Result<ApplyResult, ExtensionError>;

    /// Serialize the live schemas as a definition document.
    async fn dump(&self, schemas: &[String]) -> Result<String, ExtensionError>;

    /// Most recent history rows, newest first, at most `limit`.
    async fn history(&self, limit: u32) -> Result<Vec<HistoryRow>, ExtensionError>;

    /// Discard any staged definition.
    async fn clear(&self) -> Result<(), ExtensionError>;
}

/// [`MigrateExtension`] over a live PostgreSQL connection.
pub struct PgExtension {
    client: Client,
}

impl PgExtension {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying database client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl MigrateExtension for PgExtension {
    async fn is_installed(&self) -> Result<bool, ExtensionError> {
        let row = self
            .client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM pg_extension WHERE extname = $1)",
                &[&EXTENSION_NAME],
            )
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn version(&self) -> Result<Option<String>, ExtensionError> {
        let row = self
            .client
            .query_opt(
                "SELECT extversion FROM pg_extension WHERE extname = $1",
                &[&EXTENSION_NAME],
            )
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get(0)?)),
            None => Ok(None),
        }
    }

    async fn load(&self, definition: &str) -> Result<LoadedSchema, ExtensionError> {
        let row = self
            .client
            .query_one("SELECT pgmigrate.load($1)", &[&definition])
            .await?;
        let loaded: bool = row.try_get(0)?;
        if !loaded {
            return Err(ExtensionError::Rejected(
                "extension did not accept the schema definition".to_string(),
            ));
        }
        Ok(LoadedSchema::for_definition(definition))
    }

    async fn plan(&self, loaded: LoadedSchema) -> Result<Plan, ExtensionError> {
        log::debug!("Requesting plan; checksum={:08x}", loaded.checksum());
        let row = self
            .client
            .query_one("SELECT pgmigrate.plan()::text", &[])
            .await?;
        let json: String = row.try_get(0)?;
        Ok(Plan::from_json(&json)?)
    }

    async fn apply(
        &self,
        loaded: LoadedSchema,
        allow_destructive: bool,
    ) -> Result<ApplyResult, ExtensionError> {
        log::debug!(
            "Requesting apply; checksum={:08x}, allow_destructive={}",
            loaded.checksum(),
            allow_destructive
        );
        let row = self
            .client
            .query_one("SELECT pgmigrate.apply($1)::text", &[&allow_destructive])
            .await?;
        let json: String = row.try_get(0)?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn dump(&self, schemas: &[String]) -> Result<String, ExtensionError> {
        let row = self
            .client
            .query_one("SELECT pgmigrate.dump($1)", &[&schemas])
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn history(&self, limit: u32) -> Result<Vec<HistoryRow>, ExtensionError> {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        let rows = self
            .client
            .query(
                "SELECT id::bigint, migration_type, yaml_hash, executed_sql, \
                 applied_at::text, applied_by, duration_ms::bigint \
                 FROM pgmigrate.get_history($1)",
                &[&limit],
            )
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let malformed = |e: tokio_postgres::Error| {
                ExtensionError::Malformed(format!("history row {}: {}", i + 1, e))
            };
            out.push(HistoryRow {
                id: row.try_get(0).map_err(malformed)?,
                migration_type: row.try_get(1).map_err(malformed)?,
                yaml_hash: row.try_get(2).map_err(malformed)?,
                executed_sql: row.try_get(3).map_err(malformed)?,
                applied_at: row.try_get(4).map_err(malformed)?,
                applied_by: row.try_get(5).map_err(malformed)?,
                duration_ms: row.try_get(6).map_err(malformed)?,
            });
        }
        Ok(out)
    }

    async fn clear(&self) -> Result<(), ExtensionError> {
        self.client
            .query_one("SELECT pgmigrate.clear()", &[])
            .await?;
        Ok(())
    }
}
