//! Declarative PostgreSQL schema management: a plan/apply client for the
//! `pg_migrate` database extension.
//!
//! The extension computes diffs, generates SQL and executes it. This crate
//! decides what is allowed to run, asks before anything runs, and renders
//! what happened.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pgmigrate_core::{CliOverrides, PgMigrate, PgMigrateConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PgMigrateConfig::load(None, &CliOverrides::default())?;
//! let pm = PgMigrate::new(config).await?;
//! let definition = std::fs::read_to_string("schema.yaml")?;
//! let plan = pm.plan(&definition).await?;
//! print!("{}", pgmigrate_core::render::plan_text(&plan));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`change`] - Change kinds and safety tiers
//! - [`plan`] - Three-tier plan container
//! - [`extension`] - The procedural surface of the database extension
//! - [`commands`] - Plan, apply workflow, dump, history, init
//! - [`render`] - Text and JSON renderings of plans and results
//! - [`history`] - Migration log projection
//! - [`config`] - Configuration loading (TOML, env vars, CLI overrides)
//! - [`db`] - Database connection and TLS
//! - [`error`] - Error types

pub mod change;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod extension;
pub mod history;
pub mod plan;
pub mod render;
pub mod template;

use std::path::Path;

pub use change::{Change, ChangeKind, SafetyTier};
pub use commands::apply::{
    ApplyOptions, ApplyOutcome, ApplyResult, ApplyStage, Confirm, Gate, LineConfirm, Review,
};
pub use config::{CliOverrides, PgMigrateConfig};
pub use error::{ExtensionError, PgMigrateError, Result};
pub use extension::{LoadedSchema, MigrateExtension, PgExtension};
pub use history::{HistoryEntry, MigrationOrigin};
pub use plan::Plan;

/// Main entry point for the library.
///
/// Generic over the extension so workflows can run against anything that
/// speaks the extension's surface.
pub struct PgMigrate<E = PgExtension> {
    pub config: PgMigrateConfig,
    ext: E,
}

impl PgMigrate<PgExtension> {
    /// Connect to the configured database.
    pub async fn new(config: PgMigrateConfig) -> Result<Self> {
        let conn_string = config.connection_string()?;
        let client = db::connect(&conn_string, &config.database).await?;
        Ok(Self {
            config,
            ext: PgExtension::new(client),
        })
    }

    /// Create an instance with an existing database client.
    pub fn with_client(config: PgMigrateConfig, client: tokio_postgres::Client) -> Self {
        Self::with_extension(config, PgExtension::new(client))
    }

    /// Write the starter definition to `path`. Needs no database.
    pub fn init(path: &Path, force: bool) -> Result<()> {
        commands::init::execute(path, force)
    }
}

impl<E: MigrateExtension> PgMigrate<E> {
    pub fn with_extension(config: PgMigrateConfig, ext: E) -> Self {
        Self { config, ext }
    }

    pub fn extension(&self) -> &E {
        &self.ext
    }

    /// Fail with [`PgMigrateError::ExtensionMissing`] unless the extension is installed.
    pub async fn ensure_extension(&self) -> Result<()> {
        let installed = self
            .ext
            .is_installed()
            .await
            .map_err(PgMigrateError::ExtensionCheckFailed)?;
        if !installed {
            return Err(PgMigrateError::ExtensionMissing);
        }
        Ok(())
    }

    /// Installed extension version, `None` when not installed.
    pub async fn extension_version(&self) -> Result<Option<String>> {
        self.ext
            .version()
            .await
            .map_err(PgMigrateError::ExtensionCheckFailed)
    }

    /// Compute the plan for `definition` without changing anything.
    pub async fn plan(&self, definition: &str) -> Result<Plan> {
        self.ensure_extension().await?;
        commands::plan::execute(&self.ext, definition).await
    }

    /// Run the apply workflow.
    ///
    /// `present` sees the gated plan before `confirm` is asked anything.
    pub async fn apply<C, F>(
        &self,
        definition: &str,
        options: &ApplyOptions,
        confirm: &mut C,
        present: F,
    ) -> Result<ApplyOutcome>
    where
        C: Confirm + ?Sized,
        F: FnMut(&Review<'_>),
    {
        self.ensure_extension().await?;
        commands::apply::execute(&self.ext, definition, options, confirm, present).await
    }

    /// Serialize the live `schemas` as a definition document.
    pub async fn dump(&self, schemas: &[String]) -> Result<String> {
        self.ensure_extension().await?;
        commands::dump::execute(&self.ext, schemas).await
    }

    /// Most recent migration log entries, newest first.
    ///
    /// Falls back to the configured default when `limit` is `None`.
    pub async fn history(&self, limit: Option<u32>) -> Result<Vec<HistoryEntry>> {
        self.ensure_extension().await?;
        let limit = limit.unwrap_or(self.config.history.limit);
        commands::history::execute(&self.ext, limit).await
    }
}
