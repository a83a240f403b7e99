//! Serialize live schemas as a desired-schema definition.

use crate::error::{PgMigrateError, Result};
use crate::extension::MigrateExtension;

/// Execute the dump command.
pub async fn execute<E>(ext: &E, schemas: &[String]) -> Result<String>
where
    E: MigrateExtension + ?Sized,
{
    if schemas.is_empty() {
        return Err(PgMigrateError::ConfigError(
            "At least one schema name is required".to_string(),
        ));
    }
    let definition = ext
        .dump(schemas)
        .await
        .map_err(PgMigrateError::DumpFailed)?;
    log::info!(
        "Dumped schemas; schemas={}, bytes={}",
        schemas.join(","),
        definition.len()
    );
    Ok(definition)
}
