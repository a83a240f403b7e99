//! Write a starter schema definition file.

use std::path::Path;

use crate::error::{PgMigrateError, Result};
use crate::template::DEFAULT_TEMPLATE;

/// Execute the init command.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn execute(path: &Path, force: bool) -> Result<()> {
    let display = path.display().to_string();
    if path.exists() && !force {
        return Err(PgMigrateError::InitTargetExists { path: display });
    }

    std::fs::write(path, DEFAULT_TEMPLATE).map_err(|source| PgMigrateError::WriteFailed {
        path: display.clone(),
        source,
    })?;
    log::info!("Wrote schema template; path={}, force={}", display, force);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        execute(&path, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(&path, "managed_schemas: [app]\n").unwrap();

        let err = execute(&path, false).unwrap_err();
        assert!(matches!(err, PgMigrateError::InitTargetExists { .. }));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "managed_schemas: [app]\n"
        );
    }

    #[test]
    fn test_init_force_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(&path, "old").unwrap();
        execute(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn test_init_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("schema.yaml");
        let err = execute(&path, false).unwrap_err();
        assert!(matches!(err, PgMigrateError::WriteFailed { .. }));
    }
}
