//! Read-only projection of the extension's append-only migration log.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExtensionError, PgMigrateError, Result};
use crate::extension::MigrateExtension;

/// Display width of the definition hash before truncation.
pub const HASH_DISPLAY_WIDTH: usize = 10;

/// Display width of the timestamp column.
pub const TIMESTAMP_DISPLAY_WIDTH: usize = 22;

/// A history row as returned by the extension, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: Option<i64>,
    pub migration_type: Option<String>,
    pub yaml_hash: Option<String>,
    pub executed_sql: Option<String>,
    pub applied_at: Option<String>,
    pub applied_by: Option<String>,
    pub duration_ms: Option<i64>,
}

/// Where a recorded migration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MigrationOrigin {
    /// Applied by this tool through `pgmigrate.apply()`.
    Apply,
    /// Applied manually by a DBA through `pgmigrate.dba_migrate()`.
    DbaMigrate,
    /// A tag this client does not recognize.
    Other(String),
}

impl MigrationOrigin {
    pub fn as_str(&self) -> &str {
        match self {
            MigrationOrigin::Apply => "apply",
            MigrationOrigin::DbaMigrate => "dba_migrate",
            MigrationOrigin::Other(tag) => tag,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, MigrationOrigin::DbaMigrate)
    }
}

impl From<String> for MigrationOrigin {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "apply" => MigrationOrigin::Apply,
            "dba_migrate" => MigrationOrigin::DbaMigrate,
            _ => MigrationOrigin::Other(tag),
        }
    }
}

impl From<MigrationOrigin> for String {
    fn from(origin: MigrationOrigin) -> Self {
        match origin {
            MigrationOrigin::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MigrationOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record from the migration log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub migration_type: MigrationOrigin,
    /// Content hash of the definition that was applied.
    pub yaml_hash: String,
    /// SQL the extension actually executed.
    pub executed_sql: String,
    pub applied_at: String,
    pub applied_by: String,
    pub duration_ms: u64,
}

impl HistoryEntry {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Hash shortened for display. The stored value is untouched.
    pub fn display_hash(&self) -> String {
        truncate_with_ellipsis(&self.yaml_hash, HASH_DISPLAY_WIDTH)
    }

    /// Timestamp shortened for display. The stored value is untouched.
    pub fn display_applied_at(&self) -> &str {
        truncate_chars(&self.applied_at, TIMESTAMP_DISPLAY_WIDTH)
    }
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = ExtensionError;

    fn try_from(row: HistoryRow) -> std::result::Result<Self, Self::Error> {
        fn required<T>(value: Option<T>, column: &str) -> std::result::Result<T, ExtensionError> {
            value.ok_or_else(|| ExtensionError::Malformed(format!("column '{}' is NULL", column)))
        }

        let duration = required(row.duration_ms, "duration_ms")?;
        let duration_ms = u64::try_from(duration).map_err(|_| {
            ExtensionError::Malformed(format!("negative duration_ms {}", duration))
        })?;

        Ok(HistoryEntry {
            id: required(row.id, "id")?,
            migration_type: required(row.migration_type, "migration_type")?.into(),
            yaml_hash: required(row.yaml_hash, "yaml_hash")?,
            executed_sql: row.executed_sql.unwrap_or_default(),
            applied_at: required(row.applied_at, "applied_at")?,
            applied_by: required(row.applied_by, "applied_by")?,
            duration_ms,
        })
    }
}

/// Fetch at most `limit` history entries, newest first.
///
/// Ordering and truncation are the extension's job; any malformed row fails
/// the whole read.
pub async fn fetch_history<E>(ext: &E, limit: u32) -> Result<Vec<HistoryEntry>>
where
    E: MigrateExtension + ?Sized,
{
    let rows = ext
        .history(limit)
        .await
        .map_err(PgMigrateError::HistoryFailed)?;

    let mut entries = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        let entry = HistoryEntry::try_from(row).map_err(|e| match e {
            ExtensionError::Malformed(reason) => PgMigrateError::HistoryFailed(
                ExtensionError::Malformed(format!("history row {}: {}", i + 1, reason)),
            ),
            other => PgMigrateError::HistoryFailed(other),
        })?;
        entries.push(entry);
    }

    log::debug!("Fetched history; limit={}, entries={}", limit, entries.len());
    Ok(entries)
}

/// First `width` characters of `s`.
fn truncate_chars(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// First `width` characters of `s` followed by `...` when it was cut.
fn truncate_with_ellipsis(s: &str, width: usize) -> String {
    let cut = truncate_chars(s, width);
    if cut.len() < s.len() {
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64) -> HistoryRow {
        HistoryRow {
            id: Some(id),
            migration_type: Some("apply".into()),
            yaml_hash: Some("0123456789abcdef0123".into()),
            executed_sql: Some("ALTER TABLE public.users ADD COLUMN email text;".into()),
            applied_at: Some("2026-03-01 12:34:56.789012+00".into()),
            applied_by: Some("postgres".into()),
            duration_ms: Some(42),
        }
    }

    #[test]
    fn test_row_maps_to_entry() {
        let entry = HistoryEntry::try_from(row(7)).unwrap();
        assert_eq!(entry.id, 7);
        assert_eq!(entry.migration_type, MigrationOrigin::Apply);
        assert_eq!(entry.duration(), Duration::from_millis(42));
    }

    #[test]
    fn test_null_column_is_malformed() {
        let mut r = row(1);
        r.applied_by = None;
        let err = HistoryEntry::try_from(r).unwrap_err();
        assert!(err.to_string().contains("applied_by"));
    }

    #[test]
    fn test_negative_duration_is_malformed() {
        let mut r = row(1);
        r.duration_ms = Some(-5);
        assert!(HistoryEntry::try_from(r).is_err());
    }

    #[test]
    fn test_missing_sql_is_tolerated() {
        let mut r = row(1);
        r.executed_sql = None;
        assert_eq!(HistoryEntry::try_from(r).unwrap().executed_sql, "");
    }

    #[test]
    fn test_origin_tags() {
        assert_eq!(MigrationOrigin::from("dba_migrate".to_string()), MigrationOrigin::DbaMigrate);
        assert!(MigrationOrigin::DbaMigrate.is_manual());
        let other = MigrationOrigin::from("import".to_string());
        assert_eq!(other.as_str(), "import");
        assert!(!other.is_manual());
    }

    #[test]
    fn test_display_truncation_leaves_values_intact() {
        let entry = HistoryEntry::try_from(row(1)).unwrap();
        assert_eq!(entry.display_hash(), "0123456789...");
        assert_eq!(entry.display_applied_at(), "2026-03-01 12:34:56.78");
        assert_eq!(entry.yaml_hash, "0123456789abcdef0123");
        assert_eq!(entry.applied_at, "2026-03-01 12:34:56.789012+00");
    }

    #[test]
    fn test_short_values_are_not_truncated() {
        let mut r = row(1);
        r.yaml_hash = Some("abc".into());
        r.applied_at = Some("2026-03-01".into());
        let entry = HistoryEntry::try_from(r).unwrap();
        assert_eq!(entry.display_hash(), "abc");
        assert_eq!(entry.display_applied_at(), "2026-03-01");
    }

    #[test]
    fn test_exact_width_hash_has_no_ellipsis() {
        assert_eq!(truncate_with_ellipsis("0123456789", 10), "0123456789");
    }
}
