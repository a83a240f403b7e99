//! Show the migration log.

use crate::error::Result;
use crate::extension::MigrateExtension;
use crate::history::{fetch_history, HistoryEntry};

/// Execute the history command: newest first, at most `limit` entries.
pub async fn execute<E>(ext: &E, limit: u32) -> Result<Vec<HistoryEntry>>
where
    E: MigrateExtension + ?Sized,
{
    fetch_history(ext, limit).await
}
