//! Request a plan from the extension.

use crate::error::{PgMigrateError, Result};
use crate::extension::MigrateExtension;
use crate::plan::Plan;

/// Load `definition` into a fresh session context, then compute its plan.
///
/// A failed load is reported as [`PgMigrateError::LoadFailed`] (fix the
/// document), a failed computation as [`PgMigrateError::PlanFailed`].
pub async fn request_plan<E>(ext: &E, definition: &str) -> Result<Plan>
where
    E: MigrateExtension + ?Sized,
{
    let loaded = ext
        .load(definition)
        .await
        .map_err(PgMigrateError::LoadFailed)?;
    log::debug!(
        "Loaded schema definition; bytes={}, checksum={:08x}",
        loaded.len(),
        loaded.checksum()
    );

    let plan = ext.plan(loaded).await.map_err(PgMigrateError::PlanFailed)?;
    log::info!(
        "Plan computed; safe={}, destructive={}, breaking={}",
        plan.safe_count(),
        plan.destructive_count(),
        plan.breaking_count()
    );
    Ok(plan)
}

/// Execute the read-only plan command.
///
/// The staged definition is cleared afterwards so nothing from this session
/// can be mistaken for an apply-time load.
pub async fn execute<E>(ext: &E, definition: &str) -> Result<Plan>
where
    E: MigrateExtension + ?Sized,
{
    let plan = request_plan(ext, definition).await?;
    if let Err(e) = ext.clear().await {
        log::warn!("Failed to clear staged definition: {}", e);
    }
    Ok(plan)
}
