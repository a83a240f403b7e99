//! The apply workflow: plan, gate, confirm, execute.
//!
//! ```text
//! Planning -> Gating -> Confirming -> Executing -> Done
//!                 \           \
//!                  `-----------`--> Aborted
//! ```
//!
//! Breaking changes always abort. Destructive changes are skipped unless
//! explicitly allowed. Execution reloads the definition into a fresh session
//! context; the load used for planning is never reused.

use std::collections::HashSet;
use std::fmt;
use std::io::{BufRead, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::change::Change;
use crate::commands::plan::request_plan;
use crate::error::{PgMigrateError, Result};
use crate::extension::MigrateExtension;
use crate::plan::{null_as_empty, Plan};

/// Prompt shown before executing.
pub const CONFIRM_MESSAGE: &str = "Do you want to apply these changes?";

/// Responses accepted as "yes". Anything else, including EOF, means no.
pub const AFFIRMATIVE_RESPONSES: &[&str] = &["y", "yes"];

/// Stages of the apply workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStage {
    Planning,
    Gating,
    Confirming,
    Executing,
    Done,
    Aborted,
}

impl fmt::Display for ApplyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyStage::Planning => write!(f, "planning"),
            ApplyStage::Gating => write!(f, "gating"),
            ApplyStage::Confirming => write!(f, "confirming"),
            ApplyStage::Executing => write!(f, "executing"),
            ApplyStage::Done => write!(f, "done"),
            ApplyStage::Aborted => write!(f, "aborted"),
        }
    }
}

/// Policy decision taken on a plan before anything is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// Nothing differs.
    Empty,
    /// Breaking changes present; never applied automatically.
    Blocked,
    /// Destructive changes are withheld; the rest proceeds.
    SkipDestructive,
    /// Destructive changes are withheld and nothing else is left.
    NothingEligible,
    /// Every change in the plan is eligible.
    Proceed,
}

impl Gate {
    /// Decide what may run. Pure; no I/O.
    pub fn decide(plan: &Plan, allow_destructive: bool) -> Gate {
        if plan.is_empty() {
            Gate::Empty
        } else if plan.has_breaking() {
            Gate::Blocked
        } else if plan.has_destructive() && !allow_destructive {
            if plan.safe_count() == 0 {
                Gate::NothingEligible
            } else {
                Gate::SkipDestructive
            }
        } else {
            Gate::Proceed
        }
    }

    /// Whether destructive changes in the plan are being withheld.
    pub fn skips_destructive(&self) -> bool {
        matches!(self, Gate::SkipDestructive | Gate::NothingEligible)
    }
}

/// Number of changes that would be executed under `allow_destructive`.
pub fn eligible_count(plan: &Plan, allow_destructive: bool) -> usize {
    if allow_destructive {
        plan.safe_count() + plan.destructive_count()
    } else {
        plan.safe_count()
    }
}

/// Flags controlling the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Include destructive changes in execution.
    pub allow_destructive: bool,
    /// Skip the confirmation prompt.
    pub auto_approve: bool,
}

/// What the presenter sees once the plan has been gated.
#[derive(Debug)]
pub struct Review<'a> {
    pub plan: &'a Plan,
    pub gate: Gate,
    pub options: &'a ApplyOptions,
}

/// Interactive yes/no decision.
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> bool;
}

/// Whether `response` is one of [`AFFIRMATIVE_RESPONSES`], ignoring case and
/// surrounding whitespace.
pub fn is_affirmative(response: &str) -> bool {
    let response = response.trim().to_lowercase();
    AFFIRMATIVE_RESPONSES.contains(&response.as_str())
}

/// [`Confirm`] reading one line from `input` after writing the prompt to `output`.
///
/// Read errors and EOF are treated as "no".
pub struct LineConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for LineConfirm<R, W> {
    fn confirm(&mut self, message: &str) -> bool {
        if let Err(e) = write!(self.output, "{} [y/N]: ", message).and_then(|_| self.output.flush())
        {
            log::debug!("Failed to write confirmation prompt: {}", e);
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => false,
            Ok(_) => is_affirmative(&line),
            Err(e) => {
                log::debug!("Failed to read confirmation response: {}", e);
                false
            }
        }
    }
}

/// Result of one execution, as reported by the extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Changes the extension executed.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub applied: Vec<Change>,
    /// Changes withheld (destructive changes when not allowed).
    #[serde(default, deserialize_with = "null_as_empty")]
    pub skipped: Vec<Change>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Whether no change appears in both `applied` and `skipped`.
    pub fn is_disjoint(&self) -> bool {
        let applied: HashSet<&Change> = self.applied.iter().collect();
        !self.skipped.iter().any(|c| applied.contains(c))
    }
}

/// How the workflow ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The live schema already matches.
    NoChanges { plan: Plan },
    /// Only withheld destructive changes remained.
    NothingToApply { plan: Plan },
    /// The operator declined.
    Cancelled { plan: Plan },
    /// The extension executed the eligible changes.
    Applied { plan: Plan, result: ApplyResult },
}

impl ApplyOutcome {
    /// Terminal stage this outcome corresponds to.
    pub fn stage(&self) -> ApplyStage {
        match self {
            ApplyOutcome::Cancelled { .. } => ApplyStage::Aborted,
            ApplyOutcome::NoChanges { .. }
            | ApplyOutcome::NothingToApply { .. }
            | ApplyOutcome::Applied { .. } => ApplyStage::Done,
        }
    }

    /// The plan computed during the planning stage.
    pub fn plan(&self) -> &Plan {
        match self {
            ApplyOutcome::NoChanges { plan }
            | ApplyOutcome::NothingToApply { plan }
            | ApplyOutcome::Cancelled { plan }
            | ApplyOutcome::Applied { plan, .. } => plan,
        }
    }

    pub fn result(&self) -> Option<&ApplyResult> {
        match self {
            ApplyOutcome::Applied { result, .. } => Some(result),
            _ => None,
        }
    }
}

fn transition(stage: &mut ApplyStage, next: ApplyStage) {
    log::debug!("Apply stage; from={}, to={}", stage, next);
    *stage = next;
}

/// Run the apply workflow.
///
/// `present` is called exactly once with the gated plan, before any
/// confirmation. Breaking plans end in
/// [`PgMigrateError::BreakingChangesPresent`] without the execution call
/// ever being made.
pub async fn execute<E, C, F>(
    ext: &E,
    definition: &str,
    options: &ApplyOptions,
    confirm: &mut C,
    mut present: F,
) -> Result<ApplyOutcome>
where
    E: MigrateExtension + ?Sized,
    C: Confirm + ?Sized,
    F: FnMut(&Review<'_>),
{
    let mut stage = ApplyStage::Planning;
    let plan = request_plan(ext, definition).await?;

    transition(&mut stage, ApplyStage::Gating);
    let gate = Gate::decide(&plan, options.allow_destructive);
    log::info!(
        "Plan gated; gate={:?}, eligible={}, allow_destructive={}",
        gate,
        eligible_count(&plan, options.allow_destructive),
        options.allow_destructive
    );
    present(&Review {
        plan: &plan,
        gate,
        options,
    });

    match gate {
        Gate::Empty => {
            transition(&mut stage, ApplyStage::Done);
            return Ok(ApplyOutcome::NoChanges { plan });
        }
        Gate::Blocked => {
            transition(&mut stage, ApplyStage::Aborted);
            return Err(PgMigrateError::BreakingChangesPresent {
                count: plan.breaking_count(),
            });
        }
        Gate::NothingEligible => {
            transition(&mut stage, ApplyStage::Done);
            return Ok(ApplyOutcome::NothingToApply { plan });
        }
        Gate::SkipDestructive | Gate::Proceed => {}
    }

    if !options.auto_approve {
        transition(&mut stage, ApplyStage::Confirming);
        if !confirm.confirm(CONFIRM_MESSAGE) {
            transition(&mut stage, ApplyStage::Aborted);
            log::info!("Apply cancelled by operator");
            return Ok(ApplyOutcome::Cancelled { plan });
        }
    }

    transition(&mut stage, ApplyStage::Executing);
    let loaded = ext
        .load(definition)
        .await
        .map_err(PgMigrateError::LoadFailed)?;
    let result = ext
        .apply(loaded, options.allow_destructive)
        .await
        .map_err(PgMigrateError::ApplyFailed)?;

    if !result.is_disjoint() {
        log::warn!("Extension reported a change as both applied and skipped");
    }
    log::info!(
        "Apply completed; applied={}, skipped={}, duration_ms={}",
        result.applied.len(),
        result.skipped.len(),
        result.duration_ms
    );

    transition(&mut stage, ApplyStage::Done);
    Ok(ApplyOutcome::Applied { plan, result })
}
