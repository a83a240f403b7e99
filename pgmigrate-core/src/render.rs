//! Human and machine renderings of plans and apply outcomes.
//!
//! This is the only place the tier vocabulary (`+`, `-`, `!`) is defined.
//! Rendering is pure: it never mutates its input and the same input always
//! produces the same bytes.

use colored::{ColoredString, Colorize};

use crate::change::{Change, ChangeKind, SafetyTier};
use crate::commands::apply::{ApplyOutcome, ApplyResult, Gate};
use crate::error::Result;
use crate::plan::Plan;

/// Remediation for changes that cannot be applied automatically.
pub const MANUAL_REMEDIATION: &str = "Run SQL directly or use pgmigrate.dba_migrate() in psql.";

/// Prefix symbol of a tier.
pub fn tier_symbol(tier: SafetyTier) -> &'static str {
    match tier {
        SafetyTier::Safe => "+",
        SafetyTier::Destructive => "-",
        SafetyTier::Breaking => "!",
    }
}

fn paint(tier: SafetyTier, text: &str) -> ColoredString {
    match tier {
        SafetyTier::Safe => text.green(),
        SafetyTier::Destructive => text.red(),
        SafetyTier::Breaking => text.yellow(),
    }
}

/// `schema.table.column (note)` with only the column highlighted.
fn column_line(tier: SafetyTier, change: &Change, note: &str) -> String {
    match change.column.as_deref() {
        Some(column) => format!(
            "{}.{} {}",
            change.qualified_table(),
            paint(tier, column),
            note.dimmed()
        ),
        None => paint(tier, change.fallback_label()).to_string(),
    }
}

/// `VERB INDEX name ON schema.table`.
fn index_line(tier: SafetyTier, change: &Change, verb: &str) -> String {
    match change.index.as_deref() {
        Some(index) => format!(
            "{} {}",
            paint(tier, &format!("{} INDEX {}", verb, index)),
            format!("ON {}", change.qualified_table()).dimmed()
        ),
        None => paint(tier, change.fallback_label()).to_string(),
    }
}

/// One-line, tier-tagged description of a change.
pub fn change_line(tier: SafetyTier, change: &Change) -> String {
    let body = match &change.kind {
        ChangeKind::CreateSchema => {
            paint(tier, &format!("CREATE SCHEMA {}", change.schema)).to_string()
        }
        ChangeKind::DropSchema => {
            paint(tier, &format!("DROP SCHEMA {}", change.schema)).to_string()
        }
        ChangeKind::CreateTable => {
            paint(tier, &format!("CREATE TABLE {}", change.qualified_table())).to_string()
        }
        ChangeKind::DropTable => {
            paint(tier, &format!("DROP TABLE {}", change.qualified_table())).to_string()
        }
        ChangeKind::AddColumn => column_line(tier, change, "(add column)"),
        ChangeKind::DropColumn => column_line(tier, change, "(drop column)"),
        ChangeKind::AlterColumnType => {
            let line = column_line(tier, change, "(alter type)");
            match change.type_transition() {
                Some((old, new)) if change.column.is_some() => {
                    format!("{} {} -> {}", line, old, new)
                }
                _ => line,
            }
        }
        ChangeKind::AlterColumnNullable => column_line(tier, change, "(alter nullable)"),
        ChangeKind::AlterColumnDefault => column_line(tier, change, "(alter default)"),
        ChangeKind::CreateIndex => index_line(tier, change, "CREATE"),
        ChangeKind::DropIndex => index_line(tier, change, "DROP"),
        ChangeKind::Other(_) => paint(tier, change.fallback_label()).to_string(),
    };
    format!("  {} {}", paint(tier, tier_symbol(tier)), body)
}

/// `Plan: N to add, N to destroy, N breaking.` naming only non-empty tiers.
pub fn plan_summary(plan: &Plan) -> String {
    let mut parts = Vec::new();
    for tier in SafetyTier::ALL {
        let count = plan.tier(tier).len();
        if count == 0 {
            continue;
        }
        let part = match tier {
            SafetyTier::Safe => format!("{} to add", count).green(),
            SafetyTier::Destructive => format!("{} to destroy", count).red(),
            SafetyTier::Breaking => format!("{} breaking", count).yellow(),
        };
        parts.push(part.to_string());
    }
    format!("Plan: {}.", parts.join(", "))
}

/// Terraform-style rendering of a plan, newline-terminated.
pub fn plan_text(plan: &Plan) -> String {
    if plan.is_empty() {
        return format!(
            "{} Your schema matches the database.\n",
            "No changes.".green()
        );
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        "pgmigrate will perform the following actions:".bold()
    ));
    for (tier, change) in plan.iter() {
        out.push_str(&change_line(tier, change));
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&plan_summary(plan));
    out.push('\n');

    if plan.has_breaking() {
        out.push('\n');
        out.push_str(&format!(
            "{} Breaking changes require manual intervention.\n",
            "Warning:".yellow()
        ));
        out.push_str(MANUAL_REMEDIATION);
        out.push('\n');
    }
    out
}

/// Machine-readable rendering: tier -> ordered change list.
pub fn plan_json(plan: &Plan) -> Result<String> {
    Ok(serde_json::to_string_pretty(plan)?)
}

/// Extra lines to show after the plan once it has been gated.
pub fn gate_notice(gate: Gate) -> Option<String> {
    match gate {
        Gate::SkipDestructive | Gate::NothingEligible => Some(format!(
            "{} Destructive changes will be skipped.\nUse --allow-destructive to include them.\n",
            "Warning:".yellow()
        )),
        Gate::Blocked => Some(format!(
            "{} Breaking changes detected. These cannot be applied automatically.\n",
            "Error:".red()
        )),
        Gate::Empty | Gate::Proceed => None,
    }
}

/// Summary of an execution.
pub fn apply_result_text(result: &ApplyResult) -> String {
    let mut out = String::new();
    if result.applied.is_empty() {
        out.push_str(&format!("{}\n", "No changes applied.".yellow()));
    } else {
        out.push_str(&format!(
            "{} Applied {} change(s) in {}ms.\n",
            "Apply complete!".green(),
            result.applied.len(),
            result.duration_ms
        ));
    }
    if !result.skipped.is_empty() {
        out.push_str(&format!(
            "{} Use --allow-destructive to include.\n",
            format!(
                "Skipped {} destructive change(s).",
                result.skipped.len()
            )
            .yellow()
        ));
    }
    out
}

/// Final line(s) for a finished workflow. The plan itself is rendered earlier.
pub fn outcome_text(outcome: &ApplyOutcome) -> Option<String> {
    match outcome {
        ApplyOutcome::NoChanges { .. } => None,
        ApplyOutcome::NothingToApply { .. } => Some("No safe changes to apply.\n".to_string()),
        ApplyOutcome::Cancelled { .. } => Some("Apply cancelled.\n".to_string()),
        ApplyOutcome::Applied { result, .. } => Some(apply_result_text(result)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() {
        colored::control::set_override(false);
    }

    fn add_email() -> Change {
        Change::new(ChangeKind::AddColumn, "public")
            .with_table("users")
            .with_column("email")
    }

    fn drop_legacy() -> Change {
        Change::new(ChangeKind::DropColumn, "public")
            .with_table("users")
            .with_column("legacy")
    }

    fn retype_age() -> Change {
        Change::new(ChangeKind::AlterColumnType, "public")
            .with_table("users")
            .with_column("age")
            .with_types("integer", "text")
    }

    #[test]
    fn test_change_lines() {
        plain();
        let cases = [
            (
                SafetyTier::Safe,
                Change::new(ChangeKind::CreateSchema, "app"),
                "  + CREATE SCHEMA app",
            ),
            (
                SafetyTier::Destructive,
                Change::new(ChangeKind::DropTable, "app").with_table("old"),
                "  - DROP TABLE app.old",
            ),
            (
                SafetyTier::Safe,
                add_email(),
                "  + public.users.email (add column)",
            ),
            (
                SafetyTier::Breaking,
                retype_age(),
                "  ! public.users.age (alter type) integer -> text",
            ),
            (
                SafetyTier::Breaking,
                Change::new(ChangeKind::AlterColumnNullable, "public")
                    .with_table("users")
                    .with_column("name"),
                "  ! public.users.name (alter nullable)",
            ),
            (
                SafetyTier::Safe,
                Change::new(ChangeKind::CreateIndex, "public")
                    .with_table("users")
                    .with_index("users_email_idx"),
                "  + CREATE INDEX users_email_idx ON public.users",
            ),
        ];
        for (tier, change, expected) in cases {
            assert_eq!(change_line(tier, &change), expected);
        }
    }

    #[test]
    fn test_unknown_kind_falls_back() {
        plain();
        let described = Change::new(ChangeKind::Other("CreateView".into()), "app")
            .with_description("create view app.active_users");
        assert_eq!(
            change_line(SafetyTier::Safe, &described),
            "  + create view app.active_users"
        );

        let bare = Change::new(ChangeKind::Other("CreateView".into()), "app");
        assert_eq!(change_line(SafetyTier::Safe, &bare), "  + CreateView");
    }

    #[test]
    fn test_column_kind_without_column_falls_back() {
        plain();
        let change = Change::new(ChangeKind::AddColumn, "public").with_table("users");
        assert_eq!(change_line(SafetyTier::Safe, &change), "  + AddColumn");
    }

    #[test]
    fn test_empty_plan_text() {
        plain();
        assert_eq!(
            plan_text(&Plan::default()),
            "No changes. Your schema matches the database.\n"
        );
    }

    #[test]
    fn test_plan_text_orders_tiers_and_summarizes() {
        plain();
        // Tiers given out of order in construction still render Safe, Destructive, Breaking.
        let plan = Plan::new(vec![add_email()], vec![drop_legacy()], vec![retype_age()]);
        let text = plan_text(&plan);
        let expected = "\
pgmigrate will perform the following actions:

  + public.users.email (add column)
  - public.users.legacy (drop column)
  ! public.users.age (alter type) integer -> text

Plan: 1 to add, 1 to destroy, 1 breaking.

Warning: Breaking changes require manual intervention.
Run SQL directly or use pgmigrate.dba_migrate() in psql.
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_summary_omits_empty_tiers_and_warning() {
        plain();
        let plan = Plan::new(vec![add_email(), add_email()], vec![], vec![]);
        assert_eq!(plan_summary(&plan), "Plan: 2 to add.");
        assert!(!plan_text(&plan).contains("Warning"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        plain();
        let plan = Plan::new(vec![add_email()], vec![drop_legacy()], vec![retype_age()]);
        assert_eq!(plan_text(&plan), plan_text(&plan));
        assert_eq!(plan_json(&plan).unwrap(), plan_json(&plan).unwrap());
    }

    #[test]
    fn test_plan_json_round_trips() {
        let mut view = Change::new(ChangeKind::Other("CreateView".into()), "app")
            .with_description("create view app.v")
            .with_sql("CREATE VIEW app.v AS SELECT 1");
        view.safety = Some("safe".to_string());
        let plan = Plan::new(
            vec![
                add_email(),
                Change::new(ChangeKind::CreateSchema, "app"),
                Change::new(ChangeKind::CreateIndex, "public")
                    .with_table("users")
                    .with_index("users_email_idx")
                    .with_sql("CREATE INDEX users_email_idx ON public.users (email)"),
                view,
            ],
            vec![drop_legacy()],
            vec![retype_age().with_description("widen age")],
        );
        let json = plan_json(&plan).unwrap();
        assert!(!json.contains("null"));
        assert!(json.contains(r#""change_type": "CreateView""#));
        assert!(json.contains(r#""index": "users_email_idx""#));
        assert!(json.contains(r#""safety": "safe""#));
        assert_eq!(Plan::from_json(&json).unwrap(), plan);
    }

    #[test]
    fn test_gate_notice() {
        plain();
        assert!(gate_notice(Gate::Proceed).is_none());
        assert!(gate_notice(Gate::Empty).is_none());
        assert!(gate_notice(Gate::SkipDestructive)
            .unwrap()
            .contains("--allow-destructive"));
    }

    #[test]
    fn test_apply_result_text_reminds_about_skipped() {
        plain();
        let result = ApplyResult {
            applied: vec![add_email()],
            skipped: vec![drop_legacy()],
            duration_ms: 15,
        };
        assert_eq!(
            apply_result_text(&result),
            "Apply complete! Applied 1 change(s) in 15ms.\n\
             Skipped 1 destructive change(s). Use --allow-destructive to include.\n"
        );
    }

    #[test]
    fn test_apply_result_text_nothing_applied() {
        plain();
        assert_eq!(
            apply_result_text(&ApplyResult::default()),
            "No changes applied.\n"
        );
    }
}
