//! Terminal output for pgmigrate commands.
//! Plans and results come from the core renderer; history uses comfy-table.

use colored::Colorize;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use pgmigrate_core::commands::apply::Review;
use pgmigrate_core::render;
use pgmigrate_core::{ApplyOutcome, HistoryEntry, MigrationOrigin};

/// Print a success message with a green prefix.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green(), message);
}

/// Print the gated plan shown before any confirmation.
pub fn print_review(review: &Review<'_>) {
    print!("{}", render::plan_text(review.plan));
    if let Some(notice) = render::gate_notice(review.gate) {
        println!();
        print!("{}", notice);
    }
    if !review.plan.is_empty() {
        println!();
    }
}

/// Print the closing lines of an apply run.
pub fn print_outcome(outcome: &ApplyOutcome) {
    if let Some(text) = render::outcome_text(outcome) {
        if matches!(outcome, ApplyOutcome::Applied { .. }) {
            println!();
        }
        print!("{}", text);
    }
}

/// Print the next steps after `init`.
pub fn print_init_next_steps(path: &str) {
    print_success(&format!("Created {}", path));
    println!();
    println!("Edit this file to define your desired schema, then run:");
    println!("  pgmigrate plan    # Preview changes");
    println!("  pgmigrate apply   # Apply changes");
}

/// Format migration history as a table, newest first.
pub fn print_history_table(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("{}", "No migration history found.".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID"),
            Cell::new("Type"),
            Cell::new("Hash"),
            Cell::new("Applied At"),
            Cell::new("By"),
            Cell::new("Duration"),
        ]);

    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.id),
            origin_cell(&entry.migration_type),
            Cell::new(entry.display_hash()),
            Cell::new(entry.display_applied_at()),
            Cell::new(&entry.applied_by),
            Cell::new(format!("{}ms", entry.duration_ms)),
        ]);
    }

    println!("{}", "Migration History".bold());
    println!("{table}");
}

/// Manual migrations stand out from tool-applied ones.
fn origin_cell(origin: &MigrationOrigin) -> Cell {
    let cell = Cell::new(origin.as_str());
    if !colored::control::SHOULD_COLORIZE.should_colorize() {
        return cell;
    }
    if origin.is_manual() {
        cell.fg(Color::Yellow)
    } else {
        cell.fg(Color::Green)
    }
}

/// Print CLI and extension versions.
pub fn print_version(cli_version: &str, git_hash: &str, extension: &str) {
    println!("pgmigrate CLI {} ({})", cli_version, git_hash);
    println!("pg_migrate extension: {}", extension);
}
