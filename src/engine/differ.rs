//! Diff display - adclictl-specific UI

use colored::Colorize;
use declarative::{DiffSummary, ResourceDiff, ResourceKind};
use similar::{ChangeTag, TextDiff};

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Configuration Diff".bold()
    );
    println!("│");

    for kind in [ResourceKind::Package, ResourceKind::Service, ResourceKind::File] {
        let of_kind: Vec<_> = diffs.iter().filter(|d| d.kind == kind).collect();
        if of_kind.is_empty() {
            continue;
        }

        let type_name = match kind {
            ResourceKind::Package => "Packages",
            ResourceKind::Service => "Services",
            ResourceKind::File => "Files",
        };
        println!("│ {}", type_name.bold());

        for diff in of_kind {
            display_one(diff);
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to add, {} to change, {} to remove)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn display_one(diff: &ResourceDiff) {
    let symbol = if diff.is_in_sync() {
        "!".yellow()
    } else if diff.is_addition() {
        "+".green()
    } else if diff.is_removal() {
        "-".red()
    } else {
        "~".yellow()
    };

    let noop = if diff.noop {
        " [noop]".yellow().to_string()
    } else {
        String::new()
    };

    println!(
        "│   {} {:<30} {}{}",
        symbol,
        diff.resource_id,
        format!("({} → {})", diff.current, diff.desired).dimmed(),
        noop
    );

    for change in &diff.changes {
        println!("│       • {change}");
    }
    for note in &diff.notes {
        println!("│       {} {}", "⚠".yellow(), note.yellow());
    }

    if let Some((current, desired)) = diff.content_change() {
        for line in unified_lines(&current, &desired) {
            println!("│       {line}");
        }
    }
}

/// Colored unified diff lines between two texts
fn unified_lines(current: &str, desired: &str) -> Vec<String> {
    let diff = TextDiff::from_lines(current, desired);
    let mut lines = Vec::new();

    for (idx, group) in diff.grouped_ops(2).iter().enumerate() {
        if idx > 0 {
            lines.push("...".dimmed().to_string());
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let text = change.value().trim_end_matches('\n');
                let line = match change.tag() {
                    ChangeTag::Delete => format!("-{text}").red().to_string(),
                    ChangeTag::Insert => format!("+{text}").green().to_string(),
                    ChangeTag::Equal => format!(" {text}").dimmed().to_string(),
                };
                lines.push(line);
            }
        }
    }
    lines
}
