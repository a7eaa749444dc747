use colored::{ColoredString, Colorize};
use declarative::Action;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Symbol for a report action
pub fn action_symbol(action: &Action) -> ColoredString {
    match action {
        Action::Unchanged => "○".dimmed(),
        Action::Changed => "✓".green(),
        Action::WouldChange => "~".yellow(),
        Action::Refreshed => "↻".cyan(),
        Action::Failed => "✗".red(),
        Action::Skipped => "⊘".yellow(),
    }
}

/// Colored label for a report action
pub fn action_label(action: &Action) -> ColoredString {
    let label = action.to_string();
    match action {
        Action::Unchanged => label.dimmed(),
        Action::Changed => label.green(),
        Action::WouldChange => label.yellow(),
        Action::Refreshed => label.cyan(),
        Action::Failed => label.red().bold(),
        Action::Skipped => label.yellow(),
    }
}
