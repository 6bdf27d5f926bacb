/// Terminal output for the annokit commands
use colored::*;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

/// Labelled values under a bold title
pub fn print_summary(title: &str, items: &[(&str, String)]) {
    println!("\n{} {}", "ℹ".cyan(), title.bold());
    let width = items.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in items {
        println!("  {} {:<width$}  {}", "•".dimmed(), label, value, width = width);
    }
}

pub fn print_warning(message: &str) {
    eprintln!("\n{} {}", "⚠".yellow(), message.yellow());
}

pub fn print_success(message: &str) {
    println!("\n{} {}", "✓".green().bold(), message);
}

pub fn print_tip(message: &str) {
    println!("{} {}", "→".cyan(), message.dimmed());
}

pub fn print_section(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// Rounded table with a bold green header row
pub fn styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Green)),
        );
    table
}

/// Gene counts with thousands separators, e.g. `12,408`
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Honour `NO_COLOR` and `CLICOLOR=0`
pub fn init() {
    let disabled = std::env::var_os("NO_COLOR").is_some()
        || std::env::var("CLICOLOR").map(|v| v == "0").unwrap_or(false);
    if disabled {
        colored::control::set_override(false);
    }
}
