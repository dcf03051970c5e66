//! Terminal styling helpers for the pipeline console output

use console::{style, Emoji};
use std::path::Path;
use std::time::Duration;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static REPORT: Emoji<'_, '_> = Emoji("📝 ", "");
pub static SEED: Emoji<'_, '_> = Emoji("🎲 ", "");
pub static FOLDS: Emoji<'_, '_> = Emoji("🔁 ", "");

/// Print the application banner with ASCII art
pub fn print_banner(version: &str) {
    let banner = r#"
     ██████╗ █████╗ ██████╗ ██████╗ ██╗ ██████╗ ███╗   ███╗██╗███╗   ██╗███████╗
    ██╔════╝██╔══██╗██╔══██╗██╔══██╗██║██╔═══██╗████╗ ████║██║████╗  ██║██╔════╝
    ██║     ███████║██████╔╝██║  ██║██║██║   ██║██╔████╔██║██║██╔██╗ ██║█████╗
    ██║     ██╔══██║██╔══██╗██║  ██║██║██║   ██║██║╚██╔╝██║██║██║╚██╗██║██╔══╝
    ╚██████╗██║  ██║██║  ██║██████╔╝██║╚██████╔╝██║ ╚═╝ ██║██║██║ ╚████║███████╗
     ╚═════╝╚═╝  ╚═╝╚═╝  ╚═╝╚═════╝ ╚═╝ ╚═════╝ ╚═╝     ╚═╝╚═╝╚═╝  ╚═══╝╚══════╝
    "#;

    println!();
    println!("{}", style(banner).red().bold());
    println!(
        "    {} {}",
        style("♥").red().bold(),
        style("Heart disease data mining pipeline").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print configuration card
pub fn print_config(input: &Path, report: &Path, output_dir: &Path, folds: usize, seed: u64) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Input:  {:<39}│",
        FOLDER,
        truncate_path(input, 38)
    );
    println!(
        "    │  {} Report: {:<39}│",
        REPORT,
        truncate_path(report, 38)
    );
    println!(
        "    │  {} Output: {:<39}│",
        CHART,
        truncate_path(output_dir, 38)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Evaluation folds: {:<29}│",
        FOLDS,
        style(folds).yellow()
    );
    println!(
        "    │  {} Seed:             {:<29}│",
        SEED,
        style(seed).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a non-fatal warning
pub fn print_warning(message: &str) {
    println!("    {} {}", WARN, style(message).yellow());
}

/// Print how long a step took
pub fn print_step_time(elapsed: Duration) {
    println!(
        "      {}",
        style(format!("done in {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("Cardiomine pipeline complete!").green().bold()
    );
    println!();
}

/// Print how many rows a cleaning stage removed
pub fn print_removed(description: &str, count: usize, rule: Option<&str>) {
    let count = if count == 0 {
        style(count).dim()
    } else {
        style(count).yellow().bold()
    };
    match rule {
        Some(rule) => println!("      Removed {} {} {}", count, description, style(rule).dim()),
        None => println!("      Removed {} {}", count, description),
    }
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_strings() {
        assert_eq!(truncate_string("data.csv", 38), "data.csv");
    }

    #[test]
    fn test_truncate_keeps_the_tail() {
        let long = "a/very/long/path/to/some/heart/disease/data.csv";
        let truncated = truncate_string(long, 20);
        assert_eq!(truncated.chars().count(), 20);
        assert!(truncated.starts_with("..."));
        assert!(truncated.ends_with("data.csv"));
    }
}
