//! Terminal output helpers for deployment progress

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Section header for a run
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Progress note
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").cyan().bold(), msg);
}

/// Completed step
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Non-fatal problem
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Fatal problem
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Indented name/detail line, e.g. a missing tool and its install hint
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Spinner shown while a stack operation is in flight
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("static spinner template")
            .tick_chars("◐◓◑◒ "),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
