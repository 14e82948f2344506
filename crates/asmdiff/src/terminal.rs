//! Terminal UI utilities for progress indication and styled output.

use asmdiff::StageOutcome;
use console::{StyledObject, style};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for one suite. Case lines are printed above it.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Create a progress bar with a total count; hidden when `quiet`.
    pub fn new(total: u64, message: &str, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total)
        };
        if let Ok(bar_style) = ProgressStyle::default_bar().template("{msg} [{bar:30.cyan/dim}] {pos}/{len}") {
            bar.set_style(bar_style.progress_chars("━╸━"));
        }
        bar.set_message(message.to_string());
        Self { bar }
    }

    /// Print a line to stdout without tearing the bar, then advance it.
    pub fn case_line(&self, line: &str) {
        self.bar.suspend(|| println!("{line}"));
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// `PASS` in green, `SKIP (..)` in yellow, `FAIL (..)` in red.
pub fn status(outcome: &StageOutcome) -> StyledObject<String> {
    let label = style(outcome.status_label());
    if outcome.is_pass() {
        label.green()
    } else if outcome.is_skip() {
        label.yellow()
    } else {
        label.red()
    }
}

// ============================================================================
// Styled output helpers
// ============================================================================

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

/// Print a section header to stdout, framed by rules of `=`.
pub fn header(message: &str) {
    let rule = "=".repeat(60);
    println!("\n{rule}\n{}\n{rule}", style(message).bold());
}
