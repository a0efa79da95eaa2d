use console::{Emoji, style};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Emojis for consistent visual feedback
pub static CHECKMARK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", ">> ");

/// Console output utility for consistent formatting across the pipeline.
///
/// Owns the `MultiProgress` that all git transfer bars attach to, so bars
/// from concurrently fetched repositories render together and can be
/// cleared as a group when the run fails.
pub struct Console {
    quiet: bool,
    multi_progress: MultiProgress,
}

impl Console {
    /// Create a new Console; `quiet` suppresses progress bars and info
    /// output, leaving only warnings and errors.
    pub fn new(quiet: bool) -> Self {
        let multi_progress = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self {
            quiet,
            multi_progress,
        }
    }

    /// Handle to the shared progress group; cheap to clone into worker tasks.
    pub fn multi_progress(&self) -> MultiProgress {
        self.multi_progress.clone()
    }

    /// Print a header message with consistent formatting
    pub fn header(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", ROCKET, style(message).bold().cyan());
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", CHECKMARK, style(message).green());
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", CROSS, style(message).red());
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        println!("⚠️  {}", style(message).yellow());
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ️").blue(), message);
        }
    }

    /// Print a summary section with consistent formatting
    pub fn summary(&self, title: &str, items: &[(&str, String)]) {
        if self.quiet {
            return;
        }
        println!("\n{}", style(title).bold().underlined());
        for (label, value) in items {
            println!("  {}: {}", style(label).bold(), value);
        }
    }

    /// Remove all progress bars so the terminal is left clean on failure.
    pub fn clear_progress(&self) {
        let _ = self.multi_progress.clear();
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Create a byte-transfer progress bar for a clone or fetch, attached to
/// the shared progress group.
pub fn transfer_progress_bar(multi_progress: &MultiProgress, message: &str) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new(0));
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} objects",
        )
        .unwrap()
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    pb.set_message(format!("{} {}", PACKAGE, message));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
