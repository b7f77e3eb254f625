//! Progress reporting for a pipeline run
//!
//! Shows a spinner per phase on stderr so stdout stays clean for results.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Tracks and displays the phase a run is in
pub struct ProgressTracker {
    /// Spinner for the current phase
    spinner: Option<ProgressBar>,
    /// Current phase name
    current_phase: Option<String>,
    /// Number of phases finished
    completed: usize,
    /// Whether to show output (false for tests/quiet mode)
    show_output: bool,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            spinner: None,
            current_phase: None,
            completed: 0,
            show_output: true,
        }
    }

    /// Create a quiet progress tracker (no output)
    pub fn quiet() -> Self {
        Self {
            show_output: false,
            ..Self::new()
        }
    }

    /// Start a new phase, finishing any phase still running
    pub fn start_phase(&mut self, phase: &str) {
        if self.current_phase.is_some() {
            self.finish_phase();
        }
        self.current_phase = Some(phase.to_string());

        if self.show_output {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
                    .template("  {spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.set_message(format!("{}...", phase));
            spinner.enable_steady_tick(Duration::from_millis(80));
            self.spinner = Some(spinner);
        }
    }

    /// Finish the current phase successfully
    pub fn finish_phase(&mut self) {
        self.end_phase(|phase| format!("{} {}", phase, "done".green()));
    }

    /// Finish the current phase with a failure note
    pub fn fail_phase(&mut self, reason: &str) {
        self.end_phase(|phase| format!("{} {}", phase, reason.red()));
    }

    fn end_phase(&mut self, message: impl FnOnce(&str) -> String) {
        if let Some(phase) = self.current_phase.take() {
            if let Some(spinner) = self.spinner.take() {
                spinner.finish_with_message(message(&phase));
            }
            self.completed += 1;
        }
    }

    /// Print an informational line between phases
    pub fn note(&self, message: &str) {
        if self.show_output {
            match &self.spinner {
                Some(spinner) => spinner.println(format!("  {}", message)),
                None => eprintln!("  {}", message),
            }
        }
    }

    /// Number of phases finished so far
    pub fn phases_completed(&self) -> usize {
        self.completed
    }

    pub fn current_phase(&self) -> Option<&str> {
        self.current_phase.as_deref()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
