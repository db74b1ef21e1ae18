//! Output formatting module

pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;
pub use reporter::TerminalReporter;
pub use styles::Styles;

use crate::orchestrator::{RunOutcome, StepStatus};

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Print the per-step status table and, for failed steps, their captured
/// output. Errors are printed even under `--quiet`.
pub fn render_outcome(ctx: &OutputContext, outcome: &RunOutcome) {
    ctx.header(&format!("{} steps", outcome.operation));
    for step in &outcome.steps {
        match step.status {
            StepStatus::Succeeded => {
                ctx.success(&format!("{:<28} {:>6.1}s", step.label, step.duration.as_secs_f64()));
            }
            StepStatus::Skipped => {
                ctx.kv(&format!("{:<28}", step.label), "skipped");
            }
            StepStatus::Failed => {
                let detail = step.error.clone().unwrap_or_else(|| {
                    format!(
                        "exit code {}",
                        step.exit_code.map_or_else(|| "none (signal)".to_string(), |c| c.to_string())
                    )
                });
                ctx.error(&format!("{:<28} {detail}", step.label));
            }
        }
    }

    for step in outcome.steps.iter().filter(|s| s.status == StepStatus::Failed) {
        if !step.stdout.trim().is_empty() {
            ctx.error(&format!("{} stdout:", step.label));
            eprintln!("{}", step.stdout.trim_end());
        }
        if !step.stderr.trim().is_empty() {
            ctx.error(&format!("{} stderr:", step.label));
            eprintln!("{}", step.stderr.trim_end());
        }
    }

    let total = outcome.total_duration.as_secs_f64();
    match outcome.status {
        crate::orchestrator::RunStatus::Succeeded => {
            ctx.success(&format!("{} succeeded in {total:.1}s", outcome.operation));
        }
        crate::orchestrator::RunStatus::PartiallyFailed => {
            ctx.warn(&format!("{} partially failed after {total:.1}s", outcome.operation));
        }
        crate::orchestrator::RunStatus::Failed => {
            ctx.error(&format!("{} failed after {total:.1}s", outcome.operation));
        }
    }
}
