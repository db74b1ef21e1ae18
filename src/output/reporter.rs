//! `TerminalReporter` — presentation-layer implementation of
//! [`ProgressReporter`](crate::orchestrator::ProgressReporter).
//!
//! Long-running steps (the model simulation can take hours) get a spinner
//! on a TTY; otherwise plain step lines are printed so logs stay readable.

use std::cell::RefCell;
use std::time::Duration;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::orchestrator::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    active: RefCell<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            active: RefCell::new(None),
        }
    }

    fn take_spinner(&self) -> Option<ProgressBar> {
        self.active.borrow_mut().take()
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step_started(&self, label: &str) {
        if self.ctx.show_progress() {
            *self.active.borrow_mut() = Some(progress::spinner(&format!("running {label}...")));
        } else if !self.ctx.quiet {
            println!("  {} running {label}...", "→".cyan());
        }
    }

    fn step_succeeded(&self, label: &str, duration: Duration) {
        let msg = format!("{label} ({:.1}s)", duration.as_secs_f64());
        if let Some(pb) = self.take_spinner() {
            progress::finish_ok(&pb, &msg);
        } else if !self.ctx.quiet {
            println!("  {} {msg}", "✓".green());
        }
    }

    fn step_failed(&self, label: &str, detail: &str) {
        let msg = format!("{label}: {detail}");
        if let Some(pb) = self.take_spinner() {
            progress::finish_err(&pb, &msg);
        } else {
            eprintln!("  {} {msg}", "✗".red());
        }
    }

    fn step_skipped(&self, label: &str) {
        if !self.ctx.quiet {
            println!("  {} {label} skipped", "·".dimmed());
        }
    }
}
