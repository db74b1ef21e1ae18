//! Application context — unified state passed to every command handler.
//!
//! Adding a new cross-cutting concern (e.g. `--verbose`, telemetry)
//! requires only one field change here — zero command signatures change.

use anyhow::Result;

use crate::command_runner::TokioCommandRunner;
use crate::compose::DockerCompose;
use crate::output::OutputContext;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Unified application context passed to every command handler.
///
/// Constructed once in `Cli::run()` and passed as `&AppContext` to all
/// command handlers.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: &AppFlags) -> Self {
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            mode,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Detect and return a handle to the compose tool. Probed per command
    /// so commands that never touch containers (`version`) work without
    /// docker installed.
    ///
    /// # Errors
    ///
    /// Returns an error when neither `docker compose` nor `docker-compose`
    /// is available.
    pub async fn compose(&self) -> Result<DockerCompose<TokioCommandRunner>> {
        DockerCompose::detect(TokioCommandRunner).await
    }
}
