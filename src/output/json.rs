//! JSON output helpers.
//!
//! `--json` renders the aggregated run outcome (or an error object) as
//! pretty-printed JSON for machine consumers.

use anyhow::{Context, Result};

use crate::orchestrator::RunOutcome;

/// Render a run outcome as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen in
/// practice — `serde_json` only fails on non-finite floats and maps with
/// non-string keys, neither of which appear here).
pub fn render_outcome(outcome: &RunOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).context("JSON serialization failed")
}

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// See [`render_outcome`].
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
