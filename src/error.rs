//! Typed domain error enums.
//!
//! All error types implement `thiserror::Error` and convert to
//! `anyhow::Error` via the `?` operator. The CLI layer maps them to exit
//! codes: configuration errors exit 1, step failures exit 2, partial
//! failures exit 3.

use std::path::PathBuf;
use thiserror::Error;

// ── Configuration errors ──────────────────────────────────────────────────────

/// Errors raised while resolving an environment profile or an operation,
/// before any external process is launched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment file {} is missing required keys: {}", path.display(), keys.join(", "))]
    MissingKeys { path: PathBuf, keys: Vec<String> },

    #[error("Environment file {}, line {line}: expected KEY=VALUE", path.display())]
    Malformed { path: PathBuf, line: usize },

    #[error("Cannot read environment file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown operation '{name}'. Valid operations: {valid}")]
    UnknownOperation { name: String, valid: String },

    #[error("Service graph integrity: '{service}' depends on undefined service '{dependency}'")]
    DanglingDependency { service: String, dependency: String },

    #[error("Service graph integrity: dependency cycle among {}", services.join(", "))]
    DependencyCycle { services: Vec<String> },
}

// ── Step errors ───────────────────────────────────────────────────────────────

/// Failure of a single plan step. `Exit` and `Timeout` carry the captured
/// output so the CLI can surface it; `Launch` means the external tool never
/// started.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Failed to launch '{program}': {message}")]
    Launch { program: String, message: String },

    #[error("Step '{step}' timed out after {seconds}s and was terminated")]
    Timeout { step: String, seconds: u64 },

    #[error("Step '{step}' exited with code {code}")]
    Exit { step: String, code: i32 },

    #[error("Step '{step}' completed but expected output {} is missing", path.display())]
    MissingOutput { step: String, path: PathBuf },
}

// ── Artifact errors ───────────────────────────────────────────────────────────

/// Errors raised while relocating run outputs into the archive.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Source directory {} does not exist", .0.display())]
    MissingSource(PathBuf),

    #[error("Source directory {} is empty; upstream service produced no output", .0.display())]
    EmptySource(PathBuf),

    #[error(
        "Destination {} already holds different content (from another run?). \
         Refusing to merge archives.", path.display()
    )]
    Collision { path: PathBuf },

    #[error("Archive I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
