//! Restart-file discovery.
//!
//! A run initializes from the newest `*.restart` file under the project's
//! restart directory. The lookup happens inside the base service so the
//! orchestrator never needs the bind mount's host layout.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

use crate::compose::{Compose, ComposeRun};
use crate::dates::parse_date_stem;
use crate::plan::PROBE_TIMEOUT;
use crate::profile::EnvironmentProfile;

/// Which restart chain to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartChain {
    /// `daily/restart` — seeds operational runs.
    Operational,
    /// `forecast/restart` — seeds forecast runs.
    Forecast,
}

impl RestartChain {
    fn subdir(self) -> &'static str {
        match self {
            Self::Operational => "daily/restart",
            Self::Forecast => "forecast/restart",
        }
    }
}

/// Date stem of the newest restart file in the given chain.
///
/// # Errors
///
/// Fails when the probe cannot run, finds no restart files, or the newest
/// filename does not carry a `YYYY-MM-DD` stem.
pub async fn latest_restart_date<C: Compose>(
    compose: &C,
    profile: &EnvironmentProfile,
    chain: RestartChain,
) -> Result<NaiveDate> {
    let working_dir = format!("{}/{}", profile.required("PROJECT_ROOT"), chain.subdir());
    let command = vec![
        "bash".to_string(),
        "-c".to_string(),
        "ls -1 *.restart | sort | tail -1 | cut -f1 -d '.'".to_string(),
    ];
    let env = profile.to_overlay();
    let invocation = compose
        .run_service(&ComposeRun {
            service: "base",
            env: &env,
            working_dir: Some(&working_dir),
            command: &command,
            timeout: PROBE_TIMEOUT,
        })
        .await
        .with_context(|| format!("probing {working_dir} for restart files"))?;

    if !invocation.success() {
        bail!(
            "restart lookup in {working_dir} exited with {:?}: {}",
            invocation.exit_code,
            invocation.stderr.trim()
        );
    }
    let stem = invocation.stdout.trim();
    if stem.is_empty() {
        bail!("no .restart files found in {working_dir}");
    }
    parse_date_stem(stem)
        .with_context(|| format!("restart filename '{stem}' is not a YYYY-MM-DD date stem"))
}
