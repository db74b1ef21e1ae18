//! `onhm load-data` — fetch model and test data packages into the bind
//! volume, skipping packages that are already present.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::commands::{ProfileArgs, finish};
use crate::lock::RunLock;
use crate::orchestrator;
use crate::output::TerminalReporter;
use crate::plan;

/// Arguments for the load-data command.
#[derive(Args)]
pub struct LoadDataArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,
}

/// Run `onhm load-data`.
///
/// # Errors
///
/// Returns an error for configuration problems (profile, lock, compose
/// detection); download failures surface through the outcome.
pub async fn run(args: &LoadDataArgs, app: &AppContext) -> Result<i32> {
    let profile = args.profile.load()?;
    let _lock = RunLock::acquire(&profile.host_bind_dir())?;
    let compose = app.compose().await?;
    let plan = plan::load_data(&profile)?;
    let reporter = TerminalReporter::new(&app.output);
    let outcome = orchestrator::execute(&compose, &plan, &reporter).await;
    finish(app, &outcome)
}
