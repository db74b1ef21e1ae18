//! `onhm run-sub-seasonal` — the 28-day forecast over both methods.
//!
//! The median and ensemble branches are independent: each halts internally
//! on failure, but one branch's failure does not block the other. The
//! merged outcome degrades to partial failure when exactly one branch
//! fails.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::commands::{ProfileArgs, finish};
use crate::dates::ForecastWindow;
use crate::discovery::{RestartChain, latest_restart_date};
use crate::lock::RunLock;
use crate::orchestrator::{self, RunOutcome};
use crate::output::TerminalReporter;
use crate::plan;
use crate::service_env::ForecastMethod;

/// Arguments for the run-sub-seasonal command.
#[derive(Args)]
pub struct SubSeasonalArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,
}

/// Run `onhm run-sub-seasonal`.
///
/// # Errors
///
/// Returns an error for validation problems (profile, lock, restart
/// discovery); branch failures surface through the merged outcome.
pub async fn run(args: &SubSeasonalArgs, app: &AppContext) -> Result<i32> {
    let profile = args.profile.load()?;
    let _lock = RunLock::acquire(&profile.host_bind_dir())?;
    let compose = app.compose().await?;

    let restart = latest_restart_date(&compose, &profile, RestartChain::Forecast).await?;
    let window = ForecastWindow::from_restart(restart);
    let members = profile.ensemble_count();
    let reporter = TerminalReporter::new(&app.output);

    let mut branches = Vec::new();
    for method in [ForecastMethod::Median, ForecastMethod::Ensemble] {
        app.output.header(&format!("{} branch", method.tag()));
        let plan = plan::forecast_branch(&profile, &window, method, members)?;
        branches.push(orchestrator::execute(&compose, &plan, &reporter).await);
    }

    let outcome = RunOutcome::merge("run-sub-seasonal", branches);
    finish(app, &outcome)
}
