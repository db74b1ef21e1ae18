//! `onhm run-seasonal` — the 9-month seasonal forecast: refresh the CFSv2
//! seasonal fields, then run the median pipeline over the seasonal window.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::commands::{ProfileArgs, finish};
use crate::dates::ForecastWindow;
use crate::discovery::{RestartChain, latest_restart_date};
use crate::lock::RunLock;
use crate::orchestrator;
use crate::output::TerminalReporter;
use crate::plan;

/// Arguments for the run-seasonal command.
#[derive(Args)]
pub struct SeasonalArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,
}

/// Run `onhm run-seasonal`.
///
/// # Errors
///
/// Returns an error for validation problems (profile, lock, restart
/// discovery); step failures surface through the outcome.
pub async fn run(args: &SeasonalArgs, app: &AppContext) -> Result<i32> {
    let profile = args.profile.load()?;
    let _lock = RunLock::acquire(&profile.host_bind_dir())?;
    let compose = app.compose().await?;

    let restart = latest_restart_date(&compose, &profile, RestartChain::Forecast).await?;
    let window = ForecastWindow::seasonal(restart);
    let plan = plan::seasonal(&profile, &window)?;
    let reporter = TerminalReporter::new(&app.output);
    let outcome = orchestrator::execute(&compose, &plan, &reporter).await;
    finish(app, &outcome)
}
