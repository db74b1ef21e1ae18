//! `onhm run-update-cfsv2-data` — refresh the CFSv2 climate fields for one
//! forecast method.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::commands::{ProfileArgs, finish};
use crate::lock::RunLock;
use crate::orchestrator;
use crate::output::TerminalReporter;
use crate::plan;
use crate::service_env::ForecastMethod;

/// Arguments for the run-update-cfsv2-data command.
#[derive(Args)]
pub struct UpdateCfsv2Args {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Forecast method to refresh
    #[arg(long, value_enum)]
    pub method: ForecastMethod,
}

/// Run `onhm run-update-cfsv2-data`.
///
/// # Errors
///
/// Returns an error for configuration problems; an ETL failure surfaces
/// through the outcome and exit code 2.
pub async fn run(args: &UpdateCfsv2Args, app: &AppContext) -> Result<i32> {
    let profile = args.profile.load()?;
    let _lock = RunLock::acquire(&profile.host_bind_dir())?;
    let compose = app.compose().await?;
    let plan = plan::update_cfsv2(&profile, args.method)?;
    let reporter = TerminalReporter::new(&app.output);
    let outcome = orchestrator::execute(&compose, &plan, &reporter).await;
    finish(app, &outcome)
}
