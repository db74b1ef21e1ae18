//! `onhm conv-output-to-zarr` — convert a run's NetCDF output tree to a
//! Zarr store.

use anyhow::{Result, bail};
use clap::Args;
use chrono::NaiveDate;

use crate::app::AppContext;
use crate::commands::{ProfileArgs, finish};
use crate::dates::date_stamp;
use crate::lock::RunLock;
use crate::orchestrator;
use crate::output::TerminalReporter;
use crate::plan;
use crate::service_env::OutputMode;

/// Arguments for the conv-output-to-zarr command.
#[derive(Args)]
pub struct ConvZarrArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Which output tree to convert
    #[arg(long, value_enum)]
    pub mode: OutputMode,

    /// Forecast start date selecting the dated output folder
    /// (required for median and ensemble modes)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,
}

/// Run `onhm conv-output-to-zarr`.
///
/// # Errors
///
/// Returns an error for configuration problems, including a missing
/// `--date` for forecast modes.
pub async fn run(args: &ConvZarrArgs, app: &AppContext) -> Result<i32> {
    let profile = args.profile.load()?;
    let root = profile.required("PROJECT_ROOT").to_string();

    let output_path = match (args.mode, args.date) {
        (OutputMode::Op, _) => format!("{}/output", profile.required("OP_DIR")),
        (OutputMode::Median, Some(date)) => {
            format!("{root}/forecast/output/ensemble_median/{}", date_stamp(date))
        }
        (OutputMode::Ensemble, Some(date)) => {
            format!("{root}/forecast/output/ensembles/{}", date_stamp(date))
        }
        (mode, None) => bail!(
            "--date is required for --mode {} (selects the dated forecast output folder)",
            mode.tag()
        ),
    };

    let _lock = RunLock::acquire(&profile.host_bind_dir())?;
    let compose = app.compose().await?;
    let plan = plan::conv_output_to_zarr(&profile, &output_path, args.mode)?;
    let reporter = TerminalReporter::new(&app.output);
    let outcome = orchestrator::execute(&compose, &plan, &reporter).await;
    finish(app, &outcome)
}
