//! CLI argument parsing with clap derive
//!
//! Exit codes: 0 success, 1 validation/configuration failure (nothing was
//! launched past the failing check), 2 step failure, 3 partial failure.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Operational National Hydrologic Model pipeline orchestrator
#[derive(Parser)]
#[command(
    name = "onhm",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build all pipeline images in dependency order (admin)
    BuildImages(commands::build_images::BuildImagesArgs),

    /// Load model and test data into the bind volume (admin)
    LoadData(commands::load_data::LoadDataArgs),

    /// Run the daily operational pipeline
    RunOperational(commands::operational::OperationalArgs),

    /// Archive daily and forecast outputs (best-effort across methods)
    FetchOpResults(commands::fetch_op_results::FetchOpResultsArgs),

    /// Run the 28-day sub-seasonal forecast (median and ensemble)
    RunSubSeasonal(commands::sub_seasonal::SubSeasonalArgs),

    /// Refresh CFSv2 climate fields for one forecast method
    RunUpdateCfsv2Data(commands::update_cfsv2::UpdateCfsv2Args),

    /// Convert a run's NetCDF output tree to Zarr
    ConvOutputToZarr(commands::conv_zarr::ConvZarrArgs),

    /// Run the 9-month seasonal forecast
    RunSeasonal(commands::seasonal::SeasonalArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command, returning the process exit code.
    ///
    /// # Errors
    ///
    /// Returns an error for configuration/validation failures; the caller
    /// maps those to exit code 1. Step and partial failures come back as
    /// `Ok(2)` / `Ok(3)` so the per-step table has already been rendered.
    pub async fn run(self) -> Result<i32> {
        let Cli {
            json,
            quiet,
            no_color,
            command,
        } = self;
        let app = AppContext::new(&AppFlags {
            no_color,
            quiet,
            json,
        });
        match command {
            Command::Version => commands::version::run(json),
            Command::BuildImages(args) => commands::build_images::run(&args, &app).await,
            Command::LoadData(args) => commands::load_data::run(&args, &app).await,
            Command::RunOperational(args) => commands::operational::run(&args, &app).await,
            Command::FetchOpResults(args) => commands::fetch_op_results::run(&args, &app),
            Command::RunSubSeasonal(args) => commands::sub_seasonal::run(&args, &app).await,
            Command::RunUpdateCfsv2Data(args) => commands::update_cfsv2::run(&args, &app).await,
            Command::ConvOutputToZarr(args) => commands::conv_zarr::run(&args, &app).await,
            Command::RunSeasonal(args) => commands::seasonal::run(&args, &app).await,
        }
    }
}
