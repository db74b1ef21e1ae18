//! Command implementations

pub mod build_images;
pub mod conv_zarr;
pub mod fetch_op_results;
pub mod load_data;
pub mod operational;
pub mod seasonal;
pub mod sub_seasonal;
pub mod update_cfsv2;
pub mod version;

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::orchestrator::RunOutcome;
use crate::output::{json, render_outcome};
use crate::profile::EnvironmentProfile;

/// `--env-file` argument shared by every profile-driven command.
#[derive(Args)]
pub struct ProfileArgs {
    /// Environment file selecting the run's data scope (e.g. conus.env, uc.env)
    #[arg(long, value_name = "PATH")]
    pub env_file: PathBuf,
}

impl ProfileArgs {
    /// Load and validate the selected profile.
    ///
    /// # Errors
    ///
    /// Returns the profile's configuration error unchanged; the CLI maps
    /// it to exit code 1.
    pub fn load(&self) -> Result<EnvironmentProfile> {
        Ok(EnvironmentProfile::load(&self.env_file)?)
    }
}

/// Render an outcome in the active mode and map it to the process exit
/// code (0 success, 2 failed, 3 partially failed).
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn finish(app: &AppContext, outcome: &RunOutcome) -> Result<i32> {
    if app.is_json() {
        println!("{}", json::render_outcome(outcome)?);
    } else {
        render_outcome(&app.output, outcome);
    }
    Ok(outcome.exit_code())
}
