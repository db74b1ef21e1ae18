//! `onhm build-images` — build every pipeline image in dependency order.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::commands::finish;
use crate::orchestrator;
use crate::output::TerminalReporter;
use crate::plan;

/// Arguments for the build-images command.
#[derive(Args, Default)]
pub struct BuildImagesArgs {
    /// Build images without using the layer cache
    #[arg(long)]
    pub no_cache: bool,
}

/// Run `onhm build-images`.
///
/// # Errors
///
/// Returns an error when the compose tool is unavailable; build failures
/// are reported through the outcome and exit code instead.
pub async fn run(args: &BuildImagesArgs, app: &AppContext) -> Result<i32> {
    let compose = app.compose().await?;
    let plan = plan::build_images(args.no_cache)?;
    let reporter = TerminalReporter::new(&app.output);
    let outcome = orchestrator::execute(&compose, &plan, &reporter).await;
    finish(app, &outcome)
}
