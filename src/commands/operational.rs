//! `onhm run-operational` — the daily pipeline: climate ETL, conversion,
//! simulation, output conversion, restart update, then archival.

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::app::AppContext;
use crate::artifacts::ArtifactManager;
use crate::availability::{self, ThreddsCatalog};
use crate::commands::{ProfileArgs, finish};
use crate::dates::{self, OperationalWindow};
use crate::discovery::{RestartChain, latest_restart_date};
use crate::lock::RunLock;
use crate::orchestrator::{self, RunStatus};
use crate::output::TerminalReporter;
use crate::plan;

/// Arguments for the run-operational command.
#[derive(Args)]
pub struct OperationalArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Run a short test window instead of gating on GridMET availability
    #[arg(long)]
    pub test: bool,

    /// Days to simulate in test mode
    #[arg(long, default_value_t = 4, requires = "test")]
    pub num_days: i64,

    /// Accept a consistent GridMET date even when it is not yesterday
    #[arg(long)]
    pub override_availability: bool,
}

/// Run `onhm run-operational`.
///
/// # Errors
///
/// Returns an error for validation problems — profile, lock, restart
/// discovery, or the GridMET gate. Step failures surface through the
/// outcome and exit code.
pub async fn run(args: &OperationalArgs, app: &AppContext) -> Result<i32> {
    let profile = args.profile.load()?;
    let _lock = RunLock::acquire(&profile.host_bind_dir())?;
    let compose = app.compose().await?;

    let restart = latest_restart_date(&compose, &profile, RestartChain::Operational).await?;
    app.output
        .kv("Restart date", &dates::date_stamp(restart));

    let window = if args.test {
        app.output
            .info(&format!("test mode: simulating {} days", args.num_days));
        // Test runs skip the availability gate; the forecast horizon comes
        // from the profile override or defaults past yesterday.
        let forecast_end = match profile.get("FRCST_END_DATE") {
            Some(v) if !v.trim().is_empty() => dates::parse_date_stem(v)
                .with_context(|| format!("FRCST_END_DATE '{v}' is not a YYYY-MM-DD date"))?,
            _ => dates::forecast_horizon(dates::yesterday_mst()),
        };
        OperationalWindow::for_testing(restart, args.num_days, forecast_end)
    } else {
        let yesterday = dates::yesterday_mst();
        let status = availability::freshness(&ThreddsCatalog::new(), yesterday)?;
        if !status.fresh && !args.override_availability {
            bail!(
                "GridMET not yet updated (coverage ends {}, expected {}); try again later \
                 or pass --override-availability",
                dates::date_stamp(status.end_date),
                dates::date_stamp(yesterday)
            );
        }
        if !status.fresh {
            app.output.warn(&format!(
                "override active: using GridMET coverage through {}",
                dates::date_stamp(status.end_date)
            ));
        }
        OperationalWindow::to_end(restart, status.end_date)
    };

    let plan = plan::operational(&profile, &window)?;
    let reporter = TerminalReporter::new(&app.output);
    let outcome = orchestrator::execute(&compose, &plan, &reporter).await;

    let mut code = finish(app, &outcome)?;

    // Archive the daily output once the whole plan has succeeded. An
    // archival failure must not pass silently as a successful run.
    if outcome.status == RunStatus::Succeeded {
        let source = profile.host_path(&format!("{}/output", profile.required("OP_DIR")));
        match ArtifactManager::new(profile.archive_dir()).relocate(
            &source,
            dates::today_mst(),
            None,
        ) {
            Ok(mv) => app.output.success(&format!(
                "archived {} files to {}",
                mv.relocated + mv.skipped_identical,
                mv.destination.display()
            )),
            Err(e) => {
                app.output.error(&format!("archival failed: {e}"));
                code = 2;
            }
        }
    }

    Ok(code)
}
