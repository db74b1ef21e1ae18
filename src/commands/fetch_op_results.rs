//! `onhm fetch-op-results` — archive the daily output and the latest
//! forecast outputs.
//!
//! Best-effort across methods: one method's missing output must not block
//! archiving the others, so every relocation is attempted and the final
//! status degrades to partial failure instead of halting.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::artifacts::ArtifactManager;
use crate::commands::{ProfileArgs, finish};
use crate::dates::today_mst;
use crate::orchestrator::{RunOutcome, StepReport};
use crate::profile::EnvironmentProfile;

/// Arguments for the fetch-op-results command.
#[derive(Args)]
pub struct FetchOpResultsArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,
}

/// Run `onhm fetch-op-results`.
///
/// # Errors
///
/// Returns an error for configuration problems; per-method relocation
/// failures surface through the outcome.
pub fn run(args: &FetchOpResultsArgs, app: &AppContext) -> Result<i32> {
    let profile = args.profile.load()?;
    let manager = ArtifactManager::new(profile.archive_dir());
    let date = today_mst();

    let mut steps = Vec::new();
    for (label, source, tag) in fetch_targets(&profile) {
        let started = Instant::now();
        let result = manager
            .relocate(&source, date, tag)
            .map(|mv| {
                format!(
                    "{} files to {}",
                    mv.relocated + mv.skipped_identical,
                    mv.destination.display()
                )
            })
            .map_err(|e| e.to_string());
        steps.push(StepReport::host(label, result, started.elapsed()));
    }

    let outcome = RunOutcome::from_best_effort_steps("fetch-op-results", steps);
    finish(app, &outcome)
}

/// The relocation targets: daily output untagged, plus each forecast
/// method's newest date-stamped output directory.
fn fetch_targets(profile: &EnvironmentProfile) -> Vec<(&'static str, PathBuf, Option<&'static str>)> {
    let root = profile.required("PROJECT_ROOT").to_string();
    let median_root = profile.host_path(&format!("{root}/forecast/output/ensemble_median"));
    let ensemble_root = profile.host_path(&format!("{root}/forecast/output/ensembles"));
    vec![
        (
            "fetch daily output",
            profile.host_path(&format!("{}/output", profile.required("OP_DIR"))),
            None,
        ),
        (
            "fetch median forecast",
            latest_dated_subdir(&median_root).unwrap_or_else(|| median_root.join("<none>")),
            Some("median"),
        ),
        (
            "fetch ensemble forecast",
            latest_dated_subdir(&ensemble_root).unwrap_or_else(|| ensemble_root.join("<none>")),
            Some("ensemble"),
        ),
    ]
}

/// Newest `YYYY-MM-DD`-named subdirectory, by lexicographic (= date) order.
fn latest_dated_subdir(root: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    let mut dates: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| crate::dates::parse_date_stem(name).is_ok())
        .collect();
    dates.sort();
    dates.pop().map(|d| root.join(d))
}
