//! Operation plans — ordered step sequences built fresh per CLI invocation.
//!
//! A plan expands the service graph's ordering for one operation into
//! concrete steps: which compose verb to run, the environment overlay, the
//! wall-clock budget, whether a failure halts the remaining steps, and
//! which output path must exist afterwards. Plans are data; execution
//! lives in [`crate::orchestrator`].

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::dates::{ForecastWindow, OperationalWindow, date_stamp};
use crate::graph;
use crate::profile::EnvironmentProfile;
use crate::service_env::{self, ForecastMethod, OutputMode};

/// Image builds: pulling base layers dominates.
pub const BUILD_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Climate ETL steps download from remote archives.
pub const ETL_TIMEOUT: Duration = Duration::from_secs(2 * 3600);
/// The PRMS simulation may legitimately run for hours on CONUS.
pub const MODEL_TIMEOUT: Duration = Duration::from_secs(12 * 3600);
/// Format conversions are bounded by local I/O.
pub const CONVERT_TIMEOUT: Duration = Duration::from_secs(2 * 3600);
/// Short in-container probes (existence checks, restart discovery).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// What a step asks the compose subsystem to do.
#[derive(Debug, Clone)]
pub enum StepKind {
    /// `compose build [--no-cache] <service>`.
    Build { no_cache: bool },
    /// `compose run --rm ... <service> [command...]`.
    Run {
        /// In-container working directory override.
        working_dir: Option<String>,
        /// Command override; empty runs the service default.
        command: Vec<String>,
    },
}

/// Whether a step's failure halts the remaining plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Stop immediately; remaining steps are skipped.
    Halt,
    /// Record the failure, keep going; the run degrades to partial failure.
    BestEffort,
}

/// One unit of work within an [`OperationPlan`].
#[derive(Debug, Clone)]
pub struct PlanStep {
    /// Human-readable step label, e.g. `"prms (restart update)"`.
    pub label: String,
    /// Compose service the step targets.
    pub service: &'static str,
    pub kind: StepKind,
    /// Environment overlay for this invocation.
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
    pub failure_mode: FailureMode,
    /// Host path that must exist after the step succeeds. Checked before
    /// the next step runs so a missing upstream output surfaces early.
    pub expected_output: Option<PathBuf>,
}

impl PlanStep {
    fn run(
        label: impl Into<String>,
        service: &'static str,
        env: Vec<(String, String)>,
        timeout: Duration,
    ) -> Self {
        Self {
            label: label.into(),
            service,
            kind: StepKind::Run {
                working_dir: None,
                command: Vec::new(),
            },
            env,
            timeout,
            failure_mode: FailureMode::Halt,
            expected_output: None,
        }
    }

    fn expecting(mut self, path: PathBuf) -> Self {
        self.expected_output = Some(path);
        self
    }
}

/// Ordered steps for one CLI operation. Constructed fresh per invocation;
/// never persisted.
#[derive(Debug)]
pub struct OperationPlan {
    /// Registered operation name.
    pub operation: &'static str,
    pub steps: Vec<PlanStep>,
}

/// Plan for `build-images`: every image in dependency order.
///
/// # Errors
///
/// Fails only on a service-graph integrity violation.
pub fn build_images(no_cache: bool) -> Result<OperationPlan> {
    let steps = graph::order_for("build-images")?
        .into_iter()
        .map(|svc| PlanStep {
            label: format!("build {}", svc.name),
            service: svc.name,
            kind: StepKind::Build { no_cache },
            env: Vec::new(),
            timeout: BUILD_TIMEOUT,
            failure_mode: FailureMode::Halt,
            expected_output: None,
        })
        .collect();
    Ok(OperationPlan {
        operation: "build-images",
        steps,
    })
}

/// Plan for `load-data`: fetch the CONUS model data and the UC test data
/// into the bind volume, skipping packages that are already present. Each
/// download is a single idempotent shell chain inside the base service.
///
/// # Errors
///
/// Fails only on a service-graph integrity violation.
pub fn load_data(profile: &EnvironmentProfile) -> Result<OperationPlan> {
    graph::order_for("load-data")?;
    let overlay = profile.to_overlay();
    let packages = [
        (
            "load model data (CONUS)",
            "/nhm/NHM_PRMS_CONUS_GF_1_1",
            profile.required("PRMS_SOURCE"),
            profile.required("PRMS_DATA_PKG"),
        ),
        (
            "load test data (UC)",
            "/nhm/NHM_PRMS_UC_GF_1_1",
            profile.required("PRMS_TEST_SOURCE"),
            profile.required("PRMS_TEST_DATA_PKG"),
        ),
    ];
    let steps = packages
        .into_iter()
        .map(|(label, check_path, source, pkg)| {
            let script = format!(
                "test -e {check} || (wget --waitretry=3 --retry-connrefused --timeout=30 \
                 --tries=10 {source} && unzip {pkg} && chown -R nhm:nhm {check} && \
                 chmod -R 766 {check})",
                check = check_path,
                source = shell_quote(source),
                pkg = shell_quote(pkg),
            );
            let mut step = PlanStep::run(label, "base", overlay.clone(), ETL_TIMEOUT);
            step.kind = StepKind::Run {
                working_dir: Some("/nhm".to_string()),
                command: vec!["sh".to_string(), "-c".to_string(), script],
            };
            step.expected_output = Some(profile.host_path(check_path));
            step
        })
        .collect();
    Ok(OperationPlan {
        operation: "load-data",
        steps,
    })
}

/// Plan for `run-operational`: the daily pipeline. The PRMS restart update
/// runs after the output conversion — both write `daily/output`, and the
/// conversion must read the simulation's files, not the update's.
///
/// # Errors
///
/// Fails on a service-graph integrity violation.
pub fn operational(
    profile: &EnvironmentProfile,
    window: &OperationalWindow,
) -> Result<OperationPlan> {
    let root = profile.required("PROJECT_ROOT").to_string();
    let mut steps = Vec::new();
    for svc in graph::order_for("run-operational")? {
        match svc.name {
            // base participates during validation (restart discovery),
            // not as a pipeline step.
            "base" => {}
            "gridmetetl" => steps.push(
                PlanStep::run(
                    "gridmetetl",
                    svc.name,
                    service_env::operational_overlay(profile, window),
                    ETL_TIMEOUT,
                )
                .expecting(profile.host_path(profile.required("OP_NCF_IDIR"))),
            ),
            "ncf2cbh" => steps.push(
                PlanStep::run(
                    "ncf2cbh",
                    svc.name,
                    service_env::ncf2cbh_op_env(profile, window),
                    CONVERT_TIMEOUT,
                )
                .expecting(profile.host_path(&format!("{root}/daily/input"))),
            ),
            "prms" => steps.push(
                PlanStep::run(
                    "prms (simulation)",
                    svc.name,
                    service_env::prms_run_env(profile, window),
                    MODEL_TIMEOUT,
                )
                .expecting(profile.host_path(&format!(
                    "{root}/forecast/restart/{}.restart",
                    date_stamp(window.end)
                ))),
            ),
            "out2ncf" => steps.push(
                PlanStep::run(
                    "out2ncf",
                    svc.name,
                    service_env::out2ncf_op_env(profile),
                    CONVERT_TIMEOUT,
                )
                .expecting(profile.host_path(&format!("{root}/daily/output"))),
            ),
            other => anyhow::bail!("run-operational has no step mapping for service '{other}'"),
        }
    }
    steps.push(
        PlanStep::run(
            "prms (restart update)",
            "prms",
            service_env::prms_restart_env(profile, window),
            MODEL_TIMEOUT,
        )
        .expecting(profile.host_path(&format!(
            "{root}/daily/restart/{}.restart",
            date_stamp(window.save_restart)
        ))),
    );
    Ok(OperationPlan {
        operation: "run-operational",
        steps,
    })
}

/// Plan for one forecast branch (`run-sub-seasonal`, `run-seasonal`):
/// convert, simulate, and post-process for a method, fanning out over
/// ensemble members when applicable.
///
/// # Errors
///
/// Fails on a service-graph integrity violation.
pub fn forecast_branch(
    profile: &EnvironmentProfile,
    window: &ForecastWindow,
    method: ForecastMethod,
    members: u32,
) -> Result<OperationPlan> {
    graph::order_for("run-sub-seasonal")?;
    let root = profile.required("PROJECT_ROOT").to_string();
    let start = date_stamp(window.start);
    let member_list: Vec<Option<u32>> = match method {
        ForecastMethod::Median => vec![None],
        ForecastMethod::Ensemble => (0..members).map(Some).collect(),
    };
    let mut steps = Vec::new();
    for member in member_list {
        let suffix = member.map_or_else(|| method.tag().to_string(), |n| format!("ensemble_{n}"));
        let output_dir = match member {
            None => format!("{root}/forecast/output/ensemble_median/{start}"),
            Some(n) => format!("{root}/forecast/output/ensembles/{start}/ensemble_{n}"),
        };
        steps.push(PlanStep::run(
            format!("ncf2cbh ({suffix})"),
            "ncf2cbh",
            service_env::ncf2cbh_forecast_env(profile, window, method, member),
            CONVERT_TIMEOUT,
        ));
        steps.push(
            PlanStep::run(
                format!("prms ({suffix})"),
                "prms",
                service_env::prms_forecast_env(profile, window, method, member),
                MODEL_TIMEOUT,
            )
            .expecting(profile.host_path(&output_dir)),
        );
        steps.push(
            PlanStep::run(
                format!("out2ncf ({suffix})"),
                "out2ncf",
                service_env::out2ncf_forecast_env(profile, window, method, member),
                CONVERT_TIMEOUT,
            )
            .expecting(profile.host_path(&output_dir)),
        );
    }
    Ok(OperationPlan {
        operation: "run-sub-seasonal",
        steps,
    })
}

/// Plan for `run-update-cfsv2-data`: refresh the CFSv2 climate fields for
/// one forecast method.
///
/// # Errors
///
/// Fails on a service-graph integrity violation.
pub fn update_cfsv2(profile: &EnvironmentProfile, method: ForecastMethod) -> Result<OperationPlan> {
    let mut steps = Vec::new();
    for svc in graph::order_for("update-cfsv2")? {
        if svc.name == "cfsv2etl" {
            steps.push(
                PlanStep::run(
                    format!("cfsv2etl ({})", method.tag()),
                    svc.name,
                    service_env::cfsv2_env(profile, method),
                    ETL_TIMEOUT,
                )
                .expecting(profile.host_path(profile.required("CFSV2_NCF_IDIR"))),
            );
        }
    }
    Ok(OperationPlan {
        operation: "update-cfsv2",
        steps,
    })
}

/// Plan for `conv-output-to-zarr`: one converter run against a mode's
/// output directory.
///
/// # Errors
///
/// Fails on a service-graph integrity violation.
pub fn conv_output_to_zarr(
    profile: &EnvironmentProfile,
    output_path: &str,
    mode: OutputMode,
) -> Result<OperationPlan> {
    graph::order_for("conv-output-to-zarr")?;
    let step = PlanStep::run(
        format!("ncf2zarr ({})", mode.tag()),
        "ncf2zarr",
        service_env::ncf2zarr_env(output_path, mode),
        CONVERT_TIMEOUT,
    )
    .expecting(profile.host_path(output_path));
    Ok(OperationPlan {
        operation: "conv-output-to-zarr",
        steps: vec![step],
    })
}

/// Plan for the CFSv2 refresh that precedes a seasonal run.
///
/// # Errors
///
/// Fails on a service-graph integrity violation.
pub fn seasonal(
    profile: &EnvironmentProfile,
    window: &ForecastWindow,
) -> Result<OperationPlan> {
    graph::order_for("run-seasonal")?;
    let mut plan = forecast_branch(profile, window, ForecastMethod::Median, 1)?;
    let mut steps = update_cfsv2(profile, ForecastMethod::Median)?.steps;
    steps.append(&mut plan.steps);
    Ok(OperationPlan {
        operation: "run-seasonal",
        steps,
    })
}

/// POSIX single-quote wrapping for values interpolated into an in-container
/// `sh -c` chain.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
