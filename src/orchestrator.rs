//! Plan execution and outcome aggregation.
//!
//! One run moves through Validating (profile + plan construction, done by
//! the command layer before anything launches), Running (this module:
//! strictly sequential step execution), and Aggregating (the collected
//! [`RunOutcome`]). Steps marked halt-on-failure stop the plan and leave
//! the remaining steps `Skipped`; best-effort failures degrade the final
//! status to `PartiallyFailed`. An interrupt kills the in-flight child
//! process rather than abandoning it.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::command_runner::RunnerError;
use crate::compose::{Compose, ComposeRun};
use crate::error::StepError;
use crate::plan::{FailureMode, OperationPlan, PlanStep, StepKind};

/// Progress sink for step lifecycle events. Implemented by the terminal
/// reporter; tests inject a no-op.
pub trait ProgressReporter {
    fn step_started(&self, label: &str);
    fn step_succeeded(&self, label: &str, duration: Duration);
    fn step_failed(&self, label: &str, detail: &str);
    fn step_skipped(&self, label: &str);
}

/// Reporter that swallows all events (tests, `--quiet` paths).
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn step_started(&self, _: &str) {}
    fn step_succeeded(&self, _: &str, _: Duration) {}
    fn step_failed(&self, _: &str, _: &str) {}
    fn step_skipped(&self, _: &str) {}
}

/// Terminal state of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// Never launched because an earlier halt-on-failure step failed.
    Skipped,
}

/// Terminal state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
    /// At least one best-effort step failed; everything else succeeded.
    PartiallyFailed,
}

/// Everything observed about one step: the invocation result plus the
/// plan-level disposition.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub label: String,
    pub service: String,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    #[serde(serialize_with = "secs")]
    pub duration: Duration,
    /// Launch/timeout/missing-output detail when the step never produced a
    /// usable exit status.
    pub error: Option<String>,
}

impl StepReport {
    /// Report for a host-side (non-container) step such as an artifact
    /// relocation. `detail` lands in stdout on success, in `error` on
    /// failure.
    #[must_use]
    pub fn host(label: &str, result: Result<String, String>, duration: Duration) -> Self {
        let (status, stdout, error) = match result {
            Ok(detail) => (StepStatus::Succeeded, detail, None),
            Err(detail) => (StepStatus::Failed, String::new(), Some(detail)),
        };
        Self {
            label: label.to_string(),
            service: "host".to_string(),
            status,
            exit_code: None,
            stdout,
            stderr: String::new(),
            duration,
            error,
        }
    }

    fn skipped(step: &PlanStep) -> Self {
        Self {
            label: step.label.clone(),
            service: step.service.to_string(),
            status: StepStatus::Skipped,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
            error: None,
        }
    }
}

/// Aggregated result of executing one [`OperationPlan`].
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    pub operation: String,
    pub status: RunStatus,
    pub steps: Vec<StepReport>,
    #[serde(serialize_with = "secs")]
    pub total_duration: Duration,
}

impl RunOutcome {
    /// Combine branch outcomes (e.g. the median and ensemble forecast
    /// branches) into one aggregate: all succeeded → `Succeeded`, all
    /// failed → `Failed`, otherwise `PartiallyFailed`.
    #[must_use]
    pub fn merge(operation: &str, outcomes: Vec<RunOutcome>) -> Self {
        let total_duration = outcomes.iter().map(|o| o.total_duration).sum();
        let any_failed = outcomes
            .iter()
            .any(|o| !matches!(o.status, RunStatus::Succeeded));
        let all_failed = !outcomes.is_empty()
            && outcomes
                .iter()
                .all(|o| matches!(o.status, RunStatus::Failed));
        let status = if all_failed {
            RunStatus::Failed
        } else if any_failed {
            RunStatus::PartiallyFailed
        } else {
            RunStatus::Succeeded
        };
        Self {
            operation: operation.to_string(),
            status,
            steps: outcomes.into_iter().flat_map(|o| o.steps).collect(),
            total_duration,
        }
    }

    /// Build an outcome from pre-assembled best-effort step reports (used
    /// for host-side operations like artifact fetching): all failed →
    /// `Failed`, some failed → `PartiallyFailed`.
    #[must_use]
    pub fn from_best_effort_steps(operation: &str, steps: Vec<StepReport>) -> Self {
        let total_duration = steps.iter().map(|s| s.duration).sum();
        let any_failed = steps.iter().any(|s| s.status == StepStatus::Failed);
        let all_failed =
            !steps.is_empty() && steps.iter().all(|s| s.status == StepStatus::Failed);
        let status = if all_failed {
            RunStatus::Failed
        } else if any_failed {
            RunStatus::PartiallyFailed
        } else {
            RunStatus::Succeeded
        };
        Self {
            operation: operation.to_string(),
            status,
            steps,
            total_duration,
        }
    }

    /// Process exit code for this outcome: 0, 2 (failed), or 3 (partial).
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Succeeded => 0,
            RunStatus::Failed => 2,
            RunStatus::PartiallyFailed => 3,
        }
    }
}

/// Execute a plan step by step, strictly in order.
///
/// Never returns `Err`: every failure mode is captured in the outcome so
/// the CLI can render a full per-step table.
pub async fn execute<C: Compose, R: ProgressReporter>(
    compose: &C,
    plan: &OperationPlan,
    reporter: &R,
) -> RunOutcome {
    let started = Instant::now();
    let mut reports: Vec<StepReport> = Vec::with_capacity(plan.steps.len());
    let mut halted = false;
    let mut interrupted = false;

    for step in &plan.steps {
        if halted || interrupted {
            reporter.step_skipped(&step.label);
            reports.push(StepReport::skipped(step));
            continue;
        }

        reporter.step_started(&step.label);
        // Dropping the in-flight future on interrupt kills the child via
        // kill_on_drop, so no container is left holding the bind mount.
        let result = tokio::select! {
            result = run_step(compose, step) => result,
            _ = tokio::signal::ctrl_c() => {
                interrupted = true;
                Err("interrupted; child process terminated".to_string())
            }
        };

        let report = match result {
            Ok(report) => report,
            Err(detail) => StepReport {
                label: step.label.clone(),
                service: step.service.to_string(),
                status: StepStatus::Failed,
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
                duration: Duration::ZERO,
                error: Some(detail),
            },
        };

        match report.status {
            StepStatus::Succeeded => reporter.step_succeeded(&step.label, report.duration),
            _ => {
                let detail = report.error.clone().unwrap_or_else(|| {
                    StepError::Exit {
                        step: step.label.clone(),
                        code: report.exit_code.unwrap_or(-1),
                    }
                    .to_string()
                });
                reporter.step_failed(&step.label, &detail);
                if interrupted || step.failure_mode == FailureMode::Halt {
                    halted = true;
                }
            }
        }
        reports.push(report);
    }

    let status = aggregate(&reports, halted);
    RunOutcome {
        operation: plan.operation.to_string(),
        status,
        steps: reports,
        total_duration: started.elapsed(),
    }
}

async fn run_step<C: Compose>(compose: &C, step: &PlanStep) -> Result<StepReport, String> {
    let classify = |e: RunnerError| {
        match e {
            RunnerError::Timeout { timeout, .. } => StepError::Timeout {
                step: step.label.clone(),
                seconds: timeout.as_secs(),
            },
            other => StepError::Launch {
                program: step.service.to_string(),
                message: other.to_string(),
            },
        }
        .to_string()
    };
    let invocation = match &step.kind {
        StepKind::Build { no_cache } => compose
            .build(step.service, *no_cache, step.timeout)
            .await
            .map_err(classify)?,
        StepKind::Run {
            working_dir,
            command,
        } => compose
            .run_service(&ComposeRun {
                service: step.service,
                env: &step.env,
                working_dir: working_dir.as_deref(),
                command,
                timeout: step.timeout,
            })
            .await
            .map_err(classify)?,
    };

    let mut report = StepReport {
        label: step.label.clone(),
        service: step.service.to_string(),
        status: if invocation.success() {
            StepStatus::Succeeded
        } else {
            StepStatus::Failed
        },
        exit_code: invocation.exit_code,
        stdout: invocation.stdout,
        stderr: invocation.stderr,
        duration: invocation.duration,
        error: None,
    };

    // Missing expected output is an upstream failure surfaced immediately,
    // before the next step consumes a hole.
    if report.status == StepStatus::Succeeded
        && let Some(expected) = &step.expected_output
        && !expected.exists()
    {
        report.status = StepStatus::Failed;
        report.error = Some(
            StepError::MissingOutput {
                step: step.label.clone(),
                path: expected.clone(),
            }
            .to_string(),
        );
    }

    Ok(report)
}

fn aggregate(reports: &[StepReport], halted: bool) -> RunStatus {
    let any_failed = reports.iter().any(|r| r.status == StepStatus::Failed);
    if !any_failed {
        RunStatus::Succeeded
    } else if halted {
        RunStatus::Failed
    } else {
        RunStatus::PartiallyFailed
    }
}

fn secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
