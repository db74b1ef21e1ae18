//! Orchestrator behavior: halt-on-failure, best-effort continuation,
//! output verification, and outcome aggregation.

use std::time::Duration;

use onhm_cli::orchestrator::{
    self, NullReporter, RunOutcome, RunStatus, StepReport, StepStatus,
};
use onhm_cli::plan::FailureMode;

use crate::mocks::{ScriptedCompose, plan, step};

#[tokio::test]
async fn halting_failure_skips_the_remaining_steps() {
    let compose = ScriptedCompose::failing(&["gridmetetl"]);
    let plan = plan(
        "run-operational",
        vec![
            step("gridmetetl", "gridmetetl", FailureMode::Halt),
            step("ncf2cbh", "ncf2cbh", FailureMode::Halt),
            step("prms", "prms", FailureMode::Halt),
        ],
    );
    let outcome = orchestrator::execute(&compose, &plan, &NullReporter).await;

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.exit_code(), 2);
    // Only the failing step launched; the rest were never invoked.
    assert_eq!(compose.recorded(), ["run gridmetetl"]);
    let statuses: Vec<StepStatus> = outcome.steps.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        [StepStatus::Failed, StepStatus::Skipped, StepStatus::Skipped]
    );
}

#[tokio::test]
async fn best_effort_failure_degrades_to_partial() {
    let compose = ScriptedCompose::failing(&["ncf2cbh"]);
    let plan = plan(
        "fetch",
        vec![
            step("median", "ncf2cbh", FailureMode::BestEffort),
            step("ensemble", "prms", FailureMode::BestEffort),
        ],
    );
    let outcome = orchestrator::execute(&compose, &plan, &NullReporter).await;

    assert_eq!(outcome.status, RunStatus::PartiallyFailed);
    assert_eq!(outcome.exit_code(), 3);
    // Both steps ran; both results are present in the aggregate.
    assert_eq!(compose.recorded(), ["run ncf2cbh", "run prms"]);
    assert_eq!(outcome.steps.len(), 2);
    assert_eq!(outcome.steps[0].status, StepStatus::Failed);
    assert_eq!(outcome.steps[1].status, StepStatus::Succeeded);
}

#[tokio::test]
async fn all_steps_succeeding_is_a_success() {
    let compose = ScriptedCompose::succeeding();
    let plan = plan(
        "run-operational",
        vec![
            step("gridmetetl", "gridmetetl", FailureMode::Halt),
            step("prms", "prms", FailureMode::Halt),
        ],
    );
    let outcome = orchestrator::execute(&compose, &plan, &NullReporter).await;
    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn failing_step_report_carries_captured_stderr() {
    let compose = ScriptedCompose::failing(&["cfsv2etl"]);
    let plan = plan(
        "update-cfsv2",
        vec![step("cfsv2etl (ensemble)", "cfsv2etl", FailureMode::Halt)],
    );
    let outcome = orchestrator::execute(&compose, &plan, &NullReporter).await;
    assert_eq!(outcome.steps[0].exit_code, Some(1));
    assert!(outcome.steps[0].stderr.contains("simulated failure"));
}

#[tokio::test]
async fn missing_expected_output_fails_the_step() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let compose = ScriptedCompose::succeeding();
    let mut s = step("gridmetetl", "gridmetetl", FailureMode::Halt);
    s.expected_output = Some(dir.path().join("never-written"));
    let outcome = orchestrator::execute(&compose, &plan("run-operational", vec![s]), &NullReporter).await;

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.steps[0].status, StepStatus::Failed);
    assert!(
        outcome.steps[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("expected output"))
    );
}

#[tokio::test]
async fn present_expected_output_passes() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("done.nc"), b"x").expect("write");
    let compose = ScriptedCompose::succeeding();
    let mut s = step("out2ncf", "out2ncf", FailureMode::Halt);
    s.expected_output = Some(dir.path().join("done.nc"));
    let outcome = orchestrator::execute(&compose, &plan("run-operational", vec![s]), &NullReporter).await;
    assert_eq!(outcome.status, RunStatus::Succeeded);
}

#[test]
fn merge_mixes_branch_statuses_into_partial() {
    let ok = RunOutcome::from_best_effort_steps(
        "median",
        vec![StepReport::host("a", Ok(String::new()), Duration::ZERO)],
    );
    let bad = RunOutcome::from_best_effort_steps(
        "ensemble",
        vec![StepReport::host("b", Err("boom".to_string()), Duration::ZERO)],
    );
    let merged = RunOutcome::merge("run-sub-seasonal", vec![ok, bad]);
    assert_eq!(merged.status, RunStatus::PartiallyFailed);
    assert_eq!(merged.steps.len(), 2);
}

#[test]
fn merge_of_all_failed_branches_is_failed() {
    let bad1 = RunOutcome::from_best_effort_steps(
        "median",
        vec![StepReport::host("a", Err("x".to_string()), Duration::ZERO)],
    );
    let bad2 = RunOutcome::from_best_effort_steps(
        "ensemble",
        vec![StepReport::host("b", Err("y".to_string()), Duration::ZERO)],
    );
    let merged = RunOutcome::merge("run-sub-seasonal", vec![bad1, bad2]);
    assert_eq!(merged.status, RunStatus::Failed);
}

#[test]
fn best_effort_outcome_serializes_for_json_mode() {
    let outcome = RunOutcome::from_best_effort_steps(
        "fetch-op-results",
        vec![
            StepReport::host("fetch daily output", Ok("3 files".to_string()), Duration::ZERO),
            StepReport::host("fetch median forecast", Err("missing".to_string()), Duration::ZERO),
        ],
    );
    let json = serde_json::to_string(&outcome).expect("serializable");
    assert!(json.contains(r#""status":"partially_failed""#));
    assert!(json.contains(r#""service":"host""#));
}
