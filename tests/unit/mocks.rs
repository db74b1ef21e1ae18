//! Shared mock infrastructure for unit tests.
//!
//! Provides a scripted [`Compose`] implementation and plan-construction
//! helpers so each test module doesn't re-define the same boilerplate.

use std::sync::Mutex;
use std::time::Duration;

use onhm_cli::command_runner::{Invocation, RunnerError};
use onhm_cli::compose::{Compose, ComposeRun};
use onhm_cli::plan::{FailureMode, OperationPlan, PlanStep, StepKind};

/// Compose double that records every call and fails the services it is
/// told to fail. Never spawns a process.
pub struct ScriptedCompose {
    /// Labels of recorded calls, e.g. `"run prms"` / `"build base"`.
    pub calls: Mutex<Vec<String>>,
    fail_services: Vec<&'static str>,
}

impl ScriptedCompose {
    pub fn succeeding() -> Self {
        Self::failing(&[])
    }

    pub fn failing(services: &[&'static str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_services: services.to_vec(),
        }
    }

    pub fn recorded(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    fn invocation(&self, service: &str) -> Invocation {
        let ok = !self.fail_services.contains(&service);
        Invocation {
            exit_code: Some(i32::from(!ok)),
            stdout: String::new(),
            stderr: if ok {
                String::new()
            } else {
                format!("{service}: simulated failure\n")
            },
            duration: Duration::from_millis(10),
        }
    }
}

impl Compose for ScriptedCompose {
    async fn build(
        &self,
        service: &str,
        _no_cache: bool,
        _timeout: Duration,
    ) -> Result<Invocation, RunnerError> {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("build {service}"));
        Ok(self.invocation(service))
    }

    async fn run_service(&self, run: &ComposeRun<'_>) -> Result<Invocation, RunnerError> {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("run {}", run.service));
        Ok(self.invocation(run.service))
    }
}

/// A bare run step against a named service.
pub fn step(label: &str, service: &'static str, failure_mode: FailureMode) -> PlanStep {
    PlanStep {
        label: label.to_string(),
        service,
        kind: StepKind::Run {
            working_dir: None,
            command: Vec::new(),
        },
        env: Vec::new(),
        timeout: Duration::from_secs(5),
        failure_mode,
        expected_output: None,
    }
}

pub fn plan(operation: &'static str, steps: Vec<PlanStep>) -> OperationPlan {
    OperationPlan { operation, steps }
}
