//! Compose CLI abstraction — enables test doubles for all compose commands.
//!
//! The orchestrator talks to the container subsystem only through this
//! trait: service name, environment overlay, working directory in, exit
//! code and raw captured text out. No compose-specific output parsing.

use std::time::Duration;

use anyhow::{Result, bail};

use crate::command_runner::{CommandRequest, CommandRunner, Invocation, RunnerError};

/// Compose file all services are defined in.
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Probe timeout for `docker compose version` during detection.
const DETECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Parameters for one `compose run --rm` invocation. Struct-based to avoid
/// breaking test doubles on future parameter additions.
pub struct ComposeRun<'a> {
    /// Compose service to run.
    pub service: &'a str,
    /// Environment overlay: passed both as `-e KEY=VALUE` flags to the
    /// container and to the compose process itself (compose interpolates
    /// the service definition from its own environment).
    pub env: &'a [(String, String)],
    /// In-container working directory (`-w`), when overridden.
    pub working_dir: Option<&'a str>,
    /// Command override appended after the service name. Empty slice runs
    /// the service's default command.
    pub command: &'a [String],
    /// Wall-clock budget for this invocation.
    pub timeout: Duration,
}

/// Abstraction over the compose CLI, enabling test doubles.
///
/// The production implementation delegates to `docker compose` (or
/// `docker-compose`) via a [`CommandRunner`].
#[allow(async_fn_in_trait)]
pub trait Compose {
    /// Run `compose build [--no-cache] <service>`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the compose tool cannot be launched or
    /// times out; a failed build is reported through the exit code.
    async fn build(
        &self,
        service: &str,
        no_cache: bool,
        timeout: Duration,
    ) -> Result<Invocation, RunnerError>;

    /// Run `compose run --rm [-e K=V ...] [-w DIR] <service> [command...]`.
    ///
    /// # Errors
    ///
    /// Same contract as [`Compose::build`]: non-zero container exit is data.
    async fn run_service(&self, run: &ComposeRun<'_>) -> Result<Invocation, RunnerError>;
}

/// Production compose implementation — shells out via a [`CommandRunner`].
pub struct DockerCompose<R: CommandRunner> {
    runner: R,
    /// Detected base invocation, e.g. `["docker", "compose"]` or
    /// `["docker-compose"]`.
    base: Vec<String>,
    compose_file: String,
}

impl<R: CommandRunner> DockerCompose<R> {
    /// Detect the available compose tool: `docker compose` preferred,
    /// `docker-compose` as fallback.
    ///
    /// # Errors
    ///
    /// Returns an error when neither probe succeeds.
    pub async fn detect(runner: R) -> Result<Self> {
        for base in [vec!["docker", "compose"], vec!["docker-compose"]] {
            let mut args: Vec<String> = base[1..].iter().map(ToString::to_string).collect();
            args.push("version".to_string());
            let probe = runner
                .run(&CommandRequest {
                    program: base[0],
                    args: &args,
                    env: &[],
                    working_dir: None,
                    timeout: DETECT_TIMEOUT,
                })
                .await;
            if matches!(probe, Ok(ref inv) if inv.success()) {
                return Ok(Self {
                    runner,
                    base: base.iter().map(ToString::to_string).collect(),
                    compose_file: COMPOSE_FILE.to_string(),
                });
            }
        }
        bail!("Neither 'docker compose' nor 'docker-compose' is available on PATH")
    }

    /// Construct against a known base command (used in tests).
    #[must_use]
    pub fn with_base(runner: R, base: Vec<String>, compose_file: String) -> Self {
        Self {
            runner,
            base,
            compose_file,
        }
    }

    /// The program name of the detected tool, for diagnostics.
    #[must_use]
    pub fn program(&self) -> &str {
        self.base.first().map_or("docker", String::as_str)
    }

    fn base_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self.base[1..].to_vec();
        args.push("-f".to_string());
        args.push(self.compose_file.clone());
        args
    }

    async fn invoke(
        &self,
        args: Vec<String>,
        env: &[(String, String)],
        timeout: Duration,
    ) -> Result<Invocation, RunnerError> {
        self.runner
            .run(&CommandRequest {
                program: self.program(),
                args: &args,
                env,
                working_dir: None,
                timeout,
            })
            .await
    }
}

impl<R: CommandRunner> Compose for DockerCompose<R> {
    async fn build(
        &self,
        service: &str,
        no_cache: bool,
        timeout: Duration,
    ) -> Result<Invocation, RunnerError> {
        let mut args = self.base_args();
        args.push("build".to_string());
        if no_cache {
            args.push("--no-cache".to_string());
        }
        args.push(service.to_string());
        self.invoke(args, &[], timeout).await
    }

    async fn run_service(&self, run: &ComposeRun<'_>) -> Result<Invocation, RunnerError> {
        let mut args = self.base_args();
        args.push("run".to_string());
        args.push("--rm".to_string());
        for (key, value) in run.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        if let Some(dir) = run.working_dir {
            args.push("-w".to_string());
            args.push(dir.to_string());
        }
        args.push(run.service.to_string());
        args.extend(run.command.iter().cloned());
        self.invoke(args, run.env, run.timeout).await
    }
}
