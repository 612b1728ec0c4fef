//! Rebuild trigger
//!
//! Verifies a delivery, then runs the pull step followed by the build step.
//! The build step runs whatever the pull step's outcome was; failures are
//! classified in the returned report rather than surfaced to the sender.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use super::command::{output_lines, CommandSpec};
use super::signature::{Rejection, SignatureVerifier};
use crate::config::RebuildConfig;
use crate::error::{ConfigError, RebuildError};
use crate::logger;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Pull,
    Build,
}

impl Step {
    /// Log line emitted before the step starts
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Pull => "Pulling from git:",
            Self::Build => "Rebuilding site:",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pull => write!(f, "pull"),
            Self::Build => write!(f, "build"),
        }
    }
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepExit {
    Success,
    Failed { code: i32 },
    /// Terminated without an exit code (killed by a signal)
    Signaled,
    SpawnFailed { error: String },
}

impl StepExit {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: Step,
    pub exit: StepExit,
    /// Captured output, one entry per non-empty line
    pub lines: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RebuildReport {
    pub pull: StepReport,
    pub build: StepReport,
}

impl RebuildReport {
    /// First step that did not exit successfully
    pub fn failure(&self) -> Option<&StepReport> {
        [&self.pull, &self.build]
            .into_iter()
            .find(|report| !report.exit.is_success())
    }

    pub fn succeeded(&self) -> bool {
        self.failure().is_none()
    }

    /// Report for a pipeline task that ended without producing one
    fn interrupted(error: &str) -> Self {
        let step = |step| StepReport {
            step,
            exit: StepExit::SpawnFailed {
                error: error.to_string(),
            },
            lines: Vec::new(),
        };
        Self {
            pull: step(Step::Pull),
            build: step(Step::Build),
        }
    }
}

/// Result of handling one delivery. Every variant is acknowledged with an
/// empty 200 by the HTTP layer.
#[derive(Debug)]
pub enum TriggerOutcome {
    Rejected(Rejection),
    /// Another rebuild holds the guard
    Busy,
    /// Running on a background task
    Scheduled,
    Completed(RebuildReport),
}

#[derive(Debug)]
struct Pipeline {
    pull: CommandSpec,
    build: CommandSpec,
}

/// Verifies deliveries and drives the pull and build commands
#[derive(Debug)]
pub struct RebuildTrigger {
    verifier: SignatureVerifier,
    pipeline: Arc<Pipeline>,
    guard: Arc<Mutex<()>>,
    exclusive: bool,
    background: bool,
}

impl RebuildTrigger {
    pub fn new(secret: &str, cfg: &RebuildConfig) -> Result<Self, ConfigError> {
        let verifier = SignatureVerifier::new(secret)
            .map_err(|e| ConfigError::Invalid(format!("rebuild.secret: {e}")))?;
        let spec = |argv: &[String], name: &str| {
            CommandSpec::from_argv(argv, cfg.working_dir.clone())
                .map_err(|e| ConfigError::Invalid(format!("rebuild.{name}: {e}")))
        };

        Ok(Self {
            verifier,
            pipeline: Arc::new(Pipeline {
                pull: spec(&cfg.pull_command, "pull_command")?,
                build: spec(&cfg.build_command, "build_command")?,
            }),
            guard: Arc::new(Mutex::new(())),
            exclusive: cfg.exclusive,
            background: cfg.background,
        })
    }

    /// Handle one delivery: `body` is the raw request body, `signature` the
    /// raw `X-Hub-Signature` header value if present.
    ///
    /// The pipeline runs on its own task. Dropping the returned future only
    /// stops waiting for it; both steps still run and the guard stays held
    /// until they finish.
    pub async fn handle(&self, body: &[u8], signature: Option<&[u8]>) -> TriggerOutcome {
        if let Err(rejection) = self.verifier.verify(body, signature) {
            logger::log_warning(&format!("Webhook delivery ignored: {rejection}"));
            return TriggerOutcome::Rejected(rejection);
        }

        let permit = if self.exclusive {
            match Arc::clone(&self.guard).try_lock_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    logger::log_warning("Webhook delivery ignored: rebuild already in progress");
                    return TriggerOutcome::Busy;
                }
            }
        } else {
            None
        };

        // Runs to completion even if this future is dropped
        let task = tokio::spawn(run_pipeline(Arc::clone(&self.pipeline), permit));
        if self.background {
            return TriggerOutcome::Scheduled;
        }
        match task.await {
            Ok(report) => TriggerOutcome::Completed(report),
            Err(e) => {
                logger::log_error(&format!("Rebuild task did not finish: {e}"));
                TriggerOutcome::Completed(RebuildReport::interrupted(&e.to_string()))
            }
        }
    }
}

/// Run pull then build. `_permit` keeps the overlap guard held until both
/// steps have finished.
async fn run_pipeline(
    pipeline: Arc<Pipeline>,
    _permit: Option<OwnedMutexGuard<()>>,
) -> RebuildReport {
    let pull = run_step(Step::Pull, &pipeline.pull).await;
    let build = run_step(Step::Build, &pipeline.build).await;
    let report = RebuildReport { pull, build };

    match report.failure() {
        None => tracing::info!(target: "rebuild", "Rebuild finished"),
        Some(failed) => logger::log_warning(&format!(
            "rebuild failed: {} step ended with {:?}",
            failed.step, failed.exit
        )),
    }
    report
}

async fn run_step(step: Step, spec: &CommandSpec) -> StepReport {
    logger::log_info(step.marker());

    let owned = spec.clone();
    let result = tokio::task::spawn_blocking(move || owned.run_captured())
        .await
        .unwrap_or_else(|join_err| {
            Err(RebuildError::Capture {
                program: spec.program.clone(),
                source: std::io::Error::other(join_err.to_string()),
            })
        });

    let (exit, lines) = match result {
        Ok(out) => {
            let exit = match out.status.code() {
                Some(0) => StepExit::Success,
                Some(code) => StepExit::Failed { code },
                None => StepExit::Signaled,
            };
            (exit, output_lines(&out.text))
        }
        Err(e) => {
            logger::log_error(&format!("{step} step '{spec}' could not run: {e}"));
            (StepExit::SpawnFailed { error: e.to_string() }, Vec::new())
        }
    };

    for line in &lines {
        logger::log_command_output(step, line);
    }

    StepReport { step, exit, lines }
}
