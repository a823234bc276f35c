//! Resilient execution of a gated plan
//!
//! The loop is a fold over steps into `StepResult`s: a step that errors,
//! times out or is unsupported becomes a `Failure` and the next step still
//! runs. Only cancellation stops the walk early.

use crate::controller::{
    search_url, Acquired, Controller, ControllerError, ControllerRegistry, ControllerResult,
};
use crate::core::types::ApplicationId;
use crate::engine::summary::{ExecutionSummary, StepOutcome, StepResult};
use crate::plan::{ActionKind, ActionStep, Plan};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct ExecutionEngine {
    registry: Arc<ControllerRegistry>,
    step_timeout: Duration,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<ControllerRegistry>, step_timeout: Duration) -> Self {
        Self {
            registry,
            step_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<ControllerRegistry> {
        &self.registry
    }

    /// Run `plan` against the controller for `application`
    pub async fn execute(
        &self,
        application: ApplicationId,
        plan: &Plan,
        cancel: &CancellationToken,
    ) -> ExecutionSummary {
        if plan.is_empty() {
            return ExecutionSummary::default();
        }

        match self.registry.acquire(application).await {
            Acquired::Cached(shared) => {
                let mut controller = shared.lock().await;
                self.run_steps(controller.as_mut(), plan, cancel, None).await
            }
            Acquired::Fallback {
                mut controller,
                error,
            } => {
                self.run_steps(controller.as_mut(), plan, cancel, Some(error))
                    .await
            }
        }
    }

    async fn run_steps(
        &self,
        controller: &mut dyn Controller,
        plan: &Plan,
        cancel: &CancellationToken,
        mut acquisition_error: Option<ControllerError>,
    ) -> ExecutionSummary {
        // Without an open_app step the error rides on the first failure instead
        let mut unreported = if plan.steps().iter().any(|s| s.action() == ActionKind::OpenApp) {
            None
        } else {
            acquisition_error.take()
        };

        let mut summary = ExecutionSummary {
            planned: plan.len(),
            ..ExecutionSummary::default()
        };

        for (step_index, step) in plan.steps().iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(
                    remaining = plan.len() - step_index,
                    "Cancelled, skipping remaining steps"
                );
                summary.cancelled = true;
                break;
            }

            let synthetic = match step.action() {
                ActionKind::OpenApp => acquisition_error.take(),
                _ => None,
            };

            let outcome = match synthetic {
                Some(error) => StepOutcome::Failure(error.to_string()),
                None => {
                    let dispatched = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        result = tokio::time::timeout(self.step_timeout, dispatch(&mut *controller, step)) => Some(result),
                    };
                    match dispatched {
                        Some(Ok(Ok(detail))) => StepOutcome::Success(detail),
                        Some(Ok(Err(e))) => StepOutcome::Failure(e.to_string()),
                        Some(Err(_)) => StepOutcome::Failure(format!(
                            "Step timed out after {}s",
                            self.step_timeout.as_secs()
                        )),
                        None => {
                            summary.cancelled = true;
                            StepOutcome::Failure("Cancelled while running".into())
                        }
                    }
                }
            };

            let outcome = match outcome {
                StepOutcome::Failure(reason) => match unreported.take() {
                    Some(error) => StepOutcome::Failure(format!("{}; {}", error, reason)),
                    None => StepOutcome::Failure(reason),
                },
                success => success,
            };

            match &outcome {
                StepOutcome::Success(detail) => {
                    tracing::debug!(step = step_index, action = %step.action(), %detail, "Step succeeded")
                }
                StepOutcome::Failure(reason) => {
                    tracing::warn!(step = step_index, action = %step.action(), %reason, "Step failed")
                }
            }

            summary.results.push(StepResult {
                step_index,
                action: step.action(),
                outcome,
            });

            if summary.cancelled {
                break;
            }
        }

        if let Some(error) = unreported {
            tracing::warn!(
                controller = controller.name(),
                error = %error,
                "Controller acquisition failed but every step succeeded on the fallback"
            );
        }

        tracing::info!(
            "Executed {}/{} steps, {} succeeded",
            summary.results.len(),
            summary.planned,
            summary.successes()
        );
        summary
    }
}

/// Map one step onto the controller operation it names
async fn dispatch(controller: &mut dyn Controller, step: &ActionStep) -> ControllerResult {
    match step.action() {
        ActionKind::OpenApp => match step.str_field("filename") {
            Some(path) => controller.open_file(path).await,
            None => controller.open().await,
        },
        ActionKind::CloseApp => controller.close().await,
        ActionKind::RunCommand => controller.run_command(required_str(step, "command")?).await,
        ActionKind::CreateFile => {
            let filename = required_str(step, "filename")?;
            let content = step.str_field("content").unwrap_or_default();
            controller.create_file(filename, content).await
        }
        ActionKind::NavigateUrl => {
            let url = match step.str_field("url") {
                Some(url) => url.to_string(),
                None => search_url(required_str(step, "query")?)?,
            };
            controller.navigate_url(&url).await
        }
        ActionKind::TypeText => controller.type_text(required_str(step, "text")?).await,
        ActionKind::Click => {
            let x = coordinate(step, "x")?;
            let y = coordinate(step, "y")?;
            controller.click(x, y).await
        }
        ActionKind::PressKey => controller.press_key(required_str(step, "key")?).await,
        ActionKind::Wait => {
            let seconds = match step.f64_field("seconds") {
                Some(s) if s.is_finite() && s >= 0.0 => s,
                Some(_) => {
                    return Err(ControllerError::InvalidField {
                        field: "seconds",
                        reason: "must be a non-negative number".into(),
                    })
                }
                None => 1.0,
            };
            controller.wait(seconds).await
        }
        ActionKind::TakeScreenshot => controller.screenshot().await,
    }
}

fn required_str<'a>(step: &'a ActionStep, field: &'static str) -> Result<&'a str, ControllerError> {
    match step.fields().get(field) {
        None | Some(Value::Null) => Err(ControllerError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(ControllerError::InvalidField {
            field,
            reason: format!("expected a string, got {}", other),
        }),
    }
}

fn coordinate(step: &ActionStep, field: &'static str) -> Result<i64, ControllerError> {
    match step.f64_field(field) {
        Some(v) if v.is_finite() => Ok(v.round() as i64),
        Some(_) => Err(ControllerError::InvalidField {
            field,
            reason: "not a finite number".into(),
        }),
        None => Err(ControllerError::MissingField(field)),
    }
}
