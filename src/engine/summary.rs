//! Step outcomes and their rendering

use crate::plan::ActionKind;
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Success(String),
    Failure(String),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            StepOutcome::Success(detail) | StepOutcome::Failure(detail) => detail,
        }
    }
}

/// Outcome of one dispatched step, indexed by its position in the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub step_index: usize,
    pub action: ActionKind,
    pub outcome: StepOutcome,
}

/// Everything one `execute` call did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub results: Vec<StepResult>,
    /// Steps in the plan, dispatched or not
    pub planned: usize,
    /// Set when cancellation stopped the plan early
    pub cancelled: bool,
}

impl ExecutionSummary {
    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepResult> {
        self.results.iter().filter(|r| !r.outcome.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.successes() == self.results.len()
    }

    /// Human-readable report
    pub fn render(&self) -> String {
        let total = self.results.len();

        if total == 0 && !self.cancelled {
            return "Nothing to do: 0 steps run.".to_string();
        }
        if self.all_succeeded() {
            return format!("All {} steps completed successfully.", total);
        }

        let mut out = format!("{}/{} steps completed. Results:", self.successes(), total);
        for result in &self.results {
            let marker = if result.outcome.is_success() { "ok" } else { "failed" };
            let _ = write!(
                out,
                "\n[{}] {}. {}",
                marker,
                result.step_index + 1,
                result.action
            );
            if !result.outcome.detail().is_empty() {
                let _ = write!(out, ": {}", result.outcome.detail());
            }
        }
        if self.cancelled {
            let skipped = self.planned.saturating_sub(total);
            let _ = write!(out, "\nCancelled: {} step(s) not run.", skipped);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, action: ActionKind, ok: bool, detail: &str) -> StepResult {
        StepResult {
            step_index: index,
            action,
            outcome: if ok {
                StepOutcome::Success(detail.into())
            } else {
                StepOutcome::Failure(detail.into())
            },
        }
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(
            ExecutionSummary::default().render(),
            "Nothing to do: 0 steps run."
        );
    }

    #[test]
    fn test_render_all_success() {
        let summary = ExecutionSummary {
            results: vec![
                result(0, ActionKind::OpenApp, true, "Chrome opened"),
                result(1, ActionKind::NavigateUrl, true, "Navigated"),
            ],
            planned: 2,
            cancelled: false,
        };
        assert_eq!(summary.render(), "All 2 steps completed successfully.");
    }

    #[test]
    fn test_render_partial_failure_lists_every_step() {
        let summary = ExecutionSummary {
            results: vec![
                result(0, ActionKind::OpenApp, true, "Terminal opened"),
                result(1, ActionKind::RunCommand, false, "Timed out after 45s"),
            ],
            planned: 2,
            cancelled: false,
        };
        assert_eq!(summary.successes(), 1);
        assert_eq!(summary.failures().count(), 1);
        assert_eq!(
            summary.render(),
            "1/2 steps completed. Results:\n[ok] 1. open_app: Terminal opened\n[failed] 2. run_command: Timed out after 45s"
        );
    }

    #[test]
    fn test_render_cancelled() {
        let summary = ExecutionSummary {
            results: vec![result(0, ActionKind::Wait, true, "Waited 1s")],
            planned: 3,
            cancelled: true,
        };
        assert!(!summary.all_succeeded());
        assert!(summary.render().ends_with("Cancelled: 2 step(s) not run."));
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_value(StepOutcome::Failure("boom".into())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failure", "detail": "boom"}));
    }
}
