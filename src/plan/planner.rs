//! Action planner: templates first, then the completion service
//!
//! Whatever the source, proposals go through the gate before a `Plan`
//! exists. Planning never fails: a template miss with no usable model
//! answer degrades to a harmless echo of the request.

use crate::core::types::ApplicationId;
use crate::intent::Intent;
use crate::llm::{extract_json, CompletionService};
use crate::plan::gate::gate;
use crate::plan::step::{ActionKind, Plan, ProposedStep};
use crate::plan::templates::{self, shell_quote};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a completion could not be read as a step list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanParseError {
    #[error("No JSON object in response")]
    NoJson,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("`actions` missing or not an array")]
    MissingActions,
}

pub struct ActionPlanner {
    completion: Option<Arc<dyn CompletionService>>,
    timeout: Duration,
}

impl ActionPlanner {
    pub fn new(completion: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self {
            completion: Some(completion),
            timeout,
        }
    }

    /// Planner that never calls out; template misses use the echo plan
    pub fn templates_only() -> Self {
        Self {
            completion: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn has_completion(&self) -> bool {
        self.completion.is_some()
    }

    /// Produce a gated plan for `intent`
    pub async fn plan(&self, intent: &Intent) -> Plan {
        let Some(application) = intent.application() else {
            tracing::debug!("No application in intent, nothing to plan");
            return Plan::empty();
        };

        let proposals = match templates::match_template(application, intent.task()) {
            Some(template) => templates::instantiate(template, intent),
            None => self.generate(application, intent).await,
        };

        gate(proposals)
    }

    async fn generate(&self, application: ApplicationId, intent: &Intent) -> Vec<ProposedStep> {
        let Some(service) = &self.completion else {
            tracing::debug!(app = %application, "No template and no completion service, using fallback plan");
            return fallback_steps(application, intent.task());
        };

        let prompt = build_prompt(application, intent);
        let response = match tokio::time::timeout(self.timeout, service.complete(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Generative planning failed, using fallback plan");
                return fallback_steps(application, intent.task());
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Generative planning timed out, using fallback plan"
                );
                return fallback_steps(application, intent.task());
            }
        };

        match parse_actions(&response) {
            Ok(steps) => {
                tracing::debug!(count = steps.len(), "Model proposed steps");
                steps
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unusable planning response, using fallback plan");
                fallback_steps(application, intent.task())
            }
        }
    }
}

/// Prompt asking for `{"actions": [...]}` over the allowlist only
pub fn build_prompt(application: ApplicationId, intent: &Intent) -> String {
    let parameters = serde_json::to_string(intent.parameters()).unwrap_or_else(|_| "{}".into());

    let mut prompt = String::from("You plan desktop automation steps on a Linux machine.\n\n");
    prompt.push_str(&format!("Application: {}\n", application));
    prompt.push_str(&format!("Task: {}\n", intent.task()));
    prompt.push_str(&format!("Parameters: {}\n\n", parameters));

    prompt.push_str("Allowed actions (use only these names):\n");
    for kind in ActionKind::ALL {
        match kind.field_hint() {
            "" => prompt.push_str(&format!("- {}\n", kind)),
            hint => prompt.push_str(&format!("- {} (fields: {})\n", kind, hint)),
        }
    }

    prompt.push_str("\nRespond with a single JSON object of exactly this shape:\n");
    prompt.push_str(
        r#"{"actions": [{"action": "open_app"}, {"action": "run_command", "command": "ls -la"}]}"#,
    );
    prompt.push_str("\nUse only action names listed above. Return JSON only, nothing else.\n");
    prompt
}

/// Read the `actions` array of a completion
pub fn parse_actions(response: &str) -> Result<Vec<ProposedStep>, PlanParseError> {
    let json = extract_json(response).ok_or(PlanParseError::NoJson)?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| PlanParseError::InvalidJson(e.to_string()))?;

    match value {
        Value::Object(mut map) => match map.remove("actions") {
            Some(Value::Array(items)) => Ok(items.into_iter().map(ProposedStep::from_json).collect()),
            _ => Err(PlanParseError::MissingActions),
        },
        _ => Err(PlanParseError::MissingActions),
    }
}

/// Single step that echoes the request back, never the raw text as a command
pub fn fallback_steps(application: ApplicationId, task: &str) -> Vec<ProposedStep> {
    let mut fields = crate::core::types::FieldMap::new();
    fields.insert(
        "command".into(),
        Value::String(format!("echo {}", shell_quote(&format!("{}: {}", application, task)))),
    );
    vec![ProposedStep::new(ActionKind::RunCommand.as_str(), fields)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::extract;
    use crate::llm::CompletionError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        reply: Option<&'static str>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn replying(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionService for Scripted {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.reply
                .map(str::to_string)
                .ok_or(CompletionError::RateLimited)
        }
    }

    fn planner(service: Arc<Scripted>) -> ActionPlanner {
        ActionPlanner::new(service, Duration::from_secs(5))
    }

    fn echo_command(plan: &Plan) -> Option<String> {
        match plan.steps() {
            [only] if only.action() == ActionKind::RunCommand => {
                only.str_field("command").map(str::to_string)
            }
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_template_plan_is_deterministic_and_skips_model() {
        let service = Scripted::replying(r#"{"actions": [{"action": "wait"}]}"#);
        let planner = planner(service.clone());
        let intent = extract("use terminal to check disk space");

        let first = planner.plan(&intent).await;
        let second = planner.plan(&intent).await;
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first.steps()[0].str_field("command"), Some("df -h"));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_application_is_empty_plan() {
        let planner = planner(Scripted::failing());
        assert!(planner.plan(&extract("make me a sandwich")).await.is_empty());
    }

    #[tokio::test]
    async fn test_model_steps_are_gated() {
        let service = Scripted::replying(
            r#"{"actions":[{"action":"rm","command":"rm -rf /"}]}"#,
        );
        let plan = planner(service).plan(&extract("use terminal to wipe everything")).await;
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn test_model_steps_in_prose_are_used() {
        let service = Scripted::replying(
            "Here you go:\n{\"actions\": [{\"action\": \"open_app\"}, {\"action\": \"type_text\", \"text\": \"hi\"}]}",
        );
        let plan = planner(service).plan(&extract("use discord to say hi")).await;
        let kinds: Vec<_> = plan.steps().iter().map(|s| s.action()).collect();
        assert_eq!(kinds, vec![ActionKind::OpenApp, ActionKind::TypeText]);
    }

    #[tokio::test]
    async fn test_garbage_response_falls_back_to_echo() {
        let plan = planner(Scripted::replying("I'd rather not."))
            .plan(&extract("use terminal to wipe everything"))
            .await;
        assert_eq!(
            echo_command(&plan).as_deref(),
            Some("echo 'terminal: wipe everything'")
        );
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_echo() {
        let plan = planner(Scripted::failing())
            .plan(&extract("use git to rebase onto main"))
            .await;
        assert!(echo_command(&plan).unwrap().starts_with("echo 'git: "));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_to_echo() {
        let service = Arc::new(Scripted {
            reply: Some(r#"{"actions": []}"#),
            delay: Duration::from_secs(10),
            calls: AtomicUsize::new(0),
        });
        let planner = ActionPlanner::new(service, Duration::from_millis(50));
        let plan = planner.plan(&extract("use docker to prune volumes")).await;
        assert!(echo_command(&plan).is_some());
    }

    #[tokio::test]
    async fn test_templates_only_falls_back_without_calling_out() {
        let planner = ActionPlanner::templates_only();
        assert!(!planner.has_completion());
        let plan = planner.plan(&extract("use git to rebase onto main")).await;
        assert!(echo_command(&plan).is_some());
    }

    #[test]
    fn test_parse_actions_errors() {
        assert_eq!(parse_actions("nope"), Err(PlanParseError::NoJson));
        assert!(matches!(
            parse_actions("{not json}"),
            Err(PlanParseError::InvalidJson(_))
        ));
        assert_eq!(
            parse_actions(r#"{"steps": []}"#),
            Err(PlanParseError::MissingActions)
        );
        assert_eq!(
            parse_actions(r#"{"actions": "open_app"}"#),
            Err(PlanParseError::MissingActions)
        );
        assert_eq!(parse_actions(r#"{"actions": []}"#), Ok(vec![]));
    }

    #[test]
    fn test_fallback_quotes_hostile_task() {
        let steps = fallback_steps(ApplicationId::Terminal, "x'; reboot; echo '");
        let command = steps[0].fields["command"].as_str().unwrap();
        assert_eq!(command, r"echo 'terminal: x'\''; reboot; echo '\'''");
    }

    #[test]
    fn test_prompt_lists_allowlist() {
        let prompt = build_prompt(ApplicationId::Chrome, &extract("use chrome to do things"));
        for kind in ActionKind::ALL {
            assert!(prompt.contains(kind.as_str()));
        }
        assert!(prompt.contains(r#"{"actions""#));
    }
}
