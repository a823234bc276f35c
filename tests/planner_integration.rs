//! Integration tests for extraction and planning
//!
//! Covers the path from raw text to a gated plan without executing it:
//! - template planning is deterministic and never calls the model
//! - model output, however hostile, only reaches a plan through the gate
//! - every planning failure degrades to the echo plan

use async_trait::async_trait;
use deskhand::core::types::ApplicationId;
use deskhand::intent::extract;
use deskhand::llm::{CompletionError, CompletionService};
use deskhand::plan::{gate, ActionKind, ActionPlanner, Plan};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Canned {
    reply: Result<&'static str, fn() -> CompletionError>,
    calls: AtomicUsize,
}

impl Canned {
    fn ok(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply),
            calls: AtomicUsize::new(0),
        })
    }

    fn err(make: fn() -> CompletionError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(make),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CompletionService for Canned {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply {
            Ok(text) => Ok(text.to_string()),
            Err(make) => Err(make()),
        }
    }
}

fn planner(service: &Arc<Canned>) -> ActionPlanner {
    ActionPlanner::new(service.clone(), Duration::from_secs(5))
}

fn actions(plan: &Plan) -> Vec<ActionKind> {
    plan.steps().iter().map(|s| s.action()).collect()
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
async fn test_template_plans_are_repeatable() {
    let service = Canned::ok("{}");
    let planner = planner(&service);
    let intent = extract("use docker to list containers");

    let first = planner.plan(&intent).await;
    let second = planner.plan(&intent).await;

    assert_eq!(first, second);
    assert_eq!(first.steps()[0].str_field("command"), Some("docker ps -a"));
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_browser_search_carries_query() {
    let planner = ActionPlanner::templates_only();
    let intent = extract("use firefox to search for \"tokio cancellation\"");

    let plan = planner.plan(&intent).await;

    assert_eq!(actions(&plan), vec![ActionKind::OpenApp, ActionKind::NavigateUrl]);
    assert_eq!(plan.steps()[1].str_field("query"), Some("tokio cancellation"));
}

#[tokio::test]
async fn test_browser_open_carries_url() {
    let planner = ActionPlanner::templates_only();
    let intent = extract("use chrome to open https://example.com");

    let plan = planner.plan(&intent).await;

    let navigate = plan
        .steps()
        .iter()
        .find(|s| s.action() == ActionKind::NavigateUrl)
        .expect("navigate step");
    assert_eq!(navigate.str_field("url"), Some("https://example.com"));
}

#[tokio::test]
async fn test_folder_name_is_quoted_into_command() {
    let planner = ActionPlanner::templates_only();
    let intent = extract("use files to create folder called reports");

    let plan = planner.plan(&intent).await;

    assert_eq!(echo_command(&plan).as_deref(), Some("mkdir -p 'reports'"));
}

/// "sync" contains "nc" but is not a fetch tool; the echo plan must survive
#[tokio::test]
async fn test_fallback_echo_survives_gate_for_sync_task() {
    let planner = ActionPlanner::templates_only();
    let intent = extract("use git to sync with upstream");

    let plan = planner.plan(&intent).await;

    assert_eq!(plan.len(), 1);
    assert_eq!(
        echo_command(&plan).as_deref(),
        Some("echo 'git: sync with upstream'")
    );
}

#[tokio::test]
async fn test_no_application_no_plan() {
    let service = Canned::ok(r#"{"actions":[{"action":"open_app"}]}"#);
    let plan = planner(&service).plan(&extract("just do it")).await;
    assert!(plan.is_empty());
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_model_plan_is_gated() {
    let service = Canned::ok(
        r#"```json
{"actions": [
  {"action": "open_app"},
  {"action": "delete_everything"},
  {"action": "run_command", "command": "dd if=/dev/zero of=/dev/sda"},
  {"action": "type_text", "text": "hello"},
  {"action": "press_key", "key": "Return"}
]}
```"#,
    );
    let plan = planner(&service)
        .plan(&extract("use telegram to greet the team"))
        .await;

    assert_eq!(
        actions(&plan),
        vec![ActionKind::OpenApp, ActionKind::TypeText, ActionKind::PressKey]
    );
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_action_list_is_empty_plan() {
    let service = Canned::ok(r#"{"actions": []}"#);
    let plan = planner(&service)
        .plan(&extract("use terminal to relax"))
        .await;
    assert!(plan.is_empty());
}

#[tokio::test]
async fn test_provider_failures_all_degrade_to_echo() {
    let failures: [fn() -> CompletionError; 5] = [
        || CompletionError::Unauthorized,
        || CompletionError::RateLimited,
        || CompletionError::ModelNotFound("llama3".into()),
        || CompletionError::Timeout(45),
        || CompletionError::Unreachable("connection refused".into()),
    ];

    for make in failures {
        let service = Canned::err(make);
        let plan = planner(&service)
            .plan(&extract("use terminal to reticulate splines"))
            .await;
        assert_eq!(
            echo_command(&plan).as_deref(),
            Some("echo 'terminal: reticulate splines'")
        );
    }
}

#[tokio::test]
async fn test_bare_array_is_not_a_plan() {
    let service = Canned::ok(r#"[{"action": "open_app"}]"#);
    let plan = planner(&service)
        .plan(&extract("use vlc to do something odd"))
        .await;
    assert_eq!(
        echo_command(&plan).as_deref(),
        Some("echo 'vlc: do something odd'")
    );
}

#[tokio::test]
async fn test_generic_application_uses_model() {
    let service = Canned::ok(r#"{"actions":[{"action":"open_app"}]}"#);
    let intent = extract("use python to open a repl");
    assert_eq!(intent.application(), Some(ApplicationId::Python));

    let plan = planner(&service).plan(&intent).await;

    assert_eq!(actions(&plan), vec![ActionKind::OpenApp]);
}

proptest! {
    /// Re-gating a plan never changes it
    #[test]
    fn prop_planned_output_is_gate_stable(task in "[a-z ]{1,40}") {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let intent = extract(&format!("use terminal to {task}"));
        let plan = rt.block_on(ActionPlanner::templates_only().plan(&intent));
        let regated = gate(plan.clone().into_proposed());
        prop_assert_eq!(plan, regated);
    }
}
