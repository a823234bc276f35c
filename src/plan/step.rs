//! Step and plan data model
//!
//! `ProposedStep` is untrusted: its action is free text straight from a
//! template or a model response. `ActionStep` and `Plan` can only be built
//! by the gate, so holding a `Plan` means every step has been checked.

use crate::core::types::FieldMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The closed set of operations a plan may ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    RunCommand,
    CreateFile,
    OpenApp,
    CloseApp,
    TakeScreenshot,
    Wait,
    NavigateUrl,
    TypeText,
    Click,
    PressKey,
}

impl ActionKind {
    /// The allowlist, in the order it is presented to planners
    pub const ALL: [ActionKind; 10] = [
        ActionKind::OpenApp,
        ActionKind::CloseApp,
        ActionKind::RunCommand,
        ActionKind::CreateFile,
        ActionKind::NavigateUrl,
        ActionKind::TypeText,
        ActionKind::Click,
        ActionKind::PressKey,
        ActionKind::Wait,
        ActionKind::TakeScreenshot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::RunCommand => "run_command",
            ActionKind::CreateFile => "create_file",
            ActionKind::OpenApp => "open_app",
            ActionKind::CloseApp => "close_app",
            ActionKind::TakeScreenshot => "take_screenshot",
            ActionKind::Wait => "wait",
            ActionKind::NavigateUrl => "navigate_url",
            ActionKind::TypeText => "type_text",
            ActionKind::Click => "click",
            ActionKind::PressKey => "press_key",
        }
    }

    /// Exact, case-sensitive lookup of an allowlisted name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Whether the step hands text to a host shell
    pub fn executes_host_command(&self) -> bool {
        matches!(self, ActionKind::RunCommand)
    }

    /// Field names the step reads, for planner prompts
    pub fn field_hint(&self) -> &'static str {
        match self {
            ActionKind::RunCommand => "command",
            ActionKind::CreateFile => "filename, content",
            ActionKind::OpenApp | ActionKind::CloseApp | ActionKind::TakeScreenshot => "",
            ActionKind::Wait => "seconds",
            ActionKind::NavigateUrl => "url or query",
            ActionKind::TypeText => "text",
            ActionKind::Click => "x, y",
            ActionKind::PressKey => "key",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step as proposed by a template or a model, not yet validated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposedStep {
    pub action: String,
    pub fields: FieldMap,
}

impl ProposedStep {
    pub fn new(action: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            action: action.into(),
            fields,
        }
    }

    /// Read one element of a model's `actions` array
    ///
    /// Non-objects and objects without a string `action` become a step with
    /// an empty action name, which the gate will drop.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                let mut fields: FieldMap = map.into_iter().collect();
                let action = match fields.remove("action") {
                    Some(Value::String(name)) => name,
                    _ => String::new(),
                };
                Self { action, fields }
            }
            _ => Self {
                action: String::new(),
                fields: FieldMap::new(),
            },
        }
    }
}

impl From<ActionStep> for ProposedStep {
    fn from(step: ActionStep) -> Self {
        Self {
            action: step.action.as_str().to_string(),
            fields: step.fields,
        }
    }
}

/// A validated step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionStep {
    pub(crate) action: ActionKind,
    pub(crate) fields: FieldMap,
}

impl ActionStep {
    pub fn action(&self) -> ActionKind {
        self.action
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Numeric field, accepting numbers or numeric strings
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Ordered, gated sequence of steps
///
/// An empty plan is a valid outcome meaning "nothing to do".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    steps: Vec<ActionStep>,
}

impl Plan {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Only the gate calls this
    pub(crate) fn from_gated(steps: Vec<ActionStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[ActionStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Turn the plan back into untrusted proposals, e.g. to re-gate it
    pub fn into_proposed(self) -> Vec<ProposedStep> {
        self.steps.into_iter().map(ProposedStep::from).collect()
    }
}
