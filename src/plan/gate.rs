//! Plan validation gate
//!
//! Every plan passes through `gate` before it can reach a controller,
//! whether it came from a template or a model. The gate is a pure filter:
//! it drops steps, never reorders, rewrites or retries them, and never fails.
//!
//! The command denylist is a substring match over the lowercased command
//! text; network fetch tools are matched as whole command words so that
//! `rsync` or `sync` never trip over `nc`. It is a best-effort mitigation against obviously destructive
//! model output and NOT a security boundary: anything that can be spelled
//! differently (variables, quoting, base64, a script file) gets through.
//! Commands still run with the agent's own privileges.

use crate::plan::step::{ActionKind, ActionStep, Plan, ProposedStep};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Substrings that disqualify a `run_command` step
pub const COMMAND_DENYLIST: &[&str] = &[
    // recursive delete
    "rm -rf",
    "rm -fr",
    "rm -r",
    "rm --recursive",
    "--no-preserve-root",
    // raw disk writes
    "dd if=",
    "of=/dev/",
    "> /dev/sd",
    "> /dev/nvme",
    "shred ",
    "wipefs",
    // filesystem formatting / partitioning
    "mkfs",
    "fdisk",
    "parted ",
    "format c:",
    // fork bomb
    ":(){",
    ":|:&",
];

/// Outbound fetch tools, denied when they appear as a command word
pub const FETCH_TOOLS: &[&str] = &["curl", "wget", "nc", "netcat"];

fn fetch_tool_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!(r"(^|[\s;|&(`/])({})(\s|$)", FETCH_TOOLS.join("|"));
        Regex::new(&pattern).expect("fetch tool pattern is a valid regex")
    })
}

/// Why a proposed step did not survive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    UnknownAction(String),
    DeniedCommand(&'static str),
}

/// Check one proposal
pub fn check(step: ProposedStep) -> Result<ActionStep, Rejection> {
    let action = ActionKind::parse(&step.action).ok_or(Rejection::UnknownAction(step.action))?;

    if action.executes_host_command() {
        if let Some(pattern) = step.fields.get("command").and_then(denied_pattern) {
            return Err(Rejection::DeniedCommand(pattern));
        }
    }

    Ok(ActionStep {
        action,
        fields: step.fields,
    })
}

/// First denylisted substring or fetch tool found in a command value
fn denied_pattern(command: &Value) -> Option<&'static str> {
    let text = match command {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    };
    COMMAND_DENYLIST
        .iter()
        .copied()
        .find(|pattern| text.contains(pattern))
        .or_else(|| fetch_tool(&text))
}

/// Fetch tool invoked as a command word in `text`, if any
pub fn fetch_tool(text: &str) -> Option<&'static str> {
    let word = fetch_tool_pattern().captures(text)?.get(2)?.as_str();
    FETCH_TOOLS.iter().copied().find(|tool| *tool == word)
}

/// Filter proposals down to an executable plan, preserving order
pub fn gate<I>(proposals: I) -> Plan
where
    I: IntoIterator<Item = ProposedStep>,
{
    let mut total = 0usize;
    let mut kept = Vec::new();

    for proposal in proposals {
        total += 1;
        match check(proposal) {
            Ok(step) => kept.push(step),
            Err(Rejection::UnknownAction(name)) => {
                tracing::warn!(action = %name, "Gate dropped step with non-allowlisted action");
            }
            Err(Rejection::DeniedCommand(pattern)) => {
                tracing::warn!(pattern, "Gate dropped run_command matching denylist");
            }
        }
    }

    if kept.len() < total {
        tracing::info!("Gate kept {}/{} steps", kept.len(), total);
    } else {
        tracing::debug!("Gate kept {}/{} steps", kept.len(), total);
    }

    Plan::from_gated(kept)
}
