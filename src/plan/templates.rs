//! Hand-authored task templates
//!
//! Each application has an ordered list of task keywords; the first keyword
//! contained in the lowercased task phrase selects a fixed step sequence.
//! Literal field values may reference `{filename}`, `{url}`, `{query}`,
//! `{quantity}` and `{task}`. A step whose placeholders cannot all be filled
//! is left out of the instantiated plan. Values substituted into a
//! `run_command` command are shell-quoted.

use crate::core::types::{ApplicationId, FieldMap};
use crate::intent::{params, Intent};
use crate::plan::step::{ActionKind, ProposedStep};
use serde_json::Value;

/// One step of a template
#[derive(Debug, Clone, Copy)]
pub struct TemplateStep {
    pub action: ActionKind,
    pub literals: &'static [(&'static str, &'static str)],
}

/// Keyword -> step sequence
#[derive(Debug, Clone, Copy)]
pub struct TaskTemplate {
    pub keyword: &'static str,
    pub steps: &'static [TemplateStep],
}

/// Intent parameters copied onto every instantiated step
const MERGED_PARAMETERS: [&str; 4] = [params::FILENAME, params::URL, params::QUERY, params::QUANTITY];

macro_rules! step {
    ($action:ident) => {
        TemplateStep {
            action: ActionKind::$action,
            literals: &[],
        }
    };
    ($action:ident, $($key:literal => $value:literal),+) => {
        TemplateStep {
            action: ActionKind::$action,
            literals: &[$(($key, $value)),+],
        }
    };
}

macro_rules! shell {
    ($command:literal) => {
        step!(RunCommand, "command" => $command)
    };
}

macro_rules! template {
    ($keyword:literal, [$($step:expr),+ $(,)?]) => {
        TaskTemplate {
            keyword: $keyword,
            steps: &[$($step),+],
        }
    };
}

const OPEN: TemplateStep = step!(OpenApp);

// "disk" precedes "check" so "check disk space" gets the disk report
const TERMINAL: &[TaskTemplate] = &[
    template!("disk", [shell!("df -h")]),
    template!("memory", [shell!("free -h")]),
    template!("process", [shell!("ps aux --sort=-%cpu | head -15")]),
    template!("uptime", [shell!("uptime")]),
    template!("network", [shell!("ip -brief addr")]),
    template!("list", [shell!("ls -la")]),
    template!("check", [shell!("uname -a")]),
];

const SYSTEM: &[TaskTemplate] = &[
    template!("disk", [shell!("df -h")]),
    template!("memory", [shell!("free -h")]),
    template!("process", [shell!("ps aux --sort=-%cpu | head -15")]),
    template!("info", [shell!("uname -a")]),
];

const BROWSER: &[TaskTemplate] = &[
    template!("search", [OPEN, step!(NavigateUrl, "query" => "{query}")]),
    template!("open", [OPEN, step!(NavigateUrl, "url" => "{url}")]),
    template!("download", [OPEN, step!(NavigateUrl, "url" => "{url}")]),
];

const VSCODE: &[TaskTemplate] = &[
    template!(
        "create file",
        [
            OPEN,
            step!(CreateFile, "filename" => "{filename}", "content" => ""),
        ]
    ),
    template!("open project", [OPEN]),
    template!("run code", [OPEN, shell!("code --status")]),
];

const FILES: &[TaskTemplate] = &[
    template!(
        "create file",
        [step!(CreateFile, "filename" => "{filename}", "content" => "")]
    ),
    template!("create folder", [shell!("mkdir -p {filename}")]),
    template!("list", [shell!("ls -la")]),
    template!("organize", [OPEN]),
];

const MT4: &[TaskTemplate] = &[
    template!(
        "check balance",
        [
            OPEN,
            shell!("tail -50 ~/.wine/drive_c/Program\\ Files/MetaTrader4/Tester/Experts/logs.log"),
        ]
    ),
    template!("open chart", [OPEN, step!(TakeScreenshot)]),
];

const MT5: &[TaskTemplate] = &[
    template!(
        "check balance",
        [
            OPEN,
            shell!("tail -50 ~/.wine/drive_c/Program\\ Files/MetaTrader\\ 5/MQL5/Logs/*.log"),
        ]
    ),
    template!("open chart", [OPEN, step!(TakeScreenshot)]),
];

const GIT: &[TaskTemplate] = &[
    template!("status", [shell!("git status")]),
    template!("log", [shell!("git log --oneline -n 10")]),
    template!("diff", [shell!("git diff --stat")]),
    template!("branch", [shell!("git branch")]),
];

const DOCKER: &[TaskTemplate] = &[
    template!("list container", [shell!("docker ps -a")]),
    template!("running", [shell!("docker ps")]),
    template!("image", [shell!("docker images")]),
];

const MEDIA: &[TaskTemplate] = &[template!("play", [OPEN]), template!("open", [OPEN])];

const SPREADSHEET: &[TaskTemplate] = &[
    template!(
        "create spreadsheet",
        [step!(CreateFile, "filename" => "{filename}", "content" => "")]
    ),
    template!("open", [OPEN]),
];

const MESSENGER: &[TaskTemplate] = &[template!("open", [OPEN])];

/// Templates for `application`, in match order
pub fn templates_for(application: ApplicationId) -> &'static [TaskTemplate] {
    match application {
        ApplicationId::Terminal => TERMINAL,
        ApplicationId::System => SYSTEM,
        ApplicationId::Chrome | ApplicationId::Firefox => BROWSER,
        ApplicationId::Vscode => VSCODE,
        ApplicationId::Files => FILES,
        ApplicationId::Mt4 => MT4,
        ApplicationId::Mt5 => MT5,
        ApplicationId::Git => GIT,
        ApplicationId::Docker => DOCKER,
        ApplicationId::Spotify | ApplicationId::Vlc => MEDIA,
        ApplicationId::Excel => SPREADSHEET,
        ApplicationId::Telegram => MESSENGER,
        _ => &[],
    }
}

/// First template whose keyword appears in the task phrase
pub fn match_template(application: ApplicationId, task: &str) -> Option<&'static TaskTemplate> {
    let task = task.to_lowercase();
    let found = templates_for(application)
        .iter()
        .find(|t| task.contains(t.keyword));
    if let Some(t) = found {
        tracing::debug!(app = %application, keyword = t.keyword, "Matched template");
    }
    found
}

/// Fill a template from an intent
pub fn instantiate(template: &TaskTemplate, intent: &Intent) -> Vec<ProposedStep> {
    template
        .steps
        .iter()
        .filter_map(|step| instantiate_step(step, intent))
        .collect()
}

fn instantiate_step(step: &TemplateStep, intent: &Intent) -> Option<ProposedStep> {
    let mut fields = FieldMap::new();

    for (key, literal) in step.literals {
        let quote = step.action.executes_host_command() && *key == "command";
        match render(literal, intent, quote) {
            Some(value) => {
                fields.insert((*key).to_string(), Value::String(value));
            }
            None => {
                tracing::debug!(
                    action = %step.action,
                    field = key,
                    "Template step skipped, placeholder unfilled"
                );
                return None;
            }
        }
    }

    for key in MERGED_PARAMETERS {
        if let Some(value) = intent.parameters().get(key) {
            fields.entry(key.to_string()).or_insert_with(|| value.clone());
        }
    }

    Some(ProposedStep::new(step.action.as_str(), fields))
}

/// Substitute placeholders; `None` if one has no value
fn render(literal: &str, intent: &Intent, quote: bool) -> Option<String> {
    let mut out = literal.to_string();
    for name in ["filename", "url", "query", "quantity", "task"] {
        let placeholder = format!("{{{name}}}");
        if !out.contains(&placeholder) {
            continue;
        }
        let value = if name == "task" {
            Some(intent.task().to_string())
        } else {
            intent.parameters().get(name).and_then(value_text)
        }?;
        let value = if quote { shell_quote(&value) } else { value };
        out = out.replace(&placeholder, &value);
    }
    Some(out)
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Single-quote `text` for POSIX `sh`
pub fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}
