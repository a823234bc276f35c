//! Pattern-based intent extraction
//!
//! Three independent passes over the same raw text: application detection
//! (delegated to the registry), task-phrase extraction and best-effort
//! parameter extraction. Nothing here fails; text we cannot make sense of
//! yields an intent with no application.

use crate::core::types::{ControllerKind, FieldMap};
use crate::intent::{params, Intent};
use crate::registry::{self, Detection};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

/// "use X to Y", "open X and Y", "start X then Y", "with X Y", tried in order
const TASK_PATTERNS: &[&str] = &[
    r"(?i)\buse\s+.*?\s+to\s+(.+)",
    r"(?i)\bopen\s+.*?\s+and\s+(.+)",
    r"(?i)\bstart\s+.*?\s+then\s+(.+)",
    r"(?i)\bwith\s+.*?\s+(.+)",
];

/// Value shape shared by the quoted-or-bare parameter patterns
const VALUE: &str = r#"(?:"([^"]+)"|'([^']+)'|([^\s'"]+))"#;

/// Filename cues, most explicit first
const FILENAME_CUES: &[&str] = &[
    r"(?i)\b(?:called|named)\s+",
    r"(?i)\bcreate\s+(?:an?\s+)?(?:new\s+)?(?:file|folder|directory|spreadsheet)\s+",
    r"(?i)\bfile\s+",
    r"(?i)\bcreate\s+",
];

struct Patterns {
    task: Vec<Regex>,
    leading_the: Regex,
    leading_use: Regex,
    leading_connective: Regex,
    filename: Vec<Regex>,
    url: Regex,
    quantity: Regex,
    search: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |p: &str| Regex::new(p).expect("extractor patterns are valid regexes");
        Patterns {
            task: TASK_PATTERNS.iter().map(|p| compile(p)).collect(),
            leading_the: compile(r"(?i)^the\s+"),
            leading_use: compile(r"(?i)^use\s+"),
            leading_connective: compile(r"(?i)^(?:to|and|then)\s+"),
            filename: FILENAME_CUES
                .iter()
                .map(|cue| compile(&format!("{cue}{VALUE}")))
                .collect(),
            url: compile(r"(?i)\b(?:open|go\s+to|visit)\s+(https?://\S+)"),
            quantity: compile(r"(?i)(\d+(?:\.\d+)?)\s*lots?\b"),
            search: compile(r#"(?i)\bsearch\s+(?:for\s+)?(?:"([^"]+)"|'([^']+)'|(.+))"#),
        }
    })
}

/// Interpret `text` as an instruction
pub fn extract(text: &str) -> Intent {
    let detection = registry::detect(text);
    let application = detection.map(|d| d.application);
    let task = extract_task(text, detection.as_ref());
    let parameters = extract_parameters(text, detection.as_ref());

    tracing::debug!(
        app = ?application,
        task = %task,
        params = parameters.len(),
        "Extracted intent"
    );

    Intent::new(text, application, task, parameters)
}

fn extract_task(text: &str, detection: Option<&Detection>) -> String {
    let p = patterns();

    for pattern in &p.task {
        if let Some(m) = pattern.captures(text).and_then(|c| c.get(1)) {
            let task = m.as_str().trim();
            return p.leading_the.replace(task, "").trim().to_string();
        }
    }

    let Some(detection) = detection else {
        return text.trim().to_string();
    };

    // No phrasing pattern: peel "use", the alias and a connective off the front
    let lower = text.trim().to_lowercase();
    let without_use = p.leading_use.replace(&lower, "");
    let rest: &str = &without_use;
    let rest = rest.strip_prefix(detection.alias).unwrap_or(rest).trim_start();
    p.leading_connective.replace(rest, "").trim().to_string()
}

fn extract_parameters(text: &str, detection: Option<&Detection>) -> FieldMap {
    let p = patterns();
    let mut parameters = FieldMap::new();

    if let Some(name) = p
        .filename
        .iter()
        .find_map(|re| re.captures(text).and_then(|c| quoted_or_bare(&c)))
    {
        parameters.insert(params::FILENAME.into(), Value::String(name));
    }

    if let Some(url) = p.url.captures(text).and_then(|c| c.get(1)) {
        parameters.insert(params::URL.into(), Value::String(url.as_str().to_string()));
    }

    if let Some(quantity) = p
        .quantity
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .and_then(serde_json::Number::from_f64)
    {
        parameters.insert(params::QUANTITY.into(), Value::Number(quantity));
    }

    let is_browser = detection
        .map(|d| registry::controller_kind(d.application) == ControllerKind::Browser)
        .unwrap_or(false);
    if is_browser {
        if let Some(query) = p.search.captures(text).and_then(|c| quoted_or_bare(&c)) {
            parameters.insert(params::QUERY.into(), Value::String(query));
        }
    }

    parameters
}

/// First populated group of a quoted-or-bare value pattern, tidied
fn quoted_or_bare(caps: &Captures<'_>) -> Option<String> {
    let value = (1..caps.len()).find_map(|i| caps.get(i))?.as_str();
    let value = value.trim().trim_end_matches(&[',', ';', '!', '?', '.'][..]);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
