//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Loosely typed key/value payload carried by intents and plan steps.
///
/// Ordered so that plans render and compare deterministically.
pub type FieldMap = BTreeMap<String, serde_json::Value>;

/// Correlates the log lines of one `handle` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical identifier of an application the agent knows how to address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationId {
    Mt4,
    Mt5,
    Chrome,
    Firefox,
    Vscode,
    Vim,
    Nano,
    Terminal,
    Files,
    Excel,
    Word,
    Telegram,
    Discord,
    Spotify,
    Vlc,
    System,
    Git,
    Docker,
    Python,
    Node,
}

impl ApplicationId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationId::Mt4 => "mt4",
            ApplicationId::Mt5 => "mt5",
            ApplicationId::Chrome => "chrome",
            ApplicationId::Firefox => "firefox",
            ApplicationId::Vscode => "vscode",
            ApplicationId::Vim => "vim",
            ApplicationId::Nano => "nano",
            ApplicationId::Terminal => "terminal",
            ApplicationId::Files => "files",
            ApplicationId::Excel => "excel",
            ApplicationId::Word => "word",
            ApplicationId::Telegram => "telegram",
            ApplicationId::Discord => "discord",
            ApplicationId::Spotify => "spotify",
            ApplicationId::Vlc => "vlc",
            ApplicationId::System => "system",
            ApplicationId::Git => "git",
            ApplicationId::Docker => "docker",
            ApplicationId::Python => "python",
            ApplicationId::Node => "node",
        }
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which controller implementation drives an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerKind {
    TradingTerminal,
    Browser,
    Editor,
    Terminal,
    FileManager,
    Spreadsheet,
    Messenger,
    MediaPlayer,
    System,
    Git,
    Docker,
    /// Spawns a process named after the application; nothing else
    Generic,
}
