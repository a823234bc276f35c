//! Capability registry - which applications exist and what drives them
//!
//! Detection is plain case-insensitive substring search, no tokenization.
//! Tie-break is fully determined by table layout: the first entry (in
//! table order) with any alias contained in the text wins, aliases are
//! tried in their listed order, and the match position reported is the
//! first occurrence of that alias.
//!
//! Overlapping aliases are resolved by that rule and nothing else, so
//! "vi" claims "video" and "code" claims "barcode". Entry order is part
//! of the contract.

use crate::core::types::{ApplicationId, ControllerKind};

/// One row of the registry table
#[derive(Debug, Clone, Copy)]
pub struct AppEntry {
    pub id: ApplicationId,
    /// Lowercase natural-language names, most specific first
    pub aliases: &'static [&'static str],
    pub controller: ControllerKind,
}

/// Result of scanning a user's text for an application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub application: ApplicationId,
    /// The alias that matched
    pub alias: &'static str,
    /// Byte offset of the alias' first occurrence in the lowercased text
    pub position: usize,
}

const APPLICATIONS: &[AppEntry] = &[
    // Trading
    AppEntry {
        id: ApplicationId::Mt4,
        aliases: &["mt4", "metatrader 4", "metatrader", "meta trader"],
        controller: ControllerKind::TradingTerminal,
    },
    AppEntry {
        id: ApplicationId::Mt5,
        aliases: &["mt5", "metatrader 5", "meta trader 5"],
        controller: ControllerKind::TradingTerminal,
    },
    // Browsers
    AppEntry {
        id: ApplicationId::Chrome,
        aliases: &["google chrome", "chrome", "web browser", "browser"],
        controller: ControllerKind::Browser,
    },
    AppEntry {
        id: ApplicationId::Firefox,
        aliases: &["firefox", "mozilla"],
        controller: ControllerKind::Browser,
    },
    // Editors
    AppEntry {
        id: ApplicationId::Vscode,
        aliases: &["visual studio code", "vscode", "vs code", "code"],
        controller: ControllerKind::Editor,
    },
    AppEntry {
        id: ApplicationId::Vim,
        aliases: &["vim", "vi"],
        controller: ControllerKind::Generic,
    },
    AppEntry {
        id: ApplicationId::Nano,
        aliases: &["nano"],
        controller: ControllerKind::Generic,
    },
    // Shells
    AppEntry {
        id: ApplicationId::Terminal,
        aliases: &["terminal", "command line", "console", "bash", "shell", "cmd"],
        controller: ControllerKind::Terminal,
    },
    AppEntry {
        id: ApplicationId::Files,
        aliases: &["file manager", "nautilus", "dolphin", "explorer", "files", "file"],
        controller: ControllerKind::FileManager,
    },
    // Office
    AppEntry {
        id: ApplicationId::Excel,
        aliases: &["ms excel", "excel", "spreadsheet"],
        controller: ControllerKind::Spreadsheet,
    },
    AppEntry {
        id: ApplicationId::Word,
        aliases: &["ms word", "word"],
        controller: ControllerKind::Generic,
    },
    // Communication
    AppEntry {
        id: ApplicationId::Telegram,
        aliases: &["telegram app", "telegram"],
        controller: ControllerKind::Messenger,
    },
    AppEntry {
        id: ApplicationId::Discord,
        aliases: &["discord"],
        controller: ControllerKind::Generic,
    },
    // Media
    AppEntry {
        id: ApplicationId::Spotify,
        aliases: &["spotify app", "spotify"],
        controller: ControllerKind::MediaPlayer,
    },
    AppEntry {
        id: ApplicationId::Vlc,
        aliases: &["vlc player", "vlc"],
        controller: ControllerKind::MediaPlayer,
    },
    // System / dev
    AppEntry {
        id: ApplicationId::System,
        aliases: &["operating system", "system", "os"],
        controller: ControllerKind::System,
    },
    AppEntry {
        id: ApplicationId::Git,
        aliases: &["github", "git"],
        controller: ControllerKind::Git,
    },
    AppEntry {
        id: ApplicationId::Docker,
        aliases: &["docker", "container"],
        controller: ControllerKind::Docker,
    },
    AppEntry {
        id: ApplicationId::Python,
        aliases: &["python3", "python"],
        controller: ControllerKind::Generic,
    },
    AppEntry {
        id: ApplicationId::Node,
        aliases: &["nodejs", "node", "npm"],
        controller: ControllerKind::Generic,
    },
];

/// The full table in detection order
pub fn applications() -> &'static [AppEntry] {
    APPLICATIONS
}

/// Table row for `id`
pub fn entry(id: ApplicationId) -> Option<&'static AppEntry> {
    APPLICATIONS.iter().find(|e| e.id == id)
}

/// Controller kind for `id`; rows without a dedicated driver get `Generic`
pub fn controller_kind(id: ApplicationId) -> ControllerKind {
    entry(id)
        .map(|e| e.controller)
        .unwrap_or(ControllerKind::Generic)
}

/// Find the application named in `text`
pub fn detect(text: &str) -> Option<Detection> {
    let lower = text.to_lowercase();
    APPLICATIONS.iter().find_map(|entry| {
        entry.aliases.iter().find_map(|&alias| {
            lower.find(alias).map(|position| Detection {
                application: entry.id,
                alias,
                position,
            })
        })
    })
}
