//! Concrete controllers, one per `ControllerKind`

use crate::controller::desktop::Desktop;
use crate::controller::shell::{expand_home, launch, launch_first, write_file, ChildSlot, Shell};
use crate::controller::{Controller, ControllerError, ControllerResult};
use crate::core::config::ExecutionConfig;
use crate::core::types::{ApplicationId, ControllerKind};
use crate::registry;
use async_trait::async_trait;

const NO_ARGS: &[&str] = &[];

/// Build the controller for `application` from its registry kind
pub fn build_controller(application: ApplicationId, config: &ExecutionConfig) -> Box<dyn Controller> {
    let shell = || Shell::new(config.command_timeout(), config.output_limit);
    let desktop = || Desktop::new(config.screenshot_dir.clone(), config.command_timeout());

    match registry::controller_kind(application) {
        ControllerKind::Terminal => Box::new(TerminalController {
            shell: shell(),
            desktop: desktop(),
            window: ChildSlot::default(),
        }),
        ControllerKind::Browser => Box::new(match application {
            ApplicationId::Firefox => BrowserController::new("Firefox", "firefox", desktop()),
            _ => BrowserController::new("Chrome", "google-chrome", desktop()),
        }),
        ControllerKind::Editor => Box::new(EditorController {
            shell: shell(),
            desktop: desktop(),
        }),
        ControllerKind::FileManager => Box::new(FileManagerController {
            shell: shell(),
            desktop: desktop(),
            window: ChildSlot::default(),
        }),
        ControllerKind::Spreadsheet => Box::new(SpreadsheetController {
            desktop: desktop(),
            window: ChildSlot::default(),
        }),
        ControllerKind::Messenger => Box::new(MessengerController {
            desktop: desktop(),
            window: ChildSlot::default(),
        }),
        ControllerKind::MediaPlayer => Box::new(match application {
            ApplicationId::Vlc => MediaPlayerController::new("VLC", "vlc", true, desktop()),
            _ => MediaPlayerController::new("Spotify", "spotify", false, desktop()),
        }),
        ControllerKind::TradingTerminal => Box::new(match application {
            ApplicationId::Mt5 => TradingTerminalController::mt5(shell(), desktop()),
            _ => TradingTerminalController::mt4(shell(), desktop()),
        }),
        ControllerKind::System => Box::new(ToolController::new(
            "System",
            "System operations available",
            shell(),
        )),
        ControllerKind::Git => Box::new(ToolController::new("Git", "Git operations ready", shell())),
        ControllerKind::Docker => Box::new(ToolController::new(
            "Docker",
            "Docker operations ready",
            shell(),
        )),
        ControllerKind::Generic => Box::new(GenericController::new(application)),
    }
}

/// Search engine URL for a free-text query
pub fn search_url(query: &str) -> Result<String, ControllerError> {
    reqwest::Url::parse_with_params("https://www.google.com/search", &[("q", query)])
        .map(String::from)
        .map_err(|e| ControllerError::InvalidField {
            field: "query",
            reason: e.to_string(),
        })
}

/// Launch unless the remembered window is still alive
fn open_once(
    window: &mut ChildSlot,
    name: &str,
    candidates: &[(&str, &[&str])],
) -> ControllerResult {
    if window.is_running() {
        return Ok(format!("{} already open", name));
    }
    let (_, child) = launch_first(candidates)?;
    window.set(child);
    Ok(format!("{} opened", name))
}

fn close_window(window: &mut ChildSlot, name: &str) -> ControllerResult {
    if !window.kill() {
        tracing::debug!(app = name, "Close requested with no live window");
    }
    Ok(format!("{} closed", name))
}

pub struct TerminalController {
    shell: Shell,
    desktop: Desktop,
    window: ChildSlot,
}

#[async_trait]
impl Controller for TerminalController {
    fn name(&self) -> &str {
        "Terminal"
    }

    async fn open(&mut self) -> ControllerResult {
        open_once(
            &mut self.window,
            "Terminal",
            &[
                ("x-terminal-emulator", NO_ARGS),
                ("gnome-terminal", NO_ARGS),
                ("konsole", NO_ARGS),
                ("xterm", NO_ARGS),
            ],
        )
    }

    async fn close(&mut self) -> ControllerResult {
        close_window(&mut self.window, "Terminal")
    }

    async fn create_file(&mut self, filename: &str, content: &str) -> ControllerResult {
        let path = write_file(filename, content).await?;
        Ok(format!("Created: {}", path.display()))
    }

    fn shell(&self) -> Option<&Shell> {
        Some(&self.shell)
    }

    fn desktop(&self) -> Option<&Desktop> {
        Some(&self.desktop)
    }
}

pub struct BrowserController {
    name: &'static str,
    program: &'static str,
    desktop: Desktop,
    window: ChildSlot,
}

impl BrowserController {
    fn new(name: &'static str, program: &'static str, desktop: Desktop) -> Self {
        Self {
            name,
            program,
            desktop,
            window: ChildSlot::default(),
        }
    }
}

#[async_trait]
impl Controller for BrowserController {
    fn name(&self) -> &str {
        self.name
    }

    async fn open(&mut self) -> ControllerResult {
        open_once(
            &mut self.window,
            self.name,
            &[(self.program, &["--new-window"][..])],
        )
    }

    async fn close(&mut self) -> ControllerResult {
        close_window(&mut self.window, self.name)
    }

    async fn navigate_url(&mut self, url: &str) -> ControllerResult {
        self.desktop.enter_address(url).await?;
        Ok(format!("Navigated to {}", url))
    }

    fn desktop(&self) -> Option<&Desktop> {
        Some(&self.desktop)
    }
}

/// VS Code; it forks and exits, so there is no window to remember
pub struct EditorController {
    shell: Shell,
    desktop: Desktop,
}

#[async_trait]
impl Controller for EditorController {
    fn name(&self) -> &str {
        "VS Code"
    }

    async fn open(&mut self) -> ControllerResult {
        launch("code", NO_ARGS)?;
        Ok("VS Code opened".into())
    }

    async fn create_file(&mut self, filename: &str, content: &str) -> ControllerResult {
        let path = write_file(filename, content).await?;
        let shown = path.to_string_lossy().into_owned();
        match launch("code", &[shown.as_str()]) {
            Ok(_) => Ok(format!("Created {} and opened it in VS Code", shown)),
            Err(e) => {
                tracing::warn!(error = %e, "Created file but could not open it in the editor");
                Ok(format!("Created: {}", shown))
            }
        }
    }

    fn shell(&self) -> Option<&Shell> {
        Some(&self.shell)
    }

    fn desktop(&self) -> Option<&Desktop> {
        Some(&self.desktop)
    }
}

pub struct FileManagerController {
    shell: Shell,
    desktop: Desktop,
    window: ChildSlot,
}

#[async_trait]
impl Controller for FileManagerController {
    fn name(&self) -> &str {
        "File manager"
    }

    async fn open(&mut self) -> ControllerResult {
        open_once(
            &mut self.window,
            "File manager",
            &[
                ("nautilus", NO_ARGS),
                ("dolphin", NO_ARGS),
                ("thunar", NO_ARGS),
                ("xdg-open", &["."][..]),
            ],
        )
    }

    async fn close(&mut self) -> ControllerResult {
        close_window(&mut self.window, "File manager")
    }

    async fn create_file(&mut self, filename: &str, content: &str) -> ControllerResult {
        let path = write_file(filename, content).await?;
        Ok(format!("Created: {}", path.display()))
    }

    fn shell(&self) -> Option<&Shell> {
        Some(&self.shell)
    }

    fn desktop(&self) -> Option<&Desktop> {
        Some(&self.desktop)
    }
}

pub struct SpreadsheetController {
    desktop: Desktop,
    window: ChildSlot,
}

#[async_trait]
impl Controller for SpreadsheetController {
    fn name(&self) -> &str {
        "LibreOffice Calc"
    }

    async fn open(&mut self) -> ControllerResult {
        open_once(
            &mut self.window,
            "LibreOffice Calc",
            &[("libreoffice", &["--calc"][..]), ("localc", NO_ARGS)],
        )
    }

    async fn close(&mut self) -> ControllerResult {
        close_window(&mut self.window, "LibreOffice Calc")
    }

    async fn create_file(&mut self, filename: &str, content: &str) -> ControllerResult {
        let path = write_file(filename, content).await?;
        Ok(format!("Spreadsheet created: {}", path.display()))
    }

    fn desktop(&self) -> Option<&Desktop> {
        Some(&self.desktop)
    }
}

pub struct MessengerController {
    desktop: Desktop,
    window: ChildSlot,
}

#[async_trait]
impl Controller for MessengerController {
    fn name(&self) -> &str {
        "Telegram"
    }

    async fn open(&mut self) -> ControllerResult {
        open_once(
            &mut self.window,
            "Telegram",
            &[("telegram-desktop", NO_ARGS), ("telegram", NO_ARGS)],
        )
    }

    async fn close(&mut self) -> ControllerResult {
        close_window(&mut self.window, "Telegram")
    }

    fn desktop(&self) -> Option<&Desktop> {
        Some(&self.desktop)
    }
}

pub struct MediaPlayerController {
    name: &'static str,
    program: &'static str,
    plays_files: bool,
    desktop: Desktop,
    window: ChildSlot,
}

impl MediaPlayerController {
    fn new(name: &'static str, program: &'static str, plays_files: bool, desktop: Desktop) -> Self {
        Self {
            name,
            program,
            plays_files,
            desktop,
            window: ChildSlot::default(),
        }
    }
}

#[async_trait]
impl Controller for MediaPlayerController {
    fn name(&self) -> &str {
        self.name
    }

    async fn open(&mut self) -> ControllerResult {
        open_once(&mut self.window, self.name, &[(self.program, NO_ARGS)])
    }

    /// Plays the file, replacing whatever this controller started before
    async fn open_file(&mut self, path: &str) -> ControllerResult {
        if !self.plays_files {
            return self.open().await;
        }
        let media = expand_home(path).to_string_lossy().into_owned();
        self.window.kill();
        let child = launch(self.program, &[media.as_str()])?;
        self.window.set(child);
        Ok(format!("Playing: {}", path))
    }

    async fn close(&mut self) -> ControllerResult {
        close_window(&mut self.window, self.name)
    }

    fn desktop(&self) -> Option<&Desktop> {
        Some(&self.desktop)
    }
}

/// Programs the trading terminal may run; anything else is refused
const READ_ONLY_PROGRAMS: &[&str] = &["tail", "head", "cat", "ls", "grep"];
const SHELL_METACHARACTERS: &[char] = &[';', '|', '&', '>', '<', '`', '$', '\n'];

/// MetaTrader under wine, or a native launcher when there is one
pub struct TradingTerminalController {
    name: &'static str,
    wine_exe: &'static str,
    native: &'static str,
    shell: Shell,
    desktop: Desktop,
    window: ChildSlot,
}

impl TradingTerminalController {
    fn mt4(shell: Shell, desktop: Desktop) -> Self {
        Self {
            name: "MetaTrader 4",
            wine_exe: "~/.wine/drive_c/Program Files/MetaTrader4/terminal.exe",
            native: "metatrader4",
            shell,
            desktop,
            window: ChildSlot::default(),
        }
    }

    fn mt5(shell: Shell, desktop: Desktop) -> Self {
        Self {
            name: "MetaTrader 5",
            wine_exe: "~/.wine/drive_c/Program Files/MetaTrader 5/terminal64.exe",
            native: "metatrader5",
            shell,
            desktop,
            window: ChildSlot::default(),
        }
    }
}

#[async_trait]
impl Controller for TradingTerminalController {
    fn name(&self) -> &str {
        self.name
    }

    async fn open(&mut self) -> ControllerResult {
        if self.window.is_running() {
            return Ok(format!("{} already open", self.name));
        }

        let exe = expand_home(self.wine_exe);
        let exe_arg = exe.to_string_lossy().into_owned();
        let wine_args: &[&str] = &[exe_arg.as_str()];
        let mut candidates: Vec<(&str, &[&str])> = Vec::new();
        if exe.is_file() {
            candidates.push(("wine", wine_args));
        }
        candidates.push((self.native, NO_ARGS));

        let (program, child) = launch_first(&candidates)?;
        self.window.set(child);
        Ok(format!("{} opening via {}", self.name, program))
    }

    async fn close(&mut self) -> ControllerResult {
        close_window(&mut self.window, self.name)
    }

    async fn run_command(&mut self, command: &str) -> ControllerResult {
        let program = command.split_whitespace().next().unwrap_or_default();
        if !READ_ONLY_PROGRAMS.contains(&program) || command.contains(SHELL_METACHARACTERS) {
            return Err(ControllerError::InvalidField {
                field: "command",
                reason: format!(
                    "{} only runs plain {} commands",
                    self.name,
                    READ_ONLY_PROGRAMS.join("/")
                ),
            });
        }
        self.shell.run(command).await
    }

    fn desktop(&self) -> Option<&Desktop> {
        Some(&self.desktop)
    }
}

/// Command-line tools with nothing to open: system, git, docker
pub struct ToolController {
    name: &'static str,
    ready: &'static str,
    shell: Shell,
}

impl ToolController {
    fn new(name: &'static str, ready: &'static str, shell: Shell) -> Self {
        Self { name, ready, shell }
    }
}

#[async_trait]
impl Controller for ToolController {
    fn name(&self) -> &str {
        self.name
    }

    async fn open(&mut self) -> ControllerResult {
        Ok(self.ready.to_string())
    }

    fn shell(&self) -> Option<&Shell> {
        Some(&self.shell)
    }
}

/// Fallback for applications without a dedicated controller
///
/// Opens a program named after the application identifier and nothing else.
pub struct GenericController {
    application: ApplicationId,
    window: ChildSlot,
}

impl GenericController {
    pub fn new(application: ApplicationId) -> Self {
        Self {
            application,
            window: ChildSlot::default(),
        }
    }
}

#[async_trait]
impl Controller for GenericController {
    fn name(&self) -> &str {
        self.application.as_str()
    }

    async fn open(&mut self) -> ControllerResult {
        let program = self.application.as_str();
        open_once(&mut self.window, program, &[(program, NO_ARGS)])
    }

    async fn close(&mut self) -> ControllerResult {
        close_window(&mut self.window, self.application.as_str())
    }
}
