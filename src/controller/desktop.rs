//! Keyboard, mouse and screen helpers for X11 sessions
//!
//! Input goes through `xdotool`; screenshots use whichever of ImageMagick's
//! `import`, `scrot` or `gnome-screenshot` is installed.

use crate::controller::shell::{is_installed, run_program};
use crate::controller::{ControllerError, ControllerResult};
use std::path::PathBuf;
use std::time::Duration;

const SCREENSHOT_TOOLS: &[&str] = &["import", "scrot", "gnome-screenshot"];

#[derive(Debug, Clone)]
pub struct Desktop {
    screenshot_dir: PathBuf,
    timeout: Duration,
}

impl Desktop {
    pub fn new(screenshot_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            screenshot_dir,
            timeout,
        }
    }

    async fn xdotool(&self, args: &[&str]) -> Result<(), ControllerError> {
        run_program("xdotool", args, self.timeout).await.map(|_| ())
    }

    pub async fn click(&self, x: i64, y: i64) -> ControllerResult {
        let (xs, ys) = (x.to_string(), y.to_string());
        self.xdotool(&["mousemove", xs.as_str(), ys.as_str(), "click", "1"]).await?;
        Ok(format!("Clicked at ({}, {})", x, y))
    }

    pub async fn type_text(&self, text: &str) -> ControllerResult {
        self.xdotool(&["type", "--delay", "20", "--", text]).await?;
        Ok(format!("Typed {} characters", text.chars().count()))
    }

    pub async fn press_key(&self, key: &str) -> ControllerResult {
        self.xdotool(&["key", "--", key]).await?;
        Ok(format!("Pressed {}", key))
    }

    /// Focus the address bar of the active window, type `url`, press Return
    pub async fn enter_address(&self, url: &str) -> Result<(), ControllerError> {
        self.xdotool(&["key", "ctrl+l"]).await?;
        tokio::time::sleep(Duration::from_millis(300)).await;
        self.xdotool(&["type", "--delay", "10", "--", url]).await?;
        self.xdotool(&["key", "Return"]).await
    }

    pub async fn screenshot(&self) -> ControllerResult {
        let path = self.screenshot_path();
        let target = path.to_string_lossy().into_owned();

        let tool = SCREENSHOT_TOOLS
            .iter()
            .copied()
            .find(|tool| is_installed(tool))
            .ok_or_else(|| ControllerError::NotInstalled(SCREENSHOT_TOOLS.join(" / ")))?;

        tokio::fs::create_dir_all(&self.screenshot_dir).await?;
        let args: Vec<&str> = match tool {
            "import" => vec!["-window", "root", target.as_str()],
            "gnome-screenshot" => vec!["-f", target.as_str()],
            _ => vec![target.as_str()],
        };
        run_program(tool, &args, self.timeout).await?;

        tracing::debug!(tool, path = %target, "Screenshot taken");
        Ok(format!("Screenshot saved: {}", target))
    }

    /// Timestamped file name inside the screenshot directory
    pub fn screenshot_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
        self.screenshot_dir.join(format!("screenshot_{}.png", stamp))
    }
}
