//! Per-application controllers
//!
//! Every application is driven through the same capability set. `open` is
//! the only operation a controller has to provide; the rest default to
//! either a generic behavior (`close`, `wait`), the controller's shell or
//! desktop helpers when it has them, or an `Unsupported` error.

pub mod apps;
pub mod desktop;
pub mod registry;
pub mod shell;

pub use apps::{build_controller, search_url, GenericController};
pub use desktop::Desktop;
pub use registry::{
    Acquired, ControllerFactory, ControllerRegistry, DefaultControllerFactory, SharedController,
};
pub use shell::Shell;

use crate::plan::ActionKind;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Longest pause a `wait` step may request
pub const MAX_WAIT_SECS: f64 = 30.0;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("{action} is not supported by the {controller} controller")]
    Unsupported {
        action: ActionKind,
        controller: String,
    },

    #[error("Missing field `{0}`")]
    MissingField(&'static str),

    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("{0} is not installed")]
    NotInstalled(String),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Command exited with {status}: {output}")]
    CommandFailed { status: String, output: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ControllerResult = std::result::Result<String, ControllerError>;

/// Capability set shared by every application controller
#[async_trait]
pub trait Controller: Send {
    /// Human-readable application name used in results
    fn name(&self) -> &str;

    async fn open(&mut self) -> ControllerResult;

    /// Open with a document; controllers that cannot just open
    async fn open_file(&mut self, _path: &str) -> ControllerResult {
        self.open().await
    }

    async fn close(&mut self) -> ControllerResult {
        Ok(format!("{} closed", self.name()))
    }

    async fn run_command(&mut self, command: &str) -> ControllerResult {
        match self.shell() {
            Some(shell) => shell.run(command).await,
            None => Err(self.unsupported(ActionKind::RunCommand)),
        }
    }

    async fn create_file(&mut self, _filename: &str, _content: &str) -> ControllerResult {
        Err(self.unsupported(ActionKind::CreateFile))
    }

    async fn navigate_url(&mut self, _url: &str) -> ControllerResult {
        Err(self.unsupported(ActionKind::NavigateUrl))
    }

    async fn type_text(&mut self, text: &str) -> ControllerResult {
        match self.desktop() {
            Some(desktop) => desktop.type_text(text).await,
            None => Err(self.unsupported(ActionKind::TypeText)),
        }
    }

    async fn click(&mut self, x: i64, y: i64) -> ControllerResult {
        match self.desktop() {
            Some(desktop) => desktop.click(x, y).await,
            None => Err(self.unsupported(ActionKind::Click)),
        }
    }

    async fn press_key(&mut self, key: &str) -> ControllerResult {
        match self.desktop() {
            Some(desktop) => desktop.press_key(key).await,
            None => Err(self.unsupported(ActionKind::PressKey)),
        }
    }

    async fn wait(&mut self, seconds: f64) -> ControllerResult {
        let seconds = if seconds.is_finite() {
            seconds.clamp(0.0, MAX_WAIT_SECS)
        } else {
            0.0
        };
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        Ok(format!("Waited {}s", seconds))
    }

    async fn screenshot(&mut self) -> ControllerResult {
        match self.desktop() {
            Some(desktop) => desktop.screenshot().await,
            None => Err(self.unsupported(ActionKind::TakeScreenshot)),
        }
    }

    /// Shell used by the default `run_command`
    fn shell(&self) -> Option<&Shell> {
        None
    }

    /// Input and screen helpers used by the default desktop operations
    fn desktop(&self) -> Option<&Desktop> {
        None
    }

    fn unsupported(&self, action: ActionKind) -> ControllerError {
        ControllerError::Unsupported {
            action,
            controller: self.name().to_string(),
        }
    }
}
