//! Host process helpers
//!
//! Commands run through `sh -c` with a timeout and `kill_on_drop`, so a step
//! that is timed out or cancelled takes its child with it. GUI programs are
//! launched detached and remembered in a `ChildSlot`.

use crate::controller::{ControllerError, ControllerResult};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Bounded `sh -c` runner
#[derive(Debug, Clone)]
pub struct Shell {
    timeout: Duration,
    output_limit: usize,
}

impl Shell {
    pub fn new(timeout: Duration, output_limit: usize) -> Self {
        Self {
            timeout,
            output_limit,
        }
    }

    /// Run `command`; non-zero exit is an error carrying the output
    pub async fn run(&self, command: &str) -> ControllerResult {
        tracing::debug!(command, "Running shell command");
        let output = run_with_timeout("sh", &["-c", command], self.timeout).await?;
        let text = output_text(&output);

        if !output.status.success() {
            return Err(ControllerError::CommandFailed {
                status: output.status.to_string(),
                output: truncate(&text, self.output_limit),
            });
        }

        if text.is_empty() {
            Ok("Command completed".into())
        } else {
            Ok(truncate(&text, self.output_limit))
        }
    }
}

/// Run a program directly, failing on non-zero exit
pub async fn run_program(program: &str, args: &[&str], timeout: Duration) -> ControllerResult {
    if !is_installed(program) {
        return Err(ControllerError::NotInstalled(program.to_string()));
    }
    let output = run_with_timeout(program, args, timeout).await?;
    let text = output_text(&output);
    if output.status.success() {
        Ok(text)
    } else {
        Err(ControllerError::CommandFailed {
            status: output.status.to_string(),
            output: text,
        })
    }
}

async fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<std::process::Output, ControllerError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| ControllerError::Spawn {
        program: program.to_string(),
        source,
    })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            tracing::warn!(program, "Process timed out, killed");
            Err(ControllerError::Timeout(timeout.as_secs()))
        }
    }
}

/// Stdout if there is any, else stderr, trimmed
fn output_text(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        String::from_utf8_lossy(&output.stderr).trim().to_string()
    } else {
        stdout.trim().to_string()
    }
}

/// Cut `text` to `limit` characters
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Whether `program` resolves to an executable on `PATH` (or directly, with a slash)
pub fn is_installed(program: &str) -> bool {
    which::which(program).is_ok()
}

/// Start a GUI program detached from our stdio
pub fn launch(program: &str, args: &[&str]) -> Result<Child, ControllerError> {
    if !is_installed(program) {
        return Err(ControllerError::NotInstalled(program.to_string()));
    }
    tracing::info!(program, ?args, "Launching");
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ControllerError::Spawn {
            program: program.to_string(),
            source,
        })
}

/// Launch the first installed candidate, returning which one started
pub fn launch_first<'a>(
    candidates: &[(&'a str, &[&str])],
) -> Result<(&'a str, Child), ControllerError> {
    for (program, args) in candidates {
        match launch(program, args) {
            Ok(child) => return Ok((*program, child)),
            Err(ControllerError::NotInstalled(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    let names: Vec<&str> = candidates.iter().map(|(p, _)| *p).collect();
    Err(ControllerError::NotInstalled(names.join(" / ")))
}

/// A remembered child process, for "already open" and `close`
#[derive(Debug, Default)]
pub struct ChildSlot {
    child: Option<Child>,
}

impl ChildSlot {
    pub fn set(&mut self, child: Child) {
        self.child = Some(child);
    }

    /// Whether the remembered child is still alive
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(_) => {
                self.child = None;
                false
            }
            None => false,
        }
    }

    /// Best-effort kill; `true` if there was a live child to signal
    pub fn kill(&mut self) -> bool {
        let running = self.is_running();
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                tracing::debug!(error = %e, "Kill failed");
                return false;
            }
        }
        running
    }
}

/// Expand a leading `~/` against the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Write a file, creating parent directories
pub async fn write_file(filename: &str, content: &str) -> Result<PathBuf, ControllerError> {
    if filename.trim().is_empty() {
        return Err(ControllerError::InvalidField {
            field: "filename",
            reason: "empty".into(),
        });
    }
    let path = expand_home(filename);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, content).await?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "Wrote file");
    Ok(path)
}
