//! tmux implementation of the execution backend
//!
//! Drives the `tmux` binary through `tokio::process::Command` with argv
//! arrays — no shell sits between us and tmux, so target ids and format
//! strings are passed raw. The only shell involved is the one running
//! inside the pane, and quoting for that lives with the launch-command
//! builder, not here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

use super::{ExecutionBackend, PaneRef};
use crate::error::{AgentError, Result};

/// Format string yielding the composite pane handle
const PANE_FORMAT: &str = "#{session_id}:#{window_id}:#{pane_id}";

/// Attempts to resolve a freshly created session before giving up
const CREATE_RESOLVE_ATTEMPTS: u32 = 3;

/// Backend that runs agents in panes of a local tmux server
#[derive(Debug, Clone)]
pub struct TmuxBackend {
    tmux: PathBuf,
}

impl TmuxBackend {
    /// Locate the `tmux` binary on PATH
    ///
    /// # Errors
    /// Returns [`AgentError::BackendNotFound`] if tmux is not installed.
    pub fn new() -> Result<Self> {
        let tmux = which::which("tmux").map_err(|_| AgentError::backend_not_found())?;
        Ok(Self { tmux })
    }

    /// Use an explicit tmux binary path
    pub fn with_binary(tmux: impl Into<PathBuf>) -> Self {
        Self { tmux: tmux.into() }
    }

    /// Run one tmux command, returning trimmed stdout
    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.tmux)
            .args(args)
            .output()
            .await
            .map_err(|e| AgentError::backend(format!("failed to run tmux: {e}")))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(AgentError::backend(format!(
                "tmux {} failed: {stderr}",
                args.first().copied().unwrap_or("")
            )))
        }
    }

    /// Ask tmux for the composite handle of a target
    async fn display_pane(&self, target: Option<&str>) -> Result<PaneRef> {
        let stdout = match target {
            Some(target) => {
                self.run(&["display-message", "-t", target, "-p", PANE_FORMAT])
                    .await?
            }
            None => self.run(&["display-message", "-p", PANE_FORMAT]).await?,
        };
        parse_pane(&stdout)
    }
}

impl ExecutionBackend for TmuxBackend {
    async fn current_context(&self) -> Result<Option<PaneRef>> {
        // Failure here just means we are not inside tmux.
        Ok(self.display_pane(None).await.ok())
    }

    async fn create_shared_context(&self, name: &str) -> Result<PaneRef> {
        // Detached, and explicitly sized: the default 80x24 is too small to
        // split in CI environments ("no space for new pane").
        match self
            .run(&["new-session", "-d", "-s", name, "-x", "800", "-y", "600"])
            .await
        {
            Ok(_) => {}
            Err(AgentError::Backend(msg)) if msg.contains("duplicate session") => {}
            Err(e) => return Err(e),
        }

        // Give the server a moment to initialize in CI.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut last_err = AgentError::backend("tmux server did not come up");
        for _ in 0..CREATE_RESOLVE_ATTEMPTS {
            match self.display_pane(Some(name)).await {
                Ok(pane) => return Ok(pane),
                Err(AgentError::Backend(msg)) if msg.contains("no server running") => {
                    last_err = AgentError::backend(msg);
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err)
    }

    async fn shared_context(&self, name: &str) -> Result<Option<PaneRef>> {
        Ok(self.display_pane(Some(name)).await.ok())
    }

    async fn split_slot(&self, context: &PaneRef, cwd: Option<&Path>) -> Result<PaneRef> {
        let cwd_str = cwd.map(|c| c.to_string_lossy().into_owned());
        let mut args = vec!["split-window", "-d", "-h", "-t", context.pane_id.as_str()];
        if let Some(cwd_str) = cwd_str.as_deref() {
            args.push("-c");
            args.push(cwd_str);
        }
        args.extend(["-P", "-F", PANE_FORMAT]);

        let stdout = self.run(&args).await?;
        parse_pane(&stdout)
    }

    async fn send_command(&self, slot: &str, text: &str) -> Result<()> {
        self.run(&["send-keys", "-t", slot, text, "Enter"]).await?;
        // Small grace period for slow shell prompts before the caller
        // assumes the command was accepted.
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    }

    async fn kill_slot(&self, slot: &str) -> Result<()> {
        self.run(&["kill-pane", "-t", slot]).await?;
        Ok(())
    }

    async fn capture_output(&self, slot: &str, lines: u32) -> Result<String> {
        let start = format!("-{lines}");
        self.run(&["capture-pane", "-p", "-t", slot, "-S", &start])
            .await
    }
}

/// Parse a `session:window:pane` line from tmux
fn parse_pane(line: &str) -> Result<PaneRef> {
    let mut parts = line.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(session), Some(window), Some(pane)) if !pane.is_empty() => Ok(PaneRef {
            session_id: session.to_string(),
            window_id: window.to_string(),
            pane_id: pane.to_string(),
        }),
        _ => Err(AgentError::backend(format!(
            "unexpected tmux pane format: {line:?}"
        ))),
    }
}
