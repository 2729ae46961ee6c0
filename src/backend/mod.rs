//! Execution backend: the external collaborator that actually runs agents
//!
//! The core never talks to a terminal multiplexer directly; it goes through
//! the [`ExecutionBackend`] trait. Creation failures are fatal to agent
//! creation, kill failures during deletion are logged only — the callers
//! enforce that policy, the backend just reports.

pub mod tmux;

use std::future::Future;
use std::path::Path;

use crate::error::Result;

pub use tmux::TmuxBackend;

/// Handle to one execution slot (a tmux pane) and its enclosing context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneRef {
    /// Multiplexer session id (e.g. `$3`)
    pub session_id: String,
    /// Window id within the session (e.g. `@1`)
    pub window_id: String,
    /// Pane id within the window (e.g. `%5`)
    pub pane_id: String,
}

impl PaneRef {
    /// The composite `session:window:pane` form persisted in `meta.json`
    #[must_use]
    pub fn composite(&self) -> String {
        format!("{}:{}:{}", self.session_id, self.window_id, self.pane_id)
    }
}

/// Extract the slot (pane) component from a persisted composite handle,
/// falling back to the whole string for records written by older variants
/// that stored a bare pane id.
#[must_use]
pub fn slot_from_composite(composite: &str) -> &str {
    let mut parts = composite.split(':');
    let first = parts.next().unwrap_or(composite);
    match (parts.next(), parts.next()) {
        (_, Some(pane)) if !pane.is_empty() => pane,
        _ => first,
    }
}

/// Contract for the process-execution collaborator
///
/// All operations are fallible; implementations shell out or otherwise
/// reach external state, so every call can legitimately fail.
pub trait ExecutionBackend: Send + Sync {
    /// The context this process itself is running in, if any
    fn current_context(&self) -> impl Future<Output = Result<Option<PaneRef>>> + Send;

    /// Create a named shared context for agents to live in
    fn create_shared_context(&self, name: &str) -> impl Future<Output = Result<PaneRef>> + Send;

    /// Look up an existing named shared context
    fn shared_context(&self, name: &str) -> impl Future<Output = Result<Option<PaneRef>>> + Send;

    /// Split a new isolated execution slot off `context`
    fn split_slot(
        &self,
        context: &PaneRef,
        cwd: Option<&Path>,
    ) -> impl Future<Output = Result<PaneRef>> + Send;

    /// Type `text` into `slot` and submit it
    fn send_command(&self, slot: &str, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Kill `slot` and the process inside it
    fn kill_slot(&self, slot: &str) -> impl Future<Output = Result<()>> + Send;

    /// Capture the last `lines` lines of `slot`'s visible output
    fn capture_output(
        &self,
        slot: &str,
        lines: u32,
    ) -> impl Future<Output = Result<String>> + Send;
}
