//! Agent record and creation-parameter types
//!
//! The on-disk `meta.json` snapshot of an [`Agent`] is the sole source of
//! truth for enumeration: an agent exists, for orchestration purposes, iff
//! its metadata record is present and parses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::identifiers::AgentId;

// ============================================================================
// Agent Record
// ============================================================================

/// Advisory agent status
///
/// Set once at creation and never transitioned by the core; progress is
/// observed through emitted messages instead. Free-form annotation, not a
/// state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Record written, launch command sent
    Created,
    /// Agent reported itself ready
    Ready,
    /// Agent reported itself working
    Busy,
    /// Agent stopped reporting
    Stalled,
    /// Agent reported a failure
    Error,
}

/// One tracked worker process and its mailbox
///
/// Serialized pretty-printed to `meta.json` in the agent's directory. Field
/// names are camelCase on disk so spawned runners in any language read the
/// same record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Unique agent identifier
    pub id: AgentId,
    /// Human-readable name
    pub name: String,
    /// Role string handed to the agent's bootstrap prompt
    pub role: String,
    /// Opaque execution-context handle, `session:window:pane` composite
    pub pane_ref: String,
    /// Advisory status annotation
    pub status: AgentStatus,
    /// Creation time, epoch milliseconds
    pub created_at: i64,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

// ============================================================================
// Creation Parameters
// ============================================================================

/// Parameters for [`crate::AgentManager::create_agent`]
#[derive(Debug, Clone, Default)]
pub struct CreateAgentParams {
    /// Human-readable name
    pub name: String,
    /// Role string (e.g. "worker", "verifier")
    pub role: String,
    /// Working directory for the new execution slot
    pub cwd: Option<String>,
    /// Extra environment variables prefixed onto the launch command.
    /// Keys must match `[A-Za-z_][A-Za-z0-9_]*`; anything else fails
    /// validation before any process is spawned.
    pub env: Option<HashMap<String, String>>,
    /// Model passed to the agent CLI (`--model`)
    pub model: Option<String>,
    /// Run this command verbatim instead of the normal agent CLI launch
    /// (used by tests and the demo supervisor)
    pub executable_override: Option<String>,
    /// Extra arguments for the agent CLI
    pub args: Vec<String>,
}
