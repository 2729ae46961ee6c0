//! Durable session store: agent record creation, enumeration, deletion
//!
//! The store owns the on-disk layout and nothing else — no execution
//! backend, no in-memory caches. The `meta.json` snapshot is the sole
//! source of truth: an agent exists iff its metadata record is present and
//! parses.

use serde_json::Value;

use super::layout::SessionLayout;
use crate::error::{AgentError, Result};
use crate::types::{Agent, AgentId, AgentStatus};

/// Inputs for a new agent record; the store allocates the id and stamps the
/// creation time.
#[derive(Debug, Clone)]
pub struct NewAgentRecord {
    /// Human-readable name
    pub name: String,
    /// Role string
    pub role: String,
    /// Composite execution-context handle
    pub pane_ref: String,
    /// Initial free-form metadata
    pub metadata: serde_json::Map<String, Value>,
}

/// Creates, enumerates, and deletes agent records within one session
#[derive(Debug, Clone)]
pub struct SessionStore {
    layout: SessionLayout,
}

impl SessionStore {
    /// Create a store over `layout`
    #[must_use]
    pub fn new(layout: SessionLayout) -> Self {
        Self { layout }
    }

    /// The layout this store operates on
    #[must_use]
    pub fn layout(&self) -> &SessionLayout {
        &self.layout
    }

    /// Allocate a fresh id and persist a new agent record
    ///
    /// Builds the directory subtree (including `artifacts/`), writes an
    /// empty `inbox.jsonl`, and finally the pretty-printed `meta.json`. The
    /// directory is re-created immediately before the metadata write in
    /// case an external cleanup removed it between steps.
    ///
    /// # Errors
    /// Returns an I/O error if any directory or file write fails.
    pub async fn create_agent_record(&self, record: NewAgentRecord) -> Result<Agent> {
        let agent = Agent {
            id: AgentId::generate(),
            name: record.name,
            role: record.role,
            pane_ref: record.pane_ref,
            status: AgentStatus::Created,
            created_at: chrono::Utc::now().timestamp_millis(),
            metadata: record.metadata,
        };

        let agent_dir = self.layout.agent_dir(&agent.id);
        tokio::fs::create_dir_all(self.layout.artifacts(&agent.id)).await?;
        tokio::fs::write(self.layout.inbox(&agent.id), "").await?;

        tokio::fs::create_dir_all(&agent_dir).await?;
        let meta = serde_json::to_vec_pretty(&agent)?;
        tokio::fs::write(self.layout.meta(&agent.id), meta).await?;

        Ok(agent)
    }

    /// Load one agent's metadata record
    ///
    /// # Errors
    /// Returns [`AgentError::AgentNotFound`] if the record is absent and a
    /// decode error if it does not parse.
    pub async fn load(&self, id: &AgentId) -> Result<Agent> {
        let meta_path = self.layout.meta(id);
        let content = tokio::fs::read_to_string(&meta_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AgentError::agent_not_found(id.as_str())
            } else {
                AgentError::Io(e)
            }
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Enumerate this session's agents
    ///
    /// Directory entries without a parseable `meta.json` are skipped with a
    /// warning — a half-written or externally corrupted record never makes
    /// the whole listing fail. A missing agents directory is an empty
    /// session.
    pub async fn list(&self) -> Vec<Agent> {
        let agents_dir = self.layout.agents_dir();
        let mut entries = match tokio::fs::read_dir(&agents_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::error!("Failed to list agents in {}: {e}", agents_dir.display());
                return Vec::new();
            }
        };

        let mut agents = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let meta_path = entry.path().join("meta.json");
            match tokio::fs::read_to_string(&meta_path).await {
                Ok(content) => match serde_json::from_str::<Agent>(&content) {
                    Ok(agent) => agents.push(agent),
                    Err(e) => {
                        log::warn!(
                            "Skipping agent directory {}: meta.json invalid: {e}",
                            entry.file_name().to_string_lossy()
                        );
                    }
                },
                Err(_) => {
                    log::warn!(
                        "Skipping agent directory {}: meta.json not found",
                        entry.file_name().to_string_lossy()
                    );
                }
            }
        }
        agents
    }

    /// Remove an agent's entire directory subtree
    ///
    /// This is the authoritative delete: once it returns, the agent can
    /// never reappear in an enumeration, regardless of what happened to its
    /// execution slot. Removing an already-absent directory is a no-op.
    ///
    /// # Errors
    /// Returns an I/O error only for failures other than the directory
    /// already being gone.
    pub async fn delete(&self, id: &AgentId) -> Result<()> {
        match tokio::fs::remove_dir_all(self.layout.agent_dir(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AgentError::Io(e)),
        }
    }
}
