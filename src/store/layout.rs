//! On-disk layout of one session's subtree
//!
//! All paths hang off `<root>/.agents/sessions/<sessionId>/`:
//!
//! ```text
//! master_inbox.jsonl           orchestrator's own mailbox
//! broadcast.jsonl              session-wide event feed
//! agents/<agentId>/
//!   meta.json                  Agent record snapshot
//!   inbox.jsonl                this agent's mailbox
//!   inception.txt              bootstrap instruction text, if auto-launched
//!   artifacts/                 free-form working directory for the agent
//! ```
//!
//! (`outbox.jsonl` also lives in the agent directory, but it is agent-owned:
//! runners append to it, the core never creates or reads it.)

use std::path::{Path, PathBuf};

use crate::types::{AgentId, SessionId};

/// Top-level directory under the workspace root
const AGENTS_DIR: &str = ".agents";

/// Path arithmetic for a session's directory subtree
///
/// A plain bundle of root path and session id; cheap to clone and free of
/// I/O. Two layouts with different session ids address disjoint subtrees
/// even under a shared root.
#[derive(Debug, Clone)]
pub struct SessionLayout {
    root: PathBuf,
    session: SessionId,
}

impl SessionLayout {
    /// Create a layout for `session` rooted at `root`
    pub fn new(root: impl Into<PathBuf>, session: SessionId) -> Self {
        Self {
            root: root.into(),
            session,
        }
    }

    /// The session this layout addresses
    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// The workspace root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/.agents/sessions/<sessionId>`
    #[must_use]
    pub fn session_dir(&self) -> PathBuf {
        self.root
            .join(AGENTS_DIR)
            .join("sessions")
            .join(self.session.as_str())
    }

    /// The directory holding all agent subtrees of this session
    #[must_use]
    pub fn agents_dir(&self) -> PathBuf {
        self.session_dir().join("agents")
    }

    /// One agent's directory
    #[must_use]
    pub fn agent_dir(&self, id: &AgentId) -> PathBuf {
        self.agents_dir().join(id.as_str())
    }

    /// The orchestrator's mailbox log
    #[must_use]
    pub fn master_inbox(&self) -> PathBuf {
        self.session_dir().join("master_inbox.jsonl")
    }

    /// The session-wide broadcast event log
    #[must_use]
    pub fn broadcast_log(&self) -> PathBuf {
        self.session_dir().join("broadcast.jsonl")
    }

    /// One agent's mailbox log
    #[must_use]
    pub fn inbox(&self, id: &AgentId) -> PathBuf {
        self.agent_dir(id).join("inbox.jsonl")
    }

    /// One agent's metadata record
    #[must_use]
    pub fn meta(&self, id: &AgentId) -> PathBuf {
        self.agent_dir(id).join("meta.json")
    }

    /// One agent's bootstrap instruction file
    #[must_use]
    pub fn inception(&self, id: &AgentId) -> PathBuf {
        self.agent_dir(id).join("inception.txt")
    }

    /// One agent's free-form working directory
    #[must_use]
    pub fn artifacts(&self, id: &AgentId) -> PathBuf {
        self.agent_dir(id).join("artifacts")
    }

    /// Resolve the mailbox log for an entity reference
    #[must_use]
    pub fn inbox_for(&self, entity: &crate::types::Entity) -> PathBuf {
        match entity {
            crate::types::Entity::Master => self.master_inbox(),
            crate::types::Entity::Agent(id) => self.inbox(id),
        }
    }
}
