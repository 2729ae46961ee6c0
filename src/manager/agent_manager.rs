//! Agent manager: the façade over store, bus, readers, and backend
//!
//! One `AgentManager` instance is one orchestration run: it owns a session
//! id, a workspace root, and an injected execution backend, and exposes the
//! operations an outer transport would wrap (create/list/delete agent,
//! send/read/wait, plus task enqueueing, broadcast events, and pane
//! capture). All durable state lives on the filesystem; the manager itself
//! holds no locks and no caches.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::backend::{ExecutionBackend, slot_from_composite};
use crate::error::{AgentError, Result};
use crate::mailbox::{MailboxBus, PollConfig, read_records, wait_for_record};
use crate::store::{NewAgentRecord, SessionLayout, SessionStore};
use crate::types::{
    Agent, AgentId, CreateAgentParams, Entity, Payload, ReadPage, SessionId, Target, WaitOutcome,
};

use super::launch::{LaunchCommand, inception_prompt, validate_env_keys};
use super::{DEFAULT_CAPTURE_LINES, SHARED_CONTEXT_NAME};

/// Coordinates one session's agents through the filesystem bus
pub struct AgentManager<B> {
    layout: SessionLayout,
    store: SessionStore,
    bus: MailboxBus,
    backend: B,
    poll: PollConfig,
}

impl<B: ExecutionBackend> AgentManager<B> {
    /// Create a manager with a freshly generated session id (orchestrator
    /// startup)
    pub fn new(root: impl Into<PathBuf>, backend: B) -> Self {
        Self::with_session(root, SessionId::generate(), backend)
    }

    /// Create a manager joined to an existing session
    ///
    /// An explicitly supplied id always wins over generation; pass
    /// [`SessionId::from_env`] output here to adopt a parent orchestrator's
    /// session from a spawned sub-process.
    pub fn with_session(root: impl Into<PathBuf>, session: SessionId, backend: B) -> Self {
        let layout = SessionLayout::new(root, session);
        let store = SessionStore::new(layout.clone());
        let bus = MailboxBus::new(layout.clone());
        Self {
            layout,
            store,
            bus,
            backend,
            poll: PollConfig::default(),
        }
    }

    /// Replace the polling configuration
    #[must_use]
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// The session this manager coordinates
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        self.layout.session()
    }

    /// The bus this manager routes through
    #[must_use]
    pub fn bus(&self) -> &MailboxBus {
        &self.bus
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stand up a new agent: execution slot, durable record, launch command
    ///
    /// Resolves an execution context (the current pane when already inside
    /// one, else a dedicated shared context, created on demand), splits an
    /// isolated slot off it, persists the agent record, and sends exactly
    /// one composed command line into the slot. Environment keys are
    /// validated before the backend is touched, so a bad key can never
    /// reach a shell. Backend failures here are fatal — no agent record is
    /// left behind for a slot that never existed.
    ///
    /// # Errors
    /// Validation, backend, and I/O errors all abort creation.
    pub async fn create_agent(&self, params: CreateAgentParams) -> Result<Agent> {
        if let Some(env) = &params.env {
            validate_env_keys(env)?;
        }

        let context = match self.backend.current_context().await? {
            Some(context) => context,
            None => match self.backend.shared_context(SHARED_CONTEXT_NAME).await? {
                Some(context) => context,
                None => {
                    self.backend
                        .create_shared_context(SHARED_CONTEXT_NAME)
                        .await?
                }
            },
        };

        let cwd = params.cwd.as_ref().map(PathBuf::from);
        let pane = self.backend.split_slot(&context, cwd.as_deref()).await?;

        // Record creation comes after the slot exists: an external cleanup
        // racing the split would otherwise delete the half-built directory
        // out from under us.
        let agent = self
            .store
            .create_agent_record(NewAgentRecord {
                name: params.name.clone(),
                role: params.role.clone(),
                pane_ref: pane.composite(),
                metadata: serde_json::Map::new(),
            })
            .await?;

        let inception_path = self.layout.inception(&agent.id);
        if params.executable_override.is_none() {
            let timeout_ms = self.poll.default_timeout.as_millis() as u64;
            tokio::fs::write(&inception_path, inception_prompt(&agent, timeout_ms)).await?;
        }

        let command =
            LaunchCommand::new(&agent, &params, self.layout.session(), &inception_path).build()?;
        self.backend.send_command(&pane.pane_id, &command).await?;

        log::info!("Created agent {} ({}) in pane {}", agent.id, agent.name, agent.pane_ref);
        Ok(agent)
    }

    /// Enumerate this session's agents
    ///
    /// Corrupt or half-written records are skipped with a warning, never
    /// fatal to the listing.
    pub async fn list_agents(&self) -> Vec<Agent> {
        self.store.list().await
    }

    /// Tear down an agent: best-effort slot kill, authoritative directory
    /// removal
    ///
    /// The metadata record is read only to find the execution slot; if it
    /// is missing or corrupt the kill step is skipped with a warning. The
    /// directory removal always proceeds, so a deleted agent can never
    /// reappear in a listing even when the backend teardown failed.
    ///
    /// # Errors
    /// Returns [`AgentError::InvalidTarget`] for a malformed id, or an I/O
    /// error if the directory removal itself fails.
    pub async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        let id = AgentId::parse(agent_id)?;

        match self.store.load(&id).await {
            Ok(agent) => {
                let slot = slot_from_composite(&agent.pane_ref).to_string();
                if let Err(e) = self.backend.kill_slot(&slot).await {
                    log::warn!("Could not kill pane {slot} for agent {id}: {e}");
                }
            }
            Err(e) => {
                log::warn!("Could not read pane handle for agent {id} ({e}); skipping teardown");
            }
        }

        self.store.delete(&id).await
    }

    // ========================================================================
    // Messaging
    // ========================================================================

    /// Send a message from `from` to `target`
    ///
    /// `from` is `"master"` or an agent id; both are validated before any
    /// I/O. Routing and fan-out semantics are those of
    /// [`MailboxBus::send`].
    ///
    /// # Errors
    /// Validation errors, or a failed append to the orchestrator's log.
    pub async fn send_message(&self, from: &str, message: Payload, target: Target) -> Result<()> {
        let from = Entity::parse(from)?;
        self.bus.send(&from, message, &target).await
    }

    /// Read an entity's mailbox from a caller-held cursor
    ///
    /// `entity` is `"master"` or an agent id. A missing log reads as empty;
    /// malformed lines are dropped but still consumed.
    ///
    /// # Errors
    /// Only validation of the entity reference can fail.
    pub async fn read_inbox(
        &self,
        entity: &str,
        cursor: u64,
        limit: Option<usize>,
    ) -> Result<ReadPage> {
        let entity = Entity::parse(entity)?;
        Ok(read_records(&self.layout.inbox_for(&entity), cursor, limit).await)
    }

    /// Block until the next command for `agent_id` arrives or the timeout
    /// elapses
    ///
    /// `timeout_ms` defaults to the configured poll timeout. A timed-out
    /// wait returns the caller's cursor unchanged and is safely retriable.
    ///
    /// # Errors
    /// Only validation of the agent id can fail.
    pub async fn wait_for_command(
        &self,
        agent_id: &str,
        cursor: u64,
        timeout_ms: Option<u64>,
    ) -> Result<WaitOutcome> {
        let id = AgentId::parse(agent_id)?;
        let timeout = timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.poll.default_timeout);
        Ok(wait_for_record(&self.layout.inbox(&id), cursor, timeout, &self.poll).await)
    }

    /// Append a task record to an agent's inbox, returning the task id
    ///
    /// # Errors
    /// Validation of the agent id, or the inbox append failing.
    pub async fn enqueue_task(&self, agent_id: &str, payload: Value) -> Result<String> {
        let id = AgentId::parse(agent_id)?;
        self.bus.enqueue_task(&id, payload).await
    }

    /// Append an agent-attributed event to the session broadcast log
    ///
    /// # Errors
    /// Validation of the agent id, or the broadcast append failing.
    pub async fn emit_event(&self, agent_id: &str, event: Payload) -> Result<()> {
        let id = AgentId::parse(agent_id)?;
        self.bus.emit_event(&id, event).await
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Capture the last `lines` lines of an agent's pane output
    ///
    /// # Errors
    /// Returns [`AgentError::AgentNotFound`] if the agent's record is
    /// missing or corrupt, or a backend error if the capture fails.
    pub async fn capture_output(&self, agent_id: &str, lines: Option<u32>) -> Result<String> {
        let id = AgentId::parse(agent_id)?;
        let agent = self.store.load(&id).await.map_err(|e| match e {
            AgentError::JsonDecode(_) => AgentError::agent_not_found(agent_id),
            other => other,
        })?;

        let slot = slot_from_composite(&agent.pane_ref).to_string();
        self.backend
            .capture_output(&slot, lines.unwrap_or(DEFAULT_CAPTURE_LINES))
            .await
    }
}
