//! Message routing and fan-out across mailbox logs
//!
//! Every write appends exactly one line per target log; there is no
//! multi-target atomicity and none is needed — delivery is fire-and-forget
//! per target, and a failure writing to one log never prevents delivery to
//! the rest or rolls back lines already appended.

use std::path::Path;

use futures::future::join_all;
use serde_json::Value;

use crate::error::Result;
use crate::store::{SessionLayout, SessionStore};
use crate::types::{AgentId, Entity, Payload, Target};

/// Routes messages between the orchestrator and agent mailboxes
#[derive(Debug, Clone)]
pub struct MailboxBus {
    layout: SessionLayout,
    store: SessionStore,
}

impl MailboxBus {
    /// Create a bus over `layout`
    #[must_use]
    pub fn new(layout: SessionLayout) -> Self {
        let store = SessionStore::new(layout.clone());
        Self { layout, store }
    }

    /// Append a stamped message to the log(s) selected by `target`
    ///
    /// The record written is the caller's payload with `from` and
    /// `timestamp` (epoch ms) stamped over it. The sender's own inbox is
    /// never a delivery target, even when it appears in an explicit target
    /// list. For `Target::All` the set of "every other agent" is whatever
    /// the directory listing says at call time — a concurrent create or
    /// delete makes the fan-out best-effort, which is accepted.
    ///
    /// # Errors
    /// Fails only on the orchestrator-log append; per-agent fan-out
    /// failures are logged and swallowed so partial delivery is never
    /// reported as total failure.
    pub async fn send(&self, from: &Entity, message: Payload, target: &Target) -> Result<()> {
        let record = stamp_from(message, from);

        match target {
            Target::Master => {
                tokio::fs::create_dir_all(self.layout.session_dir()).await?;
                append_line(&self.layout.master_inbox(), &record).await?;
            }
            Target::All => {
                if *from != Entity::Master {
                    tokio::fs::create_dir_all(self.layout.session_dir()).await?;
                    append_line(&self.layout.master_inbox(), &record).await?;
                }
                let agents = self.store.list().await;
                let deliveries = agents
                    .iter()
                    .filter(|agent| agent.id.as_str() != from.as_str())
                    .map(|agent| self.deliver_to_agent(agent.id.clone(), record.clone()));
                join_all(deliveries).await;
            }
            Target::One(id) => {
                if id.as_str() != from.as_str() {
                    self.deliver_to_agent(id.clone(), record).await;
                }
            }
            Target::Many(ids) => {
                let deliveries = ids
                    .iter()
                    .filter(|id| id.as_str() != from.as_str())
                    .map(|id| self.deliver_to_agent(id.clone(), record.clone()));
                join_all(deliveries).await;
            }
        }

        Ok(())
    }

    /// Append a task record to one agent's inbox and return the task id
    ///
    /// The record is `{type: "task", taskId, payload, from: "master",
    /// timestamp}` — the shape a polling runner consumes.
    ///
    /// # Errors
    /// Fails if the append fails (single-target operation; unlike a
    /// fan-out, the caller needs to know the task never landed).
    pub async fn enqueue_task(&self, agent: &AgentId, payload: Value) -> Result<String> {
        let task_id = uuid::Uuid::new_v4().to_string();
        let mut record = Payload::new();
        record.insert("type".to_string(), Value::String("task".to_string()));
        record.insert("taskId".to_string(), Value::String(task_id.clone()));
        record.insert("payload".to_string(), payload);
        let record = stamp_from(record, &Entity::Master);

        append_line(&self.layout.inbox(agent), &record).await?;
        Ok(task_id)
    }

    /// Append an agent-attributed event to the session-wide broadcast log
    ///
    /// Stamps `agentId` and `timestamp`. Broadcast entries are strictly
    /// session-scoped: a different session id over the same root never
    /// observes them.
    ///
    /// # Errors
    /// Fails if the session directory cannot be created or the append fails.
    pub async fn emit_event(&self, agent: &AgentId, event: Payload) -> Result<()> {
        let mut record = event;
        record.insert(
            "agentId".to_string(),
            Value::String(agent.as_str().to_string()),
        );
        record.insert(
            "timestamp".to_string(),
            Value::from(chrono::Utc::now().timestamp_millis()),
        );

        tokio::fs::create_dir_all(self.layout.session_dir()).await?;
        append_line(&self.layout.broadcast_log(), &record).await
    }

    /// Best-effort append to one agent's inbox; failures are logged only
    async fn deliver_to_agent(&self, id: AgentId, record: Payload) {
        if let Err(e) = append_line(&self.layout.inbox(&id), &record).await {
            log::error!("Failed to deliver message to agent {id} inbox: {e}");
        }
    }
}

/// Merge `from` and a fresh `timestamp` over the payload fields
fn stamp_from(mut message: Payload, from: &Entity) -> Payload {
    message.insert(
        "from".to_string(),
        Value::String(from.as_str().to_string()),
    );
    message.insert(
        "timestamp".to_string(),
        Value::from(chrono::Utc::now().timestamp_millis()),
    );
    message
}

/// Append one serialized record plus newline to `path`
async fn append_line(path: &Path, record: &Payload) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .await?;
    file.write_all(&line).await?;
    Ok(())
}
