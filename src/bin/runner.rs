// Demo agent runner: the agent side of the poll/emit protocol.
//
// Launched inside a pane by the supervisor (or any orchestrator using an
// executable override). Resolves its own mailbox purely from AGENT_ID,
// AGENT_SESSION_ID, and the working directory — there is no other channel
// to the orchestrator. Emits lifecycle events to its own outbox and
// reports task results to the master inbox. Never exits on its own; it
// dies with its pane.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;

use agentmux::mailbox::{MailboxBus, PollConfig, wait_for_record};
use agentmux::store::{SessionLayout, SessionStore};
use agentmux::types::{AgentId, Entity, Payload, SessionId, Target, WaitOutcome};
use agentmux::{ENV_AGENT_ID, ENV_SESSION_ID};

/// How long each poll blocks before looping again
const POLL_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let agent_id = std::env::var(ENV_AGENT_ID)
        .ok()
        .filter(|v| !v.is_empty())
        .with_context(|| format!("missing {ENV_AGENT_ID} env var"))?;
    let session_id = std::env::var(ENV_SESSION_ID)
        .ok()
        .filter(|v| !v.is_empty())
        .with_context(|| format!("missing {ENV_SESSION_ID} env var"))?;

    let id = AgentId::parse(&agent_id).context("malformed agent id")?;
    let root = std::env::current_dir()?;
    let layout = SessionLayout::new(root, SessionId::new(session_id));
    let store = SessionStore::new(layout.clone());
    let bus = MailboxBus::new(layout.clone());

    let role = match store.load(&id).await {
        Ok(agent) => agent.role,
        Err(e) => {
            log::warn!("Could not read own metadata ({e}); defaulting role");
            "unknown".to_string()
        }
    };
    log::info!("[Agent {id}] Started. Role: {role}");

    let outbox = layout.agent_dir(&id).join("outbox.jsonl");
    emit(&outbox, &id, "agent_ready", json!({ "role": role }), None).await?;
    send_to_master(&bus, &id, "agent_ready", json!({ "role": role }), None).await?;

    let inbox = layout.inbox(&id);
    let poll = PollConfig {
        poll_interval: Duration::from_millis(200),
        ..Default::default()
    };
    let mut cursor = 0;

    loop {
        match wait_for_record(&inbox, cursor, POLL_TIMEOUT, &poll).await {
            WaitOutcome::Command {
                record,
                next_cursor,
            } => {
                cursor = next_cursor;
                if record["type"] == "task" {
                    process_task(&bus, &outbox, &id, &role, &record).await?;
                }
            }
            // Timeouts are not lossy: retry with the same cursor.
            WaitOutcome::Timeout { .. } => {}
        }
    }
}

/// Handle one task record: acknowledge, simulate work by role, report back
async fn process_task(
    bus: &MailboxBus,
    outbox: &Path,
    id: &AgentId,
    role: &str,
    task: &Value,
) -> Result<()> {
    let task_id = task["taskId"].as_str().map(str::to_string);
    let payload = &task["payload"];
    log::info!("[Agent {id}] Received task {task_id:?}");

    emit(outbox, id, "task_started", json!({ "taskId": &task_id }), task_id.clone()).await?;

    // Simulate thinking time.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let result = match role {
        "worker" => {
            let instruction = payload["instruction"].as_str().unwrap_or("unknown");
            json!({
                "status": "success",
                "output": format!("// Generated code for {instruction}\nprintln!(\"Hello World\");"),
            })
        }
        "verifier" => {
            let code = payload["code"].as_str().unwrap_or("");
            if code.contains("Hello World") {
                json!({ "status": "approved", "comments": "LGTM! Code meets requirements." })
            } else {
                json!({ "status": "rejected", "comments": "Code is missing required 'Hello World'." })
            }
        }
        _ => json!({ "status": "unknown_role", "message": "I don't know what to do." }),
    };

    emit(outbox, id, "task_completed", result.clone(), task_id.clone()).await?;
    send_to_master(bus, id, "task_completed", result, task_id).await?;
    log::info!("[Agent {id}] Task completed");
    Ok(())
}

/// Report an event to the orchestrator's mailbox
async fn send_to_master(
    bus: &MailboxBus,
    id: &AgentId,
    event_type: &str,
    payload: Value,
    task_id: Option<String>,
) -> Result<()> {
    let mut message = Payload::new();
    message.insert("type".to_string(), Value::String(event_type.to_string()));
    if let Some(task_id) = task_id {
        message.insert("taskId".to_string(), Value::String(task_id));
    }
    message.insert("payload".to_string(), payload);
    bus.send(&Entity::Agent(id.clone()), message, &Target::Master)
        .await?;
    Ok(())
}

/// Append a lifecycle event to this agent's own outbox log
async fn emit(
    outbox: &Path,
    id: &AgentId,
    event_type: &str,
    payload: Value,
    task_id: Option<String>,
) -> Result<()> {
    let mut event = serde_json::Map::new();
    event.insert("type".to_string(), Value::String(event_type.to_string()));
    event.insert("agentId".to_string(), Value::String(id.to_string()));
    if let Some(task_id) = task_id {
        event.insert("taskId".to_string(), Value::String(task_id));
    }
    event.insert("payload".to_string(), payload);
    event.insert(
        "timestamp".to_string(),
        Value::from(chrono::Utc::now().timestamp_millis()),
    );

    let mut line = serde_json::to_vec(&event)?;
    line.push(b'\n');
    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(outbox)
        .await?;
    file.write_all(&line).await?;
    Ok(())
}
