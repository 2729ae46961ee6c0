//! # agentmux
//!
//! A filesystem-backed orchestration bus for tmux-hosted worker agents.
//! One orchestrator ("master") coordinates any number of independently
//! running agent processes through durable, append-only JSONL mailboxes —
//! no network server, no locks, no transactions. Correctness comes from
//! two properties: logs only ever grow by whole-line appends, and every
//! reader owns its own cursor into each log it consumes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use agentmux::{AgentManager, CreateAgentParams, TmuxBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = TmuxBackend::new()?;
//!     let manager = AgentManager::new(std::env::current_dir()?, backend);
//!
//!     let agent = manager
//!         .create_agent(CreateAgentParams {
//!             name: "coder-bob".into(),
//!             role: "worker".into(),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     let task_id = manager
//!         .enqueue_task(
//!             agent.id.as_str(),
//!             serde_json::json!({ "instruction": "Generate Hello World code" }),
//!         )
//!         .await?;
//!
//!     // Poll the orchestrator mailbox for the agent's reply.
//!     let mut cursor = 0;
//!     loop {
//!         let page = manager.read_inbox("master", cursor, None).await?;
//!         cursor = page.next_cursor;
//!         if page.records.iter().any(|r| r["taskId"] == task_id) {
//!             break;
//!         }
//!         tokio::time::sleep(std::time::Duration::from_millis(500)).await;
//!     }
//!
//!     manager.delete_agent(agent.id.as_str()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`mailbox`]: cursor reads, blocking polls, and routed fan-out writes
//! - [`store`]: the on-disk session layout and agent records
//! - [`backend`]: the execution-backend contract and its tmux implementation
//! - [`manager`]: the `AgentManager` façade composing the above
//! - [`types`]: identifiers, records, and routing targets
//! - [`error`]: error types and handling
//!
//! ## Delivery guarantees
//!
//! Within one log file, records are observed in append order and a cursor
//! position is never delivered twice — malformed lines are skipped but
//! still consumed. Across different logs no ordering is defined. Fan-out to
//! multiple targets is fire-and-forget per target: partial delivery is
//! possible and is reported as per-target warnings, never as total failure.
//!
//! A spawned agent process needs exactly two environment values to find its
//! mailbox: its own id (`AGENT_ID`) and the owning session id
//! (`AGENT_SESSION_ID`). There is no other channel to the orchestrator.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod mailbox;
pub mod manager;
pub mod store;
pub mod types;

// Re-export commonly used types for external API
pub use backend::{ExecutionBackend, PaneRef, TmuxBackend};
pub use error::{AgentError, Result};
pub use mailbox::{MailboxBus, PollConfig, read_records, wait_for_record};
pub use manager::{AgentManager, ENV_AGENT_ID, ENV_SESSION_ID};
pub use store::{SessionLayout, SessionStore};
pub use types::{
    Agent, AgentId, AgentStatus, CreateAgentParams, Entity, MASTER, Payload, ReadPage, SessionId,
    Target, WaitOutcome,
};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
