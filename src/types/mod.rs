//! Type definitions for the agentmux bus
//!
//! This module contains the type definitions used throughout the crate,
//! organized into logical submodules:
//!
//! - [`identifiers`] - Type-safe ID wrappers and routing references
//!   (`SessionId`, `AgentId`, `Entity`, `Target`)
//! - [`agent`] - The `Agent` record and creation parameters
//! - [`message`] - Message payloads and cursor-read results

pub mod agent;
pub mod identifiers;
pub mod message;

// Re-export commonly used types
pub use agent::{Agent, AgentStatus, CreateAgentParams};
pub use identifiers::{AgentId, Entity, MASTER, SessionId, Target};
pub use message::{Payload, ReadPage, WaitOutcome};
