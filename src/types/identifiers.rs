//! Newtype wrappers for type safety
//!
//! This module contains newtype wrappers that provide type safety by wrapping
//! primitive identifier strings into distinct types, plus the entity/target
//! references used to address mailboxes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AgentError, Result};

/// Reserved entity name for the orchestrator
pub const MASTER: &str = "master";

// ============================================================================
// Newtype Wrappers for Type Safety
// ============================================================================

/// Session ID newtype for type safety
///
/// Scopes a directory subtree; all agent lookups are implicitly filtered to
/// one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a session ID from an existing value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh session ID (orchestrator startup)
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Adopt the session ID a parent orchestrator exported as
    /// `AGENT_SESSION_ID`, if present.
    ///
    /// Adoption is deliberately an explicit caller step: pass the returned
    /// value to [`crate::AgentManager::with_session`] to join the parent's
    /// session instead of starting a new one.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var(crate::manager::ENV_SESSION_ID)
            .ok()
            .filter(|v| !v.is_empty())
            .map(Self)
    }

    /// Get the session ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Agent ID newtype
///
/// Always a hyphenated UUID; [`AgentId::parse`] rejects anything else so an
/// id can never smuggle a path component into the session tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Generate a fresh agent ID
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse and validate an agent ID
    ///
    /// # Errors
    /// Returns [`AgentError::InvalidTarget`] unless the value is a
    /// well-formed hyphenated UUID.
    pub fn parse(s: &str) -> Result<Self> {
        // 36 chars pins the hyphenated form; Uuid::parse_str alone would
        // also accept simple/braced/urn variants.
        if s.len() == 36 && Uuid::parse_str(s).is_ok() {
            Ok(Self(s.to_string()))
        } else {
            Err(AgentError::invalid_target(s))
        }
    }

    /// Get the agent ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Entity and routing references
// ============================================================================

/// A mailbox owner: the orchestrator or a specific agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// The orchestrator ("master")
    Master,
    /// A specific agent
    Agent(AgentId),
}

impl Entity {
    /// Parse an entity reference: `"master"` or a well-formed agent id
    ///
    /// # Errors
    /// Returns [`AgentError::InvalidTarget`] for anything else.
    pub fn parse(s: &str) -> Result<Self> {
        if s == MASTER {
            Ok(Self::Master)
        } else {
            AgentId::parse(s).map(Self::Agent)
        }
    }

    /// Get the entity reference as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Master => MASTER,
            Self::Agent(id) => id.as_str(),
        }
    }
}

/// Routing target for [`crate::mailbox::MailboxBus::send`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Deliver to the orchestrator's log only
    Master,
    /// Fan out to the orchestrator's log (unless the sender is the
    /// orchestrator) and every other known agent's log
    All,
    /// Deliver to exactly one agent's log
    One(AgentId),
    /// Deliver to each named agent's log
    Many(Vec<AgentId>),
}

impl Target {
    /// Parse a wire-form target: `"master"`, `"all"`, a single agent id, or
    /// an array of agent ids.
    ///
    /// # Errors
    /// Returns [`AgentError::InvalidTarget`] if any referenced id is
    /// malformed.
    pub fn parse(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) if s == MASTER => Ok(Self::Master),
            serde_json::Value::String(s) if s == "all" => Ok(Self::All),
            serde_json::Value::String(s) => AgentId::parse(s).map(Self::One),
            serde_json::Value::Array(items) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    let s = item
                        .as_str()
                        .ok_or_else(|| AgentError::invalid_target(item.to_string()))?;
                    ids.push(AgentId::parse(s)?);
                }
                Ok(Self::Many(ids))
            }
            other => Err(AgentError::invalid_target(other.to_string())),
        }
    }
}

impl From<AgentId> for Target {
    fn from(id: AgentId) -> Self {
        Self::One(id)
    }
}

impl From<Vec<AgentId>> for Target {
    fn from(ids: Vec<AgentId>) -> Self {
        Self::Many(ids)
    }
}
