//! Error types for the agentmux orchestration bus

use thiserror::Error;

/// Main error type for agentmux operations
#[derive(Error, Debug)]
pub enum AgentError {
    /// tmux (or the configured execution backend binary) not found
    #[error("Execution backend not found: {0}")]
    BackendNotFound(String),

    /// Execution backend command failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// Entity reference is neither "master" nor a well-formed agent id
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Environment variable key rejected before launch
    #[error("Invalid env key \"{0}\": must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidEnvKey(String),

    /// Operation referenced an agent with no usable on-disk record
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// JSON decode error when reading a metadata record
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for agentmux operations
pub type Result<T> = std::result::Result<T, AgentError>;

impl AgentError {
    /// Create a backend-not-found error
    #[must_use]
    pub fn backend_not_found() -> Self {
        Self::BackendNotFound(
            "tmux not found on PATH. Install tmux, or inject a custom \
             ExecutionBackend when constructing the AgentManager"
                .to_string(),
        )
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create an invalid-target error
    pub fn invalid_target(entity: impl Into<String>) -> Self {
        Self::InvalidTarget(entity.into())
    }

    /// Create an agent-not-found error
    pub fn agent_not_found(id: impl Into<String>) -> Self {
        Self::AgentNotFound(id.into())
    }
}
