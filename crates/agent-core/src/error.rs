//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Missing or malformed startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection, send or timeout failure talking to the model endpoint
    #[error("Transport error: {0}")]
    Transport(String),

    /// Endpoint answered, but not with a well-formed response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Endpoint reported a non-success status
    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// A model call was attempted with nothing to send
    #[error("Conversation is empty")]
    EmptyConversation,

    /// Tool not found in registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments did not match the tool's declared parameters
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Maximum model calls reached within one user turn
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Stable snake_case tag, used in tool failure payloads and logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Transport(_) => "transport",
            Self::Protocol(_) => "protocol",
            Self::Remote { .. } => "remote",
            Self::EmptyConversation => "empty_conversation",
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::ToolExecution(_) | Self::Io(_) | Self::Json(_) => "execution_failed",
            Self::MaxIterations(_) => "max_iterations",
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(msg) => format!("Configuration problem: {msg}"),
            Self::Transport(msg) => {
                format!("Could not reach the model endpoint ({msg}). Retry when ready.")
            }
            Self::Protocol(msg) => format!("The model endpoint sent an unexpected response: {msg}"),
            Self::Remote { status, message } => {
                format!("The model endpoint returned {status}: {message}")
            }
            Self::MaxIterations(n) => {
                format!("Stopped after {n} model calls without a final answer.")
            }
            other => other.to_string(),
        }
    }
}
