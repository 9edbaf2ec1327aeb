//! # agent-runtime
//!
//! Model endpoint clients for codeloop.
//!
//! ## Clients
//!
//! - **Responses** (default): OpenAI-compatible `/responses` endpoint
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::ResponsesClient;
//!
//! let config = SessionConfig::from_env()?;
//! let client = ResponsesClient::new(&config)?;
//! let agent = Agent::new(Arc::new(client), Arc::new(tools), &config);
//! ```

#[cfg(feature = "responses")]
pub mod responses;

#[cfg(feature = "responses")]
pub use responses::ResponsesClient;

// Re-export core types for convenience
pub use agent_core::{Agent, AgentError, ModelClient, Result, SessionConfig, ToolRegistry, Turn};
