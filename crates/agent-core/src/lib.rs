//! # agent-core
//!
//! Conversation log, tool registry and the turn loop that drives a
//! tool-using model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │   Turn      │  │    Tool     │  │   ModelClient       │  │
//! │  │   Loop      │──│   Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! │         │                                                    │
//! │  ┌─────────────┐                                             │
//! │  │ Session /   │                                             │
//! │  │ Conversation│                                             │
//! │  └─────────────┘                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `ModelClient` trait keeps the loop independent of the HTTP client, so
//! the loop can be driven by a scripted client in tests.

pub mod config;
pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod tool;

pub use config::SessionConfig;
pub use error::{AgentError, Result};
pub use message::{Conversation, Turn};
pub use provider::{ModelClient, ModelResponse, OutputItem, TokenUsage};
pub use reasoning::{Agent, AgentBuilder, LoopState, Submission, TurnObserver, TurnSummary};
pub use session::{Session, SessionId, UserInput};
pub use tool::{ParamType, ParameterSchema, Tool, ToolCall, ToolRegistry, ToolSpec};
