//! Model Client Strategy
//!
//! Defines the interface between the agent loop and a remote model endpoint.
//! The loop hands over the whole conversation and the tool declarations on
//! every call; implementations keep no conversation state of their own.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::ModelClient;
//!
//! let client = ResponsesClient::new(&config)?;
//! let response = client.complete(conversation.turns(), &tools.describe()).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Turn;
use crate::tool::{ToolCall, ToolSpec};

/// One item of a model response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    /// Tool invocation request
    ToolCall(ToolCall),

    /// Tool invocation whose arguments did not decode to a JSON object.
    ///
    /// `call.arguments` is empty; `reason` says what was wrong.
    MalformedCall { call: ToolCall, reason: String },

    /// Text segment
    Text { text: String },
}

/// Token usage statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// Decoded answer from one model call
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Output items in the order the model produced them
    pub items: Vec<OutputItem>,

    /// Token usage statistics (if reported)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ModelResponse {
    pub const fn new(items: Vec<OutputItem>) -> Self {
        Self { items, usage: None }
    }

    /// Response made of a single text segment
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![OutputItem::Text { text: text.into() }])
    }

    /// Whether the model asked for at least one tool
    pub fn has_tool_calls(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item, OutputItem::ToolCall(_) | OutputItem::MalformedCall { .. }))
    }

    /// Tool calls in response order, malformed ones included
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.items.iter().filter_map(|item| match item {
            OutputItem::ToolCall(call) | OutputItem::MalformedCall { call, .. } => Some(call),
            OutputItem::Text { .. } => None,
        })
    }
}

/// Strategy trait for model endpoints
///
/// The agent works exclusively through this interface. The response must
/// depend only on `log`, `tools` and the client's fixed configuration.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the conversation and tool declarations, wait for the full answer.
    ///
    /// `log` must not be empty.
    async fn complete(&self, log: &[Turn], tools: &[ToolSpec]) -> Result<ModelResponse>;

    /// Model identifier, for display
    fn model(&self) -> &str;
}
