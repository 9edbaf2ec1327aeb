//! Conversation Turns
//!
//! The append-only log replayed to the model on every request.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tool::ToolCall;

/// A single entry in the conversation log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Turn {
    /// User input
    User { content: String },

    /// Tool invocation requested by the model
    ToolRequest(ToolCall),

    /// Result of a dispatched tool invocation
    ToolOutput { call_id: String, output: Value },

    /// Text produced by the model
    Assistant { content: String },
}

impl Turn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
        }
    }

    /// Create a tool output turn
    pub fn tool_output(call_id: impl Into<String>, output: Value) -> Self {
        Self::ToolOutput {
            call_id: call_id.into(),
            output,
        }
    }

    /// Call ID for tool requests and outputs
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::ToolRequest(call) => Some(&call.call_id),
            Self::ToolOutput { call_id, .. } => Some(call_id),
            Self::User { .. } | Self::Assistant { .. } => None,
        }
    }
}

/// Ordered conversation log
///
/// Only grows by [`Conversation::push`]; [`Conversation::clear`] is the
/// single way to shrink it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from a snapshot
    pub const fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    /// Append a turn
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Read-only view of every turn, oldest first
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Get the last turn
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Drop every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Call IDs of tool requests that have no output yet
    pub fn unanswered_calls(&self) -> Vec<&str> {
        let answered: HashSet<&str> = self
            .turns
            .iter()
            .filter_map(|t| match t {
                Turn::ToolOutput { call_id, .. } => Some(call_id.as_str()),
                _ => None,
            })
            .collect();

        self.turns
            .iter()
            .filter_map(|t| match t {
                Turn::ToolRequest(call) if !answered.contains(call.call_id.as_str()) => {
                    Some(call.call_id.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Verify request/output pairing.
    ///
    /// Every output must follow exactly one request with its call ID, within
    /// the same user turn.
    pub fn check_pairing(&self) -> std::result::Result<(), String> {
        let mut open: HashSet<&str> = HashSet::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for turn in &self.turns {
            match turn {
                Turn::User { .. } => {
                    if let Some(id) = open.iter().next() {
                        return Err(format!("call {id} unanswered before next user turn"));
                    }
                }
                Turn::ToolRequest(call) => {
                    if !seen.insert(call.call_id.as_str()) {
                        return Err(format!("duplicate request for call {}", call.call_id));
                    }
                    open.insert(call.call_id.as_str());
                }
                Turn::ToolOutput { call_id, .. } => {
                    if !open.remove(call_id.as_str()) {
                        return Err(format!("output for call {call_id} has no open request"));
                    }
                }
                Turn::Assistant { .. } => {}
            }
        }

        Ok(())
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
