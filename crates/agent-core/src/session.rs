//! Session Management
//!
//! One interactive session: its conversation log and the control commands
//! recognised at the prompt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{Conversation, Turn};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An interactive session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Conversation history
    conversation: Conversation,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new, empty session
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            conversation: Conversation::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Conversation history
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Append a turn and update the activity timestamp
    pub fn record(&mut self, turn: Turn) {
        self.conversation.push(turn);
        self.touch();
    }

    /// Reset the conversation
    pub fn clear(&mut self) {
        self.conversation.clear();
        self.touch();
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// A line typed at the prompt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserInput {
    /// End the session
    Exit,
    /// Reset the conversation
    Clear,
    /// Blank line
    Empty,
    /// Anything else goes to the model
    Message(String),
}

impl UserInput {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "exit" | "/q" | "/quit" => Self::Exit,
            "clear" | "/c" => Self::Clear,
            "" => Self::Empty,
            text => Self::Message(text.to_string()),
        }
    }
}
