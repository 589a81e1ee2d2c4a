//! Core data models used throughout opsmate.
//!
//! These types represent the conversation state that flows through the
//! dialogue machine and the chunks that flow through the ingestion and
//! retrieval pipeline.

use uuid::Uuid;

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// A single conversation message. The ordered sequence of messages forms
/// the conversation history; within one processed turn it is append-only.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// The classified category of a user's request, selecting which action
/// node of the dialogue machine executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Restart,
    GetStatus,
    GetLogs,
    SendNotification,
    RespondPlain,
}

impl Intent {
    /// Stable lowercase name, used in reports and failure messages.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Restart => "restart",
            Intent::GetStatus => "get_status",
            Intent::GetLogs => "get_logs",
            Intent::SendNotification => "send_notification",
            Intent::RespondPlain => "respond_plain",
        }
    }
}

/// Conversation state owned by one in-flight turn.
///
/// `pending_intent` holds the routed intent while a cycle is executing and
/// reads `None` whenever the machine is idle between turns.
#[derive(Debug, Clone)]
pub struct DialogueState {
    pub id: String,
    pub history: Vec<Message>,
    pub pending_intent: Option<Intent>,
}

impl DialogueState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            history: Vec::new(),
            pending_intent: None,
        }
    }
}

impl Default for DialogueState {
    fn default() -> Self {
        Self::new()
    }
}

/// A bounded-size slice of a source document's text, the unit of embedding
/// and retrieval. Immutable once stored; `id` is `{source_id}_{index}` and
/// is unique across the whole index.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub source_id: String,
    pub index: i64,
    pub text: String,
    pub hash: String,
}

/// One retrieval hit: chunk text plus its relevance score (cosine
/// similarity, higher is better). Ephemeral — lives only for the duration
/// of one retrieval call.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub score: f32,
}
