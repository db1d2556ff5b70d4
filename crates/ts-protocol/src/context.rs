//! Conversation context and request/response bodies of the agent API.

use serde::{Deserialize, Serialize};

/// Features a remote agent advertises.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentCapabilities {
    /// The agent has a reasoning variant that streams `thought` chunks.
    pub reasoning: bool,
    /// The agent accepts audio for transcription.
    pub audio: bool,
}

/// Identifies the conversation a request belongs to and the agent serving it.
///
/// The reasoning preference is not stored here: it is read from the
/// preference store on every request so toggling it takes effect immediately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationContext {
    /// Remote session id; also the key for single-flight streaming.
    pub conversation_id: String,
    pub agent_id: String,
    /// Base URL of the agent, without a trailing slash.
    pub agent_url: String,
    pub capabilities: AgentCapabilities,
}

impl ConversationContext {
    pub fn new(
        conversation_id: impl Into<String>,
        agent_id: impl Into<String>,
        agent_url: impl Into<String>,
        capabilities: AgentCapabilities,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            agent_id: agent_id.into(),
            agent_url: agent_url.into().trim_end_matches('/').to_string(),
            capabilities,
        }
    }
}

/// Which endpoint variant a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Agent without a reasoning capability.
    Standard,
    /// Reasoning-capable agent with reasoning turned off.
    Chat,
    /// Reasoning-capable agent with reasoning turned on.
    Reasoning,
}

impl ResponseMode {
    /// Path segment appended to `/sessions/{id}/`.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ResponseMode::Standard => "questions",
            ResponseMode::Chat => "chat-gemini",
            ResponseMode::Reasoning => "thinking-chat-gemini",
        }
    }

    /// Only the reasoning variant surfaces `thought` chunks.
    pub fn admits_thoughts(&self) -> bool {
        matches!(self, ResponseMode::Reasoning)
    }
}

/// Body of a question request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRequest {
    pub question: String,
}

/// Body of a session creation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewSession {
    pub locales: Vec<String>,
}

/// A session as returned by the agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub locales: Vec<String>,
    #[serde(default)]
    pub user: String,
}

/// Body of a transcription request: base64-encoded audio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptionRequest {
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptionResponse {
    pub text: String,
}

/// Page action an agent can ask the client to perform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowAction {
    Message,
    Click,
    Fill,
    Goto,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowStep {
    pub action: FlowAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Structured payload streamed in place of text by tool-invoking agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentFlow {
    pub steps: Vec<FlowStep>,
}

impl AgentFlow {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            steps: vec![FlowStep {
                action: FlowAction::Message,
                selector: None,
                value: Some(text.into()),
            }],
        }
    }
}
