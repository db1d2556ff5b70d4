//! Chunk and update types for streamed agent responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One classified unit of a streamed response.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    /// A fragment of answer text.
    Content(String),

    /// A fragment of reasoning text.
    Thought(String),

    /// Final usage counters for the answer and, in reasoning mode, the thoughts.
    Tokens {
        answer: u64,
        reasoning: Option<u64>,
    },

    /// The remote finished; nothing after this is consumed.
    End,

    /// The remote reported a failure, optionally with a detail message.
    Error(Option<String>),

    /// A JSON value without a `type` discriminator, meant for the flow runner.
    StructuredPayload(Value),

    /// A discriminator outside the known set. Ignored by the pipeline.
    Unrecognized(String),
}

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamOutcome {
    /// `end` chunk or natural exhaustion of the response.
    Completed,
    /// Stopped by the caller or superseded by a newer request.
    Interrupted,
    /// Transport, decode, or remote error.
    Failed,
}

/// The fragment that produced an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    Answer(String),
    Reasoning(String),
}

/// Snapshot handed to the update sink after every fold step.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamUpdate {
    /// Accumulated answer text so far.
    pub text: String,
    /// The fragment folded in by this step, if any.
    pub delta: Option<Delta>,
    pub complete: bool,
    /// Set only on the terminal update.
    pub outcome: Option<StreamOutcome>,
    pub answer_tokens: Option<u64>,
    pub reasoning_tokens: Option<u64>,
    /// Accumulated reasoning text, `None` while empty.
    pub reasoning: Option<String>,
}

impl StreamUpdate {
    /// `Some(true)` for a completed stream, `Some(false)` for a failed one,
    /// `None` while streaming or after an interruption.
    pub fn success(&self) -> Option<bool> {
        outcome_success(self.outcome)
    }
}

/// Final state of one stream, frozen when the stream ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedMessage {
    pub answer: String,
    pub reasoning: String,
    pub complete: bool,
    pub outcome: Option<StreamOutcome>,
    pub answer_tokens: Option<u64>,
    pub reasoning_tokens: Option<u64>,
}

impl AccumulatedMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`StreamUpdate::success`].
    pub fn success(&self) -> Option<bool> {
        outcome_success(self.outcome)
    }
}

fn outcome_success(outcome: Option<StreamOutcome>) -> Option<bool> {
    match outcome {
        Some(StreamOutcome::Completed) => Some(true),
        Some(StreamOutcome::Failed) => Some(false),
        Some(StreamOutcome::Interrupted) | None => None,
    }
}
