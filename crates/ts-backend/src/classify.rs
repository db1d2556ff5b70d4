//! Chunk classification: decoded JSON value to [`Chunk`].
//!
//! The `type` field is the discriminator. Objects without one (and values
//! that are not objects at all) are structured payloads for the flow runner:
//! that is how tool-invoking agents send page actions instead of text.

use serde_json::Value;
use ts_protocol::{Chunk, ResponseMode};

/// Discriminator field of a chunk object.
const DISCRIMINATOR: &str = "type";

/// Maps decoded values to chunks for one response mode.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    mode: ResponseMode,
}

impl Classifier {
    pub fn new(mode: ResponseMode) -> Self {
        Self { mode }
    }

    /// Classify one value. `None` means the value carries nothing to fold:
    /// an empty text fragment, a `thought` outside reasoning mode, or a
    /// chunk missing its required fields.
    pub fn classify(&self, value: Value) -> Option<Chunk> {
        let Some(kind) = value.get(DISCRIMINATOR) else {
            return Some(Chunk::StructuredPayload(value));
        };
        let Some(kind) = kind.as_str() else {
            return Some(Chunk::Unrecognized(kind.to_string()));
        };

        match kind {
            "content" => text_field(&value).map(Chunk::Content),
            "thought" => {
                if !self.mode.admits_thoughts() {
                    tracing::debug!(mode = ?self.mode, "dropping thought outside reasoning mode");
                    return None;
                }
                text_field(&value).map(Chunk::Thought)
            }
            "tokens" => {
                let Some(answer) = value.get("tokens").and_then(Value::as_u64) else {
                    tracing::warn!("tokens chunk without a usable count");
                    return None;
                };
                let reasoning = value.get("thoughts_tokens").and_then(Value::as_u64);
                Some(Chunk::Tokens { answer, reasoning })
            }
            "end" => Some(Chunk::End),
            "error" => {
                let detail = value
                    .get("error")
                    .and_then(Value::as_str)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string);
                Some(Chunk::Error(detail))
            }
            other => Some(Chunk::Unrecognized(other.to_string())),
        }
    }
}

fn text_field(value: &Value) -> Option<String> {
    value
        .get("content")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
