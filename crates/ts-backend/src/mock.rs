//! Mock transport for testing.
//!
//! Renders scripted responses as the exact SSE bytes the agent sends, so
//! tests at every layer exercise the real decoder instead of handing typed
//! chunks straight to the accumulator.

use std::pin::Pin;
use std::time::Duration;

use async_stream::stream;
use bytes::Bytes;
use futures::Stream;
use serde_json::json;
use tokio::time::sleep;
use ts_protocol::AgentFlow;

use crate::transport::{decode_event_stream, RecordFormat, ValueStream};

/// Byte stream as produced by the mock transport.
pub type MockByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Configurable mock responses for testing.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Emit an answer fragment.
    Content { content: String },
    /// Emit raw answer text, as the standard endpoint does.
    Text { text: String },
    /// Emit a reasoning fragment.
    Thought { content: String },
    /// Emit usage counters.
    Tokens {
        tokens: u64,
        thoughts_tokens: Option<u64>,
    },
    /// Emit an `error` chunk.
    Error { error: Option<String> },
    /// Emit an `event: error` record.
    ErrorEvent { detail: Option<String> },
    /// Emit an `event: flow` record carrying a structured payload.
    Flow { flow: AgentFlow },
    /// Emit an `end` chunk.
    End,
    /// Emit a record verbatim, without its terminating blank line.
    Raw { record: String },
    /// Delay before next record (for timing tests).
    Delay { ms: u64 },
}

impl MockResponse {
    /// Render as one wire record including the blank-line terminator.
    pub fn to_record(&self) -> Option<String> {
        let data = match self {
            MockResponse::Content { content } => json!({"type": "content", "content": content}),
            MockResponse::Thought { content } => json!({"type": "thought", "content": content}),
            MockResponse::Tokens {
                tokens,
                thoughts_tokens,
            } => match thoughts_tokens {
                Some(t) => json!({"type": "tokens", "tokens": tokens, "thoughts_tokens": t}),
                None => json!({"type": "tokens", "tokens": tokens}),
            },
            MockResponse::Error { error } => match error {
                Some(e) => json!({"type": "error", "error": e}),
                None => json!({"type": "error"}),
            },
            MockResponse::End => json!({"type": "end"}),
            MockResponse::ErrorEvent { detail } => {
                return Some(format!(
                    "event: error\ndata: {}\n\n",
                    detail.as_deref().unwrap_or("")
                ));
            }
            MockResponse::Flow { flow } => {
                let payload = serde_json::to_string(flow).ok()?;
                return Some(format!("event: flow\ndata: {payload}\n\n"));
            }
            MockResponse::Text { text } => {
                let lines: String = text.split('\n').map(|l| format!("data: {l}\n")).collect();
                return Some(format!("{lines}\n"));
            }
            MockResponse::Raw { record } => return Some(format!("{record}\n\n")),
            MockResponse::Delay { .. } => return None,
        };
        Some(format!("data: {data}\n\n"))
    }
}

/// Configuration for mock stream.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Sequence of responses to emit.
    pub responses: Vec<MockResponse>,
    /// Split the wire bytes into reads of this size instead of one read per
    /// record.
    pub chunk_size: Option<usize>,
    /// Optional delay between each read (ms).
    pub chunk_delay_ms: Option<u64>,
    /// Drop the blank line after the last record.
    pub omit_final_terminator: bool,
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(mut self, responses: Vec<MockResponse>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    pub fn with_chunk_delay(mut self, ms: u64) -> Self {
        self.chunk_delay_ms = Some(ms);
        self
    }

    pub fn without_final_terminator(mut self) -> Self {
        self.omit_final_terminator = true;
        self
    }

    /// The full wire body, ignoring delays.
    pub fn to_wire(&self) -> String {
        let mut wire: String = self
            .responses
            .iter()
            .filter_map(MockResponse::to_record)
            .collect();
        if self.omit_final_terminator && wire.ends_with("\n\n") {
            wire.truncate(wire.len() - 2);
        }
        wire
    }
}

/// Reads the mock transport yields, in order, with the delays between them.
enum Read {
    Bytes(Bytes),
    Delay(u64),
}

fn plan_reads(config: &MockConfig) -> Vec<Read> {
    let mut reads = Vec::new();
    let mut pending = String::new();

    for response in &config.responses {
        match response {
            MockResponse::Delay { ms } => {
                if !pending.is_empty() {
                    reads.push(Read::Bytes(Bytes::from(std::mem::take(&mut pending))));
                }
                reads.push(Read::Delay(*ms));
            }
            other => {
                if let Some(record) = other.to_record() {
                    pending.push_str(&record);
                    if config.chunk_size.is_none() {
                        reads.push(Read::Bytes(Bytes::from(std::mem::take(&mut pending))));
                    }
                }
            }
        }
    }
    if !pending.is_empty() {
        reads.push(Read::Bytes(Bytes::from(pending)));
    }

    if config.omit_final_terminator {
        if let Some(Read::Bytes(last)) = reads.iter_mut().rev().find(|r| matches!(r, Read::Bytes(_))) {
            if last.ends_with(b"\n\n") {
                *last = last.slice(..last.len() - 2);
            }
        }
    }

    let Some(size) = config.chunk_size else {
        return reads;
    };
    reads
        .into_iter()
        .flat_map(|read| match read {
            Read::Bytes(bytes) => (0..bytes.len())
                .step_by(size)
                .map(|start| Read::Bytes(bytes.slice(start..(start + size).min(bytes.len()))))
                .collect::<Vec<_>>(),
            delay => vec![delay],
        })
        .collect()
}

/// Create a byte stream from mock config.
pub fn mock_byte_stream(config: MockConfig) -> MockByteStream {
    let reads = plan_reads(&config);
    let chunk_delay_ms = config.chunk_delay_ms;

    Box::pin(stream! {
        for read in reads {
            match read {
                Read::Bytes(bytes) => {
                    // Apply inter-read delay if configured
                    if let Some(delay_ms) = chunk_delay_ms {
                        sleep(Duration::from_millis(delay_ms)).await;
                    }
                    yield Ok(bytes);
                }
                Read::Delay(ms) => {
                    sleep(Duration::from_millis(ms)).await;
                }
            }
        }
    })
}

/// Decoded values from mock config, through the real SSE decoder.
pub fn mock_values(config: MockConfig) -> ValueStream {
    mock_values_in(config, RecordFormat::Chunks)
}

/// Like [`mock_values`], decoding records as `format`.
pub fn mock_values_in(config: MockConfig, format: RecordFormat) -> ValueStream {
    decode_event_stream(mock_byte_stream(config), format)
}

/// Built-in test fixtures for common scenarios.
pub mod fixtures {
    use super::*;

    fn content(s: &str) -> MockResponse {
        MockResponse::Content {
            content: s.to_string(),
        }
    }

    /// Stream answer text in chunks, then `end`.
    pub fn streaming_text(chunks: &[&str]) -> MockConfig {
        let mut responses: Vec<_> = chunks.iter().map(|c| content(c)).collect();
        responses.push(MockResponse::End);
        MockConfig::new().with_responses(responses)
    }

    /// Reasoning, then the answer, then usage counters and `end`.
    pub fn reasoning_answer(
        thought: &str,
        answer: &str,
        tokens: u64,
        thoughts_tokens: u64,
    ) -> MockConfig {
        MockConfig::new().with_responses(vec![
            MockResponse::Thought {
                content: thought.to_string(),
            },
            content(answer),
            MockResponse::Tokens {
                tokens,
                thoughts_tokens: Some(thoughts_tokens),
            },
            MockResponse::End,
        ])
    }

    /// Some text, then an `error` chunk.
    pub fn error_mid_stream(text_before: &str, error: &str) -> MockConfig {
        MockConfig::new().with_responses(vec![
            content(text_before),
            MockResponse::Error {
                error: Some(error.to_string()),
            },
        ])
    }

    /// A flow payload as the standard endpoint sends it; no `end`.
    pub fn flow_reply(flow: AgentFlow) -> MockConfig {
        MockConfig::new().with_responses(vec![MockResponse::Flow { flow }])
    }

    /// Raw text tokens as the standard endpoint streams them; no `end`.
    pub fn text_tokens(tokens: &[&str]) -> MockConfig {
        let responses = tokens
            .iter()
            .map(|t| MockResponse::Text {
                text: t.to_string(),
            })
            .collect();
        MockConfig::new().with_responses(responses)
    }

    /// A few fragments separated by delays, for cancellation tests.
    pub fn slow_text(chunks: &[&str], delay_ms: u64) -> MockConfig {
        let mut responses = Vec::new();
        for chunk in chunks {
            responses.push(content(chunk));
            responses.push(MockResponse::Delay { ms: delay_ms });
        }
        responses.push(MockResponse::End);
        MockConfig::new().with_responses(responses)
    }
}
