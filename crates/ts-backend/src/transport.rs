//! Transport decoding: HTTP response body to a lazy sequence of JSON values.
//!
//! Two content kinds are understood. `text/event-stream` bodies are read
//! incrementally and every SSE record's data is decoded according to the
//! endpoint's [`RecordFormat`]. `application/json` bodies are read whole and
//! yield exactly one value.

use std::pin::Pin;

use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use ts_protocol::ResponseMode;

use crate::error::StreamError;
use crate::sse::{parse_sse_stream, SseEvent};

/// Lazy, non-restartable sequence of decoded values.
pub type ValueStream = Pin<Box<dyn Stream<Item = Result<Value, StreamError>> + Send>>;

/// SSE event name the remote uses to signal failure.
const ERROR_EVENT: &str = "error";

/// How the data of an unnamed SSE record is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Every record is a JSON chunk; undecodable records are skipped.
    Chunks,
    /// Unnamed records are raw answer text. A record that decodes to a JSON
    /// object is still passed through as a chunk.
    TextTokens,
}

impl From<ResponseMode> for RecordFormat {
    fn from(mode: ResponseMode) -> Self {
        match mode {
            ResponseMode::Standard => RecordFormat::TextTokens,
            ResponseMode::Chat | ResponseMode::Reasoning => RecordFormat::Chunks,
        }
    }
}

/// Declared content kind of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    EventStream,
    JsonDocument,
}

impl ContentKind {
    /// Classify a `Content-Type` header value. A missing header is treated as
    /// an event stream.
    pub fn from_header(content_type: Option<&str>) -> Result<Self, StreamError> {
        let Some(raw) = content_type else {
            return Ok(ContentKind::EventStream);
        };
        let essence = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "text/event-stream" {
            Ok(ContentKind::EventStream)
        } else if essence == "application/json" || essence.ends_with("+json") {
            Ok(ContentKind::JsonDocument)
        } else {
            Err(StreamError::UnsupportedContentType(raw.to_string()))
        }
    }
}

/// Decode a successful response according to its declared content kind.
pub fn decode_response(response: reqwest::Response, format: RecordFormat) -> ValueStream {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match ContentKind::from_header(content_type.as_deref()) {
        Ok(ContentKind::EventStream) => decode_event_stream(response.bytes_stream(), format),
        Ok(ContentKind::JsonDocument) => Box::pin(stream! {
            match response.bytes().await {
                Ok(body) => {
                    yield decode_document(&body);
                }
                Err(e) => {
                    yield Err(StreamError::from(e));
                }
            }
        }),
        Err(e) => Box::pin(futures::stream::once(async move { Err(e) })),
    }
}

/// Decode a whole body as one JSON document.
pub fn decode_document(body: &[u8]) -> Result<Value, StreamError> {
    Ok(serde_json::from_slice(body)?)
}

/// What to do with one SSE record.
#[derive(Debug)]
pub(crate) enum RecordAction {
    Yield(Value),
    Skip,
    Fail(StreamError),
}

pub(crate) fn decode_record(event: &SseEvent, format: RecordFormat) -> RecordAction {
    if event.event_type.as_deref() == Some(ERROR_EVENT) {
        let detail = Some(event.data.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        return RecordAction::Fail(StreamError::RemoteEvent(detail));
    }

    match format {
        RecordFormat::TextTokens if event.event_type.is_none() => decode_text_token(&event.data),
        _ => decode_json_record(event),
    }
}

fn decode_json_record(event: &SseEvent) -> RecordAction {
    let data = event.data.trim();
    if data.is_empty() {
        return RecordAction::Skip;
    }

    match serde_json::from_str(data) {
        Ok(value) => RecordAction::Yield(value),
        Err(e) => {
            tracing::warn!(
                event = event.event_type.as_deref().unwrap_or(""),
                error = %e,
                "skipping malformed record"
            );
            RecordAction::Skip
        }
    }
}

/// Raw text is answer content as-is; surrounding spaces belong to the token.
fn decode_text_token(data: &str) -> RecordAction {
    if data.is_empty() {
        return RecordAction::Skip;
    }
    match serde_json::from_str::<Value>(data.trim()) {
        Ok(value @ Value::Object(_)) => RecordAction::Yield(value),
        _ => RecordAction::Yield(json!({"type": "content", "content": data})),
    }
}

/// Decode an SSE byte stream into JSON values.
///
/// An `error` event ends the sequence with [`StreamError::RemoteEvent`]; a
/// read failure ends it with the underlying error. Named events such as
/// `flow` are always JSON, whatever the format.
pub fn decode_event_stream<S, E>(bytes: S, format: RecordFormat) -> ValueStream
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send + 'static,
    E: Into<StreamError> + Send + 'static,
{
    Box::pin(stream! {
        let mut events = parse_sse_stream(bytes);
        while let Some(result) = events.next().await {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            };
            match decode_record(&event, format) {
                RecordAction::Yield(value) => {
                    yield Ok(value);
                }
                RecordAction::Skip => {}
                RecordAction::Fail(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    })
}
