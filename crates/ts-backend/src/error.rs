//! Error taxonomy for a single stream.

use thiserror::Error;
use ts_protocol::AccumulatedMessage;

/// Detail used when the remote reports an error without one.
pub const GENERIC_REMOTE_ERROR: &str = "unknown remote error";

#[derive(Debug, Error)]
pub enum StreamError {
    /// Network failure while sending or reading.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
    /// The agent answered with a non-2xx status.
    #[error("agent returned {status}: {body}")]
    Status { status: u16, body: String },
    /// A single-document response was not valid JSON.
    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
    /// The agent URL cannot carry a path.
    #[error("invalid agent url: {0}")]
    InvalidUrl(String),
    /// An SSE record named `error`.
    #[error("remote error event{}", detail_suffix(.0))]
    RemoteEvent(Option<String>),
    /// An `error` chunk.
    #[error("remote error: {0}")]
    Remote(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {d}"),
        None => String::new(),
    }
}

impl StreamError {
    /// Whether the remote agent itself reported the failure.
    pub fn is_remote(&self) -> bool {
        matches!(self, StreamError::RemoteEvent(_) | StreamError::Remote(_))
    }

    /// The remote-supplied detail, if the failure came from the agent.
    pub fn remote_detail(&self) -> Option<&str> {
        match self {
            StreamError::RemoteEvent(detail) => detail.as_deref(),
            StreamError::Remote(detail) => Some(detail),
            _ => None,
        }
    }
}

/// A fatal stream error together with whatever was accumulated before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct StreamFailure {
    #[source]
    pub error: StreamError,
    /// Complete, marked failed.
    pub partial: AccumulatedMessage,
}
