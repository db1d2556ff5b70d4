//! Server-Sent Events (SSE) record parser.
//!
//! Splits a byte stream into blank-line-terminated records. Bytes are
//! buffered until a full record is available, so multi-byte characters and
//! line terminators split across reads are handled the same as a single read.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

/// A parsed SSE record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// The event name (from `event:` field). None if not specified.
    pub event_type: Option<String>,
    /// The event data (from `data:` field(s)), joined with `\n`.
    pub data: String,
}

/// Parse one record (without its terminating blank line).
///
/// Returns `None` for records carrying neither an event name nor data,
/// e.g. comment-only keep-alives.
pub fn parse_record(record: &str) -> Option<SseEvent> {
    let mut event_type = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in record.lines() {
        let Some(colon_pos) = line.find(':') else {
            // Lines without colons are comments or invalid, ignore them
            continue;
        };
        let field = &line[..colon_pos];
        let value = &line[colon_pos + 1..];
        let value = value.strip_prefix(' ').unwrap_or(value);

        match field {
            "event" => event_type = Some(value.to_string()),
            "data" => data_lines.push(value),
            // id, retry, and comments (empty field name)
            _ => {}
        }
    }

    if event_type.is_none() && data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event_type,
        data: data_lines.join("\n"),
    })
}

/// Byte buffer that yields complete records.
#[derive(Default)]
struct RecordBuffer {
    buf: Vec<u8>,
    /// Bytes already searched for a boundary without finding one.
    scanned: usize,
}

impl RecordBuffer {
    /// Append bytes. Carriage returns are dropped so `\r\n` and `\n`
    /// terminators look the same regardless of where a read splits them.
    fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().copied().filter(|b| *b != b'\r'));
    }

    /// Remove and return the next complete record, if any.
    fn next_record(&mut self) -> Option<String> {
        // Back up one byte: the first `\n` may have ended the previous read.
        let start = self.scanned.saturating_sub(1);
        let Some(offset) = self.buf[start..].windows(2).position(|w| w == b"\n\n") else {
            self.scanned = self.buf.len();
            return None;
        };
        let pos = start + offset;
        let record: Vec<u8> = self.buf.drain(..pos + 2).take(pos).collect();
        self.scanned = 0;
        Some(String::from_utf8_lossy(&record).into_owned())
    }

    /// Drain whatever is left once the input has ended.
    fn take_trailing(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        self.scanned = 0;
        let text = String::from_utf8_lossy(&rest);
        if text.trim().is_empty() {
            None
        } else {
            Some(text.into_owned())
        }
    }
}

/// Stream wrapper that parses SSE records from a byte stream.
pub struct SseStream<S> {
    inner: S,
    buffer: RecordBuffer,
    pending_events: VecDeque<SseEvent>,
    finished: bool,
}

impl<S> SseStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: RecordBuffer::default(),
            pending_events: VecDeque::new(),
            finished: false,
        }
    }

    fn drain_records(&mut self) {
        while let Some(record) = self.buffer.next_record() {
            if let Some(event) = parse_record(&record) {
                self.pending_events.push_back(event);
            }
        }
    }
}

impl<S, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<SseEvent, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(event) = this.pending_events.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend(&bytes);
                    this.drain_records();
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    // A trailing record without its blank line is tolerated
                    // only here, at end of input.
                    this.finished = true;
                    if let Some(record) = this.buffer.take_trailing() {
                        if let Some(event) = parse_record(&record) {
                            this.pending_events.push_back(event);
                        }
                    }
                }
                Poll::Pending => {
                    return Poll::Pending;
                }
            }
        }
    }
}

/// Create an SSE stream from a byte stream.
pub fn parse_sse_stream<S, E>(stream: S) -> SseStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    SseStream::new(stream)
}
