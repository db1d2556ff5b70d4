//! Terminal rendering of stream updates.
//!
//! The answer goes to `out` (stdout) so it can be piped. Reasoning, status
//! lines, and errors go to `err` (stderr). TTY output dims reasoning and
//! colors status lines; non-TTY output is plain text with no ANSI codes.
//! Flow output shares the renderer through [`SharedRenderer`] so answer
//! lines stay intact when a flow message lands mid-answer.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use ts_protocol::{Delta, StreamOutcome, StreamUpdate};

const PREFIX: &str = "[ts]";

/// Writes stream updates as they arrive.
pub struct StreamRenderer<W: Write, E: Write> {
    out: W,
    err: E,
    is_tty: bool,
    start_time: Instant,
    /// A reasoning line is open on `err`.
    in_reasoning: bool,
    /// Whether the answer text written so far ends without a newline.
    answer_open: bool,
}

impl<W: Write, E: Write> StreamRenderer<W, E> {
    pub fn new(out: W, err: E, is_tty: bool) -> Self {
        Self {
            out,
            err,
            is_tty,
            start_time: Instant::now(),
            in_reasoning: false,
            answer_open: false,
        }
    }

    fn prefix(&self) -> String {
        if self.is_tty {
            format!("\x1b[2m\x1b[36m{PREFIX}\x1b[0m")
        } else {
            PREFIX.to_string()
        }
    }

    /// Render one update from the accumulator.
    pub fn render(&mut self, update: &StreamUpdate) {
        match &update.delta {
            Some(Delta::Reasoning(text)) => self.write_reasoning(text),
            Some(Delta::Answer(text)) => self.write_answer(text),
            None => {}
        }
        if update.complete {
            self.finish(update);
        }
    }

    fn write_answer(&mut self, text: &str) {
        self.close_reasoning();
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
        self.answer_open = !text.ends_with('\n');
    }

    /// Write a flow message as its own line of answer output.
    pub fn write_message(&mut self, text: &str) {
        self.close_reasoning();
        if self.answer_open {
            let _ = writeln!(self.out);
        }
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
        self.answer_open = false;
    }

    /// Describe a non-message flow step on `err`.
    pub fn flow_step(&mut self, description: &str) {
        self.close_reasoning();
        let _ = writeln!(self.err, "[flow] {description}");
    }

    fn write_reasoning(&mut self, text: &str) {
        if !self.in_reasoning {
            let prefix = self.prefix();
            let _ = write!(self.err, "{prefix} ");
            self.in_reasoning = true;
        }
        if self.is_tty {
            let _ = write!(self.err, "\x1b[2m{text}\x1b[0m");
        } else {
            let _ = write!(self.err, "{text}");
        }
        let _ = self.err.flush();
    }

    fn close_reasoning(&mut self) {
        if self.in_reasoning {
            let _ = writeln!(self.err);
            self.in_reasoning = false;
        }
    }

    fn finish(&mut self, update: &StreamUpdate) {
        self.close_reasoning();
        if self.answer_open {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
            self.answer_open = false;
        }

        let elapsed = self.start_time.elapsed().as_secs();
        let mut summary = format!("{elapsed}s");
        if let Some(tokens) = update.answer_tokens {
            summary.push_str(&format!(", {tokens} tokens"));
        }
        if let Some(tokens) = update.reasoning_tokens {
            summary.push_str(&format!(", {tokens} reasoning"));
        }

        let prefix = self.prefix();
        match update.outcome {
            Some(StreamOutcome::Interrupted) => {
                if self.is_tty {
                    let _ = writeln!(self.err, "{prefix} \x1b[33minterrupted\x1b[0m ({summary})");
                } else {
                    let _ = writeln!(self.err, "{prefix} interrupted ({summary})");
                }
            }
            Some(StreamOutcome::Failed) => {}
            _ => {
                if self.is_tty {
                    let _ = writeln!(self.err, "{prefix} \x1b[2mdone ({summary})\x1b[0m");
                }
            }
        }
    }

    /// Report a fatal error.
    pub fn error(&mut self, msg: &str) {
        self.close_reasoning();
        let prefix = self.prefix();
        if self.is_tty {
            let _ = writeln!(self.err, "{prefix} \x1b[31merror: {msg}\x1b[0m");
        } else {
            let _ = writeln!(self.err, "{prefix} error: {msg}");
        }
    }

    pub fn into_inner(self) -> (W, E) {
        (self.out, self.err)
    }
}

/// A renderer used by both the stream sink and the flow runner.
pub struct SharedRenderer<W: Write, E: Write>(Arc<Mutex<StreamRenderer<W, E>>>);

impl<W: Write, E: Write> SharedRenderer<W, E> {
    pub fn new(renderer: StreamRenderer<W, E>) -> Self {
        Self(Arc::new(Mutex::new(renderer)))
    }

    pub fn lock(&self) -> MutexGuard<'_, StreamRenderer<W, E>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The renderer, once every other handle is gone.
    #[cfg(test)]
    pub(crate) fn try_into_inner(self) -> Option<StreamRenderer<W, E>> {
        let mutex = Arc::try_unwrap(self.0).ok()?;
        Some(mutex.into_inner().unwrap_or_else(|e| e.into_inner()))
    }
}

impl<W: Write, E: Write> Clone for SharedRenderer<W, E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}
