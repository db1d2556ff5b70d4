//! Response accumulation: folds chunks into an [`AccumulatedMessage`].
//!
//! Every fold step that changes visible text is reported to an
//! [`UpdateSink`]. The terminal update is emitted by [`ResponseAccumulator::finish`],
//! which consumes the accumulator, so a stream can only end once.

use ts_protocol::{AccumulatedMessage, Chunk, Delta, StreamOutcome, StreamUpdate};

/// Receives incremental updates, in arrival order.
pub trait UpdateSink {
    fn update(&mut self, update: &StreamUpdate);
}

impl<F> UpdateSink for F
where
    F: FnMut(&StreamUpdate),
{
    fn update(&mut self, update: &StreamUpdate) {
        self(update)
    }
}

/// Result of folding one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// An `end` chunk was folded; the caller must stop consuming and finish.
    End,
}

pub struct ResponseAccumulator<S> {
    message: AccumulatedMessage,
    sink: S,
}

impl<S: UpdateSink> ResponseAccumulator<S> {
    pub fn new(sink: S) -> Self {
        Self {
            message: AccumulatedMessage::new(),
            sink,
        }
    }

    pub fn message(&self) -> &AccumulatedMessage {
        &self.message
    }

    /// Fold one chunk. Chunks that carry no text or counters (errors,
    /// structured payloads, unrecognized kinds) are not the accumulator's
    /// concern and leave the state untouched.
    pub fn apply(&mut self, chunk: Chunk) -> Step {
        match chunk {
            Chunk::Content(text) => {
                self.message.answer.push_str(&text);
                self.emit(Some(Delta::Answer(text)));
            }
            Chunk::Thought(text) => {
                self.message.reasoning.push_str(&text);
                self.emit(Some(Delta::Reasoning(text)));
            }
            Chunk::Tokens { answer, reasoning } => {
                self.message.answer_tokens = Some(answer);
                self.message.reasoning_tokens = reasoning;
            }
            Chunk::End => return Step::End,
            Chunk::Error(_) | Chunk::StructuredPayload(_) | Chunk::Unrecognized(_) => {}
        }
        Step::Continue
    }

    /// Mark the message complete, emit the single terminal update, and hand
    /// the frozen message back.
    pub fn finish(mut self, outcome: StreamOutcome) -> AccumulatedMessage {
        self.message.complete = true;
        self.message.outcome = Some(outcome);
        self.emit(None);
        self.message
    }

    fn emit(&mut self, delta: Option<Delta>) {
        let update = StreamUpdate {
            text: self.message.answer.clone(),
            delta,
            complete: self.message.complete,
            outcome: self.message.outcome,
            answer_tokens: self.message.answer_tokens,
            reasoning_tokens: self.message.reasoning_tokens,
            reasoning: Some(&self.message.reasoning)
                .filter(|r| !r.is_empty())
                .cloned(),
        };
        self.sink.update(&update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(s: &str) -> Chunk {
        Chunk::Content(s.to_string())
    }

    fn thought(s: &str) -> Chunk {
        Chunk::Thought(s.to_string())
    }

    #[test]
    fn content_and_thought_are_independent() {
        let mut updates = Vec::new();
        let mut acc = ResponseAccumulator::new(|u: &StreamUpdate| updates.push(u.clone()));

        for chunk in [content("A"), thought("X"), content("B"), thought("Y")] {
            assert_eq!(acc.apply(chunk), Step::Continue);
        }
        let msg = acc.finish(StreamOutcome::Completed);

        assert_eq!(msg.answer, "AB");
        assert_eq!(msg.reasoning, "XY");
        assert_eq!(updates.len(), 5);
        assert_eq!(updates[1].text, "A");
        assert_eq!(updates[1].reasoning.as_deref(), Some("X"));
        assert_eq!(updates[1].delta, Some(Delta::Reasoning("X".to_string())));
        assert_eq!(updates[2].delta, Some(Delta::Answer("B".to_string())));
    }

    #[test]
    fn token_finalization() {
        let mut updates = Vec::new();
        let mut acc = ResponseAccumulator::new(|u: &StreamUpdate| updates.push(u.clone()));

        acc.apply(content("Hi"));
        acc.apply(Chunk::Tokens {
            answer: 10,
            reasoning: Some(4),
        });
        assert_eq!(acc.apply(Chunk::End), Step::End);
        let msg = acc.finish(StreamOutcome::Completed);

        let last = updates.last().unwrap();
        assert!(last.complete);
        assert_eq!(last.success(), Some(true));
        assert_eq!(last.answer_tokens, Some(10));
        assert_eq!(last.reasoning_tokens, Some(4));
        assert_eq!(last.text, "Hi");
        assert_eq!(msg.answer_tokens, Some(10));
    }

    #[test]
    fn tokens_do_not_emit_or_complete() {
        let mut count = 0;
        let mut acc = ResponseAccumulator::new(|_: &StreamUpdate| count += 1);
        acc.apply(Chunk::Tokens {
            answer: 3,
            reasoning: None,
        });
        assert!(!acc.message().complete);
        drop(acc);
        assert_eq!(count, 0);
    }

    #[test]
    fn non_text_updates_are_incomplete() {
        let mut updates = Vec::new();
        let mut acc = ResponseAccumulator::new(|u: &StreamUpdate| updates.push(u.clone()));
        acc.apply(content("partial"));
        drop(acc);

        assert_eq!(updates.len(), 1);
        assert!(!updates[0].complete);
        assert_eq!(updates[0].outcome, None);
        assert_eq!(updates[0].reasoning, None);
    }

    #[test]
    fn interrupted_finish() {
        let mut updates = Vec::new();
        let mut acc = ResponseAccumulator::new(|u: &StreamUpdate| updates.push(u.clone()));
        acc.apply(content("half"));
        let msg = acc.finish(StreamOutcome::Interrupted);

        assert!(msg.complete);
        assert_eq!(msg.success(), None);
        assert_eq!(updates.iter().filter(|u| u.complete).count(), 1);
        assert_eq!(updates.last().unwrap().outcome, Some(StreamOutcome::Interrupted));
    }

    #[test]
    fn ignored_chunks_leave_state_untouched() {
        let mut count = 0;
        let mut acc = ResponseAccumulator::new(|_: &StreamUpdate| count += 1);
        acc.apply(Chunk::Unrecognized("ping".to_string()));
        acc.apply(Chunk::StructuredPayload(serde_json::json!({"steps": []})));
        acc.apply(Chunk::Error(None));
        assert_eq!(acc.message(), &AccumulatedMessage::new());
        drop(acc);
        assert_eq!(count, 0);
    }
}
