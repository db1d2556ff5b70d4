//! ts-protocol: Shared types for thinkstream.
//!
//! This crate defines the chunk, update, and context types passed between
//! the streaming backend and its callers, plus the JSON bodies of the
//! remote agent API.

pub mod context;
pub mod message;

pub use context::{
    AgentCapabilities, AgentFlow, ConversationContext, FlowAction, FlowStep, NewSession,
    QuestionRequest, ResponseMode, Session, TranscriptionRequest, TranscriptionResponse,
};
pub use message::{AccumulatedMessage, Chunk, Delta, StreamOutcome, StreamUpdate};
