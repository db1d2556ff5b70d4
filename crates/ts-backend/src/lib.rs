//! ts-backend: Streaming response pipeline for thinkstream.
//!
//! Opens a request to a remote agent, decodes the SSE (or single JSON)
//! response into values, classifies them into chunks, and folds the chunks
//! into an answer while allowing the stream to be cancelled or superseded at
//! any chunk boundary.

pub mod accumulate;
pub mod classify;
pub mod client;
pub mod collab;
pub mod error;
pub mod mock;
pub mod pipeline;
pub mod router;
pub mod session;
pub mod sse;
pub mod transport;

pub use accumulate::{ResponseAccumulator, UpdateSink};
pub use classify::Classifier;
pub use client::{AgentClient, ClientOptions};
pub use collab::{FlowRunner, MemoryPreferences, NoFlows, PreferenceStore};
pub use error::{StreamError, StreamFailure};
pub use mock::{MockConfig, MockResponse};
pub use pipeline::run_pipeline;
pub use router::ModeRouter;
pub use session::{ActiveStream, SessionController, StreamHandle};
pub use transport::{RecordFormat, ValueStream};
