//! Stream session controller: at most one live stream per conversation.
//!
//! `begin` cancels whatever stream the conversation already has before
//! registering a new handle. Handles are compared by a generation id, so a
//! superseded stream finishing late cannot evict its successor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

/// Cancellation capability for one stream.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    generation: u64,
    token: CancellationToken,
}

impl StreamHandle {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            token: CancellationToken::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn same_as(&self, other: &StreamHandle) -> bool {
        self.generation == other.generation
    }
}

/// Registry of live stream handles keyed by conversation id.
#[derive(Debug, Default)]
pub struct SessionController {
    active: Mutex<HashMap<String, StreamHandle>>,
    next_generation: AtomicU64,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StreamHandle>> {
        // Critical sections are single map operations, so a poisoned map is
        // still consistent.
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a fresh handle for `conversation_id`, cancelling the current
    /// one first if there is one.
    pub fn begin(&self, conversation_id: &str) -> StreamHandle {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let handle = StreamHandle::new(generation);

        let previous = self
            .lock()
            .insert(conversation_id.to_string(), handle.clone());
        if let Some(previous) = previous {
            previous.token.cancel();
            tracing::debug!(
                conversation = conversation_id,
                superseded = previous.generation,
                generation,
                "superseded active stream"
            );
        }
        handle
    }

    /// Cancel the conversation's stream. Returns false if it had none.
    pub fn stop(&self, conversation_id: &str) -> bool {
        let Some(handle) = self.lock().remove(conversation_id) else {
            return false;
        };
        handle.token.cancel();
        tracing::debug!(
            conversation = conversation_id,
            generation = handle.generation,
            "stopped stream"
        );
        true
    }

    /// Called by the owning pipeline when its stream is over. Evicts the
    /// entry only if `handle` is still the registered one; returns whether
    /// it did.
    pub fn end(&self, conversation_id: &str, handle: &StreamHandle) -> bool {
        let mut active = self.lock();
        match active.get(conversation_id) {
            Some(current) if current.same_as(handle) => {
                active.remove(conversation_id);
                true
            }
            _ => false,
        }
    }

    pub fn is_streaming(&self, conversation_id: &str) -> bool {
        self.lock().contains_key(conversation_id)
    }

    /// Number of conversations with a live stream.
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }
}

/// Ends its stream on drop, however the owning pipeline exits.
pub struct ActiveStream {
    controller: Arc<SessionController>,
    conversation_id: String,
    handle: StreamHandle,
}

impl ActiveStream {
    /// Begin a stream for `conversation_id` on `controller`.
    pub fn begin(controller: Arc<SessionController>, conversation_id: &str) -> Self {
        let handle = controller.begin(conversation_id);
        Self {
            controller,
            conversation_id: conversation_id.to_string(),
            handle,
        }
    }

    pub fn handle(&self) -> &StreamHandle {
        &self.handle
    }

    pub fn token(&self) -> &CancellationToken {
        self.handle.token()
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.controller.end(&self.conversation_id, &self.handle);
    }
}
