//! Contracts for the collaborators the pipeline depends on.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

/// Per-agent user preferences.
pub trait PreferenceStore: Send + Sync {
    /// Whether reasoning mode is enabled for `agent_id`. Unset means off.
    fn reasoning_preference(&self, agent_id: &str) -> bool;

    fn set_reasoning_preference(&self, agent_id: &str, enabled: bool);
}

/// Runs structured payloads (page automation flows) streamed by the agent.
pub trait FlowRunner: Send + Sync {
    /// Returns false if the payload is not a valid flow. The pipeline logs
    /// and drops it; a failure here never ends the stream.
    fn try_run(&self, payload: &Value) -> bool;
}

/// Preferences kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    reasoning: Mutex<HashMap<String, bool>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn reasoning_preference(&self, agent_id: &str) -> bool {
        self.reasoning
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(agent_id)
            .copied()
            .unwrap_or(false)
    }

    fn set_reasoning_preference(&self, agent_id: &str, enabled: bool) {
        self.reasoning
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(agent_id.to_string(), enabled);
    }
}

/// Flow runner for callers that cannot automate anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFlows;

impl FlowRunner for NoFlows {
    fn try_run(&self, _payload: &Value) -> bool {
        false
    }
}
