//! Mode routing: which endpoint variant a request goes to.

use std::sync::Arc;

use ts_protocol::{ConversationContext, ResponseMode};

use crate::collab::PreferenceStore;

/// Picks a [`ResponseMode`] from the agent's capabilities and the stored
/// reasoning preference. The preference is read on every call.
#[derive(Clone)]
pub struct ModeRouter {
    prefs: Arc<dyn PreferenceStore>,
}

impl ModeRouter {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { prefs }
    }

    pub fn select(&self, ctx: &ConversationContext) -> ResponseMode {
        if !ctx.capabilities.reasoning {
            return ResponseMode::Standard;
        }
        if self.prefs.reasoning_preference(&ctx.agent_id) {
            ResponseMode::Reasoning
        } else {
            ResponseMode::Chat
        }
    }

    pub fn set_reasoning(&self, agent_id: &str, enabled: bool) {
        self.prefs.set_reasoning_preference(agent_id, enabled);
    }

    pub fn reasoning_enabled(&self, agent_id: &str) -> bool {
        self.prefs.reasoning_preference(agent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::MemoryPreferences;
    use ts_protocol::AgentCapabilities;

    fn ctx(reasoning: bool) -> ConversationContext {
        ConversationContext::new(
            "s1",
            "gemini",
            "http://localhost:8000",
            AgentCapabilities {
                reasoning,
                audio: false,
            },
        )
    }

    #[test]
    fn agent_without_reasoning_uses_standard() {
        let prefs = Arc::new(MemoryPreferences::new());
        prefs.set_reasoning_preference("gemini", true);
        let router = ModeRouter::new(prefs);
        assert_eq!(router.select(&ctx(false)), ResponseMode::Standard);
    }

    #[test]
    fn reasoning_agent_follows_preference() {
        let router = ModeRouter::new(Arc::new(MemoryPreferences::new()));
        assert_eq!(router.select(&ctx(true)), ResponseMode::Chat);

        router.set_reasoning("gemini", true);
        assert_eq!(router.select(&ctx(true)), ResponseMode::Reasoning);
    }

    #[test]
    fn toggle_takes_effect_on_next_select() {
        let router = ModeRouter::new(Arc::new(MemoryPreferences::new()));
        let conversation = ctx(true);

        router.set_reasoning("gemini", true);
        assert_eq!(router.select(&conversation), ResponseMode::Reasoning);
        router.set_reasoning("gemini", false);
        assert_eq!(router.select(&conversation), ResponseMode::Chat);
        assert!(!router.reasoning_enabled("gemini"));
    }
}
