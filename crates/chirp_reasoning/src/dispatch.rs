//! Dispatch: rules first, generation on a miss.

use crate::invoker::GenerationInvoker;
use crate::llm::GenerationEngine;
use crate::session::{ConversationState, SessionStore, DEFAULT_SESSION, MAX_SESSION_KEY_LEN};
use async_trait::async_trait;
use chirp_core::{ChatResponder, ChirpConfig, Clock, RuleEngine, SystemClock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};

/// Entry point for every inbound message.
///
/// Holds the rule list, the generation fallback and all conversation
/// sessions. A request keeps its session locked from rule evaluation through
/// the end of generation, so tone changes, context resets and context
/// updates within one session never interleave.
pub struct Dispatcher {
    rules: RuleEngine,
    invoker: GenerationInvoker,
    sessions: SessionStore,
    rng: Mutex<StdRng>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(engine: Arc<dyn GenerationEngine>, config: &ChirpConfig) -> Self {
        let rng = match config.conversation.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rules: RuleEngine::default(),
            invoker: GenerationInvoker::new(
                engine,
                config.generation.clone(),
                config.conversation.context_token_limit,
            ),
            sessions: SessionStore::new(config.conversation.default_tone)
                .with_max_sessions(config.conversation.max_sessions),
            rng: Mutex::new(rng),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Answer `message` in the shared default conversation.
    pub async fn handle(&self, message: &str) -> String {
        self.handle_in(None, message).await
    }

    /// Answer `message` in the given session (`None` or blank → default).
    pub async fn handle_in(&self, session: Option<&str>, message: &str) -> String {
        let key = session_key(session);
        let shared = self.sessions.get_or_create(key).await;
        let mut state = shared.lock().await;

        if let Some(reply) = self.try_rules(message, &mut state) {
            return reply;
        }
        tracing::debug!(session = key, "No rule matched, falling back to generation");
        self.invoker.respond(message, &mut state).await
    }

    /// Copy of a session's current state, if the session exists.
    pub async fn snapshot(&self, session: Option<&str>) -> Option<ConversationState> {
        let shared = self.sessions.get(session_key(session)).await?;
        let state = shared.lock().await;
        Some(state.clone())
    }

    fn try_rules(&self, message: &str, state: &mut ConversationState) -> Option<String> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        self.rules.evaluate(message, state, &mut *rng, self.clock.now())
    }
}

/// Blank maps to the default session; overlong keys are cut to
/// `MAX_SESSION_KEY_LEN` characters.
fn session_key(session: Option<&str>) -> &str {
    let key = session
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION);
    match key.char_indices().nth(MAX_SESSION_KEY_LEN) {
        Some((end, _)) => &key[..end],
        None => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_normalisation() {
        assert_eq!(session_key(None), DEFAULT_SESSION);
        assert_eq!(session_key(Some("   ")), DEFAULT_SESSION);
        assert_eq!(session_key(Some(" alice ")), "alice");

        let long = "é".repeat(MAX_SESSION_KEY_LEN + 10);
        let key = session_key(Some(&long));
        assert_eq!(key.chars().count(), MAX_SESSION_KEY_LEN);
        assert!(long.starts_with(key));
    }
}

#[async_trait]
impl ChatResponder for Dispatcher {
    async fn reply(&self, session: Option<&str>, message: &str) -> String {
        self.handle_in(session, message).await
    }
}
