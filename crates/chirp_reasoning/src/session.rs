//! Per-session conversation state.
//!
//! Each session owns a tone and a context behind its own lock. Callers that
//! don't name a session all share `DEFAULT_SESSION`, i.e. one global
//! conversation for the whole process.

use crate::context::ConversationContext;
use chirp_core::{ConversationControl, PersonalityTone};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub const DEFAULT_SESSION: &str = "default";

/// Tone plus dialogue history for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub tone: PersonalityTone,
    pub context: ConversationContext,
}

impl ConversationState {
    pub fn new(tone: PersonalityTone) -> Self {
        Self {
            tone,
            context: ConversationContext::new(),
        }
    }
}

impl ConversationControl for ConversationState {
    fn tone(&self) -> PersonalityTone {
        self.tone
    }

    fn set_tone(&mut self, tone: PersonalityTone) {
        self.tone = tone;
    }

    fn reset_context(&mut self) {
        self.context.reset();
    }
}

pub type SharedState = Arc<Mutex<ConversationState>>;

/// Session keys longer than this many characters are cut down to it.
pub const MAX_SESSION_KEY_LEN: usize = 64;

pub const DEFAULT_MAX_SESSIONS: usize = 256;

#[derive(Debug)]
struct SessionEntry {
    state: SharedState,
    last_used: AtomicU64,
}

/// All live sessions, bounded by `max_sessions`.
///
/// The default session is never evicted and does not count toward the
/// bound. Once the bound is reached, creating a new named session drops the
/// least recently used one. A caller still holding an evicted session's
/// state finishes its exchange on that state; the next request with the same
/// key starts fresh.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    initial_tone: PersonalityTone,
    max_sessions: usize,
    clock: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(PersonalityTone::default())
    }
}

impl SessionStore {
    pub fn new(initial_tone: PersonalityTone) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            initial_tone,
            max_sessions: DEFAULT_MAX_SESSIONS,
            clock: AtomicU64::new(0),
        }
    }

    /// Bound the number of named sessions. Zero is treated as one.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Look up a session, creating it on first use.
    pub async fn get_or_create(&self, key: &str) -> SharedState {
        if let Some(entry) = self.sessions.read().await.get(key) {
            entry.last_used.store(self.tick(), Ordering::Relaxed);
            return entry.state.clone();
        }

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(key) {
            entry.last_used.store(self.tick(), Ordering::Relaxed);
            return entry.state.clone();
        }

        if key != DEFAULT_SESSION {
            while named_count(&sessions) >= self.max_sessions {
                match evict_lru(&mut sessions) {
                    Some(evicted) => tracing::debug!(session = %evicted, "Evicted idle session"),
                    None => break,
                }
            }
        }

        tracing::debug!(session = key, "New conversation session");
        let state: SharedState = Arc::new(Mutex::new(ConversationState::new(self.initial_tone)));
        sessions.insert(
            key.to_string(),
            SessionEntry {
                state: state.clone(),
                last_used: AtomicU64::new(self.tick()),
            },
        );
        state
    }

    pub async fn get(&self, key: &str) -> Option<SharedState> {
        self.sessions.read().await.get(key).map(|e| e.state.clone())
    }

    /// Forget a session entirely. Returns whether it existed.
    pub async fn remove(&self, key: &str) -> bool {
        self.sessions.write().await.remove(key).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn named_count(sessions: &HashMap<String, SessionEntry>) -> usize {
    sessions.len() - usize::from(sessions.contains_key(DEFAULT_SESSION))
}

fn evict_lru(sessions: &mut HashMap<String, SessionEntry>) -> Option<String> {
    let victim = sessions
        .iter()
        .filter(|(key, _)| key.as_str() != DEFAULT_SESSION)
        .min_by_key(|(_, entry)| entry.last_used.load(Ordering::Relaxed))
        .map(|(key, _)| key.clone())?;
    sessions.remove(&victim);
    Some(victim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_reuses_state() {
        let store = SessionStore::new(PersonalityTone::Friendly);
        let a = store.get_or_create(DEFAULT_SESSION).await;
        a.lock().await.set_tone(PersonalityTone::Sarcastic);

        let b = store.get_or_create(DEFAULT_SESSION).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.lock().await.tone, PersonalityTone::Sarcastic);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new(PersonalityTone::Professional);
        let alice = store.get_or_create("alice").await;
        let bob = store.get_or_create("bob").await;

        alice.lock().await.context.append(&[1, 2, 0]);
        alice.lock().await.set_tone(PersonalityTone::Sarcastic);

        let bob = bob.lock().await;
        assert!(bob.context.is_empty());
        assert_eq!(bob.tone, PersonalityTone::Professional);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = SessionStore::default();
        assert!(store.is_empty().await);
        store.get_or_create("x").await;
        assert!(store.get("x").await.is_some());
        assert!(store.remove("x").await);
        assert!(!store.remove("x").await);
        assert!(store.get("x").await.is_none());
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used() {
        let store = SessionStore::default().with_max_sessions(2);
        store.get_or_create("a").await;
        store.get_or_create("b").await;
        // touch "a" so "b" is the oldest
        store.get_or_create("a").await;
        store.get_or_create("c").await;

        assert_eq!(store.len().await, 2);
        assert!(store.get("a").await.is_some());
        assert!(store.get("b").await.is_none());
        assert!(store.get("c").await.is_some());
    }

    #[tokio::test]
    async fn test_default_session_is_never_evicted() {
        let store = SessionStore::default().with_max_sessions(1);
        let default = store.get_or_create(DEFAULT_SESSION).await;
        default.lock().await.set_tone(PersonalityTone::Sarcastic);

        for key in ["a", "b", "c"] {
            store.get_or_create(key).await;
        }

        assert_eq!(store.len().await, 2);
        assert!(store.get("c").await.is_some());
        let kept = store.get(DEFAULT_SESSION).await.unwrap();
        assert!(Arc::ptr_eq(&default, &kept));
        assert_eq!(kept.lock().await.tone, PersonalityTone::Sarcastic);
    }

    #[test]
    fn test_zero_max_sessions_keeps_one() {
        assert_eq!(SessionStore::default().with_max_sessions(0).max_sessions(), 1);
    }

    #[test]
    fn test_reset_context_via_control() {
        let mut state = ConversationState::default();
        state.context.append(&[4, 0]);
        state.reset_context();
        assert!(state.context.is_empty());
        assert_eq!(state.tone(), PersonalityTone::Friendly);
    }
}
