//! Conversation context — the running dialogue in token form.
//!
//! User and bot turns are stored back to back, each terminated by the engine's
//! end-of-turn token. The whole buffer is fed to the engine on every
//! generation call.

use crate::llm::TokenId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationContext {
    tokens: Vec<TokenId>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an encoded turn at the end of the history.
    pub fn append(&mut self, turn: &[TokenId]) {
        self.tokens.extend_from_slice(turn);
    }

    /// Copy of the full history.
    pub fn snapshot(&self) -> Vec<TokenId> {
        self.tokens.clone()
    }

    pub fn as_slice(&self) -> &[TokenId] {
        &self.tokens
    }

    /// Replace the history with the engine's full output for the last call.
    pub fn replace(&mut self, tokens: Vec<TokenId>) {
        self.tokens = tokens;
    }

    pub fn reset(&mut self) {
        self.tokens.clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of turns, counting a trailing unterminated one.
    pub fn turns(&self, end_of_turn: TokenId) -> usize {
        let closed = self.tokens.iter().filter(|&&t| t == end_of_turn).count();
        let open = self.tokens.last().is_some_and(|&t| t != end_of_turn);
        closed + usize::from(open)
    }

    /// Drop whole turns from the front until at most `limit` tokens remain.
    ///
    /// The newest turn is never split, so a single turn longer than `limit`
    /// is kept as is. Returns the number of tokens dropped.
    pub fn enforce_limit(&mut self, limit: usize, end_of_turn: TokenId) -> usize {
        let mut cut = 0;
        while self.tokens.len() - cut > limit {
            let rest = &self.tokens[cut..];
            match rest.iter().position(|&t| t == end_of_turn) {
                Some(i) if cut + i + 1 < self.tokens.len() => cut += i + 1,
                _ => break,
            }
        }
        if cut > 0 {
            self.tokens.drain(..cut);
            tracing::debug!("Context over {} tokens, dropped {} oldest tokens", limit, cut);
        }
        cut
    }
}
