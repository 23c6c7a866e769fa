//! Mock generation engine — deterministic replies for testing without a model server.
//!
//! Tokenizes on whitespace with a vocabulary that grows as new words are seen.
//! Token 0 is the end-of-turn marker.

use crate::llm::{GenerationEngine, GenerationParams, TokenId};
use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const MOCK_END_OF_TURN: TokenId = 0;
const DEFAULT_REPLY: &str = "(mock) I hear you.";

/// One scripted outcome for a `generate` call.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(String),
}

#[derive(Debug, Default)]
struct Vocab {
    ids: HashMap<String, TokenId>,
    words: Vec<String>,
}

impl Vocab {
    fn id_for(&mut self, word: &str) -> TokenId {
        if let Some(id) = self.ids.get(word) {
            return *id;
        }
        self.words.push(word.to_string());
        // Ids start at 1; 0 is the end-of-turn marker
        let id = self.words.len() as TokenId;
        self.ids.insert(word.to_string(), id);
        id
    }

    fn word(&self, id: TokenId) -> Option<&str> {
        let idx = (id as usize).checked_sub(1)?;
        self.words.get(idx).map(|s| s.as_str())
    }
}

#[derive(Debug, Default)]
pub struct MockEngine {
    vocab: Mutex<Vocab>,
    replies: Mutex<VecDeque<MockReply>>,
    inputs: Mutex<Vec<Vec<TokenId>>>,
    generate_calls: AtomicUsize,
    latency: Option<Duration>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies returned by successive `generate` calls.
    /// Once exhausted, a fixed default reply is used.
    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for r in replies {
            self.push(MockReply::Text(r.into()));
        }
        self
    }

    /// Sleep this long inside every `generate` call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push(&self, reply: MockReply) {
        lock(&self.replies).push_back(reply);
    }

    /// Make the next `generate` call fail with `message`.
    pub fn fail_next(&self, message: &str) {
        self.push(MockReply::Fail(message.to_string()));
    }

    /// Number of `generate` calls so far (including failed ones).
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Every input sequence passed to `generate`, in call order.
    pub fn inputs(&self) -> Vec<Vec<TokenId>> {
        lock(&self.inputs).clone()
    }

    fn tokenize(&self, text: &str) -> Vec<TokenId> {
        let mut vocab = lock(&self.vocab);
        text.split_whitespace().map(|w| vocab.id_for(w)).collect()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait::async_trait]
impl GenerationEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn end_of_turn(&self) -> TokenId {
        MOCK_END_OF_TURN
    }

    async fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        Ok(self.tokenize(text))
    }

    async fn generate(&self, input: &[TokenId], params: &GenerationParams) -> Result<Vec<TokenId>> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.inputs).push(input.to_vec());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let reply = lock(&self.replies).pop_front();
        let text = match reply {
            Some(MockReply::Fail(message)) => anyhow::bail!("mock engine failure: {}", message),
            Some(MockReply::Text(text)) => text,
            None => DEFAULT_REPLY.to_string(),
        };

        let mut output = input.to_vec();
        output.extend(self.tokenize(&text));
        output.push(params.pad_token);
        output.truncate(params.max_length.max(input.len()));
        Ok(output)
    }

    async fn decode(&self, tokens: &[TokenId], skip_special: bool) -> Result<String> {
        let vocab = lock(&self.vocab);
        let words: Vec<&str> = tokens
            .iter()
            .filter_map(|&id| {
                if id == MOCK_END_OF_TURN {
                    (!skip_special).then_some("<|endofturn|>")
                } else {
                    vocab.word(id)
                }
            })
            .collect();
        Ok(words.join(" "))
    }
}
