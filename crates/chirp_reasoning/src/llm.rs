use anyhow::Result;
use async_trait::async_trait;
use chirp_core::config::GenerationConfig;

/// A single token id in the engine's vocabulary.
pub type TokenId = u32;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Maximum total length (input + continuation) in tokens.
    pub max_length: usize,
    /// Token used for padding; always the engine's end-of-turn token.
    pub pad_token: TokenId,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
    /// Stochastic sampling when true, greedy decoding when false.
    pub do_sample: bool,
}

impl GenerationParams {
    pub fn from_config(cfg: &GenerationConfig, pad_token: TokenId) -> Self {
        Self {
            max_length: cfg.max_length,
            pad_token,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            do_sample: cfg.do_sample,
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from_config(&GenerationConfig::default(), 0)
    }
}

/// The external text-generation capability.
///
/// Only these operations are used; tokenizer and model internals stay behind
/// the implementation.
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Token that terminates a dialogue turn.
    fn end_of_turn(&self) -> TokenId;

    async fn encode(&self, text: &str) -> Result<Vec<TokenId>>;

    /// Continue `input`. The returned sequence starts with `input` and is at
    /// most `params.max_length` tokens long.
    async fn generate(&self, input: &[TokenId], params: &GenerationParams) -> Result<Vec<TokenId>>;

    async fn decode(&self, tokens: &[TokenId], skip_special: bool) -> Result<String>;
}
