//! Generative fallback: continue the conversation with the engine.

use crate::context::ConversationContext;
use crate::llm::{GenerationEngine, GenerationParams, TokenId};
use crate::session::ConversationState;
use anyhow::Result;
use chirp_core::config::GenerationConfig;
use chirp_core::style;
use std::sync::Arc;

pub const EMPTY_REPLY_FALLBACK: &str = "Hmm... I didn't quite get that.";
pub const GENERATION_APOLOGY: &str = "Oops! Something went wrong while generating a reply.";

/// Wraps the generation engine and threads the conversation context through it.
pub struct GenerationInvoker {
    engine: Arc<dyn GenerationEngine>,
    generation: GenerationConfig,
    context_token_limit: Option<usize>,
}

struct Continuation {
    /// Full engine output: prior context, the new user turn and the reply.
    output: Vec<TokenId>,
    reply: String,
}

impl GenerationInvoker {
    pub fn new(
        engine: Arc<dyn GenerationEngine>,
        generation: GenerationConfig,
        context_token_limit: Option<usize>,
    ) -> Self {
        Self {
            engine,
            generation,
            context_token_limit,
        }
    }

    /// Produce a styled reply to `user_input` and advance the context.
    ///
    /// Never fails: engine errors are logged and turned into a fixed,
    /// unstyled apology, and the context is left exactly as it was.
    pub async fn respond(&self, user_input: &str, state: &mut ConversationState) -> String {
        match self.continue_conversation(user_input, &state.context).await {
            Ok(Continuation { output, reply }) => {
                state.context.replace(output);
                if let Some(limit) = self.context_token_limit {
                    state.context.enforce_limit(limit, self.engine.end_of_turn());
                }
                let reply = reply.trim();
                let reply = if reply.is_empty() {
                    EMPTY_REPLY_FALLBACK
                } else {
                    reply
                };
                style(reply, state.tone)
            }
            Err(e) => {
                tracing::warn!(engine = self.engine.name(), "AI generation error: {:#}", e);
                GENERATION_APOLOGY.to_string()
            }
        }
    }

    async fn continue_conversation(
        &self,
        user_input: &str,
        context: &ConversationContext,
    ) -> Result<Continuation> {
        let end_of_turn = self.engine.end_of_turn();

        let mut turn = self.engine.encode(user_input).await?;
        turn.push(end_of_turn);

        let mut input = context.snapshot();
        input.extend(turn);

        let params = GenerationParams::from_config(&self.generation, end_of_turn);
        let output = self.engine.generate(&input, &params).await?;

        let generated = output.get(input.len()..).unwrap_or_default();
        let reply = self.engine.decode(generated, true).await?;
        tracing::debug!(
            input_tokens = input.len(),
            generated_tokens = generated.len(),
            "Generated continuation"
        );

        Ok(Continuation { output, reply })
    }
}
