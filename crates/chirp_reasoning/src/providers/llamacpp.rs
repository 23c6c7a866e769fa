//! llama.cpp server provider.
//!
//! Talks to the native `llama-server` HTTP API, which exposes the tokenizer
//! (`/tokenize`, `/detokenize`) and accepts token-array prompts on
//! `/completion`, so the conversation context can stay in token form.

use crate::llm::{GenerationEngine, GenerationParams, TokenId};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use chirp_core::config::EngineConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LlamaCppEngine {
    client: Client,
    base_url: String,
    end_of_turn: TokenId,
    retry: RetryConfig,
}

impl LlamaCppEngine {
    pub fn new(cfg: &EngineConfig) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(cfg.timeout_secs))
                .build()?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            end_of_turn: cfg.end_of_turn_token,
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn post(&self, endpoint: &str, payload: Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        let client = &self.client;
        let url = url.as_str();
        let payload = &payload;
        let response = with_retry(&self.retry, url, move || async move {
            client
                .post(url)
                .json(payload)
                .send()
                .await
                .map_err(anyhow::Error::from)
        })
        .await?;
        response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from llama.cpp {}", endpoint))
    }
}

/// Map sampling params onto a llama.cpp `/completion` request.
pub(crate) fn build_completion_payload(input: &[TokenId], params: &GenerationParams) -> Value {
    let n_predict = params.max_length.saturating_sub(input.len());
    json!({
        "prompt": input,
        "n_predict": n_predict,
        // temperature 0 is greedy decoding in llama.cpp
        "temperature": if params.do_sample { params.temperature } else { 0.0 },
        "top_p": params.top_p,
        "stream": false,
        "cache_prompt": true,
        "return_tokens": true,
    })
}

pub(crate) fn parse_token_array(value: &Value) -> Option<Vec<TokenId>> {
    value
        .as_array()?
        .iter()
        .map(|t| t.as_u64().and_then(|n| TokenId::try_from(n).ok()))
        .collect()
}

#[async_trait::async_trait]
impl GenerationEngine for LlamaCppEngine {
    fn name(&self) -> &str {
        "llamacpp"
    }

    fn end_of_turn(&self) -> TokenId {
        self.end_of_turn
    }

    async fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let resp = self
            .post("/tokenize", json!({ "content": text, "add_special": false }))
            .await?;
        parse_token_array(&resp["tokens"]).context("llama.cpp /tokenize returned no token array")
    }

    async fn generate(&self, input: &[TokenId], params: &GenerationParams) -> Result<Vec<TokenId>> {
        let mut output = input.to_vec();
        if input.len() >= params.max_length {
            tracing::debug!(
                "Input of {} tokens already at max_length {}, skipping completion",
                input.len(),
                params.max_length
            );
            return Ok(output);
        }

        let resp = self
            .post("/completion", build_completion_payload(input, params))
            .await?;
        let generated = match parse_token_array(&resp["tokens"]) {
            Some(tokens) => tokens,
            // Older servers ignore return_tokens; re-tokenize the text instead
            None => {
                let content = resp["content"]
                    .as_str()
                    .context("llama.cpp /completion returned neither tokens nor content")?;
                self.encode(content).await?
            }
        };

        output.extend(generated);
        if resp["stop_type"].as_str() == Some("eos") || resp["stopped_eos"].as_bool() == Some(true) {
            output.push(params.pad_token);
        }
        output.truncate(params.max_length);
        Ok(output)
    }

    async fn decode(&self, tokens: &[TokenId], skip_special: bool) -> Result<String> {
        let tokens: Vec<TokenId> = if skip_special {
            tokens.iter().copied().filter(|&t| t != self.end_of_turn).collect()
        } else {
            tokens.to_vec()
        };
        if tokens.is_empty() {
            return Ok(String::new());
        }
        let resp = self.post("/detokenize", json!({ "tokens": tokens })).await?;
        Ok(resp["content"].as_str().unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_creation() {
        let cfg = EngineConfig {
            base_url: "http://localhost:8080/".into(),
            ..EngineConfig::default()
        };
        let engine = LlamaCppEngine::new(&cfg).unwrap();
        assert_eq!(engine.base_url, "http://localhost:8080");
        assert_eq!(engine.end_of_turn(), 50256);
    }

    #[test]
    fn test_completion_payload_budget() {
        let params = GenerationParams {
            max_length: 10,
            ..GenerationParams::default()
        };
        let payload = build_completion_payload(&[1, 2, 3], &params);
        assert_eq!(payload["n_predict"], 7);
        assert_eq!(payload["prompt"], json!([1, 2, 3]));
        assert_eq!(payload["return_tokens"], true);
        assert!((payload["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_greedy_when_sampling_disabled() {
        let params = GenerationParams {
            do_sample: false,
            ..GenerationParams::default()
        };
        let payload = build_completion_payload(&[1], &params);
        assert_eq!(payload["temperature"].as_f64(), Some(0.0));
    }

    #[test]
    fn test_parse_token_array() {
        assert_eq!(parse_token_array(&json!([5, 6, 50256])), Some(vec![5, 6, 50256]));
        assert_eq!(parse_token_array(&json!([])), Some(vec![]));
        assert_eq!(parse_token_array(&json!(["a"])), None);
        assert_eq!(parse_token_array(&json!([-1])), None);
        assert_eq!(parse_token_array(&Value::Null), None);
    }
}
