use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::persona::PersonalityTone;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChirpConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub generation: GenerationConfig,
    pub conversation: ConversationConfig,
}

impl ChirpConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: ChirpConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = std::env::var("PORT") {
            if let Ok(n) = v.parse() {
                self.server.port = n;
            }
        }
        if let Ok(v) = std::env::var("CHIRP_ENGINE") {
            self.engine.provider = v;
        }
        if let Ok(v) = std::env::var("LLAMACPP_BASE_URL") {
            self.engine.base_url = v;
        }
        if let Ok(v) = std::env::var("CHIRP_TONE") {
            match v.parse() {
                Ok(tone) => self.conversation.default_tone = tone,
                Err(e) => tracing::warn!("Ignoring CHIRP_TONE: {}", e),
            }
        }
        if let Ok(v) = std::env::var("CHIRP_CONTEXT_LIMIT") {
            if let Ok(n) = v.parse() {
                self.conversation.context_token_limit = Some(n);
            }
        }
        if let Ok(v) = std::env::var("CHIRP_MAX_SESSIONS") {
            match v.parse() {
                Ok(n) => self.conversation.max_sessions = n,
                Err(_) => tracing::warn!("Ignoring CHIRP_MAX_SESSIONS: not a number: {}", v),
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// "llamacpp" or "mock".
    pub provider: String,
    pub base_url: String,
    /// Token id the model uses to terminate a dialogue turn.
    /// Default: 50256 (GPT-2 / DialoGPT `<|endoftext|>`).
    pub end_of_turn_token: u32,
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: "llamacpp".to_string(),
            base_url: "http://localhost:8080".to_string(),
            end_of_turn_token: 50256,
            timeout_secs: 120,
        }
    }
}

/// Sampling parameters handed to the generation engine on every fallback call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Upper bound on input + generated tokens.
    pub max_length: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub do_sample: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: 1000,
            temperature: 0.7,
            top_p: 0.9,
            do_sample: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub default_tone: PersonalityTone,
    /// Drop the oldest turns once the context exceeds this many tokens.
    /// None keeps the whole history.
    pub context_token_limit: Option<usize>,
    /// Seed for canned-reply selection. None seeds from entropy.
    pub rng_seed: Option<u64>,
    /// Named sessions kept alive besides the default one. The least recently
    /// used is dropped when a new session would exceed this.
    pub max_sessions: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            default_tone: PersonalityTone::default(),
            context_token_limit: None,
            rng_seed: None,
            max_sessions: 256,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
