use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The personality tone applied to every outgoing reply.
///
/// Exactly one tone is active per conversation. New conversations start as
/// `Friendly` unless the config says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityTone {
    #[default]
    Friendly,
    Professional,
    Sarcastic,
}

impl PersonalityTone {
    pub const ALL: [PersonalityTone; 3] = [
        PersonalityTone::Friendly,
        PersonalityTone::Professional,
        PersonalityTone::Sarcastic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonalityTone::Friendly => "friendly",
            PersonalityTone::Professional => "professional",
            PersonalityTone::Sarcastic => "sarcastic",
        }
    }

    /// Pick a tone from free text of a "change personality" command.
    ///
    /// Expects an already-lowercased input. "sarcastic" wins over
    /// "professional"; anything else (including no keyword) is `Friendly`.
    pub fn from_keywords(lowered: &str) -> Self {
        if lowered.contains("sarcastic") {
            PersonalityTone::Sarcastic
        } else if lowered.contains("professional") {
            PersonalityTone::Professional
        } else {
            PersonalityTone::Friendly
        }
    }
}

impl fmt::Display for PersonalityTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown personality tone '{0}' (expected friendly, professional or sarcastic)")]
pub struct ToneParseError(pub String);

/// Strict parsing, for config files and CLI flags.
impl FromStr for PersonalityTone {
    type Err = ToneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        PersonalityTone::ALL
            .into_iter()
            .find(|tone| tone.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ToneParseError(trimmed.to_string()))
    }
}
