//! Tone decoration for outgoing text.

use crate::persona::PersonalityTone;

pub const FRIENDLY_SUFFIX: &str = " 😊";
pub const SARCASTIC_PREFIX: &str = "😏 ";
pub const PROFESSIONAL_PREFIX: &str = "🤖 ";

/// Decorate `text` according to `tone`.
///
/// Exactly one decoration is applied per call. Friendly text that already
/// ends with `!` is returned unchanged.
pub fn style(text: &str, tone: PersonalityTone) -> String {
    match tone {
        PersonalityTone::Friendly => {
            if text.ends_with('!') {
                text.to_string()
            } else {
                format!("{}{}", text, FRIENDLY_SUFFIX)
            }
        }
        PersonalityTone::Sarcastic => format!("{}{}", SARCASTIC_PREFIX, text),
        PersonalityTone::Professional => format!("{}{}", PROFESSIONAL_PREFIX, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendly_appends_smile() {
        assert_eq!(style("See you later.", PersonalityTone::Friendly), "See you later. 😊");
    }

    #[test]
    fn test_friendly_skips_exclamation() {
        assert_eq!(style("Hello there!", PersonalityTone::Friendly), "Hello there!");
    }

    #[test]
    fn test_sarcastic_and_professional_prefix() {
        assert_eq!(style("Fine.", PersonalityTone::Sarcastic), "😏 Fine.");
        assert_eq!(style("Fine!", PersonalityTone::Professional), "🤖 Fine!");
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(style("", PersonalityTone::Friendly), " 😊");
        assert_eq!(style("", PersonalityTone::Sarcastic), "😏 ");
    }
}
