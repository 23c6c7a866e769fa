//! Ordered keyword rules (the fast path in front of generation).
//!
//! Each rule is a trigger → action pair. Triggers are substring tests against
//! a lowercased copy of the message; the first rule with any matching trigger
//! fires and nothing after it is looked at.

use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::persona::PersonalityTone;
use crate::style::style;

pub const GREETINGS: &[&str] = &[
    "Hello there!",
    "Hey! How can I assist you today?",
    "Hi! Nice to meet you!",
];

pub const FAREWELLS: &[&str] = &["Goodbye! 👋", "See you later!", "Take care!"];

pub const ACKNOWLEDGEMENTS: &[&str] = &["You're welcome!", "No problem!", "Glad I could help!"];

pub const JOKES: &[&str] = &[
    "Why don’t programmers like nature? It has too many bugs! 🐛",
    "Why did the computer show up late? It had a hard drive!",
    "Why do Java developers wear glasses? Because they don’t C#! 🤓",
];

pub const MEMORY_RESET_REPLY: &str = "Chat memory has been reset 🧠";

/// Mutable conversation state a rule may touch.
pub trait ConversationControl {
    fn tone(&self) -> PersonalityTone;
    fn set_tone(&mut self, tone: PersonalityTone);
    /// Drop all accumulated dialogue history.
    fn reset_context(&mut self);
}

// ============================================================================
// Rule Data Model
// ============================================================================

/// What a rule does once one of its triggers matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// Reply with a random line from a fixed set.
    Pick(&'static [&'static str]),
    /// Reply with the current wall-clock time (12-hour).
    CurrentTime,
    /// Reply with the current date, long form.
    CurrentDate,
    /// Clear the conversation context.
    ResetContext,
    /// Switch tone based on keywords in the message.
    ChangePersonality,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRule {
    pub name: &'static str,
    /// Any of these substrings (lowercase) fires the rule.
    pub triggers: &'static [&'static str],
    pub action: RuleAction,
}

impl ChatRule {
    pub fn matches(&self, lowered: &str) -> bool {
        self.triggers.iter().any(|t| lowered.contains(t))
    }
}

/// The built-in rule list, in evaluation order.
pub fn default_rules() -> Vec<ChatRule> {
    vec![
        ChatRule {
            name: "greeting",
            triggers: &["hello", "hi", "hey"],
            action: RuleAction::Pick(GREETINGS),
        },
        ChatRule {
            name: "farewell",
            triggers: &["bye", "goodbye"],
            action: RuleAction::Pick(FAREWELLS),
        },
        ChatRule {
            name: "gratitude",
            triggers: &["thanks", "thank you"],
            action: RuleAction::Pick(ACKNOWLEDGEMENTS),
        },
        ChatRule {
            name: "time",
            triggers: &["time"],
            action: RuleAction::CurrentTime,
        },
        ChatRule {
            name: "date",
            triggers: &["date"],
            action: RuleAction::CurrentDate,
        },
        ChatRule {
            name: "joke",
            triggers: &["joke"],
            action: RuleAction::Pick(JOKES),
        },
        ChatRule {
            name: "reset_memory",
            triggers: &["clear memory", "reset chat"],
            action: RuleAction::ResetContext,
        },
        ChatRule {
            name: "change_personality",
            triggers: &["change personality"],
            action: RuleAction::ChangePersonality,
        },
    ]
}

// ============================================================================
// Rule Engine
// ============================================================================

#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<ChatRule>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl RuleEngine {
    pub fn new(rules: Vec<ChatRule>) -> Self {
        Self { rules }
    }

    /// First rule whose trigger occurs in `lowered`.
    pub fn find(&self, lowered: &str) -> Option<&ChatRule> {
        self.rules.iter().find(|r| r.matches(lowered))
    }

    /// Try to answer `input` without generation.
    ///
    /// Returns `None` when no rule matched; the caller falls through to the
    /// generative path. Side effects (tone change, context reset) are applied
    /// to `state` before the reply is styled.
    pub fn evaluate<C, R>(
        &self,
        input: &str,
        state: &mut C,
        rng: &mut R,
        now: NaiveDateTime,
    ) -> Option<String>
    where
        C: ConversationControl + ?Sized,
        R: Rng + ?Sized,
    {
        let lowered = input.to_lowercase();
        let rule = self.find(&lowered)?;
        tracing::debug!(rule = rule.name, "Rule matched");

        let text = match rule.action {
            RuleAction::Pick(lines) => lines.choose(rng).copied().unwrap_or_default().to_string(),
            RuleAction::CurrentTime => format!("The current time is {}.", now.format("%I:%M %p")),
            RuleAction::CurrentDate => format!("Today's date is {}.", now.format("%A, %B %d, %Y")),
            RuleAction::ResetContext => {
                state.reset_context();
                MEMORY_RESET_REPLY.to_string()
            }
            RuleAction::ChangePersonality => {
                let tone = PersonalityTone::from_keywords(&lowered);
                state.set_tone(tone);
                format!("Personality changed to {} mode.", tone)
            }
        };

        // Read the tone after the action so a personality change styles with the new tone
        Some(style(&text, state.tone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Default)]
    struct TestState {
        tone: PersonalityTone,
        resets: usize,
    }

    impl ConversationControl for TestState {
        fn tone(&self) -> PersonalityTone {
            self.tone
        }
        fn set_tone(&mut self, tone: PersonalityTone) {
            self.tone = tone;
        }
        fn reset_context(&mut self) {
            self.resets += 1;
        }
    }

    fn afternoon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 0)
            .unwrap()
    }

    fn run(input: &str, state: &mut TestState) -> Option<String> {
        let mut rng = StdRng::seed_from_u64(7);
        RuleEngine::default().evaluate(input, state, &mut rng, afternoon())
    }

    #[test]
    fn test_default_rule_order() {
        let names: Vec<_> = default_rules().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "greeting",
                "farewell",
                "gratitude",
                "time",
                "date",
                "joke",
                "reset_memory",
                "change_personality"
            ]
        );
    }

    #[test]
    fn test_jokes_keep_typographic_apostrophes() {
        assert_eq!(
            JOKES[0],
            "Why don\u{2019}t programmers like nature? It has too many bugs! 🐛"
        );
        assert_eq!(
            JOKES[2],
            "Why do Java developers wear glasses? Because they don\u{2019}t C#! 🤓"
        );
        assert!(JOKES.iter().all(|j| !j.contains('\'')));
    }

    #[test]
    fn test_greeting_is_case_insensitive() {
        let mut state = TestState::default();
        let reply = run("HELLO", &mut state).unwrap();
        assert!(GREETINGS.iter().any(|g| reply.starts_with(g)));
    }

    #[test]
    fn test_greeting_beats_farewell() {
        let mut state = TestState::default();
        let reply = run("hello and goodbye", &mut state).unwrap();
        assert!(GREETINGS.contains(&reply.as_str()), "got {reply}");
    }

    #[test]
    fn test_substring_matching_is_literal() {
        // "hi" inside "this" still counts as a greeting
        let engine = RuleEngine::default();
        assert_eq!(engine.find("is this on").map(|r| r.name), Some("greeting"));
        assert_eq!(engine.find("software update").map(|r| r.name), Some("date"));
    }

    #[test]
    fn test_time_format() {
        let mut state = TestState::default();
        let reply = run("what time is it", &mut state).unwrap();
        assert_eq!(reply, "The current time is 02:07 PM. 😊");
    }

    #[test]
    fn test_date_format() {
        let mut state = TestState::default();
        let reply = run("what's the date", &mut state).unwrap();
        assert_eq!(reply, "Today's date is Tuesday, March 05, 2024. 😊");
    }

    #[test]
    fn test_joke_is_from_fixed_set() {
        let mut state = TestState::default();
        let reply = run("tell me a joke", &mut state).unwrap();
        assert!(JOKES.iter().any(|j| reply.starts_with(j)), "got {reply}");
    }

    #[test]
    fn test_reset_calls_state() {
        let mut state = TestState::default();
        let reply = run("please reset chat", &mut state).unwrap();
        assert_eq!(state.resets, 1);
        assert_eq!(reply, "Chat memory has been reset 🧠 😊");

        run("CLEAR MEMORY", &mut state).unwrap();
        assert_eq!(state.resets, 2);
    }

    #[test]
    fn test_change_personality_styles_with_new_tone() {
        let mut state = TestState::default();
        let reply = run("change personality to sarcastic", &mut state).unwrap();
        assert_eq!(state.tone, PersonalityTone::Sarcastic);
        assert_eq!(reply, "😏 Personality changed to sarcastic mode.");

        let reply = run("change personality to professional", &mut state).unwrap();
        assert_eq!(state.tone, PersonalityTone::Professional);
        assert_eq!(reply, "🤖 Personality changed to professional mode.");

        let reply = run("change personality please", &mut state).unwrap();
        assert_eq!(state.tone, PersonalityTone::Friendly);
        assert_eq!(reply, "Personality changed to friendly mode. 😊");
    }

    #[test]
    fn test_no_match_leaves_state_alone() {
        let mut state = TestState {
            tone: PersonalityTone::Professional,
            resets: 0,
        };
        assert!(run("How are you", &mut state).is_none());
        assert!(run("", &mut state).is_none());
        assert_eq!(state.tone, PersonalityTone::Professional);
        assert_eq!(state.resets, 0);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let engine = RuleEngine::default();
        let picks = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = TestState::default();
            (0..5)
                .map(|_| engine.evaluate("joke", &mut state, &mut rng, afternoon()).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
    }
}
