pub mod clock;
pub mod config;
pub mod persona;
pub mod responder;
pub mod rules;
pub mod style;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ChirpConfig;
pub use persona::{PersonalityTone, ToneParseError};
pub use responder::ChatResponder;
pub use rules::{ConversationControl, RuleEngine};
pub use style::style;
