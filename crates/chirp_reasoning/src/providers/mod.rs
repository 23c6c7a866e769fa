pub mod llamacpp;
pub mod mock;

pub use llamacpp::LlamaCppEngine;
pub use mock::{MockEngine, MockReply};
