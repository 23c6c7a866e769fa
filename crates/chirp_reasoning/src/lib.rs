pub mod context;
pub mod dispatch;
pub mod invoker;
pub mod llm;
pub mod providers;
pub mod retry;
pub mod session;

pub use context::ConversationContext;
pub use dispatch::Dispatcher;
pub use invoker::{GenerationInvoker, EMPTY_REPLY_FALLBACK, GENERATION_APOLOGY};
pub use llm::{GenerationEngine, GenerationParams, TokenId};
pub use session::{ConversationState, SessionStore, DEFAULT_SESSION};
