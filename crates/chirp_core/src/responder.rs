use async_trait::async_trait;

/// Anything that can answer a chat message.
///
/// `session` selects an independent conversation; `None` means the shared
/// default conversation. Implementations are infallible: failures surface as
/// reply text.
#[async_trait]
pub trait ChatResponder: Send + Sync {
    async fn reply(&self, session: Option<&str>, message: &str) -> String;
}
