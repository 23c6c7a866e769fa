use crate::types::{ChatRequest, ChatResponse};
use anyhow::Context;
use axum::{
    extract::State,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use chirp_core::ChatResponder;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared state for the gateway server.
#[derive(Clone)]
struct AppState {
    responder: Arc<dyn ChatResponder>,
}

/// Build the router.
///
/// - `GET /` — bundled chat page
/// - `POST /api/chat` — `{message, session?}` → `{reply}`
/// - `GET /health` — health check
pub fn router(responder: Arc<dyn ChatResponder>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .layer(CorsLayer::permissive())
        .with_state(AppState { responder })
}

/// The gateway HTTP server.
pub struct GatewayServer {
    responder: Arc<dyn ChatResponder>,
    host: String,
    port: u16,
}

impl GatewayServer {
    pub fn new(responder: Arc<dyn ChatResponder>, host: &str, port: u16) -> Self {
        Self {
            responder,
            host: host.to_string(),
            port,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bind and serve until the process stops.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Gateway failed to bind {}", addr))?;
        tracing::info!("Gateway listening on http://{}", addr);
        axum::serve(listener, router(self.responder))
            .await
            .context("Gateway server error")
    }
}

// ============================================================================
// Route handlers
// ============================================================================

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> &'static str {
    "ok"
}

/// POST /api/chat — answer one message.
async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<ChatResponse> {
    let reply = state
        .responder
        .reply(req.session.as_deref(), req.message())
        .await;
    Json(ChatResponse { reply })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    struct Echo;

    #[async_trait]
    impl ChatResponder for Echo {
        async fn reply(&self, session: Option<&str>, message: &str) -> String {
            format!("{}:{}", session.unwrap_or("-"), message)
        }
    }

    fn app() -> Router {
        router(Arc::new(Echo))
    }

    async fn post_chat(body: &str) -> (StatusCode, String) {
        let resp = app()
            .oneshot(
                Request::post("/api/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(health().await, "ok");
    }

    #[tokio::test]
    async fn test_index_served() {
        let resp = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/api/chat"));
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let (status, body) = post_chat(r#"{"message":"yo","session":"s1"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"reply":"s1:yo"}"#);
    }

    #[tokio::test]
    async fn test_chat_missing_message_is_empty() {
        let (status, body) = post_chat("{}").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"reply":"-:"}"#);
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_json() {
        let (status, _) = post_chat("not json").await;
        assert!(status.is_client_error());
    }

    #[test]
    fn test_gateway_server_creates() {
        let server = GatewayServer::new(Arc::new(Echo), "127.0.0.1", 0);
        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.port, 0);
        assert_eq!(server.addr(), "127.0.0.1:0");
    }
}
