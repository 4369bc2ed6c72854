//! Health check and the ManyChat-style JSON webhook.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::debug;

use super::AppState;
use crate::pipeline::InboundMessage;

pub const HEALTH_TEXT: &str = "✅ Catalog reply bot is running";

/// Keys that may carry the customer's text, in priority order.
const MESSAGE_KEYS: &[&str] = &["message", "text", "body", "input", "last_input_text"];

/// Parse a request body leniently: anything that is not JSON becomes `Null`.
pub fn parse_payload(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// Pull the message text out of a flat webhook payload.
///
/// The first non-blank string under a known key wins. Numbers and booleans
/// are stringified; objects, arrays and nulls are skipped. Returns an empty
/// string when nothing usable is present.
pub fn extract_message(payload: &Value) -> String {
    if let Value::String(s) = payload {
        return s.trim().to_string();
    }
    let Some(object) = payload.as_object() else {
        return String::new();
    };

    for key in MESSAGE_KEYS {
        match object.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
            Some(value @ (Value::Number(_) | Value::Bool(_))) => return value.to_string(),
            _ => continue,
        }
    }
    String::new()
}

/// Response body shaped for ManyChat dynamic blocks.
pub fn manychat_response(text: &str) -> Value {
    json!({ "content": { "messages": [{ "text": text }] } })
}

/// GET /
async fn health() -> &'static str {
    HEALTH_TEXT
}

/// POST /manychat
async fn manychat(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let payload = parse_payload(&body);
    let message = InboundMessage::new("manychat", extract_message(&payload));
    debug!(request_id = %message.id, chars = message.text.chars().count(), "ManyChat message");
    let text = state.pipeline.reply(&message).await;
    Json(manychat_response(&text))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/manychat", post(manychat))
}
