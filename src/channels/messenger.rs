//! Facebook Messenger webhook and Send API client.
//!
//! `GET /webhook` answers the subscription handshake. `POST /webhook`
//! accepts either a Messenger page event (replies go out through the Send
//! API) or a flat chat-platform payload (answered inline like `/manychat`).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::AppState;
use super::manychat::{extract_message, manychat_response, parse_payload};
use crate::error::ChannelError;
use crate::pipeline::InboundMessage;

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v19.0";

/// Messenger rejects text messages longer than this many characters.
const MESSENGER_MAX_CHARS: usize = 2000;

/// Posts replies through the Graph Send API.
pub struct MessengerSender {
    page_access_token: SecretString,
    base_url: String,
    client: reqwest::Client,
}

impl MessengerSender {
    pub fn new(page_access_token: SecretString) -> Self {
        Self {
            page_access_token,
            base_url: GRAPH_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different Graph API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send a text reply, split into several messages when it is long.
    pub async fn send_text(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        if recipient.is_empty() {
            return Err(ChannelError::InvalidMessage("missing recipient id".into()));
        }
        for chunk in split_message(text, MESSENGER_MAX_CHARS) {
            self.send_chunk(recipient, &chunk).await?;
        }
        Ok(())
    }

    async fn send_chunk(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "recipient": { "id": recipient },
            "messaging_type": "RESPONSE",
            "message": { "text": text },
        });

        let resp = self
            .client
            .post(format!("{}/me/messages", self.base_url))
            .query(&[("access_token", self.page_access_token.expose_secret())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "messenger".into(),
                reason: e.without_url().to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "messenger".into(),
                reason: format!("Send API returned {status}: {detail}"),
            });
        }
        Ok(())
    }
}

/// Split on newlines or spaces so no chunk exceeds `max_chars` characters.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.chars().count() > max_chars {
        let limit = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PageEvent {
    #[serde(default)]
    entry: Vec<PageEntry>,
}

#[derive(Debug, Deserialize)]
struct PageEntry {
    #[serde(default)]
    messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Deserialize)]
struct MessagingEvent {
    sender: Option<Participant>,
    message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
struct Participant {
    id: String,
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    text: Option<String>,
    #[serde(default)]
    is_echo: bool,
}

impl PageEvent {
    /// (sender id, text) for every inbound text message. Echoes of the
    /// page's own messages and attachment-only messages are skipped.
    fn text_messages(self) -> Vec<(String, String)> {
        self.entry
            .into_iter()
            .flat_map(|entry| entry.messaging)
            .filter_map(|event| {
                let message = event.message?;
                if message.is_echo {
                    return None;
                }
                Some((event.sender?.id, message.text?))
            })
            .collect()
    }
}

/// GET /webhook
async fn verify(State(state): State<AppState>, Query(params): Query<VerifyParams>) -> Response {
    match (
        state.verify_token.as_deref(),
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge,
    ) {
        (Some(expected), Some("subscribe"), Some(token), Some(challenge)) if token == expected => {
            info!("Messenger webhook verified");
            (StatusCode::OK, challenge).into_response()
        }
        _ => {
            warn!(mode = ?params.mode, "Messenger webhook verification rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// POST /webhook
///
/// Page events are acknowledged straight away and answered from a spawned
/// task, so a slow sheet or LLM never delays `EVENT_RECEIVED` past the
/// platform's redelivery window.
async fn receive(State(state): State<AppState>, body: Bytes) -> Response {
    let payload = parse_payload(&body);

    if payload.get("object").and_then(Value::as_str) == Some("page") {
        let event: PageEvent = serde_json::from_value(payload).unwrap_or_default();
        let messages = event.text_messages();
        match state.messenger.clone() {
            Some(messenger) if !messages.is_empty() => {
                tokio::spawn(deliver(state, messenger, messages));
            }
            Some(_) => {}
            None => warn!(
                events = messages.len(),
                "FB_PAGE_ACCESS_TOKEN not set, page events not answered"
            ),
        }
        return (StatusCode::OK, "EVENT_RECEIVED").into_response();
    }

    let message = InboundMessage::new("webhook", extract_message(&payload));
    debug!(request_id = %message.id, "Flat webhook message");
    let text = state.pipeline.reply(&message).await;
    Json(manychat_response(&text)).into_response()
}

/// Answer page messages in arrival order.
async fn deliver(state: AppState, messenger: Arc<MessengerSender>, messages: Vec<(String, String)>) {
    for (sender, text) in messages {
        let message = InboundMessage::new("messenger", text).with_sender(sender.as_str());
        let reply = state.pipeline.reply(&message).await;
        match messenger.send_text(&sender, &reply).await {
            Ok(()) => debug!(request_id = %message.id, "Messenger reply delivered"),
            Err(e) => error!(request_id = %message.id, error = %e, "Messenger delivery failed"),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/webhook", get(verify).post(receive))
}
