//! HTTP surface: health check, ManyChat webhook, Messenger webhook.
//!
//! Every POST answers HTTP 200. Failures reach the customer as fixed chat
//! text, and a panic anywhere in a handler becomes the apology reply.

pub mod manychat;
pub mod messenger;

use std::any::Any;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use messenger::MessengerSender;

use crate::config::MessengerConfig;
use crate::pipeline::ReplyPipeline;
use crate::responder::templates;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReplyPipeline>,
    /// Token expected in the Messenger subscription handshake.
    pub verify_token: Option<String>,
    /// Send API client; page events are only acknowledged without one.
    pub messenger: Option<Arc<MessengerSender>>,
}

impl AppState {
    pub fn new(pipeline: Arc<ReplyPipeline>) -> Self {
        Self {
            pipeline,
            verify_token: None,
            messenger: None,
        }
    }

    pub fn with_messenger_config(mut self, config: &MessengerConfig) -> Self {
        self.verify_token = config.verify_token.clone();
        self.messenger = config
            .page_access_token
            .clone()
            .map(|token| Arc::new(MessengerSender::new(token)));
        self
    }

    pub fn with_sender(mut self, sender: MessengerSender) -> Self {
        self.messenger = Some(Arc::new(sender));
        self
    }
}

/// Build the full application router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(manychat::routes())
        .merge(messenger::routes())
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_reply))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn panic_reply(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked, answering with apology");
    Json(manychat::manychat_response(templates::APOLOGY)).into_response()
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use crate::catalog::{CatalogEntry, StaticCatalog};
    use crate::config::ReplyConfig;

    let catalog = StaticCatalog::new(vec![
        CatalogEntry::new("ปลั๊กไฟอัจฉริยะ", "https://shop.example/plug", "ปลั๊ก,ปลั๊กไฟ"),
        CatalogEntry::new("หม้อหุงข้าว", "https://shop.example/rice", "หม้อ,หุงข้าว"),
    ]);
    let pipeline = ReplyPipeline::from_config(&ReplyConfig::default(), Arc::new(catalog), None);
    AppState::new(Arc::new(pipeline))
}
