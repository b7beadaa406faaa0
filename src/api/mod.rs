//! HTTP surface: the webhook endpoint and a health check

pub mod health;
pub mod webhook;

use axum::{Router, extract::DefaultBodyLimit, routing};

use crate::SharedState;

pub use health::root;
pub use webhook::handle_webhook;

pub const WEBHOOK_PATH: &str = "/wh";

/// GitHub caps webhook payloads at 25 MB; larger deliveries are never sent.
pub const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route(
            WEBHOOK_PATH,
            routing::post(handle_webhook).layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES)),
        )
        .with_state(state)
}
