//! Webhook handler for GitHub push events

use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
};
use tracing::{debug, error, info, warn};

use crate::SharedState;
use crate::dispatch::DispatchOutcome;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub const EVENT_HEADER: &str = "X-GitHub-Event";
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// Handles the GitHub webhook POST request.
///
/// Deliveries without an `X-GitHub-Event` header are treated as pushes.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let delivery = header_str(&headers, DELIVERY_HEADER).unwrap_or("-");

    if let Some(event) = header_str(&headers, EVENT_HEADER).filter(|e| *e != "push") {
        info!("Delivery {}: not a push event; received {:?}", delivery, event);
        return (StatusCode::OK, format!("Ignored {} event", event));
    }

    let signature = header_str(&headers, SIGNATURE_HEADER);
    match state.dispatcher.dispatch(&body, signature).await {
        Ok(outcome) => {
            if let DispatchOutcome::Deployed { report, .. } = &outcome {
                if !report.stderr.is_empty() {
                    warn!("Delivery {}: deploy script stderr:\n{}", delivery, report.stderr);
                }
                debug!(
                    "Delivery {}: deploy script wrote {} bytes of output",
                    delivery,
                    report.stdout.len()
                );
            }
            info!("Delivery {}: {}", delivery, outcome.message());
            (StatusCode::OK, outcome.message())
        }
        Err(e) => {
            let status = e.status_code();
            error!("Delivery {}: responding {}: {}", delivery, status, e);
            (status, e.to_string())
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
