use super::{status_response, user_agent};
use crate::ports::{KeyValueStore, PushGateway, TimeProvider};
use crate::push::webhook::{MANUAL_INTERACTION_EVENT, event_type};
use crate::push::{EventOutcome, account_from_path, is_test_event};
use crate::state;
use crate::types::webhook::WebhookPayload;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::Response;
use serde_json::Value as JsonValue;

/// Any path other than `/register`. Accepted webhooks always get 202,
/// whatever happens to delivery.
pub(crate) async fn webhook<S, G, T>(
    State(state): State<state::AppState<S, G, T>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: KeyValueStore,
    G: PushGateway,
    T: TimeProvider,
{
    let payload: JsonValue = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(error = %err, "request body is not json");
            return status_response(StatusCode::BAD_REQUEST);
        }
    };
    if !state
        .validator
        .is_webhook_request(user_agent(&headers), &payload)
    {
        return status_response(StatusCode::BAD_REQUEST);
    }

    tracing::info!(event_type = event_type(&payload).unwrap_or_default(), "webhook received");
    tracing::debug!(payload = %payload, "webhook payload");

    if is_test_event(&payload) {
        return status_response(StatusCode::ACCEPTED);
    }
    if event_type(&payload) == Some(MANUAL_INTERACTION_EVENT) {
        tracing::warn!(payload = %payload, "manual interaction required");
        return status_response(StatusCode::ACCEPTED);
    }

    let payload: WebhookPayload = match serde_json::from_value(payload) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(error = %err, "webhook payload has unexpected shape");
            return status_response(StatusCode::ACCEPTED);
        }
    };

    let account = account_from_path(uri.path());
    match state.relay.handle_event(account.as_deref(), &payload).await {
        EventOutcome::Delivered(results) => {
            let delivered = results.iter().filter(|result| result.success).count();
            tracing::info!(
                delivered,
                failed = results.len() - delivered,
                "webhook delivered"
            );
        }
        outcome => tracing::debug!(?outcome, "webhook not delivered"),
    }

    status_response(StatusCode::ACCEPTED)
}
