use super::{status_response, user_agent};
use crate::ports::{KeyValueStore, PushGateway, TimeProvider};
use crate::push::RegistryError;
use crate::state;
use crate::types::webhook::RegistrationRequest;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;

pub(crate) async fn register<S, G, T>(
    State(state): State<state::AppState<S, G, T>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: KeyValueStore,
    G: PushGateway,
    T: TimeProvider,
{
    if !state.validator.is_registration_agent(user_agent(&headers)) {
        tracing::warn!("registration from unrecognized user agent");
        return status_response(StatusCode::BAD_REQUEST);
    }

    let request: RegistrationRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "invalid registration body");
            return status_response(StatusCode::BAD_REQUEST);
        }
    };
    if request.account.trim().is_empty() || request.token.trim().is_empty() {
        tracing::warn!("registration with empty account or token");
        return status_response(StatusCode::BAD_REQUEST);
    }

    match state.relay.register(&request.account, &request.token).await {
        Ok(added) => {
            tracing::info!(added, "device registered");
            status_response(StatusCode::CREATED)
        }
        Err(RegistryError::InvalidAccount) => {
            tracing::warn!("registration with invalid account identifier");
            status_response(StatusCode::BAD_REQUEST)
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to register device");
            status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
