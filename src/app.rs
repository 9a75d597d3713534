use crate::ports::{KeyValueStore, PushGateway, TimeProvider};
use crate::state;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use serde::Serialize;

mod register;
mod webhook;

const X_ROBOTS_TAG: HeaderName = HeaderName::from_static("x-robots-tag");

pub fn app<S, G, T>(state: state::AppState<S, G, T>) -> Router
where
    S: KeyValueStore,
    G: PushGateway,
    T: TimeProvider,
{
    Router::new()
        .route("/register", any(register::register::<S, G, T>))
        .fallback(webhook::webhook::<S, G, T>)
        .with_state(state)
        .layer(middleware::from_fn(preconditions))
}

#[derive(Serialize)]
pub(crate) struct StatusBody {
    pub(crate) status: u16,
}

/// Every response carries only its own status code.
pub(crate) fn status_response(code: StatusCode) -> Response {
    tracing::info!(status = code.as_u16(), "response");
    (
        code,
        Json(StatusBody {
            status: code.as_u16(),
        }),
    )
        .into_response()
}

pub(crate) fn user_agent(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"))
}

pub(crate) async fn preconditions(req: Request<Body>, next: Next) -> Response {
    tracing::info!(
        method = %req.method(),
        uri = %req.uri(),
        user_agent = user_agent(req.headers()).unwrap_or_default(),
        "request"
    );

    let mut response = if req.method() != Method::POST {
        status_response(StatusCode::METHOD_NOT_ALLOWED)
    } else if !is_json_content_type(req.headers()) {
        status_response(StatusCode::UNSUPPORTED_MEDIA_TYPE)
    } else {
        next.run(req).await
    };

    response
        .headers_mut()
        .insert(X_ROBOTS_TAG, HeaderValue::from_static("noindex, nofollow"));
    response
}
