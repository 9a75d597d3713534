use std::future::Future;
use std::pin::Pin;

use time::OffsetDateTime;

use crate::ports;
use crate::types::push::{GatewayRequest, GatewayResponse};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl ports::TimeProvider for SystemTimeProvider {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("gateway request failed: {0}")]
pub struct GatewayError(#[from] reqwest::Error);

/// HTTP/2 client for the push gateway.
#[derive(Debug, Clone)]
pub struct ApnsGateway {
    client: reqwest::Client,
}

impl ApnsGateway {
    pub fn new() -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl ports::PushGateway for ApnsGateway {
    type Error = GatewayError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<GatewayResponse, Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, request: GatewayRequest) -> Self::Fut<'a> {
        Box::pin(async move {
            let response = self
                .client
                .post(request.url())
                .header("content-type", "application/json;charset=UTF-8")
                .header("authorization", format!("Bearer {}", request.bearer_token))
                .header("apns-topic", request.topic.as_str())
                .header("apns-push-type", "alert")
                .header("apns-priority", request.priority.to_string())
                .header("apns-expiration", request.expiration.to_string())
                .body(request.body)
                .send()
                .await?;

            let status = response.status().as_u16();
            let headers = response.headers();
            let apns_id = headers
                .get("apns-unique-id")
                .or_else(|| headers.get("apns-id"))
                .and_then(|value| value.to_str().ok())
                .map(str::to_ascii_lowercase);
            let body = response.bytes().await?.to_vec();

            Ok(GatewayResponse {
                status,
                apns_id,
                body,
            })
        })
    }
}
