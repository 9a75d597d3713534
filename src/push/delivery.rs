use crate::ports::{PushGateway, TimeProvider};
use crate::types::push::{
    DeliveryResult, GatewayErrorBody, GatewayHost, GatewayRequest, GatewayResponse, Notification,
};

use futures_util::future::join_all;

use std::sync::Arc;
use std::time::Duration;

const PRIORITY: u8 = 5;

#[derive(Debug, Clone)]
pub struct DeliveryOptions {
    pub topic: String,
    pub host: GatewayHost,
    /// Retry a production `BadDeviceToken` against the sandbox gateway.
    pub sandbox_fallback: bool,
    pub timeout: Duration,
}

/// Fans one notification out to every device of an account.
#[derive(Clone)]
pub struct Delivery<G, T> {
    gateway: G,
    time: T,
    options: Arc<DeliveryOptions>,
}

impl<G, T> Delivery<G, T>
where
    G: PushGateway,
    T: TimeProvider,
{
    pub fn new(gateway: G, time: T, options: DeliveryOptions) -> Self {
        Self {
            gateway,
            time,
            options: Arc::new(options),
        }
    }

    /// Sends to all devices at once and waits for each to settle. Results are
    /// in the same order as `devices`.
    pub async fn deliver(
        &self,
        notification: &Notification,
        bearer_token: &str,
        devices: &[String],
    ) -> Vec<DeliveryResult> {
        let body = match serde_json::to_string(notification) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode notification");
                return devices
                    .iter()
                    .map(|device| failure(device, None, None, "InvalidPayload"))
                    .collect();
            }
        };

        let sends = devices
            .iter()
            .map(|device| self.deliver_one(&body, bearer_token, device));
        join_all(sends).await
    }

    async fn deliver_one(&self, body: &str, bearer_token: &str, device: &str) -> DeliveryResult {
        let host = self.options.host;
        let result = self.send(host, body, bearer_token, device).await;

        let retry = self.options.sandbox_fallback
            && host == GatewayHost::Production
            && result.status == Some(400)
            && result.reason.as_deref() == Some("BadDeviceToken");
        if !retry {
            return result;
        }

        tracing::info!(device_token = %device, "retrying device against sandbox gateway");
        self.send(GatewayHost::Sandbox, body, bearer_token, device)
            .await
    }

    async fn send(
        &self,
        host: GatewayHost,
        body: &str,
        bearer_token: &str,
        device: &str,
    ) -> DeliveryResult {
        let expiration = self.time.now() + time::Duration::days(host.expiration_days());
        let request = GatewayRequest {
            host,
            device_token: device.to_string(),
            bearer_token: bearer_token.to_string(),
            topic: self.options.topic.clone(),
            priority: PRIORITY,
            expiration: expiration.unix_timestamp(),
            body: body.to_string(),
        };
        let sandbox = host == GatewayHost::Sandbox;

        match tokio::time::timeout(self.options.timeout, self.gateway.send(request)).await {
            Ok(Ok(response)) => result_from_response(device, sandbox, response),
            Ok(Err(err)) => {
                tracing::error!(error = %err, sandbox, device_token = %device, "gateway request failed");
                failure(device, None, None, "RequestFailed")
            }
            Err(_) => {
                tracing::error!(
                    timeout_ms = self.options.timeout.as_millis() as u64,
                    sandbox,
                    device_token = %device,
                    "gateway request timed out"
                );
                failure(device, None, None, "Timeout")
            }
        }
    }
}

fn result_from_response(device: &str, sandbox: bool, response: GatewayResponse) -> DeliveryResult {
    let GatewayResponse {
        status,
        apns_id,
        body,
    } = response;

    if status < 400 {
        tracing::info!(
            status,
            sandbox,
            apns_id = apns_id.as_deref().unwrap_or_default(),
            device_token = %device,
            "gateway accepted notification"
        );
        return DeliveryResult {
            success: true,
            device_token: device.to_string(),
            apns_id,
            status: Some(status),
            reason: None,
        };
    }

    let reason = serde_json::from_slice::<GatewayErrorBody>(&body)
        .ok()
        .and_then(|body| body.reason)
        .unwrap_or_else(|| "Unknown".to_string());
    tracing::error!(
        status,
        reason = %reason,
        sandbox,
        apns_id = apns_id.as_deref().unwrap_or_default(),
        device_token = %device,
        "gateway rejected notification"
    );
    failure(device, apns_id, Some(status), &reason)
}

fn failure(
    device: &str,
    apns_id: Option<String>,
    status: Option<u16>,
    reason: &str,
) -> DeliveryResult {
    DeliveryResult {
        success: false,
        device_token: device.to_string(),
        apns_id,
        status,
        reason: Some(reason.to_string()),
    }
}
