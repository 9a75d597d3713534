use crate::config;
use crate::ports::{KeyValueStore, PushGateway, TimeProvider};
use crate::types::push::{DeliveryResult, GatewayHost};
use crate::types::webhook::WebhookPayload;

pub mod alert;
mod credentials;
pub mod delivery;
pub mod registry;
pub mod signer;
pub mod webhook;

pub use alert::alert_for_payload;
pub(crate) use credentials::{ApnsConfigStatus, load_apns_credentials};
pub use delivery::{Delivery, DeliveryOptions};
pub use registry::{DeviceRegistry, RegistryError, is_valid_account};
pub use signer::{SigningError, TokenCache, TokenSigner};
pub use webhook::{WebhookValidator, account_from_path, is_test_event};

/// What to do with tokens the gateway reports as permanently invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenPruning {
    #[default]
    Disabled,
    Registry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    NoDevices,
    Unmapped,
    SigningFailed,
    Delivered(Vec<DeliveryResult>),
}

/// Registration and webhook handling over one store, gateway and clock.
#[derive(Clone)]
pub struct Relay<S, G, T> {
    registry: DeviceRegistry<S>,
    signer: TokenSigner<S, T>,
    delivery: Delivery<G, T>,
    pruning: TokenPruning,
}

impl<S, G, T> Relay<S, G, T>
where
    S: KeyValueStore,
    G: PushGateway,
    T: TimeProvider,
{
    pub fn new(
        registry: DeviceRegistry<S>,
        signer: TokenSigner<S, T>,
        delivery: Delivery<G, T>,
        pruning: TokenPruning,
    ) -> Self {
        Self {
            registry,
            signer,
            delivery,
            pruning,
        }
    }

    pub fn from_config(config: &config::AppConfig, store: S, gateway: G, time: T) -> Self {
        let credentials = match load_apns_credentials(&config.apns) {
            ApnsConfigStatus::Ready(credentials) => Some(credentials),
            ApnsConfigStatus::Incomplete => {
                tracing::warn!("push delivery disabled: incomplete signing configuration");
                None
            }
            ApnsConfigStatus::Missing => {
                tracing::info!("push delivery disabled: no signing configuration");
                None
            }
        };

        let host = if config.apns.sandbox {
            GatewayHost::Sandbox
        } else {
            GatewayHost::Production
        };
        let options = DeliveryOptions {
            topic: config.apns.topic.clone(),
            host,
            sandbox_fallback: config.apns.sandbox_fallback,
            timeout: config.delivery_timeout,
        };
        let pruning = if config.prune_invalid_tokens {
            TokenPruning::Registry
        } else {
            TokenPruning::Disabled
        };

        Self::new(
            DeviceRegistry::new(store.clone()),
            TokenSigner::new(credentials, TokenCache::new(store), time.clone()),
            Delivery::new(gateway, time, options),
            pruning,
        )
    }

    pub async fn register(&self, account: &str, token: &str) -> Result<bool, RegistryError> {
        self.registry.register(account, token).await
    }

    /// Delivers an event to the account's devices. Every failure past this
    /// point is logged and folded into the outcome.
    pub async fn handle_event(
        &self,
        account: Option<&str>,
        payload: &WebhookPayload,
    ) -> EventOutcome {
        let Some(account) = account else {
            tracing::info!("webhook path does not name an account");
            return EventOutcome::NoDevices;
        };
        let devices = match self.registry.devices_for(account).await {
            Ok(Some(devices)) if !devices.is_empty() => devices,
            Ok(_) => {
                tracing::info!("no devices registered for webhook account");
                return EventOutcome::NoDevices;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load devices");
                return EventOutcome::NoDevices;
            }
        };

        let Some(notification) = alert_for_payload(payload) else {
            tracing::info!(event_type = ?payload.event_type, "event type has no notification");
            return EventOutcome::Unmapped;
        };

        let bearer_token = match self.signer.authorization_token().await {
            Ok(token) => token,
            Err(SigningError::NotConfigured) => {
                tracing::warn!("skipping delivery: push credentials are not configured");
                return EventOutcome::SigningFailed;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to obtain gateway token");
                return EventOutcome::SigningFailed;
            }
        };

        let devices: Vec<String> = devices.into_iter().collect();
        tracing::debug!(devices = devices.len(), "delivering notification");
        let results = self
            .delivery
            .deliver(&notification, &bearer_token, &devices)
            .await;
        self.handle_invalid_tokens(account, &results).await;
        EventOutcome::Delivered(results)
    }

    async fn handle_invalid_tokens(&self, account: &str, results: &[DeliveryResult]) {
        for result in results.iter().filter(|result| result.is_invalid_token()) {
            if self.pruning == TokenPruning::Disabled {
                tracing::info!(device_token = %result.device_token, "gateway reports invalid token");
                continue;
            }
            match self.registry.unregister(account, &result.device_token).await {
                Ok(removed) => {
                    tracing::info!(device_token = %result.device_token, removed, "pruned invalid token")
                }
                Err(err) => {
                    tracing::error!(error = %err, device_token = %result.device_token, "failed to prune invalid token")
                }
            }
        }
    }
}
