use serde::{Deserialize, Serialize};

pub const PRODUCTION_HOST: &str = "https://api.push.apple.com";
pub const SANDBOX_HOST: &str = "https://api.sandbox.push.apple.com";

/// Localized alert content as understood by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Alert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_loc_key: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub title_loc_args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_loc_key: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtitle_loc_args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc_key: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub loc_args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Aps {
    pub alert: Alert,
    pub sound: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub relevance_score: f64,
}

/// Complete request body sent to the gateway for one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub aps: Aps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deeplink: Option<String>,
    #[serde(rename = "hideInForeground", skip_serializing_if = "std::ops::Not::not")]
    pub hide_in_foreground: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayHost {
    Production,
    Sandbox,
}

impl GatewayHost {
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_HOST,
            Self::Sandbox => SANDBOX_HOST,
        }
    }

    /// Days until the gateway may drop an undelivered notification.
    pub fn expiration_days(self) -> i64 {
        match self {
            Self::Production => 14,
            Self::Sandbox => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub host: GatewayHost,
    pub device_token: String,
    pub bearer_token: String,
    pub topic: String,
    pub priority: u8,
    pub expiration: i64,
    pub body: String,
}

impl GatewayRequest {
    pub fn url(&self) -> String {
        format!("{}/3/device/{}", self.host.base_url(), self.device_token)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub apns_id: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GatewayErrorBody {
    pub(crate) reason: Option<String>,
}

/// Outcome of pushing one notification to one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryResult {
    pub success: bool,
    pub device_token: String,
    pub apns_id: Option<String>,
    pub status: Option<u16>,
    pub reason: Option<String>,
}

impl DeliveryResult {
    /// The gateway reported the token as permanently unusable.
    pub fn is_invalid_token(&self) -> bool {
        match (self.status, self.reason.as_deref()) {
            (Some(410), Some("Unregistered" | "ExpiredToken")) => true,
            (Some(400), Some("BadDeviceToken")) => true,
            _ => false,
        }
    }
}

/// Material for signing gateway bearer tokens.
#[derive(Clone)]
pub struct ApnsCredentials {
    pub team_id: String,
    pub key_id: String,
    pub private_key: String,
}

impl std::fmt::Debug for ApnsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApnsCredentials")
            .field("team_id", &self.team_id)
            .field("key_id", &self.key_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}
