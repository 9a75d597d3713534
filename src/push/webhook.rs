use base64::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD, decode_config};
use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Sent by the media server's "test connection" button.
pub const TEST_EVENT: &str = "Test";
pub const MANUAL_INTERACTION_EVENT: &str = "ManualInteractionRequired";

/// Classifies inbound requests by user agent and payload shape.
///
/// This is a heuristic: nothing here authenticates the sender.
#[derive(Debug, Clone)]
pub struct WebhookValidator {
    sender_agents: Vec<String>,
    registration_agent: String,
}

impl WebhookValidator {
    pub fn new(sender_agents: Vec<String>, registration_agent: String) -> Self {
        let sender_agents = sender_agents
            .into_iter()
            .map(|agent| agent.trim().to_string())
            .filter(|agent| !agent.is_empty())
            .collect();
        Self {
            sender_agents,
            registration_agent,
        }
    }

    pub fn is_webhook_request(&self, user_agent: Option<&str>, payload: &JsonValue) -> bool {
        let Some(user_agent) = user_agent else {
            return false;
        };
        if !self
            .sender_agents
            .iter()
            .any(|agent| user_agent.starts_with(agent.as_str()))
        {
            return false;
        }

        let has_event_type = payload
            .get("eventType")
            .and_then(JsonValue::as_str)
            .is_some_and(|event_type| !event_type.is_empty());

        has_event_type && payload.get("instanceName").is_some()
    }

    pub fn is_registration_agent(&self, user_agent: Option<&str>) -> bool {
        !self.registration_agent.is_empty()
            && user_agent.is_some_and(|agent| agent.contains(self.registration_agent.as_str()))
    }
}

pub fn event_type(payload: &JsonValue) -> Option<&str> {
    payload.get("eventType").and_then(JsonValue::as_str)
}

pub fn is_test_event(payload: &JsonValue) -> bool {
    event_type(payload) == Some(TEST_EVENT)
}

/// Resolves the account a webhook is addressed to.
///
/// Accepts `/<account>` and `/push/<code>`, where `<code>` is base64 of
/// `<timestamp>:<account>`. The account is not validated here.
pub fn account_from_path(path: &str) -> Option<String> {
    let trimmed = path.trim_matches('/');
    if let Some(code) = trimmed.strip_prefix("push/") {
        return account_from_code(code);
    }
    if trimmed.is_empty() || trimmed.contains('/') {
        return None;
    }
    Some(trimmed.to_string())
}

fn account_from_code(code: &str) -> Option<String> {
    let decoded = decode_config(code, STANDARD)
        .or_else(|_| decode_config(code, URL_SAFE))
        .or_else(|_| decode_config(code, STANDARD_NO_PAD))
        .or_else(|_| decode_config(code, URL_SAFE_NO_PAD))
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (timestamp, account) = decoded.rsplit_once(':')?;
    if !is_valid_timestamp(timestamp) {
        return None;
    }
    Some(account.to_string())
}

fn is_valid_timestamp(raw: &str) -> bool {
    let raw = raw.trim();
    raw.parse::<i64>().is_ok() || OffsetDateTime::parse(raw, &Rfc3339).is_ok()
}
