use crate::ports;
use crate::types::push::{GatewayHost, GatewayRequest, GatewayResponse};

use jwt_simple::prelude::ES256KeyPair;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const ACCOUNT: &str = "0123456789abcdef0123456789abcdef";

#[derive(Clone)]
pub(crate) struct TestTime {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl TestTime {
    pub(crate) fn new() -> Self {
        let now = OffsetDateTime::parse("2025-01-12T09:30:00Z", &Rfc3339).expect("parse now");
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub(crate) fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().expect("now lock");
        *now += duration;
    }
}

impl ports::TimeProvider for TestTime {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("now lock")
    }
}

pub(crate) fn test_private_key_pem() -> String {
    ES256KeyPair::generate().to_pem().expect("pem")
}

#[derive(Debug)]
pub(crate) struct TestGatewayError;

impl std::fmt::Display for TestGatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("test gateway error")
    }
}

/// Gateway double: answers 200 unless told otherwise and records every request.
#[derive(Clone, Default)]
pub(crate) struct TestGateway {
    requests: Arc<Mutex<Vec<GatewayRequest>>>,
    responses: Arc<Mutex<HashMap<(GatewayHost, String), GatewayResponse>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    stalled: Arc<Mutex<HashSet<String>>>,
}

impl TestGateway {
    pub(crate) fn respond(&self, host: GatewayHost, device: &str, status: u16, reason: &str) {
        let body = serde_json::to_vec(&serde_json::json!({ "reason": reason })).expect("body");
        self.responses.lock().expect("responses lock").insert(
            (host, device.to_string()),
            GatewayResponse {
                status,
                apns_id: Some(format!("failed-{device}")),
                body,
            },
        );
    }

    pub(crate) fn fail(&self, device: &str) {
        self.failing
            .lock()
            .expect("failing lock")
            .insert(device.to_string());
    }

    pub(crate) fn stall(&self, device: &str) {
        self.stalled
            .lock()
            .expect("stalled lock")
            .insert(device.to_string());
    }

    pub(crate) fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl ports::PushGateway for TestGateway {
    type Error = TestGatewayError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<GatewayResponse, Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, request: GatewayRequest) -> Self::Fut<'a> {
        let device = request.device_token.clone();
        let host = request.host;
        self.requests.lock().expect("requests lock").push(request);

        if self.stalled.lock().expect("stalled lock").contains(&device) {
            return Box::pin(std::future::pending());
        }
        if self.failing.lock().expect("failing lock").contains(&device) {
            return Box::pin(std::future::ready(Err(TestGatewayError)));
        }
        let response = self
            .responses
            .lock()
            .expect("responses lock")
            .get(&(host, device.clone()))
            .cloned()
            .unwrap_or_else(|| GatewayResponse {
                status: 200,
                apns_id: Some(format!("id-{device}")),
                body: Vec::new(),
            });
        Box::pin(std::future::ready(Ok(response)))
    }
}
