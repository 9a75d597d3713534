use crate::push::{Relay, WebhookValidator};

use std::sync::Arc;

pub struct AppState<S, G, T> {
    pub relay: Arc<Relay<S, G, T>>,
    pub validator: Arc<WebhookValidator>,
}

impl<S, G, T> AppState<S, G, T> {
    pub fn new(relay: Relay<S, G, T>, validator: WebhookValidator) -> Self {
        Self {
            relay: Arc::new(relay),
            validator: Arc::new(validator),
        }
    }
}

impl<S, G, T> Clone for AppState<S, G, T> {
    fn clone(&self) -> Self {
        Self {
            relay: Arc::clone(&self.relay),
            validator: Arc::clone(&self.validator),
        }
    }
}
