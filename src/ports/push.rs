use crate::types::push::{GatewayRequest, GatewayResponse};

pub trait PushGateway: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<GatewayResponse, Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(&'a self, request: GatewayRequest) -> Self::Fut<'a>;
}
