use super::{respond, GatewayRequest};
use crate::backend::{Backend, BackendBody};
use axum::response::Response;
use std::sync::Arc;
use tracing::debug;

/// Pass-through for route groups whose endpoints live entirely in the
/// backend: method, subpath, query and body bytes are forwarded as received.
pub struct RelayController {
    backend: Arc<dyn Backend>,
}

impl RelayController {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn relay(&self, request: GatewayRequest) -> Response {
        debug!(
            method = %request.method,
            group = %request.group_prefix,
            remainder = %request.remainder,
            "Relaying request"
        );

        let mut backend_request = request.to_backend(request.method.clone(), &request.remainder);
        if !request.raw_body.is_empty() {
            backend_request.body = BackendBody::Raw(request.raw_body);
        }
        respond("relay", self.backend.forward(backend_request).await)
    }
}
