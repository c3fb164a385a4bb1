use super::{respond, GatewayRequest};
use crate::backend::{Backend, BackendBody};
use axum::{http::Method, response::Response};
use std::sync::Arc;
use tracing::info;

/// Client registration and login, served by the backend's client service.
pub struct ClientController {
    backend: Arc<dyn Backend>,
}

impl ClientController {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Register a new client. The JSON payload goes to the backend untouched.
    pub async fn register_new_client(&self, request: GatewayRequest) -> Response {
        info!(has_body = request.body.is_some(), "Registering new client");

        let mut backend_request = request.to_backend(Method::POST, "/register");
        if let Some(body) = request.body {
            backend_request.body = BackendBody::Json(body);
        }
        respond("register_new_client", self.backend.forward(backend_request).await)
    }

    /// Log in an existing client. Credentials travel as `email` and
    /// `password` query parameters.
    pub async fn login_existing_client(&self, request: GatewayRequest) -> Response {
        info!("Logging in existing client");

        let backend_request = request.to_backend(Method::GET, "");
        respond("login_existing_client", self.backend.forward(backend_request).await)
    }
}
