//! Controllers behind the route bindings.
//!
//! Each controller receives the whole [`GatewayRequest`] and writes the
//! response itself; the router never interprets what comes back.

pub mod client;
pub mod health;
pub mod relay;

pub use client::ClientController;
pub use relay::RelayController;

use crate::backend::{BackendBody, BackendRequest, BackendResponse};
use crate::error::GatewayResult;
use crate::middleware::ParsedBody;
use crate::routing::RouteMatch;
use axum::{
    body::Bytes,
    extract::Request,
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::error;

/// Request as seen by a controller, after prefix stripping.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    /// Canonical prefix of the route group, independent of the alias used.
    pub group_prefix: String,
    pub remainder: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    /// Parsed JSON body, if the request declared JSON content.
    pub body: Option<Value>,
    /// Body bytes exactly as received.
    pub raw_body: Bytes,
}

impl GatewayRequest {
    pub fn new(matched: &RouteMatch<'_>, request: Request) -> Self {
        let (parts, _) = request.into_parts();
        let ParsedBody { raw, json } = parts
            .extensions
            .get::<ParsedBody>()
            .cloned()
            .unwrap_or_default();

        Self {
            method: parts.method,
            group_prefix: matched.group().prefix.clone(),
            remainder: matched.remainder.to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body: json,
            raw_body: raw,
        }
    }

    /// Backend call for `<group prefix><subpath>`, carrying this request's
    /// query and headers but no body.
    pub fn to_backend(&self, method: Method, subpath: &str) -> BackendRequest {
        BackendRequest {
            method,
            path: format!("{}{}", self.group_prefix, subpath),
            query: self.query.clone(),
            headers: self.headers.clone(),
            body: BackendBody::Empty,
        }
    }
}

/// Write the backend's answer, or the gateway error, as the response.
pub(crate) fn respond(operation: &str, result: GatewayResult<BackendResponse>) -> Response {
    match result {
        Ok(response) => response.into_response(),
        Err(e) => {
            error!(operation = operation, error = %e, "Backend call failed");
            e.into_response()
        }
    }
}
