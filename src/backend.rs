use crate::error::{GatewayError, GatewayResult};
use axum::{
    body::Bytes,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Headers copied from the inbound request onto the backend call.
pub fn is_forwarded_header(name: &header::HeaderName) -> bool {
    *name == header::AUTHORIZATION || *name == header::CONTENT_TYPE || *name == header::ACCEPT
}

/// A call to the backend service, relative to its base URL.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: BackendBody,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum BackendBody {
    #[default]
    Empty,
    Json(Value),
    /// Bytes sent exactly as the client supplied them.
    Raw(Bytes),
}

impl BackendBody {
    pub fn is_empty(&self) -> bool {
        match self {
            BackendBody::Empty => true,
            BackendBody::Json(_) => false,
            BackendBody::Raw(bytes) => bytes.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl IntoResponse for BackendResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

/// Downstream service the controllers delegate to
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn forward(&self, request: BackendRequest) -> GatewayResult<BackendResponse>;
}

/// Backend reached over HTTP
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::new();
        Self { base_url, client }
    }

    pub fn url_for(&self, path: &str, query: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// Translate a [`BackendRequest`] into the outgoing HTTP call.
    pub fn build_request(&self, request: BackendRequest) -> GatewayResult<reqwest::Request> {
        let url = self.url_for(&request.path, request.query.as_deref());

        // reqwest and axum sit on different `http` versions, so convert by value.
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| GatewayError::Backend(e.to_string()))?;

        let mut builder = self.client.request(method, &url);
        let has_body = !request.body.is_empty();

        for (name, value) in request.headers.iter() {
            // A content type without content would misdescribe the call.
            if *name == header::CONTENT_TYPE && !has_body {
                continue;
            }
            if is_forwarded_header(name) {
                builder = builder.header(name.as_str(), value.as_bytes());
            }
        }

        builder = match request.body {
            BackendBody::Empty => builder,
            BackendBody::Json(body) => builder.json(&body),
            BackendBody::Raw(bytes) => builder.body(bytes),
        };

        Ok(builder.build()?)
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn forward(&self, request: BackendRequest) -> GatewayResult<BackendResponse> {
        let outgoing = self.build_request(request)?;
        let url = outgoing.url().to_string();
        debug!(method = %outgoing.method(), url = %url, "Forwarding to backend");

        let response = self.client.execute(outgoing).await.map_err(|e| {
            warn!(url = %url, error = %e, "Backend request failed");
            GatewayError::from(e)
        })?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| GatewayError::Backend(e.to_string()))?;
        let bytes = response.bytes().await?;

        debug!(status = %status, bytes = bytes.len(), "Backend responded");

        Ok(BackendResponse {
            status,
            body: decode_body(&bytes),
        })
    }
}

/// JSON bodies pass through; plain text is wrapped as `{"message": ...}`.
pub fn decode_body(bytes: &[u8]) -> Option<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(_) => Some(json!({ "message": String::from_utf8_lossy(bytes).trim() })),
    }
}
