use crate::error::{GatewayError, GatewayResult};
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::Value;
use tracing::{debug, warn};

/// Request body buffered ahead of routing.
#[derive(Debug, Clone, Default)]
pub struct ParsedBody {
    /// Bytes exactly as received.
    pub raw: Bytes,
    /// Parsed value, when the request declared JSON content.
    pub json: Option<Value>,
}

/// Buffer the request body into a [`ParsedBody`] extension, parsing it
/// when it declares a JSON content type.
///
/// Bodies that declare JSON but do not parse are rejected before any route
/// is consulted. Like a strict body parser, only objects and arrays are
/// accepted at the top level.
pub async fn parse_body(State(limit): State<usize>, request: Request, next: Next) -> Response {
    match read_body(request, limit).await {
        Ok(request) => next.run(request).await,
        Err(e) => {
            warn!(error = %e, "Rejecting request body");
            e.into_response()
        }
    }
}

async fn read_body(request: Request, limit: usize) -> GatewayResult<Request> {
    let (mut parts, body) = request.into_parts();

    let raw = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| body_read_error(e, limit))?;

    let json = if is_json_content(&parts.headers) {
        parse_json(&raw)?
    } else {
        None
    };

    debug!(bytes = raw.len(), json = json.is_some(), "Buffered request body");

    parts.extensions.insert(ParsedBody {
        raw: raw.clone(),
        json,
    });
    Ok(Request::from_parts(parts, Body::from(raw)))
}

fn parse_json(raw: &[u8]) -> GatewayResult<Option<Value>> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value =
        serde_json::from_slice(raw).map_err(|e| GatewayError::InvalidJson(e.to_string()))?;
    if !(value.is_object() || value.is_array()) {
        return Err(GatewayError::InvalidJson(
            "top-level value must be an object or array".to_string(),
        ));
    }
    Ok(Some(value))
}

/// 413 only when the limit tripped; any other read failure is the client's.
fn body_read_error(error: axum::Error, limit: usize) -> GatewayError {
    let inner = error.into_inner();

    let first: &(dyn std::error::Error + 'static) = &*inner;
    let mut source = Some(first);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return GatewayError::PayloadTooLarge(limit);
        }
        source = e.source();
    }

    GatewayError::BodyRead(inner.to_string())
}

/// `application/json` or any `+json` suffix type, ignoring parameters.
pub fn is_json_content(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{self, HeaderValue};

    fn json_request(body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/client/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn test_is_json_content() {
        let mut headers = HeaderMap::new();
        assert!(!is_json_content(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json_content(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        assert!(is_json_content(&headers));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json_content(&headers));
    }

    #[tokio::test]
    async fn test_object_body_is_parsed() {
        let request = read_body(json_request(r#"{"email":"a@b.com"}"#), 1024)
            .await
            .unwrap();
        let parsed = request.extensions().get::<ParsedBody>().unwrap();
        assert_eq!(parsed.json.as_ref().unwrap()["email"], "a@b.com");
        assert_eq!(&parsed.raw[..], br#"{"email":"a@b.com"}"#);
    }

    #[tokio::test]
    async fn test_empty_body_is_none() {
        let request = read_body(json_request(""), 1024).await.unwrap();
        let parsed = request.extensions().get::<ParsedBody>().unwrap();
        assert!(parsed.json.is_none());
        assert!(parsed.raw.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_fails() {
        let err = read_body(json_request("{\"email\":"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_scalar_body_fails() {
        let err = read_body(json_request("42"), 1024).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_oversized_body_fails() {
        let err = read_body(json_request(r#"{"name":"abcdefghij"}"#), 8)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::PayloadTooLarge(8)));
    }

    #[tokio::test]
    async fn test_broken_body_stream_is_bad_request() {
        let stream = futures_util::stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"symbol=")),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "client went away",
            )),
        ]);
        let request = http::Request::builder()
            .method("POST")
            .uri("/trade/buy")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from_stream(stream))
            .unwrap();

        let err = read_body(request, 1024).await.unwrap_err();
        assert!(matches!(err, GatewayError::BodyRead(_)));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_json_body_is_kept_raw() {
        let request = http::Request::builder()
            .method("POST")
            .uri("/trade")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("not json"))
            .unwrap();
        let request = read_body(request, 1024).await.unwrap();
        let parsed = request.extensions().get::<ParsedBody>().unwrap().clone();
        assert!(parsed.json.is_none());
        assert_eq!(&parsed.raw[..], b"not json");

        let bytes = axum::body::to_bytes(request.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"not json");
    }

    #[tokio::test]
    async fn test_oversized_non_json_body_fails() {
        let request = http::Request::builder()
            .method("PUT")
            .uri("/portfolio/1")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("0123456789"))
            .unwrap();
        let err = read_body(request, 4).await.unwrap_err();
        assert!(matches!(err, GatewayError::PayloadTooLarge(4)));
    }
}
