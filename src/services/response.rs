//! HTTP response building helpers

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

use crate::cache::CacheEntry;
use crate::types::CatalogError;

fn with_status(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
}

/// Build a response from an already-serialized JSON body
pub fn json_bytes(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = with_status(status, body);
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => json_bytes(status, Bytes::from(json)),
        Err(e) => {
            error!(error = %e, "Failed to serialize response");
            json_bytes(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"error":"Internal server error"}"#),
            )
        }
    }
}

/// Build a JSON response with 200 OK status
pub fn ok<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, body)
}

/// Serve a cached body, or 304 when the client already holds it
pub fn cached(entry: &CacheEntry, if_none_match: Option<&str>) -> Response<Full<Bytes>> {
    let etag = HeaderValue::from_str(&entry.etag).ok();

    let mut response = if if_none_match == Some(entry.etag.as_str()) {
        with_status(StatusCode::NOT_MODIFIED, Bytes::new())
    } else {
        json_bytes(StatusCode::OK, entry.data.clone())
    };

    if let Some(etag) = etag {
        response.headers_mut().insert(header::ETAG, etag);
    }
    if let Ok(max_age) = HeaderValue::from_str(&format!("max-age={}", entry.remaining_ttl_secs())) {
        response.headers_mut().insert(header::CACHE_CONTROL, max_age);
    }
    response
}

/// Build an empty response with 204 No Content status
pub fn no_content() -> Response<Full<Bytes>> {
    with_status(StatusCode::NO_CONTENT, Bytes::new())
}

/// Build a 404 Not Found response with message
pub fn not_found(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": message }),
    )
}

/// Build a 405 Method Not Allowed response
pub fn method_not_allowed() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "error": "Method not allowed" }),
    )
}

/// Convert a CatalogError to an HTTP response.
///
/// Server-side failures are logged with their detail; the client only sees
/// the public message.
pub fn error_response(err: CatalogError) -> Response<Full<Bytes>> {
    if err.status_code().is_server_error() {
        error!(error = %err, "Request failed");
    }
    let (status, message) = err.into_status_code_and_body();
    json_response(status, &serde_json::json!({ "error": message }))
}
