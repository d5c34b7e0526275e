// API response helpers

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::types::{ErrorDetail, ErrorResponse};

const JSON: &str = "application/json";

/// Serialize `body` as pretty JSON with `status`
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = match serde_json::to_string_pretty(body) {
        Ok(j) => j,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize API response");
            return raw_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":"Internal server error"}"#.to_string(),
            );
        }
    };
    raw_json(status, json)
}

fn raw_json(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to build API response");
            Response::new(Full::new(Bytes::from("Error")))
        })
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ErrorResponse {
            status: "NACK",
            error_detail: ErrorDetail {
                code: status.as_u16(),
                message: message.to_string(),
            },
        },
    )
}

/// 404 listing the endpoints that do exist
pub fn not_found() -> Response<Full<Bytes>> {
    error_response(
        StatusCode::NOT_FOUND,
        "unknown endpoint; available: GET /v1/cache, DELETE /v1/cache[?key=|?prefix=]",
    )
}

pub fn bad_request(message: &str) -> Response<Full<Bytes>> {
    error_response(StatusCode::BAD_REQUEST, message)
}

pub fn method_not_allowed() -> Response<Full<Bytes>> {
    let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    response
        .headers_mut()
        .insert(hyper::header::ALLOW, hyper::header::HeaderValue::from_static("GET, DELETE"));
    response
}
