// API module entry
// Management endpoints for inspecting and invalidating the representation cache

mod handlers;
mod response;
mod types;

use std::convert::Infallible;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};

use crate::config::AppState;
use crate::logger;

pub use handlers::parse_scope;
pub use response::{bad_request, json_response, not_found};
pub use types::{CacheSnapshot, InvalidationResponse, InvalidationScope};

/// API route handler
///
/// Dispatches on method and path; request bodies are ignored.
pub async fn handle_api_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path();
    let method = req.method();

    let response = match (method, path) {
        (&Method::GET, "/v1/cache") => handlers::handle_cache_get(&state),
        (&Method::DELETE, "/v1/cache") => handlers::handle_cache_delete(&state, req.uri().query()),
        (_, "/v1/cache") => response::method_not_allowed(),
        _ => not_found(),
    };

    logger::log_api_request(method.as_str(), path, response.status().as_u16());
    Ok(response)
}
