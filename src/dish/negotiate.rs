//! Status, encoding and header selection for one request against one record.
//!
//! Pure and synchronous: no I/O, no locking.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, IF_MODIFIED_SINCE,
    IF_NONE_MATCH,
};
use hyper::{Method, Response, StatusCode};

use super::record::Representation;
use crate::http::cache;

/// Which bytes, if any, go on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyChoice {
    None,
    Identity,
    Gzip,
    Deflate,
}

impl BodyChoice {
    /// `Content-Encoding` token; identity and none carry no header
    pub const fn content_encoding(self) -> Option<&'static str> {
        match self {
            Self::Gzip => Some("gzip"),
            Self::Deflate => Some("deflate"),
            Self::None | Self::Identity => None,
        }
    }

    /// The chosen bytes of `record`
    pub fn select(self, record: &Representation) -> Bytes {
        match self {
            Self::None => Bytes::new(),
            Self::Identity => record.raw().clone(),
            Self::Gzip => record.gzip().cloned().unwrap_or_default(),
            Self::Deflate => record.deflate().cloned().unwrap_or_default(),
        }
    }
}

/// Outcome of negotiation, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyChoice,
}

impl Negotiated {
    /// Build the response; headers are complete before anything is written
    pub fn into_response(self, record: &Representation) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body.select(record)));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: hyper::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn accepts(request: &HeaderMap, coding: &str) -> bool {
    request
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains(coding))
}

/// Whether the request's validators match the record
///
/// Either a matching `If-None-Match` or an `If-Modified-Since` at or after
/// `Last-Modified` is enough. A record without a usable date never matches
/// on time.
pub fn is_not_modified(record: &Representation, request: &HeaderMap) -> bool {
    cache::check_etag_match(header_str(request, IF_NONE_MATCH), record.entity_tag())
        || record.last_modified().is_some_and(|modified| {
            cache::check_not_modified_since(header_str(request, IF_MODIFIED_SINCE), modified)
        })
}

/// Pick the encoding to send for a body-bearing response
///
/// Preference order is gzip, deflate, identity.
pub fn choose_encoding(record: &Representation, request: &HeaderMap) -> BodyChoice {
    if record.gzip().is_some() && accepts(request, "gzip") {
        BodyChoice::Gzip
    } else if record.deflate().is_some() && accepts(request, "deflate") {
        BodyChoice::Deflate
    } else {
        BodyChoice::Identity
    }
}

/// Decide status, headers and body for `request` against `record`
///
/// `status` is used when the request is not answered with 304.
pub fn negotiate(
    record: &Representation,
    request: &HeaderMap,
    method: &Method,
    status: StatusCode,
) -> Negotiated {
    let mut headers = record.headers().clone();

    let not_modified = is_not_modified(record, request);
    let body = if not_modified || *method == Method::HEAD {
        BodyChoice::None
    } else {
        choose_encoding(record, request)
    };

    headers.remove(CONTENT_ENCODING);
    headers.remove(CONTENT_LENGTH);
    if body != BodyChoice::None {
        if let Some(coding) = body.content_encoding() {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static(coding));
        }
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.select(record).len()));
    }

    Negotiated {
        status: if not_modified { StatusCode::NOT_MODIFIED } else { status },
        headers,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dish::record::testing::record;
    use hyper::header::{ETAG, LAST_MODIFIED, VARY};

    fn request(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_static(*value));
        }
        headers
    }

    #[test]
    fn test_gzip_preferred_when_accepted() {
        let r = record("k", 100, Some(30), Some(25));
        let out = negotiate(&r, &request(&[("accept-encoding", "deflate, GZIP")]), &Method::GET, StatusCode::OK);

        assert_eq!(out.status, StatusCode::OK);
        assert_eq!(out.body, BodyChoice::Gzip);
        assert_eq!(out.headers.get(CONTENT_ENCODING).unwrap(), "gzip");
        assert_eq!(out.headers.get(CONTENT_LENGTH).unwrap(), "30");
        assert_eq!(out.headers.get(VARY).unwrap(), "Accept-Encoding");
    }

    #[test]
    fn test_deflate_when_gzip_not_accepted() {
        let r = record("k", 100, Some(30), Some(25));
        let out = negotiate(&r, &request(&[("accept-encoding", "deflate")]), &Method::GET, StatusCode::OK);
        assert_eq!(out.body, BodyChoice::Deflate);
        assert_eq!(out.headers.get(CONTENT_ENCODING).unwrap(), "deflate");
        assert_eq!(out.headers.get(CONTENT_LENGTH).unwrap(), "25");
    }

    #[test]
    fn test_identity_without_variants_or_accept() {
        let plain = record("k", 100, None, None);
        let out = negotiate(&plain, &request(&[("accept-encoding", "gzip")]), &Method::GET, StatusCode::OK);
        assert_eq!(out.body, BodyChoice::Identity);
        assert!(out.headers.get(CONTENT_ENCODING).is_none());
        assert_eq!(out.headers.get(CONTENT_LENGTH).unwrap(), "100");

        let compressed = record("k", 100, Some(30), Some(25));
        let out = negotiate(&compressed, &HeaderMap::new(), &Method::GET, StatusCode::OK);
        assert_eq!(out.body, BodyChoice::Identity);
        assert_eq!(out.headers.get(CONTENT_LENGTH).unwrap(), "100");
    }

    #[test]
    fn test_if_none_match_quoted_or_bare() {
        let r = record("k", 10, Some(5), None);
        let quoted = format!("\"{}\"", r.etag());
        for tag in [r.etag().to_string(), quoted] {
            let mut req = HeaderMap::new();
            req.insert(IF_NONE_MATCH, HeaderValue::from_str(&tag).unwrap());
            req.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
            let out = negotiate(&r, &req, &Method::GET, StatusCode::OK);

            assert_eq!(out.status, StatusCode::NOT_MODIFIED);
            assert_eq!(out.body, BodyChoice::None);
            assert!(out.headers.get(CONTENT_LENGTH).is_none());
            assert!(out.headers.get(CONTENT_ENCODING).is_none());
            assert!(out.headers.contains_key(ETAG));
        }
    }

    #[test]
    fn test_if_modified_since() {
        // Record is modified 2020-01-01T00:00:00Z
        let r = record("k", 10, None, None);
        let same = negotiate(
            &r,
            &request(&[("if-modified-since", "Wed, 01 Jan 2020 00:00:00 GMT")]),
            &Method::GET,
            StatusCode::OK,
        );
        assert_eq!(same.status, StatusCode::NOT_MODIFIED);

        let older = negotiate(
            &r,
            &request(&[("if-modified-since", "Tue, 31 Dec 2019 23:59:59 GMT")]),
            &Method::GET,
            StatusCode::OK,
        );
        assert_eq!(older.status, StatusCode::OK);

        let malformed = negotiate(
            &r,
            &request(&[("if-modified-since", "not a date")]),
            &Method::GET,
            StatusCode::OK,
        );
        assert_eq!(malformed.status, StatusCode::OK);
        assert_eq!(malformed.body, BodyChoice::Identity);
    }

    #[test]
    fn test_either_validator_is_enough() {
        let r = record("k", 10, None, None);
        let out = negotiate(
            &r,
            &request(&[
                ("if-none-match", "\"something-else\""),
                ("if-modified-since", "Thu, 02 Jan 2020 00:00:00 GMT"),
            ]),
            &Method::GET,
            StatusCode::OK,
        );
        assert_eq!(out.status, StatusCode::NOT_MODIFIED);
    }

    #[test]
    fn test_head_has_no_body() {
        let r = record("k", 10, Some(5), None);
        let out = negotiate(&r, &request(&[("accept-encoding", "gzip")]), &Method::HEAD, StatusCode::OK);
        assert_eq!(out.status, StatusCode::OK);
        assert_eq!(out.body, BodyChoice::None);
        assert!(out.headers.get(CONTENT_LENGTH).is_none());
        assert!(out.headers.contains_key(LAST_MODIFIED));

        let response = out.into_response(&r);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_override_status_and_304_precedence() {
        let r = record("k", 10, None, None);
        let out = negotiate(&r, &HeaderMap::new(), &Method::GET, StatusCode::NOT_FOUND);
        assert_eq!(out.status, StatusCode::NOT_FOUND);

        let mut req = HeaderMap::new();
        req.insert(IF_NONE_MATCH, HeaderValue::from_str(r.etag()).unwrap());
        let out = negotiate(&r, &req, &Method::GET, StatusCode::NOT_FOUND);
        assert_eq!(out.status, StatusCode::NOT_MODIFIED);
    }

    #[test]
    fn test_idempotent() {
        let r = record("k", 64, Some(20), Some(18));
        let req = request(&[("accept-encoding", "gzip, deflate")]);
        let first = negotiate(&r, &req, &Method::GET, StatusCode::OK);
        let second = negotiate(&r, &req, &Method::GET, StatusCode::OK);
        assert_eq!(first, second);
        assert_eq!(first.body.select(&r), second.body.select(&r));
    }
}
