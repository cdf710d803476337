//! HTTP response building module
//!
//! Builders for every status the server produces, plus the single place
//! where engine errors are turned into responses.

use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, ACCEPT_RANGES, ALLOW, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE, ETAG, LOCATION,
};
use hyper::{Response, StatusCode};

use super::body::{self, HttpResponse, ResponseBody};
use super::cache::Validator;
use super::range::{Negotiated, ACCEPT_RANGES as BYTES};
use crate::logger;
use crate::tree::error::TreeError;

/// Entity headers of a successful byte-serving response
#[derive(Debug, Clone, Copy)]
pub struct ContentHeaders<'a> {
    pub content_type: &'a str,
    pub etag: &'a Validator,
    /// `Content-Disposition` value, for downloads
    pub disposition: Option<&'a str>,
}

/// Build a 200/206 response around an already positioned body
pub fn build_content_response(
    headers: &ContentHeaders<'_>,
    negotiated: &Negotiated,
    payload: ResponseBody,
) -> HttpResponse {
    let mut builder = Response::builder()
        .status(negotiated.status)
        .header(CONTENT_TYPE, headers.content_type)
        .header(CONTENT_LENGTH, negotiated.content_length())
        .header(ACCEPT_RANGES, BYTES)
        .header(ETAG, headers.etag.as_str());

    if let Some(content_range) = negotiated.content_range() {
        builder = builder.header(CONTENT_RANGE, content_range);
    }
    if let Some(disposition) = headers.disposition {
        builder = builder.header(CONTENT_DISPOSITION, disposition);
    }

    builder.body(payload).unwrap_or_else(|e| {
        log_build_error(negotiated.status.as_str(), &e);
        Response::new(body::empty())
    })
}

/// Build a 200/206 response from an in-memory payload
///
/// The payload is sliced to the negotiated window; HEAD gets no body.
pub fn build_bytes_response(
    data: Bytes,
    headers: &ContentHeaders<'_>,
    negotiated: &Negotiated,
    is_head: bool,
) -> HttpResponse {
    let payload = if is_head {
        body::empty()
    } else {
        let range = negotiated.range;
        // Window was negotiated against data.len(), so both ends fit in usize
        let start = usize::try_from(range.start).unwrap_or(data.len());
        let end = usize::try_from(range.end_exclusive).unwrap_or(data.len());
        body::full(data.slice(start..end))
    };
    build_content_response(headers, negotiated, payload)
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &Validator) -> HttpResponse {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(ETAG, etag.as_str())
        .body(body::empty())
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(body::empty())
        })
}

/// Build 302 redirect response
pub fn build_redirect_response(target: &str) -> HttpResponse {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(LOCATION, target)
        .header(CONTENT_LENGTH, 0)
        .body(body::empty())
        .unwrap_or_else(|e| {
            log_build_error("302", &e);
            Response::new(body::empty())
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> HttpResponse {
    let mut response =
        build_plain_response(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET, HEAD, OPTIONS"));
    response
}

/// Build OPTIONS response
pub fn build_options_response() -> HttpResponse {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ALLOW, "GET, HEAD, OPTIONS")
        .body(body::empty())
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(body::empty())
        })
}

/// Translate an engine error into its response
///
/// Client errors carry a short plain-text body; server errors are logged
/// here and never expose the underlying cause.
pub fn build_error_response(err: &TreeError) -> HttpResponse {
    let status = err.status();
    match err {
        TreeError::RangeNotSatisfiable { total } => Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "text/plain")
            .header(CONTENT_RANGE, format!("bytes */{total}"))
            .header(ACCEPT_RANGES, BYTES)
            .body(body::full("416 Requested Range Not Satisfiable"))
            .unwrap_or_else(|e| {
                log_build_error("416", &e);
                Response::new(body::empty())
            }),
        TreeError::Io(cause) => {
            logger::log_error(&format!("Internal error while serving request: {cause}"));
            build_plain_response(status, "500 Internal Server Error")
        }
        TreeError::NotFound => build_plain_response(status, "404 Not Found"),
        TreeError::Forbidden => build_plain_response(status, "403 Forbidden"),
        TreeError::BadRequest(_) => build_plain_response(status, "400 Bad Request"),
        TreeError::TooManyArchives => {
            build_plain_response(status, "429 Too many operations in progress")
        }
    }
}

fn build_plain_response(status: StatusCode, text: &'static str) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain")
        .header(CONTENT_LENGTH, text.len())
        .body(body::full(text))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(body::empty())
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::cache::fingerprint;
    use crate::http::range::negotiate;
    use http_body_util::BodyExt;

    #[test]
    fn test_error_statuses() {
        let resp = build_error_response(&TreeError::NotFound);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = build_error_response(&TreeError::TooManyArchives);
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let resp = build_error_response(&TreeError::RangeNotSatisfiable { total: 1000 });
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()[CONTENT_RANGE], "bytes */1000");
    }

    #[test]
    fn test_405_has_allow() {
        let resp = build_405_response();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()[ALLOW], "GET, HEAD, OPTIONS");
    }

    #[tokio::test]
    async fn test_bytes_response_slices_window() {
        let etag = fingerprint(["listing"], None, true);
        let headers = ContentHeaders {
            content_type: "text/plain",
            etag: &etag,
            disposition: None,
        };
        let negotiated = negotiate(Some("bytes=2-4"), 10).unwrap();
        let resp = build_bytes_response(Bytes::from_static(b"0123456789"), &headers, &negotiated, false);

        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()[CONTENT_RANGE], "bytes 2-4/10");
        assert_eq!(resp.headers()[CONTENT_LENGTH], "3");
        assert_eq!(resp.headers()[ACCEPT_RANGES], "bytes");
        assert_eq!(resp.headers()[ETAG], etag.as_str());
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"234");
    }

    #[tokio::test]
    async fn test_head_keeps_headers() {
        let etag = fingerprint(["x"], None, false);
        let headers = ContentHeaders {
            content_type: "text/plain",
            etag: &etag,
            disposition: Some("attachment; filename=\"x.zip\""),
        };
        let negotiated = negotiate(None, 5).unwrap();
        let resp = build_bytes_response(Bytes::from_static(b"hello"), &headers, &negotiated, true);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_LENGTH], "5");
        assert!(resp.headers().contains_key(CONTENT_DISPOSITION));
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }
}
