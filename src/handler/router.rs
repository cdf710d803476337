//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, path
//! decoding, dispatch to the delivery pipeline, and access logging.

use hyper::header::{
    HeaderName, HeaderValue, ACCEPT, CONTENT_LENGTH, HOST, IF_NONE_MATCH, RANGE, REFERER, SERVER,
    USER_AGENT,
};
use hyper::{Method, Request, Version};
use percent_encoding::percent_decode_str;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::{delivery, static_files};
use crate::config::AppState;
use crate::http::body::HttpResponse;
use crate::http::{
    build_405_response, build_error_response, build_options_response, build_redirect_response,
};
use crate::logger::{self, AccessLogEntry};
use crate::tree::{TreeError, TreeResult};

/// The parts of a request the pipeline looks at
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub is_head: bool,
    /// Path as received, still percent-encoded
    pub raw_path: String,
    pub query: Option<String>,
    pub if_none_match: Option<String>,
    pub range_header: Option<String>,
    pub accept: Option<String>,
    pub host: Option<String>,
}

impl RequestContext {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let header = |name: HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        Self {
            is_head: req.method() == Method::HEAD,
            raw_path: req.uri().path().to_string(),
            query: req.uri().query().map(ToString::to_string),
            if_none_match: header(IF_NONE_MATCH),
            range_header: header(RANGE),
            accept: header(ACCEPT),
            host: header(HOST).or_else(|| req.uri().authority().map(ToString::to_string)),
        }
    }

    /// Whether the query string carries `name`, with or without a value
    pub fn has_param(&self, name: &str) -> bool {
        self.query.as_deref().is_some_and(|q| {
            q.split('&')
                .any(|pair| pair.split('=').next() == Some(name))
        })
    }

    /// Same URL with `/` appended to the path, query preserved
    pub fn with_trailing_slash(&self) -> String {
        match &self.query {
            Some(q) => format!("{}/?{q}", self.raw_path),
            None => format!("{}/", self.raw_path),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// Never fails: every error becomes a response here.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<HttpResponse, Infallible> {
    let started = Instant::now();
    let access = state
        .config
        .logging
        .access_log
        .then(|| access_entry(&req, peer_addr));

    let ctx = RequestContext::from_request(&req);
    let method = req.method().clone();
    drop(req);

    let mut response = match method {
        Method::GET | Method::HEAD => route(&ctx, &state)
            .await
            .unwrap_or_else(|err| build_error_response(&err)),
        Method::OPTIONS => build_options_response(),
        other => {
            logger::log_warning(&format!("Method not allowed: {other}"));
            build_405_response()
        }
    };

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if let Some(mut entry) = access {
        entry.status = response.status().as_u16();
        entry.body_bytes = if entry.method == "HEAD" {
            0
        } else {
            response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)
        };
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Map a decoded path onto the pipeline
async fn route(ctx: &RequestContext, state: &Arc<AppState>) -> TreeResult<HttpResponse> {
    let decoded = percent_decode_str(&ctx.raw_path)
        .decode_utf8()
        .map_err(|_| TreeError::BadRequest("path is not valid UTF-8"))?;
    let path = decoded.strip_prefix('/').unwrap_or(&decoded);

    match path {
        "" => delivery::serve_root(ctx, state).await,
        "favicon.png" | "robots.txt" => static_files::serve_asset(ctx, state, path).await,
        _ => {
            if let Some(name) = path.strip_prefix("_/") {
                return static_files::serve_asset(ctx, state, name).await;
            }
            match path.split_once('/') {
                Some((root_key, rest)) => delivery::serve_tree(ctx, state, root_key, rest).await,
                // `/{root}` names a directory: always redirect to `/{root}/`
                None if state.roots.get(path).is_some() => {
                    Ok(build_redirect_response(&ctx.with_trailing_slash()))
                }
                None => Err(TreeError::NotFound),
            }
        }
    }
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };
    let mut entry = AccessLogEntry::new(
        peer_addr.to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}
