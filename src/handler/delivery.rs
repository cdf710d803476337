//! Delivery pipeline
//!
//! resolve → validate → negotiate → body, for files, listings and archives.
//! Filesystem work runs on the blocking pool; the validator is always
//! checked before anything expensive is produced.

use hyper::body::Bytes;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};

use super::render::{self, Representation};
use super::router::RequestContext;
use crate::config::AppState;
use crate::http::body::{self, HttpResponse};
use crate::http::cache::{fingerprint, ConditionalCache, Validator};
use crate::http::response::{
    build_304_response, build_bytes_response, build_content_response, build_redirect_response,
    ContentHeaders,
};
use crate::http::{mime, negotiate};
use crate::logger;
use crate::tree::resolve::read_no_follow;
use crate::tree::{archive, listing, resolve, DirectoryEntry, ResolvedTarget, TargetKind};
use crate::tree::{TreeError, TreeResult};

/// Run blocking filesystem work off the async workers
async fn blocking<T, F>(work: F) -> TreeResult<T>
where
    F: FnOnce() -> TreeResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| TreeError::Io(io::Error::other(e)))?
}

/// `GET /`: the configured roots
pub async fn serve_root(ctx: &RequestContext, state: &AppState) -> TreeResult<HttpResponse> {
    let validator = listing::roots_validator(&state.roots);
    if state.cache().check(&validator, ctx.if_none_match.as_deref()) {
        return Ok(build_304_response(&validator));
    }

    let entries = listing::list_roots(&state.roots);
    let repr = Representation::select(ctx.accept.as_deref(), false, false);
    let payload = match repr {
        Representation::Json => render::render_json(&entries)?,
        _ => render::render_html("/", &entries, false).into_bytes(),
    };
    listing_response(ctx, repr, payload, &validator)
}

/// `GET /{root}/{path}`
pub async fn serve_tree(
    ctx: &RequestContext,
    state: &Arc<AppState>,
    root_key: &str,
    raw_path: &str,
) -> TreeResult<HttpResponse> {
    let target = {
        let state = Arc::clone(state);
        let key = root_key.to_string();
        let raw = raw_path.to_string();
        blocking(move || resolve(&state.roots, &key, &raw)).await?
    };
    if logger::debug_enabled() {
        logger::log_debug(&format!(
            "Resolved /{root_key}/{raw_path} -> {} ({:?})",
            target.absolute_path.display(),
            target.kind
        ));
    }

    let has_slash = raw_path.is_empty() || raw_path.ends_with('/');
    match target.kind {
        TargetKind::File => serve_file(ctx, state.cache(), &target.absolute_path).await,
        TargetKind::Directory if !has_slash => {
            Ok(build_redirect_response(&ctx.with_trailing_slash()))
        }
        TargetKind::Directory if ctx.has_param("zip") && state.config.archive.enabled => {
            serve_archive(ctx, state, target).await
        }
        TargetKind::Directory => serve_directory(ctx, state, target).await,
    }
}

/// Stream a regular file with a strong validator
pub async fn serve_file(
    ctx: &RequestContext,
    cache: ConditionalCache,
    path: &Path,
) -> TreeResult<HttpResponse> {
    let file = OpenOptions::from(read_no_follow()).open(path).await?;
    let meta = file.metadata().await?;
    let validator = fingerprint([path.as_os_str().as_encoded_bytes()], Some(&meta), false);
    if cache.check(&validator, ctx.if_none_match.as_deref()) {
        return Ok(build_304_response(&validator));
    }

    let negotiated = negotiate(ctx.range_header.as_deref(), meta.len())?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let headers = ContentHeaders {
        content_type: mime::mime_for(&name),
        etag: &validator,
        disposition: None,
    };

    let payload = if ctx.is_head {
        body::empty()
    } else {
        body::file_window(file, negotiated.range).await?
    };
    Ok(build_content_response(&headers, &negotiated, payload))
}

async fn serve_directory(
    ctx: &RequestContext,
    state: &AppState,
    target: ResolvedTarget,
) -> TreeResult<HttpResponse> {
    let dir = target.absolute_path.clone();
    let names = {
        let dir = dir.clone();
        blocking(move || listing::entry_names(&dir)).await?
    };
    let validator = listing::listing_validator(&names, &target.metadata);
    if state.cache().check(&validator, ctx.if_none_match.as_deref()) {
        return Ok(build_304_response(&validator));
    }

    let entries: Vec<DirectoryEntry> = blocking(move || listing::list(&dir, &names)).await?;
    let (title, url_path) = listing_paths(&target);
    let repr = Representation::select(ctx.accept.as_deref(), ctx.has_param("m3u"), true);
    let payload = match repr {
        Representation::Html => {
            render::render_html(&title, &entries, state.config.archive.enabled).into_bytes()
        }
        Representation::Json => render::render_json(&entries)?,
        Representation::M3u => {
            let dir_url = format!("{}{url_path}", url_base(ctx, state));
            render::render_m3u(&dir_url, &entries).into_bytes()
        }
    };
    listing_response(ctx, repr, payload, &validator)
}

async fn serve_archive(
    ctx: &RequestContext,
    state: &AppState,
    target: ResolvedTarget,
) -> TreeResult<HttpResponse> {
    let dir = target.absolute_path.clone();
    let files = {
        let dir = dir.clone();
        blocking(move || {
            let names = listing::entry_names(&dir)?;
            archive::manifest(&dir, &names)
        })
        .await?
    };
    let validator = archive::archive_validator(&files, &target.metadata);
    if state.cache().check(&validator, ctx.if_none_match.as_deref()) {
        return Ok(build_304_response(&validator));
    }

    // Released on every early return below, or by the body once streamed
    let permit = state.archives.try_acquire()?;
    logger::log_debug(&format!(
        "Building archive of {} ({} files, {} slots left)",
        dir.display(),
        files.len(),
        state.archives.available()
    ));

    let spool = blocking(move || archive::build_archive(&dir, &files)).await?;
    let file = File::from_std(spool);
    let total = file.metadata().await?.len();
    let negotiated = negotiate(ctx.range_header.as_deref(), total)?;

    let disposition = archive::content_disposition(&target.name());
    let headers = ContentHeaders {
        content_type: "application/zip",
        etag: &validator,
        disposition: Some(&disposition),
    };

    let payload = if ctx.is_head {
        body::empty()
    } else {
        body::file_window_guarded(file, negotiated.range, permit).await?
    };
    Ok(build_content_response(&headers, &negotiated, payload))
}

/// A rendered listing, subject to range negotiation like any other body
fn listing_response(
    ctx: &RequestContext,
    repr: Representation,
    payload: Vec<u8>,
    validator: &Validator,
) -> TreeResult<HttpResponse> {
    let data = Bytes::from(payload);
    let negotiated = negotiate(ctx.range_header.as_deref(), data.len() as u64)?;
    let headers = ContentHeaders {
        content_type: repr.content_type(),
        etag: validator,
        disposition: None,
    };
    Ok(build_bytes_response(data, &headers, &negotiated, ctx.is_head))
}

/// Decoded title and encoded URL path of a directory, both ending with `/`
fn listing_paths(target: &ResolvedTarget) -> (String, String) {
    let mut title = format!("/{}/", target.root.key);
    let mut url = format!("/{}/", render::encode_segment(&target.root.key));
    for segment in &target.relative_path {
        let segment = segment.to_string_lossy();
        title.push_str(&segment);
        title.push('/');
        url.push_str(&render::encode_segment(&segment));
        url.push('/');
    }
    (title, url)
}

/// Scheme and authority for absolute playlist URLs
///
/// The configured base URL wins; otherwise the request's `Host`. Without
/// either the playlist falls back to root-relative URLs.
fn url_base(ctx: &RequestContext, state: &AppState) -> String {
    if let Some(base) = state.config.http.base_url.as_deref() {
        return base.trim_end_matches('/').to_string();
    }
    ctx.host
        .as_deref()
        .map(|host| format!("http://{host}"))
        .unwrap_or_default()
}
