//! Listing representations
//!
//! A listing is rendered as HTML for browsers, JSON for scripts, or an M3U
//! playlist of its audio entries for media players.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt::Write as _;
use std::io;

use crate::tree::DirectoryEntry;

/// Characters escaped in a single URL path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

pub const HTML_TYPE: &str = "text/html; charset=utf-8";
pub const JSON_TYPE: &str = "application/json";
pub const M3U_TYPE: &str = "audio/x-mpegurl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Html,
    Json,
    M3u,
}

impl Representation {
    /// Pick a representation from the first `Accept` media type and the
    /// `?m3u` query flag
    pub fn select(accept: Option<&str>, m3u_param: bool, allow_m3u: bool) -> Self {
        let first = accept
            .and_then(|a| a.split(',').next())
            .and_then(|t| t.split(';').next())
            .map(|t| t.trim().to_ascii_lowercase());

        match first.as_deref() {
            Some(JSON_TYPE) => Self::Json,
            Some(M3U_TYPE) if allow_m3u => Self::M3u,
            _ if m3u_param && allow_m3u => Self::M3u,
            _ => Self::Html,
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Html => HTML_TYPE,
            Self::Json => JSON_TYPE,
            Self::M3u => M3U_TYPE,
        }
    }
}

/// Percent-encode one path segment
pub fn encode_segment(name: &str) -> String {
    utf8_percent_encode(name, SEGMENT).to_string()
}

pub fn render_json(entries: &[DirectoryEntry]) -> io::Result<Vec<u8>> {
    Ok(serde_json::to_vec(entries)?)
}

/// One absolute URL per audio entry, in listing order
///
/// `dir_url` is the listing's own URL, ending with `/`.
pub fn render_m3u(dir_url: &str, entries: &[DirectoryEntry]) -> String {
    entries
        .iter()
        .filter(|e| e.is_audio)
        .fold(String::new(), |mut out, e| {
            let _ = writeln!(out, "{dir_url}{}", encode_segment(&e.name));
            out
        })
}

/// HTML page for a listing
///
/// `title` is the decoded path shown to the user; `archive` adds a link to
/// download the directory as a zip.
pub fn render_html(title: &str, entries: &[DirectoryEntry], archive: bool) -> String {
    let title = escape_html(title);
    let mut page = String::with_capacity(512 + entries.len() * 128);

    let _ = write!(
        page,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<ul>\n"
    );
    if title != "/" {
        page.push_str("<li><a href=\"../\">../</a></li>\n");
    }

    for entry in entries {
        let name = escape_html(&entry.name);
        let href = escape_html(&encode_segment(&entry.name));
        if entry.is_dir {
            let _ = writeln!(page, "<li><a href=\"{href}/\">{name}/</a></li>");
        } else {
            let _ = writeln!(
                page,
                "<li><a href=\"{href}\">{name}</a> <small>{}</small></li>",
                human_size(entry.size)
            );
        }
    }
    page.push_str("</ul>\n");

    if entries.iter().any(|e| e.is_audio) {
        page.push_str("<p><a href=\"?m3u\">Playlist</a></p>\n");
    }
    if archive {
        page.push_str("<p><a href=\"?zip\">Download as zip</a></p>\n");
    }
    page.push_str("</body>\n</html>\n");
    page
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn human_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if size < 1024 {
        return format!("{size} B");
    }
    let mut value = size as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
