//! MIME type detection module
//!
//! Audio files are recognized through a fixed suffix table, matched
//! case-sensitively against the file name. Everything else goes through the
//! generic extension table.

use std::path::Path;

/// Suffixes served as playable audio, with the type announced for them
pub const AUDIO_EXTENSIONS: &[(&str, &str)] = &[
    (".flac", "audio/flac"),
    (".ogg", "audio/ogg"),
    (".mp3", "audio/mpeg"),
    (".wav", "audio/x-wav"),
    (".m4a", "audio/mpeg"),
];

/// Audio MIME type for a file name, if it has an audio suffix
pub fn audio_type(name: &str) -> Option<&'static str> {
    AUDIO_EXTENSIONS
        .iter()
        .find(|(ext, _)| name.ends_with(ext))
        .map(|&(_, mime)| mime)
}

pub fn is_audio(name: &str) -> bool {
    audio_type(name).is_some()
}

/// Content-Type to serve a file with: audio table first, then by extension
pub fn mime_for(name: &str) -> &'static str {
    audio_type(name).unwrap_or_else(|| {
        get_content_type(Path::new(name).extension().and_then(|e| e.to_str()))
    })
}

/// Get MIME Content-Type based on file extension
///
/// # Examples
/// ```
/// use audiotree::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("html")), "text/html; charset=utf-8");
/// assert_eq!(get_content_type(Some("mp4")), "video/mp4");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    let Some(extension) = extension else {
        return "application/octet-stream";
    };
    match extension.to_ascii_lowercase().as_str() {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "txt" | "md" | "nfo" | "log" | "cue" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "m3u" | "m3u8" => "audio/x-mpegurl",
        "pls" => "audio/x-scpls",

        // JavaScript/WASM
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "bmp" => "image/bmp",

        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",

        // Audio without a dedicated suffix entry
        "opus" => "audio/ogg",
        "aac" => "audio/aac",
        "wma" => "audio/x-ms-wma",
        "mid" | "midi" => "audio/midi",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",

        // Default
        _ => "application/octet-stream",
    }
}
