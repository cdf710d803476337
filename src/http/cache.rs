//! HTTP cache control module
//!
//! Provides `ETag` generation and conditional request handling.

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::Metadata;
use std::time::UNIX_EPOCH;

use crate::config::CacheConfig;

/// An `ETag` value, already quoted (`"…"` or `W/"…"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator(String);

impl Validator {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_weak(&self) -> bool {
        self.0.starts_with("W/")
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute a validator over discriminating `parts` and, optionally, the
/// stat snapshot of the filesystem object they describe
///
/// Each part is length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
/// The snapshot covers size, modification time and (on unix) identity, so
/// any change that could alter the content changes the validator.
pub fn fingerprint<I, P>(parts: I, source: Option<&Metadata>, weak: bool) -> Validator
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        let part = part.as_ref();
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    if let Some(meta) = source {
        hash_metadata(&mut hasher, meta);
    }

    let digest = hex::encode(&hasher.finalize()[..16]);
    if weak {
        Validator(format!("W/\"{digest}\""))
    } else {
        Validator(format!("\"{digest}\""))
    }
}

fn hash_metadata(hasher: &mut Sha256, meta: &Metadata) {
    hasher.update(b"stat");
    hasher.update(meta.len().to_le_bytes());
    hasher.update([u8::from(meta.is_dir())]);
    if let Ok(mtime) = meta.modified() {
        let since = mtime
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        hasher.update(since.as_secs().to_le_bytes());
        hasher.update(since.subsec_nanos().to_le_bytes());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        hasher.update(meta.dev().to_le_bytes());
        hasher.update(meta.ino().to_le_bytes());
        hasher.update(meta.ctime().to_le_bytes());
        hasher.update(meta.ctime_nsec().to_le_bytes());
    }
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Wildcard: `*`
///
/// Comparison is weak: a `W/` prefix on either side is ignored.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    let opaque = etag.trim_start_matches("W/");
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').map(str::trim).any(|e| {
            e == "*" || e.trim_start_matches("W/") == opaque
        })
    })
}

/// Conditional GET policy
#[derive(Debug, Clone, Copy)]
pub struct ConditionalCache {
    match_etag: bool,
}

impl ConditionalCache {
    pub const fn new(match_etag: bool) -> Self {
        Self { match_etag }
    }

    /// True when the request may be answered with 304 Not Modified
    ///
    /// Always false while matching is disabled.
    pub fn check(&self, validator: &Validator, if_none_match: Option<&str>) -> bool {
        self.match_etag && check_etag_match(if_none_match, validator.as_str())
    }
}

impl From<CacheConfig> for ConditionalCache {
    fn from(config: CacheConfig) -> Self {
        Self::new(config.match_etag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_fingerprint_format() {
        let strong = fingerprint(["hello world"], None, false);
        assert!(strong.as_str().starts_with('"'));
        assert!(strong.as_str().ends_with('"'));
        assert!(!strong.is_weak());

        let weak = fingerprint(["hello world"], None, true);
        assert!(weak.as_str().starts_with("W/\""));
        assert!(weak.is_weak());
        assert_eq!(weak.as_str().trim_start_matches("W/"), strong.as_str());
    }

    #[test]
    fn test_fingerprint_consistency() {
        assert_eq!(
            fingerprint(["same", "content"], None, true),
            fingerprint(["same", "content"], None, true)
        );
        assert_ne!(
            fingerprint(["ab", "c"], None, true),
            fingerprint(["a", "bc"], None, true)
        );
    }

    #[test]
    fn test_fingerprint_tracks_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        fs::write(&path, b"one").unwrap();

        let meta = fs::metadata(&path).unwrap();
        let first = fingerprint::<[&str; 0], _>([], Some(&meta), false);
        let again = fingerprint::<[&str; 0], _>([], Some(&fs::metadata(&path).unwrap()), false);
        assert_eq!(first, again);

        // Same size, different modification time
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000))
            .unwrap();
        let touched = fingerprint::<[&str; 0], _>([], Some(&fs::metadata(&path).unwrap()), false);
        assert_ne!(first, touched);

        fs::write(&path, b"longer content").unwrap();
        let rewritten = fingerprint::<[&str; 0], _>([], Some(&fs::metadata(&path).unwrap()), false);
        assert_ne!(touched, rewritten);
    }

    #[test]
    fn test_check_etag_match() {
        let etag = "\"abc123\"";
        assert!(check_etag_match(Some("\"abc123\""), etag));
        assert!(check_etag_match(Some("\"xyz\", \"abc123\""), etag));
        assert!(check_etag_match(Some("*"), etag));
        assert!(check_etag_match(Some("W/\"abc123\""), etag));
        assert!(check_etag_match(Some("\"abc123\""), "W/\"abc123\""));
        assert!(!check_etag_match(Some("\"different\""), etag));
        assert!(!check_etag_match(Some("\"abc\""), etag));
        assert!(!check_etag_match(None, etag));
    }

    #[test]
    fn test_disabled_cache_never_matches() {
        let validator = fingerprint(["x"], None, true);
        let header = Some(validator.as_str());
        assert!(ConditionalCache::new(true).check(&validator, header));
        assert!(!ConditionalCache::new(false).check(&validator, header));
        assert!(!ConditionalCache::from(CacheConfig { match_etag: false }).check(&validator, Some("*")));
    }
}
