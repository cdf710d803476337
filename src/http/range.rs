//! HTTP Range request negotiation module
//!
//! Single `bytes=start-end` ranges for resumable downloads (RFC 7233 subset).
//! Multi-range and suffix forms are rejected as malformed.

use hyper::StatusCode;

use crate::tree::error::{TreeError, TreeResult};

/// Value of `Accept-Ranges` on every byte-serving response
pub const ACCEPT_RANGES: &str = "bytes";

/// Byte window `[start, end_exclusive)` of a resource of `total` bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end_exclusive: u64,
    pub total: u64,
}

impl ByteRange {
    /// The whole resource
    pub const fn full(total: u64) -> Self {
        Self {
            start: 0,
            end_exclusive: total,
            total,
        }
    }

    #[inline]
    pub const fn len(&self) -> u64 {
        self.end_exclusive - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inclusive last byte position
    #[inline]
    pub const fn last(&self) -> u64 {
        self.end_exclusive - 1
    }
}

/// Outcome of range negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated {
    pub status: StatusCode,
    pub range: ByteRange,
}

impl Negotiated {
    pub fn is_partial(&self) -> bool {
        self.status == StatusCode::PARTIAL_CONTENT
    }

    pub const fn content_length(&self) -> u64 {
        self.range.len()
    }

    /// `Content-Range` header value for partial responses
    pub fn content_range(&self) -> Option<String> {
        self.is_partial().then(|| {
            format!(
                "bytes {}-{}/{}",
                self.range.start,
                self.range.last(),
                self.range.total
            )
        })
    }
}

/// Decide what part of a `total`-byte resource to serve
///
/// # Examples
/// ```
/// use audiotree::http::range::negotiate;
///
/// let full = negotiate(None, 1000).unwrap();
/// assert_eq!(full.status.as_u16(), 200);
///
/// let tail = negotiate(Some("bytes=500-"), 1000).unwrap();
/// assert_eq!(tail.content_range().as_deref(), Some("bytes 500-999/1000"));
/// ```
pub fn negotiate(range_header: Option<&str>, total: u64) -> TreeResult<Negotiated> {
    let Some(header) = range_header else {
        return Ok(Negotiated {
            status: StatusCode::OK,
            range: ByteRange::full(total),
        });
    };

    let Some(spec) = header.trim().strip_prefix("bytes=") else {
        return Err(TreeError::BadRequest("unsupported range unit"));
    };

    // Only a single range is supported
    if spec.contains(',') {
        return Err(TreeError::BadRequest("multiple ranges"));
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return Err(TreeError::BadRequest("malformed range"));
    };

    let start = parse_position(start_str)?;
    let end = match end_str.trim() {
        "" => None,
        e => Some(parse_position(e)?),
    };

    if end.is_some_and(|e| e < start) {
        return Err(TreeError::BadRequest("range end before start"));
    }

    if start >= total {
        return Err(TreeError::RangeNotSatisfiable { total });
    }

    // Clamp end to total - 1
    let last = end.map_or(total - 1, |e| e.min(total - 1));

    Ok(Negotiated {
        status: StatusCode::PARTIAL_CONTENT,
        range: ByteRange {
            start,
            end_exclusive: last + 1,
            total,
        },
    })
}

fn parse_position(s: &str) -> TreeResult<u64> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TreeError::BadRequest("malformed range"));
    }
    s.parse::<u64>()
        .map_err(|_| TreeError::BadRequest("range position out of bounds"))
}
