//! Error taxonomy of the delivery engine
//!
//! Every failure the engine can report maps to exactly one HTTP status; the
//! mapping lives in [`TreeError::status`] and nowhere else.

use hyper::StatusCode;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    /// Unknown root, or nothing exists at the target path
    #[error("not found")]
    NotFound,

    /// Path escapes its root, targets a symlink, or targets a special file
    #[error("forbidden")]
    Forbidden,

    /// Malformed or multi-range `Range` header
    #[error("bad request: {0}")]
    BadRequest(&'static str),

    /// Range starts at or beyond the end of the resource
    #[error("range not satisfiable (resource is {total} bytes)")]
    RangeNotSatisfiable { total: u64 },

    /// Archive pool exhausted
    #[error("too many operations in progress")]
    TooManyArchives,

    /// Any other filesystem or archive failure
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl TreeError {
    /// Classify an I/O error by its reason: missing, permission-denied and
    /// refused-symlink become client errors, everything else stays fatal.
    pub fn from_io(err: io::Error) -> Self {
        // O_NOFOLLOW on a symlink
        #[cfg(unix)]
        if err.raw_os_error() == Some(libc::ELOOP) {
            return Self::Forbidden;
        }
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Forbidden,
            _ => Self::Io(err),
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::TooManyArchives => StatusCode::TOO_MANY_REQUESTS,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<io::Error> for TreeError {
    fn from(err: io::Error) -> Self {
        Self::from_io(err)
    }
}

impl From<zip::result::ZipError> for TreeError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::from_io(e),
            other => Self::Io(io::Error::other(other)),
        }
    }
}

pub type TreeResult<T> = Result<T, TreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        let missing = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(TreeError::from_io(missing), TreeError::NotFound));

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(TreeError::from(denied), TreeError::Forbidden));

        #[cfg(unix)]
        assert!(matches!(
            TreeError::from(io::Error::from_raw_os_error(libc::ELOOP)),
            TreeError::Forbidden
        ));

        let other = io::Error::other("disk on fire");
        assert!(matches!(TreeError::from_io(other), TreeError::Io(_)));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(TreeError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(TreeError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(TreeError::BadRequest("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            TreeError::RangeNotSatisfiable { total: 1 }.status(),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
        assert_eq!(
            TreeError::TooManyArchives.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            TreeError::Io(io::Error::other("x")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
