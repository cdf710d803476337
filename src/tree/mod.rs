//! Served tree module
//!
//! Everything that touches the filesystem on behalf of a request: path
//! sandboxing, directory enumeration and archive building. All of it is
//! blocking and runs on the blocking thread pool.

pub mod archive;
pub mod error;
pub mod listing;
pub mod natsort;
pub mod resolve;

pub use archive::{ArchivePermit, ArchivePool};
pub use error::{TreeError, TreeResult};
pub use listing::DirectoryEntry;
pub use resolve::{resolve, ResolvedTarget, TargetKind};
