//! On-the-fly directory archives
//!
//! A directory's immediate regular files are packed, uncompressed, into a
//! zip spooled to an anonymous temporary file. The spool has a known size,
//! so archives take part in range negotiation like any other file. Building
//! is bounded by [`ArchivePool`]; a request that finds the pool exhausted is
//! refused instead of queued.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::{TreeError, TreeResult};
use super::resolve::read_no_follow;
use crate::http::cache::{fingerprint, Validator};

/// Entries at or above this size need zip64 records
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Characters kept verbatim in `filename*`
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Slot held for the whole life of one archive response
pub type ArchivePermit = OwnedSemaphorePermit;

/// Process-wide limit on concurrent archive builds
#[derive(Debug, Clone)]
pub struct ArchivePool {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl ArchivePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Take a slot without waiting
    ///
    /// The slot is released when the returned permit is dropped, whether the
    /// response completed or the client disconnected.
    pub fn try_acquire(&self) -> TreeResult<ArchivePermit> {
        Arc::clone(&self.slots)
            .try_acquire_owned()
            .map_err(|_| TreeError::TooManyArchives)
    }

    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A regular file picked for an archive, with the `lstat` taken at the time
#[derive(Debug)]
pub struct ArchiveMember {
    pub name: String,
    pub metadata: fs::Metadata,
}

/// The regular files directly inside `dir`, in natural order
///
/// `names` is the natural-ordered entry list of `dir`; subdirectories,
/// symlinks and special files are left out.
pub fn manifest(dir: &Path, names: &[String]) -> TreeResult<Vec<ArchiveMember>> {
    let mut files = Vec::with_capacity(names.len());
    for name in names {
        match fs::symlink_metadata(dir.join(name)) {
            Ok(metadata) if metadata.file_type().is_file() => files.push(ArchiveMember {
                name: name.clone(),
                metadata,
            }),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(files)
}

/// Weak validator of a directory's archive
///
/// Covers the directory itself and every member's stat snapshot, so a file
/// rewritten in place changes it. Distinct from the listing validator of the
/// same directory.
pub fn archive_validator(files: &[ArchiveMember], dir_meta: &fs::Metadata) -> Validator {
    let members: Vec<Validator> = files
        .iter()
        .map(|f| fingerprint([f.name.as_bytes()], Some(&f.metadata), false))
        .collect();
    let parts = std::iter::once("zip").chain(members.iter().map(Validator::as_str));
    fingerprint(parts, Some(dir_meta), true)
}

/// Removed, or replaced by a symlink, since the manifest was taken
fn vanished(err: &io::Error) -> bool {
    #[cfg(unix)]
    if err.raw_os_error() == Some(libc::ELOOP) {
        return true;
    }
    err.kind() == io::ErrorKind::NotFound
}

/// Write the archive of `files` (relative to `dir`) into an anonymous spool
///
/// Returns the spool rewound to its start.
pub fn build_archive(dir: &Path, files: &[ArchiveMember]) -> TreeResult<File> {
    let mut zip = ZipWriter::new(tempfile::tempfile()?);

    for member in files {
        let mut source = match read_no_follow().open(dir.join(&member.name)) {
            Ok(f) => f,
            Err(e) if vanished(&e) => continue,
            Err(e) => return Err(e.into()),
        };
        let len = source.metadata()?.len();
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(len >= ZIP64_THRESHOLD);
        zip.start_file(member.name.as_str(), options)?;
        io::copy(&mut source, &mut zip)?;
    }

    let mut spool = zip.finish()?;
    spool.seek(SeekFrom::Start(0))?;
    Ok(spool)
}

/// `Content-Disposition` value for the archive of directory `dir_name`
///
/// Non-ASCII names get an ASCII fallback plus an RFC 5987 `filename*`.
pub fn content_disposition(dir_name: &str) -> String {
    let file_name = format!("{dir_name}.zip");
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == file_name {
        format!("attachment; filename=\"{file_name}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            utf8_percent_encode(&file_name, ATTR_CHAR)
        )
    }
}
