//! Directory enumeration
//!
//! Produces the ordered item records for a directory: immediate entries
//! only, symlinks and special files dropped, directories first, then natural
//! name order.

use serde::Serialize;
use std::cmp::Ordering;
use std::fs::{self, Metadata};
use std::path::Path;

use super::error::TreeResult;
use super::natsort::{natural_cmp, sort_natural};
use crate::config::RootSet;
use crate::http::cache::{fingerprint, Validator};
use crate::http::mime;

/// One listed item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    #[serde(rename = "basename")]
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
    pub is_audio: bool,
    pub mime: Option<&'static str>,
}

impl DirectoryEntry {
    fn from_metadata(name: String, meta: &Metadata) -> Self {
        let is_dir = meta.is_dir();
        let (is_audio, mime) = if is_dir {
            (false, None)
        } else {
            (mime::is_audio(&name), Some(mime::mime_for(&name)))
        };
        Self {
            size: meta.len(),
            is_dir,
            is_audio,
            mime,
            name,
        }
    }
}

/// Raw names of a directory's immediate entries, in natural order
///
/// Cheap compared to [`list`]: no per-entry `stat`. Names that are not valid
/// UTF-8 cannot be addressed through a URL and are left out.
pub fn entry_names(dir: &Path) -> TreeResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        if let Ok(name) = entry?.file_name().into_string() {
            names.push(name);
        }
    }
    sort_natural(&mut names, String::as_str);
    Ok(names)
}

/// Weak validator of a directory listing
///
/// Covers the entry names and the directory's own stat snapshot, which
/// changes whenever an entry is added, removed or renamed.
pub fn listing_validator(names: &[String], dir_meta: &Metadata) -> Validator {
    fingerprint(names.iter().map(String::as_bytes), Some(dir_meta), true)
}

/// Stat, filter and order the given entry names of `dir`
pub fn list(dir: &Path, names: &[String]) -> TreeResult<Vec<DirectoryEntry>> {
    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let meta = match fs::symlink_metadata(dir.join(name)) {
            Ok(meta) => meta,
            // Entry vanished between readdir and stat
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        let file_type = meta.file_type();
        if file_type.is_symlink() || !(file_type.is_file() || file_type.is_dir()) {
            continue;
        }
        entries.push(DirectoryEntry::from_metadata(name.clone(), &meta));
    }
    sort_entries(&mut entries);
    Ok(entries)
}

/// Directories first, then natural name order
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => natural_cmp(&a.name, &b.name),
    });
}

/// Listing of the configured roots: one synthetic directory per key
pub fn list_roots(roots: &RootSet) -> Vec<DirectoryEntry> {
    let mut keys: Vec<&str> = roots.keys().collect();
    keys.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
    keys.into_iter()
        .map(|key| DirectoryEntry {
            name: key.to_string(),
            size: 0,
            is_dir: true,
            is_audio: false,
            mime: None,
        })
        .collect()
}

/// Weak validator of the root listing
pub fn roots_validator(roots: &RootSet) -> Validator {
    fingerprint(roots.keys().map(str::as_bytes), None, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_of(entries: &[DirectoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_dirs_first_then_natural() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("track10.mp3"), b"1").unwrap();
        fs::write(dir.path().join("track2.mp3"), b"22").unwrap();
        fs::write(dir.path().join("Track1.mp3"), b"333").unwrap();
        fs::write(dir.path().join("aaa.mp3"), b"").unwrap();
        fs::create_dir(dir.path().join("zzz")).unwrap();
        fs::create_dir(dir.path().join("Disc 10")).unwrap();
        fs::create_dir(dir.path().join("disc 9")).unwrap();

        let names = entry_names(dir.path()).unwrap();
        let entries = list(dir.path(), &names).unwrap();
        assert_eq!(
            names_of(&entries),
            vec![
                "disc 9",
                "Disc 10",
                "zzz",
                "aaa.mp3",
                "Track1.mp3",
                "track2.mp3",
                "track10.mp3"
            ]
        );
    }

    #[test]
    fn test_entry_flags() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.mp3"), b"12345").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"12").unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();

        let names = entry_names(dir.path()).unwrap();
        let entries = list(dir.path(), &names).unwrap();
        assert_eq!(names_of(&entries), vec!["a", "b.mp3", "cover.jpg"]);

        assert!(entries[0].is_dir);
        assert!(!entries[0].is_audio);
        assert_eq!(entries[0].mime, None);

        assert!(!entries[1].is_dir);
        assert!(entries[1].is_audio);
        assert_eq!(entries[1].size, 5);
        assert_eq!(entries[1].mime, Some("audio/mpeg"));

        assert!(!entries[2].is_audio);
        assert_eq!(entries[2].mime, Some("image/jpeg"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_skipped() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("real.mp3"), b"x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        symlink(dir.path().join("real.mp3"), dir.path().join("link.mp3")).unwrap();
        symlink(dir.path().join("sub"), dir.path().join("linkdir")).unwrap();
        symlink("/nonexistent", dir.path().join("dangling")).unwrap();

        let names = entry_names(dir.path()).unwrap();
        assert_eq!(names.len(), 5);
        let entries = list(dir.path(), &names).unwrap();
        assert_eq!(names_of(&entries), vec!["sub", "real.mp3"]);
    }

    #[test]
    fn test_listing_validator_changes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mp3"), b"x").unwrap();

        let names = entry_names(dir.path()).unwrap();
        let meta = fs::metadata(dir.path()).unwrap();
        let first = listing_validator(&names, &meta);
        assert!(first.is_weak());
        assert_eq!(first, listing_validator(&names, &fs::metadata(dir.path()).unwrap()));

        fs::write(dir.path().join("b.mp3"), b"y").unwrap();
        let names = entry_names(dir.path()).unwrap();
        let second = listing_validator(&names, &fs::metadata(dir.path()).unwrap());
        assert_ne!(first, second);
    }

    #[test]
    fn test_root_listing() {
        let a = tempfile::tempdir().unwrap();
        let roots = RootSet::new([
            ("video", a.path()),
            ("Music", a.path()),
            ("books", a.path()),
        ])
        .unwrap();

        let entries = list_roots(&roots);
        assert_eq!(names_of(&entries), vec!["books", "Music", "video"]);
        assert!(entries.iter().all(|e| e.is_dir && e.size == 0 && !e.is_audio));

        assert!(roots_validator(&roots).is_weak());
        assert_eq!(roots_validator(&roots), roots_validator(&roots));
    }
}
