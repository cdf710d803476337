//! Path sandboxing
//!
//! Maps a root key and an untrusted relative path onto the filesystem. The
//! request path is normalized lexically first, so no encoding trick can walk
//! out of the root; parent directories are then canonicalized to make sure
//! no symlinked ancestor leads outside either. The final component is never
//! followed.

use std::fs::{self, Metadata};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::error::{TreeError, TreeResult};
use crate::config::{Root, RootSet};

/// What a resolved path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    File,
    Directory,
}

/// A request path that passed every sandbox check
#[derive(Debug)]
pub struct ResolvedTarget {
    pub root: Arc<Root>,
    /// Normalized path below the root, empty for the root itself
    pub relative_path: PathBuf,
    pub absolute_path: PathBuf,
    pub kind: TargetKind,
    /// `lstat` snapshot taken during resolution
    pub metadata: Metadata,
}

impl ResolvedTarget {
    pub fn is_dir(&self) -> bool {
        self.kind == TargetKind::Directory
    }

    /// Last path component, or the root key for the root itself
    pub fn name(&self) -> String {
        self.relative_path.file_name().map_or_else(
            || self.root.key.clone(),
            |n| n.to_string_lossy().into_owned(),
        )
    }
}

/// Read-only open options that refuse a symlink as the final component
///
/// Closes the window between the `lstat` in [`resolve`] and the open: a link
/// swapped in meanwhile fails with `ELOOP`, which maps to `Forbidden`.
pub fn read_no_follow() -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    options.read(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOFOLLOW);
    }
    options
}

/// Lexically normalize a relative request path
///
/// Collapses `.` and `..` segments and repeated separators without touching
/// the filesystem. Absolute paths and paths climbing above their start are
/// rejected.
pub fn normalize(raw_path: &str) -> TreeResult<PathBuf> {
    if raw_path.contains('\0') {
        return Err(TreeError::Forbidden);
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(raw_path).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(segment) => normalized.push(segment),
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(TreeError::Forbidden);
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(TreeError::Forbidden),
        }
    }
    Ok(normalized)
}

/// Resolve `raw_path` below the root named `root_key`
///
/// Blocking: performs `lstat` and `realpath` calls.
pub fn resolve(roots: &RootSet, root_key: &str, raw_path: &str) -> TreeResult<ResolvedTarget> {
    let root = roots.get(root_key).ok_or(TreeError::NotFound)?;
    let relative_path = normalize(raw_path)?;

    let absolute_path = match (relative_path.parent(), relative_path.file_name()) {
        (Some(parent), Some(name)) => {
            // Symlinks in ancestors are allowed only while they stay inside the root
            let physical_parent = root.base_dir.join(parent).canonicalize()?;
            if !physical_parent.starts_with(&root.base_dir) {
                return Err(TreeError::Forbidden);
            }
            physical_parent.join(name)
        }
        _ => root.base_dir.clone(),
    };

    let metadata = fs::symlink_metadata(&absolute_path)?;
    let file_type = metadata.file_type();
    let kind = if file_type.is_symlink() {
        return Err(TreeError::Forbidden);
    } else if file_type.is_dir() {
        TargetKind::Directory
    } else if file_type.is_file() {
        TargetKind::File
    } else {
        return Err(TreeError::Forbidden);
    };

    Ok(ResolvedTarget {
        root: Arc::clone(root),
        relative_path,
        absolute_path,
        kind,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, RootSet) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("album")).unwrap();
        fs::write(dir.path().join("album/01.mp3"), b"abc").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"img").unwrap();
        let roots = RootSet::new([("music", dir.path())]).unwrap();
        (dir, roots)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("").unwrap(), PathBuf::new());
        assert_eq!(normalize("foo/bar/").unwrap(), PathBuf::from("foo/bar"));
        assert_eq!(normalize("foo//./bar").unwrap(), PathBuf::from("foo/bar"));
        assert_eq!(normalize("foo/../bar").unwrap(), PathBuf::from("bar"));
        assert_eq!(normalize("foo/..").unwrap(), PathBuf::new());
    }

    #[test]
    fn test_normalize_rejects_traversal() {
        for raw in ["..", "../x", "/etc/passwd", "a/../../b", "./../x", "a\0b"] {
            assert!(
                matches!(normalize(raw), Err(TreeError::Forbidden)),
                "{raw:?} should be forbidden"
            );
        }
    }

    #[test]
    fn test_resolve_file_and_dir() {
        let (_dir, roots) = fixture();

        let target = resolve(&roots, "music", "album/01.mp3").unwrap();
        assert_eq!(target.kind, TargetKind::File);
        assert_eq!(target.relative_path, PathBuf::from("album/01.mp3"));
        assert!(target.absolute_path.starts_with(&target.root.base_dir));
        assert_eq!(target.name(), "01.mp3");

        let target = resolve(&roots, "music", "album/").unwrap();
        assert!(target.is_dir());

        let target = resolve(&roots, "music", "").unwrap();
        assert!(target.is_dir());
        assert_eq!(target.absolute_path, target.root.base_dir);
        assert_eq!(target.name(), "music");
    }

    #[test]
    fn test_resolve_errors() {
        let (_dir, roots) = fixture();
        assert!(matches!(
            resolve(&roots, "video", ""),
            Err(TreeError::NotFound)
        ));
        assert!(matches!(
            resolve(&roots, "music", "missing.mp3"),
            Err(TreeError::NotFound)
        ));
        assert!(matches!(
            resolve(&roots, "music", "nope/missing.mp3"),
            Err(TreeError::NotFound)
        ));
        for raw in ["../x", "/etc/passwd", ".."] {
            assert!(matches!(
                resolve(&roots, "music", raw),
                Err(TreeError::Forbidden)
            ));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_forbidden() {
        use std::os::unix::fs::symlink;

        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret"), b"s").unwrap();

        let (dir, roots) = fixture();
        // Link inside the sandbox, link leaving it, and a dangling link
        symlink(dir.path().join("cover.jpg"), dir.path().join("inside.jpg")).unwrap();
        symlink(outside.path(), dir.path().join("escape")).unwrap();
        symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

        for raw in ["inside.jpg", "escape", "escape/", "dangling", "escape/secret"] {
            assert!(
                matches!(resolve(&roots, "music", raw), Err(TreeError::Forbidden)),
                "{raw:?} should be forbidden"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_open_refuses_symlink() {
        use std::os::unix::fs::symlink;

        let (dir, _roots) = fixture();
        symlink(dir.path().join("cover.jpg"), dir.path().join("swapped.jpg")).unwrap();

        assert!(read_no_follow().open(dir.path().join("cover.jpg")).is_ok());
        let err = read_no_follow()
            .open(dir.path().join("swapped.jpg"))
            .unwrap_err();
        assert!(matches!(TreeError::from(err), TreeError::Forbidden));
    }

    #[cfg(unix)]
    #[test]
    fn test_special_file_forbidden() {
        use std::os::unix::net::UnixListener;

        let (dir, roots) = fixture();
        let _sock = UnixListener::bind(dir.path().join("sock")).unwrap();
        assert!(matches!(
            resolve(&roots, "music", "sock"),
            Err(TreeError::Forbidden)
        ));
    }
}
