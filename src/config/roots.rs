// Root registry module
// The set of served trees, built once at startup and read-only afterwards

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// A named, served directory tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub key: String,
    /// Canonical absolute path of the tree
    pub base_dir: PathBuf,
}

/// Errors raised while building the root registry
#[derive(Error, Debug)]
pub enum RootSetError {
    #[error("root name must not be empty or contain '/': {0:?}")]
    InvalidKey(String),

    #[error("roots can only be specified once: {0}")]
    DuplicateKey(String),

    #[error("root {key} is not a directory: {}", path.display())]
    NotADirectory { key: String, path: PathBuf },

    #[error("root {key} at {}: {source}", path.display())]
    Io {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Immutable registry of roots keyed by name
#[derive(Debug, Default)]
pub struct RootSet {
    roots: BTreeMap<String, Arc<Root>>,
}

impl RootSet {
    /// Build the registry, canonicalizing every base directory
    pub fn new<I, K, P>(entries: I) -> Result<Self, RootSetError>
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<Path>,
    {
        let mut roots = BTreeMap::new();
        for (key, path) in entries {
            let key = key.into();
            if key.is_empty() || key.contains('/') {
                return Err(RootSetError::InvalidKey(key));
            }
            if roots.contains_key(&key) {
                return Err(RootSetError::DuplicateKey(key));
            }

            let path = path.as_ref();
            let base_dir = path.canonicalize().map_err(|source| RootSetError::Io {
                key: key.clone(),
                path: path.to_path_buf(),
                source,
            })?;
            if !base_dir.is_dir() {
                return Err(RootSetError::NotADirectory {
                    key,
                    path: path.to_path_buf(),
                });
            }

            roots.insert(key.clone(), Arc::new(Root { key, base_dir }));
        }
        Ok(Self { roots })
    }

    pub fn get(&self, key: &str) -> Option<&Arc<Root>> {
        self.roots.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Parse a command-line root spec of the form `NAME=PATH`
pub fn parse_root_spec(spec: &str) -> Result<(String, PathBuf), String> {
    match spec.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got `{spec}`")),
    }
}
