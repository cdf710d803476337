// Application state module
// Immutable per-process state shared by every connection

use std::path::PathBuf;

use super::roots::{RootSet, RootSetError};
use super::types::Config;
use crate::http::ConditionalCache;
use crate::tree::archive::ArchivePool;

/// Application state
///
/// Built once at startup and shared as `Arc<AppState>`; nothing in here is
/// mutated while requests are served, except the archive pool's permits.
pub struct AppState {
    pub config: Config,
    pub roots: RootSet,
    pub archives: ArchivePool,
}

impl AppState {
    pub fn new(config: Config, roots: RootSet) -> Self {
        let archives = ArchivePool::new(config.archive.max_concurrent);
        Self {
            config,
            roots,
            archives,
        }
    }

    /// Build state from configuration plus roots given on the command line
    ///
    /// Configured `[roots]` come first; a key given in both places is a
    /// duplicate and rejected.
    pub fn from_config(
        config: Config,
        extra_roots: Vec<(String, PathBuf)>,
    ) -> Result<Self, RootSetError> {
        let configured = config
            .roots
            .iter()
            .map(|(k, v)| (k.clone(), PathBuf::from(v)));
        let roots = RootSet::new(configured.chain(extra_roots))?;
        Ok(Self::new(config, roots))
    }

    /// Validator matching as configured
    pub fn cache(&self) -> ConditionalCache {
        ConditionalCache::from(self.config.cache)
    }
}
