//! In-memory raster store.
//!
//! This is the reference implementation of `RasterStore`: a path-keyed
//! HashMap protected by a RwLock. Clones share the same contents, so a test
//! can keep a handle while the engine owns another.
//!
//! Use this store for:
//! - Testing evaluators without touching the filesystem
//! - Embedding the engine where grids are produced and consumed in-process

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use parking_lot::RwLock;

use crate::raster::Raster;
use crate::{Error, Result};
use super::RasterStore;

/// In-memory raster storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<PathBuf, Raster>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raster (e.g. a manually mapped source grid).
    pub fn insert(&self, path: impl Into<PathBuf>, raster: Raster) {
        self.inner.write().insert(path.into(), raster);
    }

    pub fn get(&self, path: &Path) -> Option<Raster> {
        self.inner.read().get(path).cloned()
    }

    /// Stored paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.inner.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl RasterStore for MemoryStore {
    fn read(&self, path: &Path) -> Result<Raster> {
        self.get(path)
            .ok_or_else(|| Error::NotFound(path.display().to_string()))
    }

    fn write(&self, path: &Path, raster: &Raster) -> Result<()> {
        self.inner.write().insert(path.to_path_buf(), raster.clone());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.read().contains_key(path)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.inner
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(path.display().to_string()))
    }
}
