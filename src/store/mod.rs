//! # Raster Store Trait
//!
//! This is THE contract between the engine and raster persistence. The engine
//! reads prerequisite grids, writes element grids, and detects
//! materialization purely through [`RasterStore::exists`].
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory for testing/embedding |
//! | `AsciiGridStore` | `ascii` | ESRI ASCII grids on disk |

pub mod memory;
pub mod ascii;

use std::path::{Path, PathBuf};

use crate::model::ElementId;
use crate::raster::Raster;
use crate::{EngineConfig, Result};

pub use ascii::AsciiGridStore;
pub use memory::MemoryStore;

// ============================================================================
// Grid layout
// ============================================================================

/// Deterministic output paths: `<dir>/<id with '.' → '_'>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    dir: PathBuf,
    extension: String,
}

impl GridLayout {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self { dir: dir.into(), extension: extension.into() }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.grid_dir.clone(), config.extension.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Canonical output path of an element.
    pub fn path_for(&self, id: &ElementId) -> PathBuf {
        self.dir.join(format!("{}.{}", id.file_stem(), self.extension))
    }

    /// Scratch path next to the output: `<stem>_temp.<extension>`.
    pub fn temp_path_for(&self, id: &ElementId) -> PathBuf {
        self.dir.join(format!("{}_temp.{}", id.file_stem(), self.extension))
    }
}

// ============================================================================
// RasterStore Trait
// ============================================================================

/// Raster persistence contract.
///
/// `read` returns the grid with its validity mask derived from the stored
/// no-data value; `write` persists values, no-data and georeference. Stores
/// must treat a path as materialized exactly when `exists` returns true.
pub trait RasterStore {
    /// Read a raster. Missing paths are `Error::NotFound`.
    fn read(&self, path: &Path) -> Result<Raster>;

    /// Write (or overwrite) a raster.
    fn write(&self, path: &Path, raster: &Raster) -> Result<()>;

    /// Presence test; the only materialization signal.
    fn exists(&self, path: &Path) -> bool;

    /// Delete a raster.
    fn remove(&self, path: &Path) -> Result<()>;
}
