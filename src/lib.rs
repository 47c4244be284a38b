//! # muirweb: Raster Suitability Engine
//!
//! Computes derived suitability grids for ecological elements whose values
//! depend on other elements through a declared relationship graph.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `RasterStore` and `Proximity` are the contracts with raster persistence
//! 2. **Tables are context**: elements and relationships load once and stay immutable
//! 3. **Rules compile once**: subset rules parse into an AST, never execute as code
//! 4. **Presence is materialization**: an element is computed when its grid exists
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use muirweb::{AsciiGridStore, Engine, EngineConfig, Tables};
//!
//! # fn example() -> muirweb::Result<()> {
//! let tables = Tables::from_json_dir("tables")?;
//! let config = EngineConfig::from_json_file("muirweb.json")?;
//! let engine = Engine::new(tables, AsciiGridStore::new(), config);
//!
//! let report = engine.compute_pending();
//! println!("computed {} elements in {} passes", report.computed.len(), report.passes);
//! # Ok(())
//! # }
//! ```
//!
//! ## Raster Stores
//!
//! | Store | Description |
//! |-------|-------------|
//! | `MemoryStore` | In-memory grids for testing/embedding |
//! | `AsciiGridStore` | ESRI ASCII grids with `.prj` sidecars |

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod evaluate;
pub mod export;
pub mod index;
pub mod model;
pub mod proximity;
pub mod raster;
pub mod rule;
pub mod store;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

// ============================================================================
// Re-exports
// ============================================================================

pub use config::EngineConfig;
pub use index::RelationshipIndex;
pub use model::{
    Definition, Element, ElementId, FrequencyType, InteractionType, Relationship, RelId,
    StrengthType, Tables,
};
pub use proximity::{EuclideanProximity, Proximity, ProximityOptions};
pub use raster::{GeoTransform, Raster, NODATA_INT16};
pub use rule::Rule;
pub use store::{AsciiGridStore, GridLayout, MemoryStore, RasterStore};

// ============================================================================
// Top-level Engine handle
// ============================================================================

/// The primary entry point. An `Engine` owns the tables, a raster store and
/// a proximity primitive, and computes element grids on request.
pub struct Engine<S: RasterStore, P: Proximity = EuclideanProximity> {
    tables: Tables,
    store: S,
    proximity: P,
    config: EngineConfig,
    layout: GridLayout,
}

impl<S: RasterStore> Engine<S> {
    /// Create an engine with the built-in Euclidean proximity.
    pub fn new(tables: Tables, store: S, config: EngineConfig) -> Self {
        Self::with_proximity(tables, store, EuclideanProximity, config)
    }
}

impl<S: RasterStore, P: Proximity> Engine<S, P> {
    pub fn with_proximity(tables: Tables, store: S, proximity: P, config: EngineConfig) -> Self {
        let layout = GridLayout::from_config(&config);
        Self { tables, store, proximity, config, layout }
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Access the underlying store (for seeding source grids).
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn proximity(&self) -> &P {
        &self.proximity
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Canonical grid path of an element.
    pub fn output_path(&self, id: &ElementId) -> PathBuf {
        self.layout.path_for(id)
    }

    /// Relationship grouping of an element, rebuilt from the tables.
    pub fn index(&self, id: &ElementId) -> RelationshipIndex<'_> {
        RelationshipIndex::build(&self.tables, id)
    }

    pub fn is_materialized(&self, id: &ElementId) -> bool {
        self.store.exists(&self.output_path(id))
    }

    pub fn is_ready(&self, id: &ElementId) -> bool {
        evaluate::is_ready(self, &self.index(id))
    }

    /// Objects that still block `id`, in first-seen order.
    pub fn missing_prerequisites(&self, id: &ElementId) -> Vec<ElementId> {
        let index = self.index(id);
        evaluate::missing_prerequisites(self, &index).into_iter().cloned().collect()
    }

    /// Maximum output probability of an element.
    pub fn ceiling(&self, element: &Element) -> f64 {
        self.tables.max_prob(element)
    }

    /// Compute one element, propagating evaluator errors.
    ///
    /// `Ok(false)` means a prerequisite is not materialized yet.
    pub fn try_compute_element(&self, id: &ElementId) -> Result<bool> {
        let element = self
            .tables
            .element(id)
            .ok_or_else(|| Error::UnknownElement(id.to_string()))?;
        let index = self.index(id);

        let missing = evaluate::missing_prerequisites(self, &index);
        if !missing.is_empty() {
            debug!(element = %id, missing = ?missing, "prerequisites not materialized");
            return Ok(false);
        }

        info!(element = %element, definition = %element.definition, "mapping");
        evaluate::run(self, element, &index)?;
        Ok(true)
    }

    /// Compute one element. Returns true only when its grid was written;
    /// every failure is logged and reported as `false`.
    pub fn compute_element(&self, id: &ElementId) -> bool {
        match self.try_compute_element(id) {
            Ok(written) => written,
            Err(e @ Error::MissingObject(_)) => {
                warn!(element = %id, error = %e, "element skipped");
                false
            }
            Err(e @ Error::MissingPlaceholder { .. }) => {
                error!(element = %id, error = %e, "subset rule references an unknown object");
                false
            }
            Err(e) => {
                error!(element = %id, error = %e, "evaluation failed");
                false
            }
        }
    }

    /// Compute every automapped element that is not materialized yet,
    /// pass after pass, until a pass makes no progress.
    pub fn compute_pending(&self) -> RunReport {
        let started_at = Utc::now();
        let (already, mut pending): (Vec<&Element>, Vec<&Element>) = self
            .tables
            .elements()
            .filter(|e| !e.mapped_manually)
            .partition(|e| self.is_materialized(&e.id));

        let mut computed = Vec::new();
        let mut passes = 0;
        while !pending.is_empty() {
            passes += 1;
            let before = pending.len();
            pending.retain(|element| {
                if self.compute_element(&element.id) {
                    computed.push(element.id.clone());
                    false
                } else {
                    true
                }
            });
            if pending.len() == before {
                break;
            }
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            passes,
            computed,
            already_materialized: already.into_iter().map(|e| e.id.clone()).collect(),
            pending: pending.into_iter().map(|e| e.id.clone()).collect(),
        };
        info!(
            passes = report.passes,
            computed = report.computed.len(),
            pending = report.pending.len(),
            "run finished"
        );
        report
    }

    /// Delete the grid of every automapped element. Returns how many were removed.
    pub fn clear_automapped(&self) -> usize {
        let mut removed = 0;
        for element in self.tables.elements().filter(|e| !e.mapped_manually) {
            let path = self.output_path(&element.id);
            if !self.store.exists(&path) {
                continue;
            }
            match self.store.remove(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(element = %element.id, error = %e, "could not delete grid"),
            }
        }
        removed
    }

    /// Render an element's relationship grouping; `None` for unknown elements.
    pub fn describe_relationships(&self, id: &ElementId) -> Option<String> {
        self.tables.element(id)?;
        let text = self.index(id).to_string();
        info!("{text}");
        Some(text)
    }
}

/// Outcome of [`Engine::compute_pending`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub passes: usize,
    /// Elements written during the run, in completion order.
    pub computed: Vec<ElementId>,
    pub already_materialized: Vec<ElementId>,
    /// Elements still blocked or failing when the run stopped.
    pub pending: Vec<ElementId>,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Rule syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Rule error: {0}")]
    RuleError(String),

    #[error("[{placeholder}] in the subset rule is not an object of {element}")]
    MissingPlaceholder { element: String, placeholder: String },

    #[error("No object defined for {0}")]
    MissingObject(String),

    #[error("Unknown element: {0}")]
    UnknownElement(String),

    #[error("Unknown strength type: {0}")]
    UnknownStrengthType(u32),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid grid {path}: {message}")]
    Format { path: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Table error: {0}")]
    Table(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
