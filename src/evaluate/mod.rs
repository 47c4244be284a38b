//! Element evaluation.
//!
//! Readiness gating plus the three rule evaluators. Each evaluator reads its
//! prerequisite grids through the engine's [`RasterStore`] and returns the
//! finished int16-valued output raster; [`run`] writes it to the element's
//! canonical path.

pub mod readiness;
mod adjacency;
mod combination;
mod subset;

use tracing::info;

use crate::index::RelationshipIndex;
use crate::model::{Definition, Element, ElementId};
use crate::proximity::Proximity;
use crate::raster::Raster;
use crate::store::RasterStore;
use crate::{Engine, Result};

pub use readiness::{is_ready, missing_prerequisites};

/// Evaluate `element` by its definition and persist the result.
pub(crate) fn run<S: RasterStore, P: Proximity>(
    engine: &Engine<S, P>,
    element: &Element,
    index: &RelationshipIndex<'_>,
) -> Result<()> {
    let raster = match element.definition {
        Definition::Combination => combination::evaluate(engine, element, index)?,
        Definition::Subset => subset::evaluate(engine, element, index)?,
        Definition::Adjacency => adjacency::evaluate(engine, element, index)?,
    };

    let path = engine.output_path(&element.id);
    engine.store().write(&path, &raster)?;
    info!(element = %element.id, path = %path.display(), valid = raster.valid_count(), "grid written");
    Ok(())
}

/// Read the materialized grid of a prerequisite.
fn read_object<S: RasterStore, P: Proximity>(engine: &Engine<S, P>, id: &ElementId) -> Result<Raster> {
    engine.store().read(&engine.output_path(id))
}
