//! Readiness checking.
//!
//! An element can be computed once every prerequisite object is
//! materialized, unless the first relationship from the subject to that
//! object carries the unmapped-condition label.

use crate::index::RelationshipIndex;
use crate::model::ElementId;
use crate::proximity::Proximity;
use crate::store::RasterStore;
use crate::Engine;

/// Prerequisite objects that block computation, in first-seen order.
pub fn missing_prerequisites<'t, S: RasterStore, P: Proximity>(
    engine: &Engine<S, P>,
    index: &RelationshipIndex<'t>,
) -> Vec<&'t ElementId> {
    mapped_objects(engine, index)
        .into_iter()
        .filter(|object| !engine.store().exists(&engine.output_path(object)))
        .collect()
}

/// Prerequisite objects minus those exempted by the unmapped-condition label.
pub(crate) fn mapped_objects<'t, S: RasterStore, P: Proximity>(
    engine: &Engine<S, P>,
    index: &RelationshipIndex<'t>,
) -> Vec<&'t ElementId> {
    let label = engine.config().unmapped_condition.as_str();
    index
        .objects()
        .iter()
        .copied()
        .filter(|object| {
            !engine
                .tables()
                .relationship_between(index.subject(), object)
                .is_some_and(|rel| rel.is_unmapped(label))
        })
        .collect()
}

/// True when nothing blocks computation; vacuously true without prerequisites.
pub fn is_ready<S: RasterStore, P: Proximity>(engine: &Engine<S, P>, index: &RelationshipIndex<'_>) -> bool {
    missing_prerequisites(engine, index).is_empty()
}
