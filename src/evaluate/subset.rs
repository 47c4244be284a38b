//! Subset evaluator: `where(rule, present, absent) · ceiling`.
//!
//! The first prerequisite's validity mask decides which cells are written;
//! placeholders must name prerequisite objects of the element.

use ndarray::Zip;

use crate::index::RelationshipIndex;
use crate::model::Element;
use crate::proximity::Proximity;
use crate::raster::{round_int, Raster};
use crate::rule::{Bindings, Rule};
use crate::store::RasterStore;
use crate::{Engine, Error, Result};

pub(super) fn evaluate<S: RasterStore, P: Proximity>(
    engine: &Engine<S, P>,
    element: &Element,
    index: &RelationshipIndex<'_>,
) -> Result<Raster> {
    let objects = super::readiness::mapped_objects(engine, index);
    let Some(&first) = objects.first() else {
        return Err(Error::MissingObject(element.to_string()));
    };
    let text = element
        .subset_rule
        .as_deref()
        .ok_or_else(|| Error::EvaluationError(format!("{element} has no subset rule")))?;
    let rule = Rule::parse(text)?;

    if let Some(placeholder) = rule
        .placeholders()
        .iter()
        .find(|p| !objects.iter().any(|o| o.as_str() == p.as_str()))
    {
        return Err(Error::MissingPlaceholder {
            element: element.to_string(),
            placeholder: placeholder.clone(),
        });
    }

    let mut bindings = Bindings::new();
    let mut presence = None;
    let mut last_read = None;
    for &object in &objects {
        let raster = super::read_object(engine, object)?;
        if object == first {
            presence = Some(raster.mask().clone());
        }
        bindings.insert(object.to_string(), raster.data().clone());
        last_read = Some(raster);
    }
    let (Some(presence), Some(source)) = (presence, last_read) else {
        return Err(Error::EvaluationError(format!("{element} read no prerequisite grid")));
    };

    let predicate = rule.evaluate(&bindings, presence.dim())?;
    let ceiling = engine.ceiling(element);
    let data = Zip::from(&predicate)
        .and(&presence)
        .map_collect(|&hit, &valid| match (valid, hit) {
            (true, true) => ceiling,
            (true, false) => 0.0,
            (false, _) => source.nodata(),
        });
    let selected = Raster::with_mask(data, presence, source.nodata())?;

    Ok(round_int(&selected, source.nodata()).with_georeference(source.geotransform(), source.projection()))
}
