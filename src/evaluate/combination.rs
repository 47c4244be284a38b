//! Combination evaluator.
//!
//! Required objects are scaled by strength, unioned within a group,
//! intersected across groups and unioned across states. Enhancing and
//! attenuating objects become flat modifiers `100 ± strength·v` that are
//! intersected with the core habitat afterwards; their state and group are
//! labels only.

use crate::index::RelationshipIndex;
use crate::model::{Element, InteractionType};
use crate::proximity::Proximity;
use crate::raster::{intersection, round_int, union, Raster};
use crate::store::RasterStore;
use crate::{Engine, Error, Result};

pub(super) fn evaluate<S: RasterStore, P: Proximity>(
    engine: &Engine<S, P>,
    element: &Element,
    index: &RelationshipIndex<'_>,
) -> Result<Raster> {
    let tables = engine.tables();
    let label = engine.config().unmapped_condition.as_str();

    let mut states = Vec::new();
    let mut modifiers = Vec::new();
    let mut default_habitat: Option<Raster> = None;
    let mut last_read: Option<Raster> = None;

    for state in index.states() {
        let mut groups = Vec::new();
        for group in &state.groups {
            let mut rasters = Vec::new();
            for edge in group.edges.iter().filter(|e| !e.relationship.is_unmapped(label)) {
                let raster = super::read_object(engine, edge.object)?;
                let strength = tables.strength_fraction(edge.relationship)?;
                if default_habitat.is_none() {
                    default_habitat = Some(raster.map_valid(|v| if v >= 0.0 { 1.0 } else { v }));
                }

                match edge.relationship.interaction {
                    InteractionType::Required => rasters.push(raster.map_valid(|v| v * strength)),
                    InteractionType::Enhancing => modifiers.push(raster.map_valid(|v| 100.0 + v * strength)),
                    InteractionType::Attenuating => modifiers.push(raster.map_valid(|v| 100.0 - v * strength)),
                }
                last_read = Some(raster);
            }
            if !rasters.is_empty() {
                groups.push(union(rasters)?);
            }
        }
        if !groups.is_empty() {
            states.push(intersection(groups)?);
        }
    }

    let Some(source) = last_read else {
        return Err(Error::EvaluationError(format!("{element} has no readable prerequisite grid")));
    };
    let habitat = if states.is_empty() {
        default_habitat.ok_or_else(|| Error::EvaluationError(format!("{element} has no default habitat")))?
    } else {
        union(states)?
    };

    let habitat = intersection(std::iter::once(habitat).chain(modifiers).collect())?;
    let ceiling = engine.ceiling(element);
    let scaled = habitat.map_valid(|v| v * ceiling / 100.0);

    Ok(round_int(&scaled, source.nodata()).with_georeference(source.geotransform(), source.projection()))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use crate::model::{Definition, Element, FrequencyTypeId, InteractionType, RelId, Relationship, StrengthTypeId};
    use crate::raster::NODATA_INT16;
    use crate::Error;
    use pretty_assertions::assert_eq;

    const SENTINEL: f64 = NODATA_INT16 as f64;

    fn habitat(id: &str) -> Element {
        Element::new(id, "Habitat", Definition::Combination)
    }

    #[test]
    fn test_single_required_is_identity() {
        let (engine, _) = engine(vec![source("1.00"), habitat("9.00")], vec![required(1, "9.00", "1.00")]);
        seed(&engine, "1.00", &[vec![50.0, 50.0], vec![ND, 50.0]]);
        compute(&engine, "9.00").unwrap();

        let out = output(&engine, "9.00");
        assert_eq!(out.get(0, 0), Some(50.0));
        assert_eq!(out.get(1, 0), None);
        assert_eq!(out.filled_data()[[1, 0]], SENTINEL);
        assert_eq!(out.projection(), "EPSG:26918");
    }

    #[test]
    fn test_group_union_and_state_intersection() {
        let rels = vec![
            required(1, "9.00", "1.00").in_group("a"),
            required(2, "9.00", "2.00").in_group("a"),
            required(3, "9.00", "3.00").in_group("b"),
        ];
        let (engine, _) = engine(vec![source("1.00"), source("2.00"), source("3.00"), habitat("9.00")], rels);
        seed(&engine, "1.00", &[vec![30.0, 80.0]]);
        seed(&engine, "2.00", &[vec![20.0, 80.0]]);
        seed(&engine, "3.00", &[vec![50.0, 50.0]]);
        compute(&engine, "9.00").unwrap();

        // (30+20)% · 50% = 25; min(160, 100)% · 50% = 50
        assert_eq!(output(&engine, "9.00").data(), &ndarray::array![[25.0, 50.0]]);
    }

    #[test]
    fn test_states_union() {
        let rels = vec![required(1, "9.00", "1.00").in_state("1"), required(2, "9.00", "2.00").in_state("2")];
        let (engine, _) = engine(vec![source("1.00"), source("2.00"), habitat("9.00")], rels);
        seed(&engine, "1.00", &[vec![70.0]]);
        seed(&engine, "2.00", &[vec![60.0]]);
        compute(&engine, "9.00").unwrap();
        assert_eq!(output(&engine, "9.00").get(0, 0), Some(100.0));
    }

    #[test]
    fn test_strength_and_ceiling_scale() {
        let rel = Relationship::new(RelId(1), "9.00", "1.00", InteractionType::Required, StrengthTypeId(50));
        let (engine, _) = engine(
            vec![source("1.00"), habitat("9.00").with_frequency_type(FrequencyTypeId(1))],
            vec![rel],
        );
        seed(&engine, "1.00", &[vec![100.0, 45.0]]);
        compute(&engine, "9.00").unwrap();
        // 100·0.5·0.5 = 25; 45·0.5·0.5 = 11.25
        assert_eq!(output(&engine, "9.00").data(), &ndarray::array![[25.0, 11.0]]);
    }

    #[test]
    fn test_modifiers_without_required_use_default_habitat() {
        let rels = vec![
            Relationship::new(RelId(1), "9.00", "1.00", InteractionType::Enhancing, StrengthTypeId(50)),
            Relationship::new(RelId(2), "9.00", "2.00", InteractionType::Attenuating, StrengthTypeId(100)),
        ];
        let (engine, _) = engine(vec![source("1.00"), source("2.00"), habitat("9.00")], rels);
        seed(&engine, "1.00", &[vec![0.0, 100.0, 40.0]]);
        seed(&engine, "2.00", &[vec![0.0, 0.0, 50.0]]);
        compute(&engine, "9.00").unwrap();

        // habitat = 1 everywhere; 1% · (100 + 0.5v)% · (100 - v)%
        let out = output(&engine, "9.00");
        assert_eq!(out.data(), &ndarray::array![[1.0, 2.0, 1.0]]);
    }

    #[test]
    fn test_enhancing_applied_to_core() {
        let rels = vec![
            required(1, "9.00", "1.00"),
            Relationship::new(RelId(2), "9.00", "2.00", InteractionType::Enhancing, StrengthTypeId(25)),
        ];
        let (engine, _) = engine(vec![source("1.00"), source("2.00"), habitat("9.00")], rels);
        seed(&engine, "1.00", &[vec![40.0, 90.0]]);
        seed(&engine, "2.00", &[vec![100.0, 100.0]]);
        compute(&engine, "9.00").unwrap();
        // 40 · 1.25 = 50; 90 · 1.25 = 112.5 → clamped to 100
        assert_eq!(output(&engine, "9.00").data(), &ndarray::array![[50.0, 100.0]]);
    }

    #[test]
    fn test_unmapped_relationships_are_skipped() {
        let rels = vec![
            required(1, "9.00", "1.00"),
            required(2, "9.00", "2.00").in_group("2").with_label("unmapped condition"),
        ];
        let (engine, _) = engine(vec![source("1.00"), source("2.00"), habitat("9.00")], rels);
        seed(&engine, "1.00", &[vec![33.0]]);
        compute(&engine, "9.00").unwrap();
        assert_eq!(output(&engine, "9.00").get(0, 0), Some(33.0));
    }

    #[test]
    fn test_unknown_strength_type_fails() {
        let rel = Relationship::new(RelId(1), "9.00", "1.00", InteractionType::Required, StrengthTypeId(7));
        let (engine, _) = engine(vec![source("1.00"), habitat("9.00")], vec![rel]);
        seed(&engine, "1.00", &[vec![10.0]]);
        assert!(matches!(compute(&engine, "9.00"), Err(Error::UnknownStrengthType(7))));
        assert!(!engine.is_materialized(&"9.00".into()));
    }

    #[test]
    fn test_no_prerequisites_fails() {
        let (engine, _) = engine(vec![habitat("9.00")], vec![]);
        assert!(matches!(compute(&engine, "9.00"), Err(Error::EvaluationError(_))));
    }
}
