//! Adjacency evaluator: proximity buffer around a single object.
//!
//! The object grid is copied to `<stem>_temp.<ext>`, the proximity primitive
//! fills the copy, and the copy is post-processed into the output: buffered
//! cells keep their (truncated) value, other valid source cells become 0.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::warn;

use crate::index::RelationshipIndex;
use crate::model::Element;
use crate::proximity::{Proximity, ProximityOptions};
use crate::raster::{Raster, NODATA_INT16};
use crate::store::RasterStore;
use crate::{Engine, Error, Result};

/// Scratch grid removed from the store when dropped.
struct TempRaster<'s, S: RasterStore> {
    store: &'s S,
    path: PathBuf,
}

impl<'s, S: RasterStore> TempRaster<'s, S> {
    fn create(store: &'s S, path: PathBuf, raster: &Raster) -> Result<Self> {
        let temp = Self { store, path };
        store.write(&temp.path, raster)?;
        Ok(temp)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl<S: RasterStore> Drop for TempRaster<'_, S> {
    fn drop(&mut self) {
        if !self.store.exists(&self.path) {
            return;
        }
        if let Err(e) = self.store.remove(&self.path) {
            warn!(path = %self.path.display(), error = %e, "could not delete temporary grid");
        }
    }
}

pub(super) fn evaluate<S: RasterStore, P: Proximity>(
    engine: &Engine<S, P>,
    element: &Element,
    index: &RelationshipIndex<'_>,
) -> Result<Raster> {
    let Some(object) = super::readiness::mapped_objects(engine, index).first().copied() else {
        return Err(Error::MissingObject(element.to_string()));
    };
    let distance = element
        .adjacency_rule
        .ok_or_else(|| Error::EvaluationError(format!("{element} has no adjacency distance")))?;
    let cell_size = engine.config().cell_size;
    if !(cell_size > 0.0) {
        return Err(Error::EvaluationError(format!("cell size must be positive, got {cell_size}")));
    }

    let source = super::read_object(engine, object)?;
    let options = ProximityOptions::probability_buffer(distance / cell_size, engine.ceiling(element));

    let temp = TempRaster::create(engine.store(), engine.layout().temp_path_for(&element.id), &source)?;
    let mut dest = engine.store().read(temp.path())?;
    engine.proximity().compute(&source, &mut dest, &options)?;
    engine.store().write(temp.path(), &dest)?;
    let buffered = engine.store().read(temp.path())?;
    drop(temp);

    let nodata = buffered.nodata();
    let sentinel = f64::from(NODATA_INT16);
    let (nrows, ncols) = buffered.shape();
    let mut data = Array2::from_elem((nrows, ncols), sentinel);
    let mut mask = Array2::from_elem((nrows, ncols), false);
    for ((row, col), cell) in data.indexed_iter_mut() {
        let value = match buffered.get(row, col) {
            Some(v) => v.trunc().clamp(f64::from(i16::MIN), f64::from(i16::MAX)),
            None if source.is_valid(row, col) => 0.0,
            None => continue,
        };
        if value != nodata && value != sentinel {
            *cell = value;
            mask[[row, col]] = true;
        }
    }

    Ok(Raster::with_mask(data, mask, sentinel)?
        .with_georeference(buffered.geotransform(), buffered.projection()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::fixtures::*;
    use crate::model::{Definition, FrequencyTypeId};
    use crate::store::MemoryStore;
    use crate::EngineConfig;
    use ndarray::array;
    use pretty_assertions::assert_eq;

    fn adjacency(id: &str, distance: f64) -> Element {
        Element::new(id, "Edge", Definition::Adjacency).with_adjacency_rule(distance)
    }

    #[test]
    fn test_buffer_and_zero_fill() {
        let (engine, store) = engine(vec![source("1.00"), adjacency("9.00", 30.0)], vec![required(1, "9.00", "1.00")]);
        seed(&engine, "1.00", &[vec![100.0, 0.0, 0.0, ND]]);
        compute(&engine, "9.00").unwrap();

        let out = output(&engine, "9.00");
        assert_eq!(out.filled_data(), array![[100.0, 100.0, 0.0, -32768.0]]);
        assert_eq!(out.nodata(), -32768.0);
        // only the source and the output remain
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_zero_radius() {
        let (engine, _) = engine(
            vec![source("1.00"), adjacency("9.00", 0.0).with_frequency_type(FrequencyTypeId(1))],
            vec![required(1, "9.00", "1.00")],
        );
        seed(&engine, "1.00", &[vec![0.0, 60.0, 0.0], vec![ND, 0.0, 0.0]]);
        compute(&engine, "9.00").unwrap();

        let out = output(&engine, "9.00");
        assert_eq!(out.filled_data(), array![[0.0, 50.0, 0.0], [-32768.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_unmapped_first_object_is_skipped() {
        let (engine, _) = engine(
            vec![source("1.00"), source("2.00"), adjacency("9.00", 30.0)],
            vec![required(1, "9.00", "2.00").with_label("unmapped condition"), required(2, "9.00", "1.00")],
        );
        seed(&engine, "1.00", &[vec![100.0, 0.0, 0.0, ND]]);

        assert!(engine.is_ready(&"9.00".into()));
        assert!(engine.try_compute_element(&"9.00".into()).unwrap());
        assert_eq!(output(&engine, "9.00").filled_data(), array![[100.0, 100.0, 0.0, -32768.0]]);
    }

    #[test]
    fn test_missing_object() {
        let (engine, store) = engine(vec![adjacency("9.00", 30.0)], vec![]);
        assert!(matches!(compute(&engine, "9.00"), Err(Error::MissingObject(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_temp_removed_on_failure() {
        struct FailingProximity;
        impl Proximity for FailingProximity {
            fn compute(&self, _: &Raster, _: &mut Raster, _: &ProximityOptions) -> Result<()> {
                Err(Error::EvaluationError("proximity failed".into()))
            }
        }

        let store = MemoryStore::new();
        let engine = Engine::with_proximity(
            tables(vec![source("1.00"), adjacency("9.00", 30.0)], vec![required(1, "9.00", "1.00")]),
            store.clone(),
            FailingProximity,
            EngineConfig::default(),
        );
        seed(&engine, "1.00", &[vec![100.0]]);

        assert!(compute(&engine, "9.00").is_err());
        assert_eq!(store.paths(), vec![engine.output_path(&"1.00".into())]);
    }
}
