//! End-to-end tests for the element pipeline against MemoryStore.
//!
//! Each test exercises: tables -> relationship index -> readiness ->
//! evaluator -> store, through the public `Engine` entry points.

use std::path::Path;

use muirweb::{
    Definition, Element, ElementId, Engine, EngineConfig, Error, FrequencyType, GeoTransform,
    InteractionType, MemoryStore, Raster, RasterStore, RelId, Relationship, StrengthType, Tables,
    NODATA_INT16,
};
use muirweb::model::{FrequencyTypeId, StrengthTypeId};
use ndarray::array;
use pretty_assertions::assert_eq;

const ND: f64 = -9999.0;
const SENTINEL: f64 = NODATA_INT16 as f64;

fn required(id: u64, subject: &str, object: &str) -> Relationship {
    Relationship::new(RelId(id), subject, object, InteractionType::Required, StrengthTypeId(1))
}

fn tables(elements: Vec<Element>, relationships: Vec<Relationship>) -> Tables {
    Tables::new(
        elements,
        relationships,
        vec![FrequencyType::new(1, 100.0), FrequencyType::new(2, 80.0)],
        vec![StrengthType::new(1, 100.0), StrengthType::new(2, 50.0)],
    )
    .unwrap()
}

fn seed<S: RasterStore>(engine: &Engine<S>, id: &str, raster: Raster) {
    let raster = raster.with_georeference(GeoTransform::north_up(500_000.0, 4_400_090.0, 30.0), "EPSG:26918");
    engine.store().write(&engine.output_path(&id.into()), &raster).unwrap();
}

fn output<S: RasterStore>(engine: &Engine<S>, id: &str) -> Raster {
    engine.store().read(&engine.output_path(&id.into())).unwrap()
}

/// Source R (manual), A = combination of R, B = subset `[A] >= 40`.
fn scenario() -> Engine<MemoryStore> {
    let elements = vec![
        Element::new("R", "Raw source", Definition::Combination).mapped_manually(),
        Element::new("A", "Habitat A", Definition::Combination).with_frequency_type(FrequencyTypeId(1)),
        Element::new("B", "Subset B", Definition::Subset)
            .with_subset_rule("[A] >= 40")
            .with_frequency_type(FrequencyTypeId(1)),
    ];
    let relationships = vec![required(1, "A", "R"), required(2, "B", "A")];
    Engine::new(tables(elements, relationships), MemoryStore::new(), EngineConfig::default())
}

// ============================================================================
// 1. Single required relationship reproduces the source
// ============================================================================

#[test]
fn test_combination_identity() {
    let engine = scenario();
    seed(&engine, "R", Raster::new(array![[50.0, 50.0, ND], [50.0, ND, 50.0]], ND));

    assert!(engine.compute_element(&"A".into()));

    let a = output(&engine, "A");
    assert_eq!(a.filled_data(), array![[50.0, 50.0, SENTINEL], [50.0, SENTINEL, 50.0]]);
    assert_eq!(a.nodata(), SENTINEL);
    assert_eq!(a.projection(), "EPSG:26918");
    assert_eq!(a.geotransform(), GeoTransform::north_up(500_000.0, 4_400_090.0, 30.0));
}

// ============================================================================
// 2. Subset over a computed element preserves its mask
// ============================================================================

#[test]
fn test_subset_over_combination() {
    let engine = scenario();
    seed(&engine, "R", Raster::new(array![[50.0, 30.0, ND]], ND));

    assert!(engine.compute_element(&"A".into()));
    assert!(engine.compute_element(&"B".into()));

    assert_eq!(output(&engine, "B").filled_data(), array![[100.0, 0.0, SENTINEL]]);
}

// ============================================================================
// 3. Readiness gates computation without failing
// ============================================================================

#[test]
fn test_not_ready_returns_false() {
    let engine = scenario();

    assert!(!engine.is_ready(&"A".into()));
    assert_eq!(engine.missing_prerequisites(&"A".into()), vec![ElementId::new("R")]);
    assert!(!engine.compute_element(&"A".into()));
    assert!(engine.store().is_empty());

    assert!(engine.is_ready(&"R".into()));
}

#[test]
fn test_unmapped_condition_does_not_block() {
    let elements = vec![
        Element::new("R", "Raw", Definition::Combination).mapped_manually(),
        Element::new("U", "Never mapped", Definition::Combination).mapped_manually(),
        Element::new("A", "Habitat", Definition::Combination),
    ];
    let relationships = vec![
        required(1, "A", "R"),
        required(2, "A", "U").in_group("2").with_label("unmapped condition"),
    ];
    let engine = Engine::new(tables(elements, relationships), MemoryStore::new(), EngineConfig::default());
    seed(&engine, "R", Raster::filled((2, 2), 40.0, ND));

    assert!(engine.is_ready(&"A".into()));
    assert!(engine.compute_element(&"A".into()));
    assert_eq!(output(&engine, "A").data(), &array![[40.0, 40.0], [40.0, 40.0]]);
}

#[test]
fn test_custom_unmapped_label() {
    let elements = vec![
        Element::new("U", "Never mapped", Definition::Combination).mapped_manually(),
        Element::new("A", "Habitat", Definition::Combination),
    ];
    let relationships = vec![required(1, "A", "U").with_label("not mapped")];
    let config = EngineConfig { unmapped_condition: "not mapped".into(), ..EngineConfig::default() };
    let engine = Engine::new(tables(elements, relationships), MemoryStore::new(), config);

    assert!(engine.is_ready(&"A".into()));
    // ready, but nothing readable to combine
    assert!(matches!(engine.try_compute_element(&"A".into()), Err(Error::EvaluationError(_))));
    assert!(!engine.compute_element(&"A".into()));
}

// ============================================================================
// 4. Failures are reported, never propagated
// ============================================================================

#[test]
fn test_missing_placeholder_is_recoverable() {
    let elements = vec![
        Element::new("R", "Raw", Definition::Combination).mapped_manually(),
        Element::new("B", "Subset", Definition::Subset).with_subset_rule("[R] > 0 and [Q] > 0"),
    ];
    let engine = Engine::new(tables(elements, vec![required(1, "B", "R")]), MemoryStore::new(), EngineConfig::default());
    seed(&engine, "R", Raster::filled((1, 2), 10.0, ND));

    assert!(matches!(
        engine.try_compute_element(&"B".into()),
        Err(Error::MissingPlaceholder { placeholder, .. }) if placeholder == "Q"
    ));
    assert!(!engine.compute_element(&"B".into()));
    assert!(!engine.is_materialized(&"B".into()));
}

#[test]
fn test_unknown_element() {
    let engine = scenario();
    assert!(matches!(engine.try_compute_element(&"ZZ".into()), Err(Error::UnknownElement(_))));
    assert!(!engine.compute_element(&"ZZ".into()));
    assert_eq!(engine.describe_relationships(&"ZZ".into()), None);
}

// ============================================================================
// 5. Adjacency cleanup faults are warnings only
// ============================================================================

/// Store whose `remove` always fails for scratch grids.
#[derive(Clone, Default)]
struct StickyTempStore {
    inner: MemoryStore,
}

impl RasterStore for StickyTempStore {
    fn read(&self, path: &Path) -> muirweb::Result<Raster> {
        self.inner.read(path)
    }

    fn write(&self, path: &Path, raster: &Raster) -> muirweb::Result<()> {
        self.inner.write(path, raster)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn remove(&self, path: &Path) -> muirweb::Result<()> {
        if path.to_string_lossy().contains("_temp") {
            return Err(Error::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked")));
        }
        self.inner.remove(path)
    }
}

#[test]
fn test_cleanup_fault_does_not_fail_adjacency() {
    let elements = vec![
        Element::new("12.00", "Stream", Definition::Combination).mapped_manually(),
        Element::new("40.00", "Riparian", Definition::Adjacency)
            .with_adjacency_rule(60.0)
            .with_frequency_type(FrequencyTypeId(2)),
    ];
    let store = StickyTempStore::default();
    let engine = Engine::new(tables(elements, vec![required(1, "40.00", "12.00")]), store.clone(), EngineConfig::default());
    seed(&engine, "12.00", Raster::new(array![[0.0, 0.0, 100.0, 0.0, 0.0, 0.0]], ND));

    assert!(engine.compute_element(&"40.00".into()));
    assert_eq!(output(&engine, "40.00").data(), &array![[80.0, 80.0, 80.0, 80.0, 80.0, 0.0]]);
    assert!(store.inner.exists(&engine.layout().temp_path_for(&"40.00".into())));
}

// ============================================================================
// 6. Batch driver and maintenance
// ============================================================================

#[test]
fn test_compute_pending_resolves_dependency_order() {
    // table order lists the dependent first; the second pass picks it up
    let elements = vec![
        Element::new("B", "Subset B", Definition::Subset).with_subset_rule("[A] >= 40"),
        Element::new("A", "Habitat A", Definition::Combination),
        Element::new("R", "Raw source", Definition::Combination).mapped_manually(),
        Element::new("X", "Blocked", Definition::Combination),
    ];
    let relationships = vec![required(1, "A", "R"), required(2, "B", "A"), required(3, "X", "Y")];
    let engine = Engine::new(tables(elements, relationships), MemoryStore::new(), EngineConfig::default());
    seed(&engine, "R", Raster::filled((2, 2), 45.0, ND));

    let report = engine.compute_pending();
    assert_eq!(report.computed, vec![ElementId::new("A"), ElementId::new("B")]);
    assert_eq!(report.pending, vec![ElementId::new("X")]);
    assert!(report.already_materialized.is_empty());
    assert_eq!(report.passes, 3);
    assert!(report.finished_at >= report.started_at);

    let again = engine.compute_pending();
    assert_eq!(again.already_materialized, vec![ElementId::new("B"), ElementId::new("A")]);
    assert!(again.computed.is_empty());
    assert_eq!(again.passes, 1);
}

#[test]
fn test_clear_automapped_keeps_manual_grids() {
    let engine = scenario();
    seed(&engine, "R", Raster::filled((1, 1), 60.0, ND));
    engine.compute_pending();
    assert_eq!(engine.store().len(), 3);

    assert_eq!(engine.clear_automapped(), 2);
    assert!(engine.is_materialized(&"R".into()));
    assert!(!engine.is_materialized(&"A".into()));
    assert_eq!(engine.clear_automapped(), 0);
}

#[test]
fn test_describe_relationships() {
    let engine = scenario();
    let text = engine.describe_relationships(&"A".into()).unwrap();
    assert!(text.starts_with("A requirements:"));
    assert!(text.contains("R Required"));
}

#[test]
fn test_run_report_serializes() {
    let engine = scenario();
    let report = engine.compute_pending();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["pending"], serde_json::json!(["A", "B"]));
    assert_eq!(json["passes"], serde_json::json!(1));
}
