//! Tables: the load-once context every engine call reads from.
//!
//! Elements, relationships and the two lookup tables are loaded before a run
//! and never mutated while an `Engine` owns them.

use std::path::Path;
use hashbrown::HashMap;

use super::{
    Element, ElementId, FrequencyType, FrequencyTypeId, Relationship, StrengthType,
    StrengthTypeId,
};
use crate::{Error, Result};

/// Ceiling used when an element has no usable frequency type.
pub const DEFAULT_MAX_PROB: f64 = 100.0;

/// Immutable element/relationship/lookup tables.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    elements: Vec<Element>,
    by_id: HashMap<ElementId, usize>,
    relationships: Vec<Relationship>,
    frequency_types: Vec<FrequencyType>,
    strength_types: Vec<StrengthType>,
}

impl Tables {
    pub fn new(
        elements: Vec<Element>,
        relationships: Vec<Relationship>,
        frequency_types: Vec<FrequencyType>,
        strength_types: Vec<StrengthType>,
    ) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(elements.len());
        for (pos, el) in elements.iter().enumerate() {
            if by_id.insert(el.id.clone(), pos).is_some() {
                return Err(Error::Table(format!("duplicate element id {}", el.id)));
            }
        }
        Ok(Self { elements, by_id, relationships, frequency_types, strength_types })
    }

    /// Parse the four tables from JSON arrays.
    pub fn from_json_strs(
        elements: &str,
        relationships: &str,
        frequency_types: &str,
        strength_types: &str,
    ) -> Result<Self> {
        Self::new(
            serde_json::from_str(elements)?,
            serde_json::from_str(relationships)?,
            serde_json::from_str(frequency_types)?,
            serde_json::from_str(strength_types)?,
        )
    }

    /// Load `elements.json`, `relationships.json`, `frequency_types.json` and
    /// `strength_types.json` from a directory.
    pub fn from_json_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let read = |name: &str| std::fs::read_to_string(dir.join(name));
        Self::from_json_strs(
            &read("elements.json")?,
            &read("relationships.json")?,
            &read("frequency_types.json")?,
            &read("strength_types.json")?,
        )
    }

    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.by_id.get(id).map(|&pos| &self.elements[pos])
    }

    /// Elements in load order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Relationships whose subject is `subject`, in table order.
    pub fn relationships_from<'a>(
        &'a self,
        subject: &'a ElementId,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.relationships.iter().filter(move |r| &r.subject == subject)
    }

    /// First relationship (table order) from `subject` to `object`.
    pub fn relationship_between(&self, subject: &ElementId, object: &ElementId) -> Option<&Relationship> {
        self.relationships.iter().find(|r| &r.subject == subject && &r.object == object)
    }

    pub fn frequency_type(&self, id: FrequencyTypeId) -> Option<&FrequencyType> {
        self.frequency_types.iter().find(|f| f.id == id)
    }

    pub fn strength_type(&self, id: StrengthTypeId) -> Option<&StrengthType> {
        self.strength_types.iter().find(|s| s.id == id)
    }

    /// Maximum output probability for an element.
    ///
    /// A missing frequency type, a missing row, or a zero ceiling all fall
    /// back to [`DEFAULT_MAX_PROB`].
    pub fn max_prob(&self, element: &Element) -> f64 {
        element
            .frequency_type
            .and_then(|id| self.frequency_type(id))
            .map(|f| f.max_prob)
            .filter(|&p| p != 0.0)
            .unwrap_or(DEFAULT_MAX_PROB)
    }

    /// Strength of a relationship as a fraction (`prob / 100`).
    pub fn strength_fraction(&self, rel: &Relationship) -> Result<f64> {
        self.strength_type(rel.strength)
            .map(|s| s.prob / 100.0)
            .ok_or(Error::UnknownStrengthType(rel.strength.0))
    }
}
