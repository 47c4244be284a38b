//! Element: a named computable entity with one output raster.

use serde::{Deserialize, Serialize};
use super::{FrequencyTypeId, flexible};

/// Element identifier, e.g. `"31.00"`.
///
/// Identifiers are decimal-looking strings; string ids are kept verbatim so
/// that `"31.00"` and `"31.0"` stay distinct keys. A JSON number id keeps only
/// its shortest decimal form (`31.00` loads as `"31"`), so tables that rely on
/// trailing zeros must export ids as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(#[serde(deserialize_with = "flexible::string")] pub String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File stem of the element's output raster: `.` becomes `_`.
    pub fn file_stem(&self) -> String {
        self.0.replace('.', "_")
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ElementId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Rule type that produces an element's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Definition {
    /// Union/intersection of required objects, then enhancing/attenuating modifiers.
    Combination,
    /// Map-algebra predicate over the objects' grids.
    Subset,
    /// Proximity buffer around a single object.
    Adjacency,
}

impl std::fmt::Display for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Definition::Combination => "combination",
            Definition::Subset => "subset",
            Definition::Adjacency => "adjacency",
        };
        f.write_str(name)
    }
}

/// An element row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(alias = "elementid")]
    pub id: ElementId,
    pub name: String,
    #[serde(alias = "mw_definition")]
    pub definition: Definition,
    /// Map-algebra expression with `[elementid]` placeholders (subset only).
    #[serde(default)]
    pub subset_rule: Option<String>,
    /// Buffer distance in map units (adjacency only).
    #[serde(default)]
    pub adjacency_rule: Option<f64>,
    #[serde(default, alias = "frequencytype")]
    pub frequency_type: Option<FrequencyTypeId>,
    #[serde(default)]
    pub mapped_manually: bool,
}

impl Element {
    pub fn new(id: impl Into<ElementId>, name: impl Into<String>, definition: Definition) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            definition,
            subset_rule: None,
            adjacency_rule: None,
            frequency_type: None,
            mapped_manually: false,
        }
    }

    pub fn with_subset_rule(mut self, rule: impl Into<String>) -> Self {
        self.subset_rule = Some(rule.into());
        self
    }

    pub fn with_adjacency_rule(mut self, distance: f64) -> Self {
        self.adjacency_rule = Some(distance);
        self
    }

    pub fn with_frequency_type(mut self, id: FrequencyTypeId) -> Self {
        self.frequency_type = Some(id);
        self
    }

    pub fn mapped_manually(mut self) -> Self {
        self.mapped_manually = true;
        self
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_replaces_dots() {
        assert_eq!(ElementId::new("31.00").file_stem(), "31_00");
        assert_eq!(ElementId::new("1.2.3").file_stem(), "1_2_3");
    }

    #[test]
    fn test_deserialize_table_field_names() {
        let json = r#"{
            "elementid": "31.00",
            "name": "Open water",
            "mw_definition": "subset",
            "subset_rule": "[30.00] >= 2",
            "frequencytype": 2,
            "mapped_manually": false
        }"#;
        let el: Element = serde_json::from_str(json).unwrap();
        assert_eq!(el.id, ElementId::new("31.00"));
        assert_eq!(el.definition, Definition::Subset);
        assert_eq!(el.frequency_type, Some(FrequencyTypeId(2)));
        assert_eq!(el.adjacency_rule, None);
    }

    #[test]
    fn test_numeric_element_id() {
        let el: Element = serde_json::from_str(
            r#"{"id": 12, "name": "Beaver", "definition": "adjacency", "adjacency_rule": 90.0}"#,
        ).unwrap();
        assert_eq!(el.id.as_str(), "12");
        assert_eq!(el.adjacency_rule, Some(90.0));
    }

    #[test]
    fn test_float_element_id_loses_trailing_zeros() {
        let el: Element = serde_json::from_str(r#"{"elementid": 31.00, "name": "Soil", "mw_definition": "combination"}"#).unwrap();
        assert_eq!(el.id.as_str(), "31");
        let el: Element = serde_json::from_str(r#"{"elementid": 41.1, "name": "Acidic", "mw_definition": "subset"}"#).unwrap();
        assert_eq!(el.id.as_str(), "41.1");
        let el: Element = serde_json::from_str(r#"{"elementid": "31.00", "name": "Soil", "mw_definition": "combination"}"#).unwrap();
        assert_eq!(el.id.as_str(), "31.00");
    }
}
