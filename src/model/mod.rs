//! # Element Model
//!
//! Plain data rows loaded from the element, relationship, frequency and
//! strength tables, plus the [`Tables`] context that owns them.
//!
//! Design rule: no rasters, no paths, no I/O beyond table loading.

pub mod element;
pub mod relationship;
pub mod lookup;
pub mod tables;

pub use element::{Element, ElementId, Definition};
pub use relationship::{Relationship, RelId, InteractionType};
pub use lookup::{FrequencyType, FrequencyTypeId, StrengthType, StrengthTypeId};
pub use tables::{Tables, DEFAULT_MAX_PROB};

/// Table ids arrive as JSON strings or numbers depending on the export.
///
/// Strings pass through untouched. Numbers are rendered in their shortest
/// form, so trailing zeros of a float id are lost.
pub(crate) mod flexible {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    pub fn string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Str(s) => s,
            Raw::Int(i) => i.to_string(),
            Raw::Float(f) => f.to_string(),
        })
    }
}
