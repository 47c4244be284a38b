//! Frequency and strength lookup rows.

use serde::{Deserialize, Serialize};

/// Frequency type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrequencyTypeId(pub u32);

/// Strength type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrengthTypeId(pub u32);

impl std::fmt::Display for FrequencyTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for StrengthTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bounds an element's output: its maximum probability (0–100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyType {
    pub id: FrequencyTypeId,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "maxprob")]
    pub max_prob: f64,
}

/// Probability multiplier (0–100) carried by a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthType {
    pub id: StrengthTypeId,
    #[serde(default)]
    pub name: String,
    pub prob: f64,
}

impl FrequencyType {
    pub fn new(id: u32, max_prob: f64) -> Self {
        Self { id: FrequencyTypeId(id), name: String::new(), max_prob }
    }
}

impl StrengthType {
    pub fn new(id: u32, prob: f64) -> Self {
        Self { id: StrengthTypeId(id), name: String::new(), prob }
    }
}
