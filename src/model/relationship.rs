//! Relationship (dependency edge) between two elements.

use serde::{Deserialize, Serialize};
use super::{ElementId, StrengthTypeId, flexible};

/// Opaque relationship identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelId(pub u64);

impl std::fmt::Display for RelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an object contributes to its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    /// Gates the core habitat through the state/group union-intersection tree.
    Required,
    /// Multiplies the core habitat by `100 + strength * object`.
    Enhancing,
    /// Multiplies the core habitat by `100 - strength * object`.
    Attenuating,
}

/// A directed edge: `subject` depends on `object`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelId,
    #[serde(alias = "id_subject")]
    pub subject: ElementId,
    #[serde(alias = "id_object")]
    pub object: ElementId,
    /// Top-level grouping; states are combined by union.
    #[serde(deserialize_with = "flexible::string")]
    pub state: String,
    /// Sub-grouping within a state; groups are combined by intersection.
    #[serde(alias = "relationshiptype", deserialize_with = "flexible::string")]
    pub group: String,
    #[serde(default, alias = "relationshiptype_label")]
    pub group_label: Option<String>,
    #[serde(alias = "interactiontype")]
    pub interaction: InteractionType,
    #[serde(alias = "strengthtype")]
    pub strength: StrengthTypeId,
}

impl Relationship {
    pub fn new(
        id: RelId,
        subject: impl Into<ElementId>,
        object: impl Into<ElementId>,
        interaction: InteractionType,
        strength: StrengthTypeId,
    ) -> Self {
        Self {
            id,
            subject: subject.into(),
            object: object.into(),
            state: "1".into(),
            group: "1".into(),
            group_label: None,
            interaction,
            strength,
        }
    }

    pub fn in_state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.group_label = Some(label.into());
        self
    }

    /// True when the object is never materialized and must not block or feed the subject.
    pub fn is_unmapped(&self, unmapped_label: &str) -> bool {
        self.group_label.as_deref() == Some(unmapped_label)
    }
}
