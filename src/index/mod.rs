//! Relationship index.
//!
//! Groups a subject's relationships as `state → group → edges` and collects
//! its distinct objects in first-seen order. The index is a value computed
//! from the relationship table on every call; it is never persisted.

use smallvec::SmallVec;

use crate::model::{ElementId, RelId, Relationship, Tables};

/// One prerequisite edge in a group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge<'t> {
    pub id: RelId,
    pub object: &'t ElementId,
    pub relationship: &'t Relationship,
}

/// Edges sharing a `(state, group)` key, in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<'t> {
    pub name: &'t str,
    pub edges: SmallVec<[Edge<'t>; 4]>,
}

/// Groups sharing a state, in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct State<'t> {
    pub name: &'t str,
    pub groups: Vec<Group<'t>>,
}

/// Relationship grouping of one subject element.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipIndex<'t> {
    subject: ElementId,
    states: Vec<State<'t>>,
    objects: Vec<&'t ElementId>,
}

impl<'t> RelationshipIndex<'t> {
    /// Scan the relationship table and bucket every edge whose subject is `subject`.
    pub fn build(tables: &'t Tables, subject: &ElementId) -> Self {
        let mut states: Vec<State<'t>> = Vec::new();
        let mut objects: Vec<&'t ElementId> = Vec::new();

        for rel in tables.relationships().iter().filter(|r| &r.subject == subject) {
            let s = match states.iter().position(|s| s.name == rel.state) {
                Some(pos) => pos,
                None => {
                    states.push(State { name: &rel.state, groups: Vec::new() });
                    states.len() - 1
                }
            };
            let groups = &mut states[s].groups;
            let g = match groups.iter().position(|g| g.name == rel.group) {
                Some(pos) => pos,
                None => {
                    groups.push(Group { name: &rel.group, edges: SmallVec::new() });
                    groups.len() - 1
                }
            };
            let group = &mut groups[g];
            group.edges.push(Edge { id: rel.id, object: &rel.object, relationship: rel });

            if !objects.contains(&&rel.object) {
                objects.push(&rel.object);
            }
        }

        Self { subject: subject.clone(), states, objects }
    }

    pub fn subject(&self) -> &ElementId {
        &self.subject
    }

    pub fn states(&self) -> &[State<'t>] {
        &self.states
    }

    pub fn state(&self, name: &str) -> Option<&State<'t>> {
        self.states.iter().find(|s| s.name == name)
    }

    /// Distinct prerequisite objects in first-seen order.
    pub fn objects(&self) -> &[&'t ElementId] {
        &self.objects
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Every edge, state by state, group by group.
    pub fn edges(&self) -> impl Iterator<Item = &Edge<'t>> {
        self.states
            .iter()
            .flat_map(|s| s.groups.iter())
            .flat_map(|g| g.edges.iter())
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }
}

impl std::fmt::Display for RelationshipIndex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} requirements:", self.subject)?;
        for state in &self.states {
            writeln!(f, "  state {}", state.name)?;
            for group in &state.groups {
                writeln!(f, "    group {}", group.name)?;
                for edge in &group.edges {
                    let rel = edge.relationship;
                    write!(
                        f,
                        "      [{}] {} {:?} strength={}",
                        edge.id, edge.object, rel.interaction, rel.strength
                    )?;
                    if let Some(label) = &rel.group_label {
                        write!(f, " ({label})")?;
                    }
                    writeln!(f)?;
                }
            }
        }
        Ok(())
    }
}
