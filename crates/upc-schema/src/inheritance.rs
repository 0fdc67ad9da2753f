//! Schema inheritance and merge logic

use crate::model::ObjectSchema;
use std::collections::HashSet;

/// Tracks `extends` relationships to detect cycles
#[derive(Debug, Default)]
pub struct InheritanceGraph {
    edges: Vec<(String, String)>, // (child, parent)
}

impl InheritanceGraph {
    #[must_use]
    pub fn new() -> Self {
        Self { edges: Vec::new() }
    }

    pub fn add_edge(&mut self, child: impl Into<String>, parent: impl Into<String>) {
        self.edges.push((child.into(), parent.into()));
    }

    /// Detect if adding this edge would create a cycle
    #[must_use]
    pub fn would_create_cycle(&self, child: &str, parent: &str) -> bool {
        if child == parent {
            return true;
        }

        // Check if parent depends on child (directly or transitively)
        let mut to_visit = vec![parent.to_string()];
        let mut visited = HashSet::new();

        while let Some(current) = to_visit.pop() {
            if current == child {
                return true;
            }
            if visited.insert(current.clone()) {
                for (c, p) in &self.edges {
                    if c == &current {
                        to_visit.push(p.clone());
                    }
                }
            }
        }

        false
    }
}

/// Merge a parent schema into a child schema
///
/// The result keeps the parent's field and relation order; child entries with
/// the same tag replace the parent's in place and new child entries follow.
/// Rules and the id field come from the child when it sets them.
pub fn merge_schemas(parent: &ObjectSchema, child: &mut ObjectSchema) {
    let mut fields = parent.fields.clone();
    for child_field in child.fields.drain(..) {
        match fields.iter_mut().find(|f| f.tag == child_field.tag) {
            Some(existing) => *existing = child_field,
            None => fields.push(child_field),
        }
    }
    child.fields = fields;

    let mut relations = parent.relations.clone();
    for child_relation in child.relations.drain(..) {
        match relations
            .iter_mut()
            .find(|r| r.object_type == child_relation.object_type)
        {
            Some(existing) => *existing = child_relation,
            None => relations.push(child_relation),
        }
    }
    child.relations = relations;

    let mut derivations = parent.derivations.clone();
    for derivation in child.derivations.drain(..) {
        if !derivations.contains(&derivation) {
            derivations.push(derivation);
        }
    }
    child.derivations = derivations;

    // An alias names one type; only an override of the same type keeps it
    if child.alias.is_none() && child.object_type == parent.object_type {
        child.alias.clone_from(&parent.alias);
    }
    if child.id_field.is_none() {
        child.id_field.clone_from(&parent.id_field);
    }
    if child.matching.is_none() {
        child.matching.clone_from(&parent.matching);
    }
    if child.auto_number.is_none() {
        child.auto_number.clone_from(&parent.auto_number);
    }
    if child.postal_address.is_none() {
        child.postal_address.clone_from(&parent.postal_address);
    }
}
