//! Element and object tree
#![allow(clippy::must_use_candidate)] // Accessor API intentionally omits pervasive #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builder methods return Self for ergonomics.

use crate::action::Action;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One record instance of an object type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Value of the element's id attribute (if the type has one)
    pub id: Option<Value>,

    /// Per-element action override; only meaningful on embedded elements
    pub action: Option<Action>,

    /// Field values keyed by canonical tag
    pub fields: BTreeMap<String, Value>,

    /// Child objects keyed by canonical object type
    pub objects: BTreeMap<String, ObjectData>,
}

/// An object type plus the elements supplied for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectData {
    /// Canonical object type tag
    pub object_type: String,

    /// Action for all elements that do not override it
    pub action: Option<Action>,

    /// Elements in caller order
    pub elements: Vec<Element>,
}

impl Element {
    /// Create an empty element
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the id attribute value
    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set a field value by canonical tag
    pub fn set_field(&mut self, tag: impl Into<String>, value: Value) -> &mut Self {
        self.fields.insert(tag.into(), value);
        self
    }

    /// Get a field value by canonical tag
    pub fn field(&self, tag: &str) -> Option<&Value> {
        self.fields.get(tag)
    }

    /// Whether the field is present (a present `Null` counts)
    pub fn has_field(&self, tag: &str) -> bool {
        self.fields.contains_key(tag)
    }

    /// Whether the field is present with a non-null value
    pub fn has_value(&self, tag: &str) -> bool {
        self.fields.get(tag).is_some_and(|v| !v.is_null())
    }

    /// Remove a field, returning its previous value
    pub fn remove_field(&mut self, tag: &str) -> Option<Value> {
        self.fields.remove(tag)
    }

    /// Put a child object into its slot, replacing what was there
    pub fn set_object(&mut self, object: ObjectData) -> &mut Self {
        self.objects.insert(object.object_type.clone(), object);
        self
    }

    /// Get a child object by canonical type
    pub fn object(&self, object_type: &str) -> Option<&ObjectData> {
        self.objects.get(object_type)
    }

    /// Get a mutable child object by canonical type
    pub fn object_mut(&mut self, object_type: &str) -> Option<&mut ObjectData> {
        self.objects.get_mut(object_type)
    }

    /// Whether a child slot holds at least one element
    pub fn has_populated_object(&self, object_type: &str) -> bool {
        self.objects
            .get(object_type)
            .is_some_and(|o| !o.elements.is_empty())
    }

    /// An element holding child objects but not a single scalar field
    pub fn is_child_only(&self) -> bool {
        self.fields.is_empty() && !self.objects.is_empty()
    }
}

impl ObjectData {
    /// Create an object with no elements
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            action: None,
            elements: Vec::new(),
        }
    }

    /// Set the object-level action
    pub fn with_action(mut self, action: Option<Action>) -> Self {
        self.action = action;
        self
    }

    /// Replace the element list
    pub fn with_elements(mut self, elements: Vec<Element>) -> Self {
        self.elements = elements;
        self
    }

    /// Append an element
    pub fn push(&mut self, element: Element) -> &mut Self {
        self.elements.push(element);
        self
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the object has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get an element by index
    pub fn element(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    /// Get a mutable element by index
    pub fn element_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.elements.get_mut(index)
    }

    /// Action that applies to one element before any parent default:
    /// its own override, else the object-level action.
    pub fn element_action(&self, index: usize) -> Option<Action> {
        self.elements
            .get(index)
            .and_then(|e| e.action)
            .or(self.action)
    }
}
