//! Validated, immutable snapshot of an object tree
//!
//! Produced by output validation. Fields are already in schema order, the id
//! attribute carries its schema name and every element carries its resolved
//! action, so encoders never need the schema registry.

use crate::action::Action;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A validated object: its type and elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedObject {
    pub object_type: String,
    pub elements: Vec<ValidatedElement>,
}

/// A validated element ready for encoding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatedElement {
    pub id: Option<IdAttribute>,
    pub action: Option<Action>,
    /// Canonical tag / value pairs in schema order
    pub fields: Vec<(String, Value)>,
    /// Populated child objects in schema order
    pub objects: Vec<ValidatedObject>,
}

/// The element-identifying attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdAttribute {
    pub name: String,
    pub value: Value,
}

impl ValidatedObject {
    #[must_use]
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            elements: Vec::new(),
        }
    }

    /// First element, the common case for single-record payloads
    #[must_use]
    pub fn first(&self) -> Option<&ValidatedElement> {
        self.elements.first()
    }
}

impl ValidatedElement {
    /// Look up a field value by tag
    #[must_use]
    pub fn field(&self, tag: &str) -> Option<&Value> {
        self.fields.iter().find(|(t, _)| t == tag).map(|(_, v)| v)
    }

    /// Look up a child object by type
    #[must_use]
    pub fn object(&self, object_type: &str) -> Option<&ValidatedObject> {
        self.objects.iter().find(|o| o.object_type == object_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_helpers() {
        let element = ValidatedElement {
            id: None,
            action: Some(Action::Insert),
            fields: vec![
                ("StId".to_string(), Value::Integer(1)),
                ("Ds".to_string(), Value::from("x")),
            ],
            objects: vec![ValidatedObject::new("KnSubjectLink")],
        };

        assert_eq!(element.field("Ds"), Some(&Value::from("x")));
        assert!(element.field("SbTx").is_none());
        assert!(element.object("KnSubjectLink").is_some());

        let mut object = ValidatedObject::new("KnSubject");
        assert!(object.first().is_none());
        object.elements.push(element);
        assert_eq!(object.first().and_then(|e| e.action), Some(Action::Insert));
    }
}
