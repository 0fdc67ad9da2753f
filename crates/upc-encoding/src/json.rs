//! JSON encoder
//!
//! Mirrors the XML nesting: `{"KnSubject": {"Element": {...}}}` for one
//! element and an array under `"Element"` for two or more. The id attribute
//! becomes an `@`-prefixed key. The action is not part of the document; REST
//! callers express it through the HTTP verb.

use crate::{EncodeOptions, Result};
use serde_json::{Map, Value as Json};
use tracing::trace;
use upc_ir::{ValidatedElement, ValidatedObject};

/// Prefix marking the id attribute among element keys
pub const ID_PREFIX: char = '@';

/// Encode as a JSON string
///
/// # Errors
///
/// Returns [`crate::Error::Empty`] for an object without elements and
/// [`crate::Error::Json`] if serialization fails.
pub fn to_json(object: &ValidatedObject, options: &EncodeOptions) -> Result<String> {
    crate::ensure_elements(object)?;
    let value = to_json_value(object);
    let text = if options.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    trace!("Encoded {} as {} bytes of JSON", object.object_type, text.len());
    Ok(text)
}

/// The JSON document as a value
#[must_use]
pub fn to_json_value(object: &ValidatedObject) -> Json {
    let mut root = Map::new();
    root.insert(object.object_type.clone(), object_body(object));
    Json::Object(root)
}

fn object_body(object: &ValidatedObject) -> Json {
    let elements = match object.elements.as_slice() {
        [single] => element_body(single),
        many => Json::Array(many.iter().map(element_body).collect()),
    };
    let mut body = Map::new();
    body.insert("Element".to_string(), elements);
    Json::Object(body)
}

fn element_body(element: &ValidatedElement) -> Json {
    let mut body = Map::new();
    if let Some(id) = &element.id {
        body.insert(format!("{ID_PREFIX}{}", id.name), id.value.to_json());
    }

    let fields: Map<String, Json> = element
        .fields
        .iter()
        .map(|(tag, value)| (tag.clone(), value.to_json()))
        .collect();
    body.insert("Fields".to_string(), Json::Object(fields));

    if !element.objects.is_empty() {
        let objects: Map<String, Json> = element
            .objects
            .iter()
            .map(|child| (child.object_type.clone(), object_body(child)))
            .collect();
        body.insert("Objects".to_string(), Json::Object(objects));
    }

    Json::Object(body)
}
