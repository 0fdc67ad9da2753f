//! Type-specific field derivations
//!
//! Derivations fill a field from a sibling field. They run once per element
//! before the rest of output validation, and never touch a target the caller
//! supplied (a supplied null counts as supplied).

use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;
use upc_ir::{Action, Element, Value};
use upc_schema::{Derivation, ObjectSchema};

static STREET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<street>.*\S)\s+(?P<number>\d+)(?:\s*[-/]?\s*(?P<ext>\S.*?))?\s*$")
        .expect("valid street regex")
});

/// Apply every derivation of `schema` to `element`
///
/// Name derivations only run on insert; street splitting runs for any action.
pub fn apply_derivations(element: &mut Element, schema: &ObjectSchema, action: Option<Action>) {
    let inserting = action == Some(Action::Insert);

    for derivation in &schema.derivations {
        match derivation {
            Derivation::SearchName { source, target } if inserting => {
                if element.has_field(target) {
                    continue;
                }
                if let Some(name) = text_of(element, source) {
                    let mut search_name = name.trim().to_uppercase();
                    if let Some(max) = schema.field(target).and_then(|f| f.max_length) {
                        search_name = search_name.chars().take(max).collect();
                    }
                    trace!("Derived {} '{}' from {}", target, search_name, source);
                    element.set_field(target.clone(), Value::String(search_name));
                }
            }
            Derivation::Initials { source, target } if inserting => {
                if element.has_field(target) {
                    continue;
                }
                if let Some(value) = text_of(element, source).as_deref().and_then(initials) {
                    trace!("Derived {} '{}' from {}", target, value, source);
                    element.set_field(target.clone(), Value::String(value));
                }
            }
            Derivation::SplitStreet {
                street,
                number,
                extension,
            } => split_street(element, street, number, extension),
            Derivation::SearchName { .. } | Derivation::Initials { .. } => {}
        }
    }
}

/// `"Jan Pieter"` becomes `"J.P."`
#[must_use]
pub fn initials(first_names: &str) -> Option<String> {
    let result: String = first_names
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter_map(|part| part.chars().next())
        .flat_map(|c| c.to_uppercase().chain(std::iter::once('.')))
        .collect();
    (!result.is_empty()).then_some(result)
}

/// Split `"Keizersgracht 12a"` into street, number and extension
#[must_use]
pub fn parse_street(text: &str) -> Option<(String, i64, Option<String>)> {
    let caps = STREET_RE.captures(text)?;
    let number = caps.name("number")?.as_str().parse().ok()?;
    let street = caps.name("street")?.as_str().to_string();
    let ext = caps.name("ext").map(|m| m.as_str().to_string());
    Some((street, number, ext))
}

fn split_street(element: &mut Element, street: &str, number: &str, extension: &str) {
    if element.has_field(number) {
        return;
    }
    let Some(text) = text_of(element, street) else {
        return;
    };
    let Some((name, house_number, ext)) = parse_street(&text) else {
        return;
    };

    trace!("Split street '{}' into {} / {} / {:?}", text, name, house_number, ext);
    element.set_field(street, Value::String(name));
    element.set_field(number, Value::Integer(house_number));
    if let Some(ext) = ext {
        if !element.has_field(extension) {
            element.set_field(extension, Value::String(ext));
        }
    }
}

fn text_of(element: &Element, tag: &str) -> Option<String> {
    element
        .field(tag)
        .and_then(Value::as_text)
        .filter(|t| !t.trim().is_empty())
}
