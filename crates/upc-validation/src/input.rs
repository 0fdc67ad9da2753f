//! Input conversion and input-time checks
//!
//! Caller data is a JSON mapping keyed by field tag or alias, or a list of
//! such mappings for a batch. Two reserved keys carry the element's id
//! attribute and its action override.

use crate::engine::{ValidationEngine, ValidationLevel, id_without_field, join_path};
use crate::reporter::ValidationReport;
use crate::rules::{ValidationMode, coerce_value, validate_field_value};
use crate::{Error, Result};
use serde_json::Map;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;
use upc_ir::{Action, Element, ObjectData, Value};
use upc_schema::{ObjectSchema, SchemaContext};

/// Reserved key carrying the element's id attribute
pub const ID_KEY: &str = "#id";

/// Reserved key carrying a per-element action override
pub const ACTION_KEY: &str = "#action";

impl ValidationEngine {
    /// Build a whole object from caller data
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] for an unknown object type and
    /// [`Error::Input`] with every input problem found.
    pub fn object_from_input(
        &self,
        object_type: &str,
        parent: Option<&str>,
        action: Option<Action>,
        data: &serde_json::Value,
        level: ValidationLevel,
    ) -> Result<ObjectData> {
        let canonical = self.registry().canonical_type(object_type)?;
        let elements = self.elements_from_input(&canonical, parent, action, data, level)?;
        Ok(ObjectData::new(canonical)
            .with_action(action)
            .with_elements(elements))
    }

    /// Convert caller data into elements of `object_type`
    ///
    /// A mapping yields one element, a list of mappings a batch. Unless
    /// `level` is [`ValidationLevel::None`] every element is checked with
    /// [`ValidationEngine::validate_element_input`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] for an unknown object type and
    /// [`Error::Input`] with every input problem found.
    pub fn elements_from_input(
        &self,
        object_type: &str,
        parent: Option<&str>,
        action: Option<Action>,
        data: &serde_json::Value,
        level: ValidationLevel,
    ) -> Result<Vec<Element>> {
        let canonical = self.registry().canonical_type(object_type)?;
        let mut report = ValidationReport::new();
        let elements = self.convert_elements(&canonical, data, "", level, &mut report);

        if level != ValidationLevel::None {
            for (index, element) in elements.iter().enumerate() {
                let context = SchemaContext {
                    parent: parent.map(str::to_string),
                    action: element.action.or(action),
                };
                let path = join_path("", &canonical, index);
                self.validate_element_input(&canonical, &context, element, &path, &mut report);
            }
        }

        if report.is_empty() {
            Ok(elements)
        } else {
            Err(Error::Input(report.message()))
        }
    }

    /// Resolve one caller-supplied field to its canonical tag and value
    ///
    /// With [`ValidationLevel::None`] an unknown name is kept as supplied so
    /// output validation can report it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for unknown fields, nested values and values
    /// that fail the field rules.
    pub fn field_from_input(
        &self,
        object_type: &str,
        context: &SchemaContext,
        name: &str,
        value: &serde_json::Value,
        level: ValidationLevel,
    ) -> Result<(String, Value)> {
        let schema = self.registry().schema_for(object_type, context)?;
        let value = Value::from_json(value).map_err(|e| Error::Input(format!("'{name}': {e}")))?;

        if level == ValidationLevel::None {
            let tag = self
                .registry()
                .get(object_type)
                .and_then(|full| full.field(name).map(|f| f.tag.clone()))
                .unwrap_or_else(|| name.to_string());
            return Ok((tag, value));
        }

        let def = self
            .resolve_field_key(&schema, name, &BTreeMap::new())
            .map_err(Error::Input)?;
        validate_field_value(&value, def, ValidationMode::Input)
            .map_err(|msg| Error::Input(format!("{}: {msg}", def.label())))?;
        Ok((def.tag.clone(), value))
    }

    /// Convert a caller-supplied id attribute value
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] when the type has no id field or the value
    /// does not fit the id field's type.
    pub fn id_from_input(
        &self,
        object_type: &str,
        context: &SchemaContext,
        value: &serde_json::Value,
        level: ValidationLevel,
    ) -> Result<Value> {
        let value =
            Value::from_json(value).map_err(|e| Error::Input(format!("'{ID_KEY}': {e}")))?;
        if level == ValidationLevel::None || value.is_null() {
            return Ok(value);
        }

        let schema = self.registry().schema_for(object_type, context)?;
        let id_field = schema
            .id_field
            .as_ref()
            .ok_or_else(|| Error::Input(id_without_field(object_type)))?;
        coerce_value(&value, id_field.field_type)
            .map_err(|msg| Error::Input(format!("id '{}': {msg}", id_field.name)))?;
        Ok(value)
    }

    /// Check one element's structure and supplied values
    ///
    /// Problems are added to `report`; nothing is defaulted and required
    /// fields are not enforced. Child objects are checked recursively.
    pub fn validate_element_input(
        &self,
        object_type: &str,
        context: &SchemaContext,
        element: &Element,
        path: &str,
        report: &mut ValidationReport,
    ) {
        let schema = match self.registry().schema_for(object_type, context) {
            Ok(schema) => schema,
            Err(e) => {
                report.push(path, e.to_string());
                return;
            }
        };

        if let Some(over) = element.action {
            if !context.is_embedded() {
                report.push(
                    path,
                    format!("action override '{over}' is only allowed on embedded elements"),
                );
            }
        }

        if let Some(id) = element.id.as_ref().filter(|v| !v.is_null()) {
            match &schema.id_field {
                None => report.push(path, id_without_field(object_type)),
                Some(id_field) => {
                    if let Err(msg) = coerce_value(id, id_field.field_type) {
                        report.push(path, format!("id '{}': {msg}", id_field.name));
                    }
                }
            }
        }

        for (key, value) in &element.fields {
            match self.resolve_field_key(&schema, key, &element.fields) {
                Ok(def) => {
                    if let Err(msg) = validate_field_value(value, def, ValidationMode::Input) {
                        report.push(path, format!("{}: {msg}", def.label()));
                    }
                }
                Err(msg) => report.push(path, msg),
            }
        }

        for (key, child) in &element.objects {
            let child_type = match self.resolve_object_key(&schema, key, &element.objects) {
                Ok(t) => t,
                Err(msg) => {
                    report.push(path, msg);
                    continue;
                }
            };
            for (index, child_element) in child.elements.iter().enumerate() {
                let child_context = SchemaContext {
                    parent: Some(schema.object_type.clone()),
                    action: child.element_action(index).or(context.action),
                };
                let child_path = join_path(path, &child_type, index);
                self.validate_element_input(
                    &child_type,
                    &child_context,
                    child_element,
                    &child_path,
                    report,
                );
            }
        }
    }

    fn convert_elements(
        &self,
        object_type: &str,
        data: &serde_json::Value,
        prefix: &str,
        level: ValidationLevel,
        report: &mut ValidationReport,
    ) -> Vec<Element> {
        let Some(schema) = self.registry().get(object_type) else {
            report.push(&join_path(prefix, object_type, 0), format!("Unknown object type: {object_type}"));
            return Vec::new();
        };

        match data {
            serde_json::Value::Object(map) => {
                let path = join_path(prefix, object_type, 0);
                vec![self.convert_element(&schema, map, &path, false, level, report)]
            }
            serde_json::Value::Array(items) => {
                let mut elements = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let path = join_path(prefix, object_type, index);
                    match item {
                        serde_json::Value::Object(map) => elements
                            .push(self.convert_element(&schema, map, &path, true, level, report)),
                        other => report.push(
                            &path,
                            format!("expected a mapping, found {}", json_kind(other)),
                        ),
                    }
                }
                elements
            }
            other => {
                report.push(
                    &join_path(prefix, object_type, 0),
                    format!(
                        "expected a mapping or a list of mappings, found {}",
                        json_kind(other)
                    ),
                );
                Vec::new()
            }
        }
    }

    fn convert_element(
        &self,
        schema: &ObjectSchema,
        map: &Map<String, serde_json::Value>,
        path: &str,
        in_batch: bool,
        level: ValidationLevel,
        report: &mut ValidationReport,
    ) -> Element {
        let mut element = Element::new();
        // canonical tag -> key it was supplied under
        let mut origins: HashMap<String, String> = HashMap::new();

        for (key, data) in map {
            match key.as_str() {
                ID_KEY => match Value::from_json(data) {
                    Ok(value) => element.id = Some(value),
                    Err(e) => report.push(path, format!("'{ID_KEY}': {e}")),
                },
                ACTION_KEY => match data {
                    serde_json::Value::Null => {}
                    serde_json::Value::String(s) => match s.parse::<Action>() {
                        Ok(action) => element.action = Some(action),
                        Err(e) => report.push(path, e.to_string()),
                    },
                    other => report.push(
                        path,
                        format!("'{ACTION_KEY}' must be a string, found {}", json_kind(other)),
                    ),
                },
                _ => {
                    if let Some(def) = schema.field(key) {
                        let value = match Value::from_json(data) {
                            Ok(value) => value,
                            Err(e) => {
                                report.push(path, format!("{}: {e}", def.label()));
                                continue;
                            }
                        };
                        match origins.get(&def.tag) {
                            None => {
                                origins.insert(def.tag.clone(), key.clone());
                                element.set_field(def.tag.clone(), value);
                            }
                            // Keep both spellings so the collision is reported
                            Some(previous) if *key == def.tag => {
                                if let Some(earlier) = element.remove_field(&def.tag) {
                                    element.set_field(previous.clone(), earlier);
                                }
                                element.set_field(def.tag.clone(), value);
                            }
                            Some(_) => {
                                element.set_field(key.clone(), value);
                            }
                        }
                    } else if let Some(relation) = schema.relation(key) {
                        let child_type = relation.object_type.clone();
                        let children = self.convert_elements(&child_type, data, path, level, report);
                        if element.object(&child_type).is_some() {
                            report.push(
                                path,
                                format!(
                                    "object '{child_type}' supplied both as '{child_type}' and as '{}'",
                                    relation.alias.as_deref().unwrap_or(key)
                                ),
                            );
                            continue;
                        }
                        element.set_object(ObjectData::new(child_type).with_elements(children));
                    } else {
                        match Value::from_json(data) {
                            Ok(value) => {
                                element.set_field(key.clone(), value);
                            }
                            Err(_) => report.push(
                                path,
                                format!("unknown field or object '{key}' for {}", schema.object_type),
                            ),
                        }
                    }
                }
            }
        }

        if level != ValidationLevel::None && !in_batch && element.is_child_only() {
            report.push(
                path,
                "element holds only child objects; supply it inside a list to send it as a batch",
            );
        }

        trace!(
            "Converted {} with {} field(s) and {} object(s)",
            path,
            element.fields.len(),
            element.objects.len()
        );
        element
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "a mapping",
    }
}
