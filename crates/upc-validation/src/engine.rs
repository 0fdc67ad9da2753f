//! Validation engine
//!
//! Output validation turns an [`ObjectData`] tree into a [`ValidatedObject`].
//! Per element it resolves the action, fills the matching-method field,
//! injects defaults and pseudo-field flags, checks required fields and
//! recurses into child objects with the resolved action.

use crate::derive::apply_derivations;
use crate::reporter::ValidationReport;
use crate::rules::{ValidationMode, coerce_value, validate_field_value};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};
use upc_ir::{
    Action, Element, IdAttribute, ObjectData, ValidatedElement, ValidatedObject, Value,
};
use upc_schema::{
    DefaultValue, FieldDefinition, FieldType, ObjectSchema, SchemaContext, SchemaRegistry,
};

/// How much checking input methods do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Store loosely converted values; every check waits for output
    None,
    /// Check structure and the format of supplied values
    #[default]
    Input,
    /// Input checks followed by full output validation of the object
    Eager,
}

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Level used when a caller does not pass one
    pub level: ValidationLevel,
    /// Run type-specific derivations (search name, initials, street split)
    pub reformat: bool,
    /// Inject ordinary defaults also when the element is not a provable insert
    pub defaults_on_update: bool,
    /// Date used for "current date" defaults; the local date when unset
    pub today: Option<NaiveDate>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            level: ValidationLevel::Input,
            reformat: true,
            defaults_on_update: false,
            today: None,
        }
    }
}

/// Main validation engine
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    registry: Arc<SchemaRegistry>,
    config: ValidationConfig,
}

impl ValidationEngine {
    /// Create an engine with default configuration
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_config(registry, ValidationConfig::default())
    }

    /// Create with specific configuration
    #[must_use]
    pub fn with_config(registry: Arc<SchemaRegistry>, config: ValidationConfig) -> Self {
        Self { registry, config }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// The date "current date" defaults resolve to
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.config
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Fully validate an object and everything below it
    ///
    /// `parent` and `inherited_action` describe where the object sits when
    /// it is a subtree of a larger payload; pass `None` for a root object.
    /// The object itself is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] with every issue found, one per line.
    pub fn validate_elements(
        &self,
        object: &ObjectData,
        parent: Option<&str>,
        inherited_action: Option<Action>,
    ) -> Result<ValidatedObject> {
        let mut report = ValidationReport::new();
        let validated = self.validate_object(object, parent, inherited_action, "", &mut report);
        if report.is_empty() {
            Ok(validated)
        } else {
            debug!(
                "Output validation of {} found {} issue(s)",
                object.object_type,
                report.len()
            );
            Err(Error::Output(report.message()))
        }
    }

    fn validate_object(
        &self,
        object: &ObjectData,
        parent: Option<&str>,
        inherited_action: Option<Action>,
        prefix: &str,
        report: &mut ValidationReport,
    ) -> ValidatedObject {
        let object_type = match self.registry.canonical_type(&object.object_type) {
            Ok(t) => t,
            Err(e) => {
                report.push(&join_path(prefix, &object.object_type, 0), e.to_string());
                return ValidatedObject::new(object.object_type.clone());
            }
        };

        let mut validated = ValidatedObject::new(object_type.clone());
        for (index, element) in object.elements.iter().enumerate() {
            let path = join_path(prefix, &object_type, index);
            let mut action = object.action.or(inherited_action);
            if let Some(over) = element.action {
                if parent.is_some() {
                    action = Some(over);
                } else {
                    report.push(
                        &path,
                        format!("action override '{over}' is only allowed on embedded elements"),
                    );
                }
            }

            let context = SchemaContext {
                parent: parent.map(str::to_string),
                action,
            };
            match self.registry.schema_for(&object_type, &context) {
                Ok(schema) => validated
                    .elements
                    .push(self.validate_element(element, &schema, action, &path, report)),
                Err(e) => report.push(&path, e.to_string()),
            }
        }
        validated
    }

    fn validate_element(
        &self,
        element: &Element,
        schema: &ObjectSchema,
        action: Option<Action>,
        path: &str,
        report: &mut ValidationReport,
    ) -> ValidatedElement {
        let mut element = self.normalize_element(element, schema, path, report);
        let id = self.resolve_id(&element, schema, path, report);

        if self.config.reformat {
            apply_derivations(&mut element, schema, action);
        }

        let provable_insert = resolve_matching(&mut element, schema, action, path);
        self.apply_defaults(&mut element, schema, provable_insert);
        apply_flags(&mut element, schema, provable_insert);

        let mut fields = Vec::new();
        for def in &schema.fields {
            match element.field(&def.tag) {
                Some(value) => match validate_field_value(value, def, ValidationMode::Output) {
                    Ok(value) => fields.push((def.tag.clone(), value)),
                    Err(msg) => report.push(path, format!("{}: {msg}", def.label())),
                },
                None if def.required => {
                    report.push(path, format!("{}: a value is required", def.label()));
                }
                None => {}
            }
        }

        let mut objects = Vec::new();
        for relation in &schema.relations {
            if let Some(child) = element.object(&relation.object_type) {
                if !child.is_empty() {
                    objects.push(self.validate_object(
                        child,
                        Some(&schema.object_type),
                        action,
                        path,
                        report,
                    ));
                }
            }
        }

        ValidatedElement {
            id,
            action,
            fields,
            objects,
        }
    }

    /// Copy of `element` with every field and child keyed by canonical tag
    ///
    /// Keys that cannot be mapped are reported and dropped.
    fn normalize_element(
        &self,
        element: &Element,
        schema: &ObjectSchema,
        path: &str,
        report: &mut ValidationReport,
    ) -> Element {
        let mut normalized = Element {
            id: element.id.clone(),
            action: element.action,
            fields: BTreeMap::new(),
            objects: BTreeMap::new(),
        };

        for (key, value) in &element.fields {
            match self.resolve_field_key(schema, key, &element.fields) {
                Ok(def) => {
                    normalized.set_field(def.tag.clone(), value.clone());
                }
                Err(msg) => report.push(path, msg),
            }
        }

        for (key, child) in &element.objects {
            match self.resolve_object_key(schema, key, &element.objects) {
                Ok(object_type) => {
                    let mut child = child.clone();
                    child.object_type = object_type;
                    normalized.set_object(child);
                }
                Err(msg) => report.push(path, msg),
            }
        }

        normalized
    }

    /// Field definition a supplied key stands for
    pub(crate) fn resolve_field_key<'s>(
        &self,
        schema: &'s ObjectSchema,
        key: &str,
        supplied: &BTreeMap<String, Value>,
    ) -> std::result::Result<&'s FieldDefinition, String> {
        if let Some(def) = schema.fields.iter().find(|f| f.tag == key) {
            return Ok(def);
        }
        match schema.field(key) {
            Some(def) if supplied.contains_key(&def.tag) => Err(format!(
                "field {} supplied both as '{}' and as '{key}'",
                def.label(),
                def.tag
            )),
            Some(def) => Ok(def),
            None => {
                let known = self
                    .registry
                    .get(&schema.object_type)
                    .is_some_and(|full| full.field(key).is_some());
                Err(if known {
                    format!("field '{key}' is not available for {} here", schema.object_type)
                } else {
                    format!("unknown field '{key}' for {}", schema.object_type)
                })
            }
        }
    }

    /// Canonical child type a supplied object key stands for
    pub(crate) fn resolve_object_key(
        &self,
        schema: &ObjectSchema,
        key: &str,
        supplied: &BTreeMap<String, ObjectData>,
    ) -> std::result::Result<String, String> {
        if let Some(relation) = schema.relations.iter().find(|r| r.object_type == key) {
            return Ok(relation.object_type.clone());
        }
        match schema.relation(key) {
            Some(relation) if supplied.contains_key(&relation.object_type) => Err(format!(
                "object '{}' supplied both as '{}' and as '{key}'",
                relation.object_type, relation.object_type
            )),
            Some(relation) => Ok(relation.object_type.clone()),
            None => {
                let known = self
                    .registry
                    .get(&schema.object_type)
                    .is_some_and(|full| full.relation(key).is_some());
                Err(if known {
                    format!(
                        "object '{key}' cannot be embedded in {} here",
                        schema.object_type
                    )
                } else {
                    format!("unknown field or object '{key}' for {}", schema.object_type)
                })
            }
        }
    }

    fn resolve_id(
        &self,
        element: &Element,
        schema: &ObjectSchema,
        path: &str,
        report: &mut ValidationReport,
    ) -> Option<IdAttribute> {
        let value = element.id.as_ref().filter(|v| !v.is_null())?;
        let Some(id_field) = &schema.id_field else {
            report.push(path, id_without_field(&schema.object_type));
            return None;
        };
        match coerce_value(value, id_field.field_type) {
            Ok(value) => Some(IdAttribute {
                name: id_field.name.clone(),
                value,
            }),
            Err(msg) => {
                report.push(path, format!("id '{}': {msg}", id_field.name));
                None
            }
        }
    }

    fn apply_defaults(&self, element: &mut Element, schema: &ObjectSchema, provable_insert: bool) {
        let ordinary = provable_insert || self.config.defaults_on_update;
        for def in &schema.fields {
            let Some(default) = &def.default else {
                continue;
            };
            if element.has_field(&def.tag) || !(def.always_default || ordinary) {
                continue;
            }
            let value = match default {
                DefaultValue::Fixed(value) => value.clone(),
                DefaultValue::CurrentDate => Value::Date(self.today()),
            };
            trace!("Default {} = {:?}", def.tag, value);
            element.set_field(def.tag.clone(), value);
        }
    }
}

pub(crate) fn id_without_field(object_type: &str) -> String {
    format!("id value supplied but {object_type} has no id field")
}

pub(crate) fn join_path(prefix: &str, object_type: &str, index: usize) -> String {
    if prefix.is_empty() {
        format!("{object_type}[{index}]")
    } else {
        format!("{prefix}/{object_type}[{index}]")
    }
}

/// Fill the matching-method field and tell whether the element is a
/// provable insert
fn resolve_matching(
    element: &mut Element,
    schema: &ObjectSchema,
    action: Option<Action>,
    path: &str,
) -> bool {
    let inserting = action == Some(Action::Insert);
    let Some(rule) = &schema.matching else {
        return inserting;
    };

    if !element.has_field(&rule.field) {
        let value = if let Some(identifier) =
            rule.identifiers.iter().find(|m| element.has_value(&m.field))
        {
            identifier.value
        } else if inserting {
            if rule.primary_key_on_insert && element.has_value(&rule.primary_key) {
                rule.primary_key_value
            } else {
                rule.always_insert_value
            }
        } else {
            rule.primary_key_value
        };
        debug!("{}: {} resolved to {}", path, rule.field, value);
        element.set_field(rule.field.clone(), Value::Integer(value));
    }

    // Compare as numbers so "06", 6 and 6.0 all mean the same method
    inserting
        && element
            .field(&rule.field)
            .and_then(|v| coerce_value(v, FieldType::Integer).ok())
            .is_some_and(|v| v == Value::Integer(rule.always_insert_value))
}

/// Auto-number and postal-address flags
fn apply_flags(element: &mut Element, schema: &ObjectSchema, provable_insert: bool) {
    if let Some(rule) = &schema.auto_number {
        if provable_insert
            && !element.has_field(&rule.field)
            && !element.has_value(&rule.identifier)
            && schema.field(&rule.field).is_some()
        {
            element.set_field(rule.field.clone(), Value::Boolean(true));
        }
    }

    if let Some(rule) = &schema.postal_address {
        if !element.has_field(&rule.field)
            && element.has_populated_object(&rule.address)
            && !element.has_populated_object(&rule.postal)
        {
            element.set_field(rule.field.clone(), Value::Boolean(true));
        }
    }
}
