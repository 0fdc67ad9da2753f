//! Schema loader for custom object types
//!
//! Schema files describe one object type in JSON or YAML. A file may
//! `extends` a registered type (including its own type, to add fields to a
//! built-in); the loaded definition is merged over the parent before it is
//! registered.

use crate::inheritance::{InheritanceGraph, merge_schemas};
use crate::model::{
    AutoNumberRule, DefaultValue, Derivation, FieldDefinition, FieldScope, FieldType, IdField,
    MatchingRule, ObjectRelation, ObjectSchema, PostalAddressRule,
};
use crate::registry::SchemaRegistry;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace};
use upc_ir::Value;

/// Serializable schema format for loading from files
#[derive(Debug, Deserialize)]
struct SchemaFile {
    object_type: String,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    extends: Option<String>,
    #[serde(default)]
    id_field: Option<IdField>,
    #[serde(default)]
    fields: Vec<FieldFile>,
    #[serde(default)]
    relations: Vec<ObjectRelation>,
    #[serde(default)]
    matching: Option<MatchingRule>,
    #[serde(default)]
    auto_number: Option<AutoNumberRule>,
    #[serde(default)]
    postal_address: Option<PostalAddressRule>,
    #[serde(default)]
    derivations: Vec<Derivation>,
}

#[derive(Debug, Deserialize)]
struct FieldFile {
    tag: String,
    #[serde(default)]
    alias: Option<String>,
    #[serde(rename = "type", default)]
    field_type: FieldType,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    default: Option<serde_json::Value>,
    #[serde(default)]
    default_today: bool,
    #[serde(default)]
    always_default: bool,
    #[serde(default)]
    scope: FieldScope,
    #[serde(default)]
    codes: Option<Vec<String>>,
    #[serde(default)]
    max_length: Option<usize>,
}

/// A parsed schema file whose `extends` is not resolved yet
#[derive(Debug)]
struct PendingSchema {
    schema: ObjectSchema,
    extends: Option<String>,
}

/// Loads schema files into a shared registry
pub struct SchemaLoader {
    registry: Arc<SchemaRegistry>,
    schema_paths: Vec<PathBuf>,
}

impl SchemaLoader {
    /// Create a loader that registers into `registry`
    pub fn new(registry: Arc<SchemaRegistry>, schema_paths: Vec<PathBuf>) -> Self {
        Self {
            registry,
            schema_paths,
        }
    }

    /// The registry this loader writes to
    #[must_use]
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Parse a JSON schema and resolve its `extends` against the registry
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON, bad defaults or an unknown parent.
    pub fn load_from_json(&self, json: &str) -> Result<ObjectSchema> {
        let file: SchemaFile = serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))?;
        self.resolve(convert_schema_file(file)?)
    }

    /// Parse a YAML schema and resolve its `extends` against the registry
    ///
    /// # Errors
    ///
    /// Returns an error for malformed YAML, bad defaults or an unknown parent.
    pub fn load_from_yaml(&self, yaml: &str) -> Result<ObjectSchema> {
        let file: SchemaFile = serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidFormat(format!("YAML parse error: {e}")))?;
        self.resolve(convert_schema_file(file)?)
    }

    /// Load a schema from a specific file path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&self, path: &Path) -> Result<ObjectSchema> {
        trace!("Loading schema from file: {:?}", path);
        let pending = read_schema_file(path)?;
        self.resolve(pending)
    }

    /// Load and register one schema file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded.
    pub fn register_file(&self, path: &Path) -> Result<String> {
        let schema = self.load_from_file(path)?;
        let object_type = schema.object_type.clone();
        self.registry.register(schema);
        Ok(object_type)
    }

    /// Load and register every schema file on the search paths
    ///
    /// Files are read in path order; a file extending another file from the
    /// same batch is registered after its parent. Returns the registered types.
    ///
    /// # Errors
    ///
    /// Returns an error for unreadable files, circular `extends` chains and
    /// parents that are neither registered nor part of the batch.
    pub fn load_all(&self) -> Result<Vec<String>> {
        let mut pending = Vec::new();
        for dir in &self.schema_paths {
            for path in schema_files_in(dir)? {
                pending.push(read_schema_file(&path)?);
            }
        }

        let mut graph = InheritanceGraph::new();
        for item in &pending {
            if let Some(parent) = &item.extends {
                if *parent == item.schema.object_type {
                    continue;
                }
                if graph.would_create_cycle(&item.schema.object_type, parent) {
                    return Err(Error::Inheritance(format!(
                        "Circular extends between {} and {}",
                        item.schema.object_type, parent
                    )));
                }
                graph.add_edge(item.schema.object_type.clone(), parent.clone());
            }
        }

        let mut registered = Vec::new();
        while !pending.is_empty() {
            let ready = pending.iter().position(|item| match &item.extends {
                None => true,
                Some(parent) if *parent == item.schema.object_type => true,
                Some(parent) => !pending.iter().any(|p| p.schema.object_type == *parent),
            });
            let Some(index) = ready else {
                return Err(Error::Inheritance(
                    "Unresolvable extends chain in schema files".to_string(),
                ));
            };

            let item = pending.remove(index);
            let schema = self.resolve(item)?;
            registered.push(schema.object_type.clone());
            self.registry.register(schema);
        }

        info!("Loaded {} schema file(s)", registered.len());
        Ok(registered)
    }

    fn resolve(&self, pending: PendingSchema) -> Result<ObjectSchema> {
        let PendingSchema {
            mut schema,
            extends,
        } = pending;

        if let Some(parent_name) = extends {
            let parent = self.registry.get(&parent_name).ok_or_else(|| {
                Error::Inheritance(format!(
                    "{} extends unknown object type {}",
                    schema.object_type, parent_name
                ))
            })?;
            debug!("Merging {} over {}", schema.object_type, parent.object_type);
            merge_schemas(&parent, &mut schema);
        }

        Ok(schema)
    }
}

fn is_schema_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e, "json" | "yaml" | "yml"))
}

fn schema_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_schema_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_schema_file(path: &Path) -> Result<PendingSchema> {
    let content = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .is_some_and(|e| e == "yaml" || e == "yml");

    let file: SchemaFile = if is_yaml {
        serde_yaml::from_str(&content)
            .map_err(|e| Error::InvalidFormat(format!("{}: YAML parse error: {e}", path.display())))?
    } else {
        serde_json::from_str(&content)
            .map_err(|e| Error::InvalidFormat(format!("{}: JSON parse error: {e}", path.display())))?
    };
    convert_schema_file(file)
}

fn convert_schema_file(file: SchemaFile) -> Result<PendingSchema> {
    let mut fields = Vec::with_capacity(file.fields.len());
    for f in file.fields {
        let default = match (f.default_today, f.default) {
            (true, _) => Some(DefaultValue::CurrentDate),
            (false, Some(json)) => Some(DefaultValue::Fixed(Value::from_json(&json).map_err(
                |e| Error::Parse(format!("Default of field {}: {e}", f.tag)),
            )?)),
            (false, None) => None,
        };
        fields.push(FieldDefinition {
            tag: f.tag,
            alias: f.alias,
            field_type: f.field_type,
            required: f.required,
            default,
            always_default: f.always_default,
            scope: f.scope,
            codes: f.codes,
            max_length: f.max_length,
        });
    }

    let schema = ObjectSchema {
        object_type: file.object_type,
        alias: file.alias,
        id_field: file.id_field,
        fields,
        relations: file.relations,
        matching: file.matching,
        auto_number: file.auto_number,
        postal_address: file.postal_address,
        derivations: file.derivations,
    };

    Ok(PendingSchema {
        schema,
        extends: file.extends,
    })
}
