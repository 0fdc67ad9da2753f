//! Concurrent schema registry with start-up overrides

use crate::builtin;
use crate::model::{ObjectSchema, SchemaContext};
use crate::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registry of object type schemas, keyed by canonical type
///
/// Safe to share behind an `Arc`; registering a schema for an existing type
/// replaces it for every later lookup.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<String, Arc<ObjectSchema>>,
    aliases: DashMap<String, String>,
}

impl SchemaRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in type
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for schema in builtin::all() {
            registry.register(schema);
        }
        registry
    }

    /// Register a schema, replacing any schema of the same type
    pub fn register(&self, schema: ObjectSchema) {
        let object_type = schema.object_type.clone();
        let alias = schema.alias.clone();

        let previous = self.schemas.insert(object_type.clone(), Arc::new(schema));
        match &previous {
            Some(_) => info!("Overriding schema for object type {}", object_type),
            None => debug!("Registered schema for object type {}", object_type),
        }

        if let Some(old_alias) = previous.as_ref().and_then(|p| p.alias.as_ref()) {
            self.aliases.remove_if(old_alias, |_, target| *target == object_type);
        }
        if let Some(alias) = alias {
            if let Some(other) = self.aliases.insert(alias.clone(), object_type.clone()) {
                if other != object_type {
                    warn!(
                        "Alias '{}' moved from object type {} to {}",
                        alias, other, object_type
                    );
                }
            }
        }
    }

    /// Get a schema by canonical type or alias
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ObjectSchema>> {
        let canonical = self.canonical_type(name).ok()?;
        self.schemas.get(&canonical).map(|s| Arc::clone(s.value()))
    }

    /// Check if a type or alias is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.canonical_type(name).is_ok()
    }

    /// Canonical type tag for a type or alias
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownObjectType`] if neither matches.
    pub fn canonical_type(&self, name: &str) -> Result<String> {
        if self.schemas.contains_key(name) {
            return Ok(name.to_string());
        }
        self.aliases
            .get(name)
            .map(|t| t.value().clone())
            .ok_or_else(|| Error::UnknownObjectType(name.to_string()))
    }

    /// Schema of a type narrowed to the given parent/action context
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownObjectType`] for unregistered types.
    pub fn schema_for(&self, name: &str, context: &SchemaContext) -> Result<ObjectSchema> {
        let schema = self
            .get(name)
            .ok_or_else(|| Error::UnknownObjectType(name.to_string()))?;
        Ok(schema.resolve(context))
    }

    /// All registered canonical types, sorted
    #[must_use]
    pub fn object_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.schemas.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }
}
