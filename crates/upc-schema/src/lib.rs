//! # upc-schema
//!
//! Object type schemas for update payloads: the model, the built-in
//! definitions, a concurrent registry and a loader for custom types.
//!
//! Custom schema files may extend a registered type, including their own
//! built-in type, to add or override fields at start-up.

pub mod builtin;
pub mod inheritance;
pub mod loader;
pub mod model;
pub mod registry;

pub use loader::SchemaLoader;
pub use model::{
    AutoNumberRule, DefaultValue, Derivation, FieldDefinition, FieldScope, FieldType, IdField,
    IdentifierMatch, MatchingRule, ObjectRelation, ObjectSchema, PostalAddressRule, SchemaContext,
};
pub use registry::SchemaRegistry;

use thiserror::Error;

/// Errors that can occur when working with schemas
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown object type: {0}")]
    UnknownObjectType(String),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("Inheritance error: {0}")]
    Inheritance(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
