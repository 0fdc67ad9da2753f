#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # upc-ir
//!
//! In-memory tree model for update payloads.
//!
//! An [`ObjectData`] holds one object type, an optional action and an ordered
//! list of [`Element`]s. Each element carries scalar field values keyed by
//! canonical tag plus nested child objects, so a whole payload is one tree
//! that is exclusively owned by its root.
//!
//! Output validation turns the mutable tree into a [`ValidatedObject`]: an
//! immutable snapshot with fields in schema order that encoders can render
//! without consulting a schema.

/// Insert/update/delete verbs.
pub mod action;
/// Mutable element and object tree.
pub mod element;
/// Path navigation inside object trees.
pub mod traversal;
/// Immutable, validated snapshot consumed by encoders.
pub mod validated;
/// Scalar field values.
pub mod value;

pub use action::Action;
pub use element::{Element, ObjectData};
pub use traversal::ObjectPath;
pub use validated::{IdAttribute, ValidatedElement, ValidatedObject};
pub use value::Value;

use thiserror::Error;

/// Errors that can occur when working with the tree model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Object not found at path: {path}")]
    ObjectNotFound { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Invalid action '{0}': expected insert, update or delete")]
    InvalidAction(String),

    #[error("Conversion error in {context}: {message}")]
    Conversion { context: String, message: String },
}

impl Error {
    /// Build an object-not-found error with path context.
    pub fn object_not_found(path: impl Into<String>) -> Self {
        Self::ObjectNotFound { path: path.into() }
    }

    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a conversion error with conversion context.
    pub fn conversion(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Crate-local result type for tree operations.
pub type Result<T> = std::result::Result<T, Error>;
