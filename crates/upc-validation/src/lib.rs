#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # upc-validation
//!
//! Two-pass validation of update payloads.
//!
//! Input validation runs when a caller supplies data and checks only that
//! data: known keys, no tag/alias collisions and well-formed values. Output
//! validation runs before encoding and works on the whole tree: it resolves
//! actions and the matching method, injects defaults, enforces required
//! fields and produces an immutable [`upc_ir::ValidatedObject`].
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use upc_ir::Action;
//! use upc_schema::SchemaRegistry;
//! use upc_validation::{ValidationEngine, ValidationLevel};
//!
//! let engine = ValidationEngine::new(Arc::new(SchemaRegistry::with_builtins()));
//! let object = engine
//!     .object_from_input(
//!         "person",
//!         None,
//!         Some(Action::Insert),
//!         &json!({"last_name": "Jansen"}),
//!         ValidationLevel::Input,
//!     )
//!     .unwrap();
//!
//! let validated = engine.validate_elements(&object, None, None).unwrap();
//! assert_eq!(validated.elements[0].field("AutoNum"), Some(&upc_ir::Value::Boolean(true)));
//! ```

pub mod derive;
pub mod engine;
pub mod input;
pub mod reporter;
pub mod rules;

pub use engine::{ValidationConfig, ValidationEngine, ValidationLevel};
pub use input::{ACTION_KEY, ID_KEY};
pub use reporter::{ValidationIssue, ValidationReport};
pub use rules::{ValidationMode, coerce_value, validate_field_value};

use thiserror::Error;

/// Errors that can occur during validation
#[derive(Error, Debug)]
pub enum Error {
    /// Supplied data is structurally wrong; one problem per line
    #[error("Invalid input: {0}")]
    Input(String),

    /// Full-tree validation found unresolved problems; one problem per line
    #[error("Output validation failed: {0}")]
    Output(String),

    #[error("Schema error: {0}")]
    Schema(#[from] upc_schema::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
