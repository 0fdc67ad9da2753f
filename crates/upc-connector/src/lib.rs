#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # upc-connector
//!
//! Public API for building update payloads.
//!
//! An [`UpdateFactory`] owns the schema registry and validation settings.
//! Callers create [`UpdateObject`] trees from it, populate them through the
//! input methods and render them with [`UpdateObject::output`]. An
//! [`UpdateConnector`] hands the rendered body to a [`Transport`].
//!
//! ## Example Usage
//!
//! ```rust
//! use serde_json::json;
//! use upc_connector::{OutputFormat, UpdateFactory};
//! use upc_encoding::EncodeOptions;
//! use upc_ir::Action;
//!
//! let factory = UpdateFactory::with_builtins();
//! let mut subject = factory
//!     .create(
//!         "subject",
//!         Some(&json!({"#id": 1957, "type": 1, "description": "x", "date": "2024-06-30"})),
//!         Some(Action::Insert),
//!         None,
//!     )
//!     .unwrap();
//! subject.set_field("done", &json!(true), None, None).unwrap();
//!
//! let xml = subject.output(OutputFormat::Xml, &EncodeOptions::default()).unwrap();
//! assert!(xml.contains(r#"<Element SbId="1957"><Fields Action="insert">"#));
//! ```

pub mod factory;
pub mod transport;
pub mod tree;

pub use factory::{FactoryConfig, OutputConfig, UpdateFactory};
pub use transport::{ConnectorCall, Transport, TransportError, UpdateConnector, Verb};
pub use tree::{ObjectMut, UpdateObject};
pub use upc_encoding::OutputFormat;
pub use upc_validation::{ValidationConfig, ValidationLevel};

use thiserror::Error;

/// Errors surfaced to callers of the connector API
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Output validation failed: {0}")]
    Output(String),

    #[error("Schema error: {0}")]
    Schema(#[from] upc_schema::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] upc_encoding::Error),

    #[error("Transport error during {operation} on '{connector}': {message}")]
    Transport {
        operation: String,
        connector: String,
        message: String,
    },

    #[error("Configuration error for '{path}': {message}")]
    Config { path: String, message: String },
}

impl Error {
    /// Create a transport error with the call it belongs to.
    pub fn transport(
        operation: impl Into<String>,
        connector: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            operation: operation.into(),
            connector: connector.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error for a file or setting.
    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn element_out_of_range(object_type: &str, index: usize, len: usize) -> Self {
        Self::Input(format!(
            "{object_type}[{index}]: element index is out of range ({len} element(s))"
        ))
    }
}

impl From<upc_validation::Error> for Error {
    fn from(e: upc_validation::Error) -> Self {
        match e {
            upc_validation::Error::Input(message) => Error::Input(message),
            upc_validation::Error::Output(message) => Error::Output(message),
            upc_validation::Error::Schema(e) => Error::Schema(e),
        }
    }
}

impl From<upc_ir::Error> for Error {
    fn from(e: upc_ir::Error) -> Self {
        Error::Input(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_keep_their_kind() {
        let input: Error = upc_validation::Error::Input("a\nb".to_string()).into();
        assert!(matches!(input, Error::Input(ref m) if m == "a\nb"));

        let output: Error = upc_validation::Error::Output("x".to_string()).into();
        assert_eq!(output.to_string(), "Output validation failed: x");

        let schema: Error = upc_validation::Error::Schema(upc_schema::Error::UnknownObjectType(
            "KnNothing".to_string(),
        ))
        .into();
        assert!(matches!(schema, Error::Schema(_)));
    }

    #[test]
    fn test_structured_errors() {
        let err = Error::transport("send", "KnPerson", "connection refused");
        assert_eq!(
            err.to_string(),
            "Transport error during send on 'KnPerson': connection refused"
        );
        let err: Error = "insrt".parse::<upc_ir::Action>().unwrap_err().into();
        assert!(err.to_string().starts_with("Invalid input: Invalid action 'insrt'"));
    }
}
