#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # upc-encoding
//!
//! Renders a [`ValidatedObject`] as XML or JSON.
//!
//! Both encoders walk the snapshot in order and never consult a schema, so
//! the same validated tree always produces the same bytes.

pub mod json;
pub mod xml;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use upc_ir::ValidatedObject;

/// Errors that can occur while encoding
#[derive(Error, Debug)]
pub enum Error {
    #[error("XML encoding error: {0}")]
    Xml(String),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown output format: {0}")]
    UnknownFormat(String),

    #[error("Nothing to encode: {0} has no elements")]
    Empty(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Wire format of an encoded payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// SOAP-style XML
    #[default]
    Xml,
    /// REST-style JSON
    Json,
}

impl OutputFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(OutputFormat::Xml),
            "json" => Ok(OutputFormat::Json),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

/// Encoder options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Indent nested tags and keys
    pub pretty: bool,
}

impl EncodeOptions {
    #[must_use]
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

/// Encode a validated object in the given format
///
/// # Errors
///
/// Returns [`Error::Empty`] for an object without elements and an error if
/// the underlying writer fails.
pub fn encode(
    object: &ValidatedObject,
    format: OutputFormat,
    options: &EncodeOptions,
) -> Result<String> {
    match format {
        OutputFormat::Xml => xml::to_xml(object, options),
        OutputFormat::Json => json::to_json(object, options),
    }
}

/// A root without elements would encode as an empty payload
fn ensure_elements(object: &ValidatedObject) -> Result<()> {
    if object.elements.is_empty() {
        Err(Error::Empty(object.object_type.clone()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upc_ir::ValidatedElement;

    #[test]
    fn test_format_parsing() {
        assert_eq!("XML".parse::<OutputFormat>().unwrap(), OutputFormat::Xml);
        assert_eq!(" json ".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!(matches!(
            "yaml".parse::<OutputFormat>(),
            Err(Error::UnknownFormat(_))
        ));
        assert_eq!(OutputFormat::default().to_string(), "xml");
    }

    #[test]
    fn test_encode_dispatches_on_format() {
        let mut object = ValidatedObject::new("KnSubject");
        object.elements.push(ValidatedElement::default());
        let xml = encode(&object, OutputFormat::Xml, &EncodeOptions::default()).unwrap();
        assert!(xml.starts_with("<KnSubject"));
        let json = encode(&object, OutputFormat::Json, &EncodeOptions::default()).unwrap();
        assert!(json.starts_with("{\"KnSubject\""));
    }

    #[test]
    fn test_empty_root_is_not_encoded() {
        let object = ValidatedObject::new("KnSubject");
        for format in [OutputFormat::Xml, OutputFormat::Json] {
            let err = encode(&object, format, &EncodeOptions::default()).unwrap_err();
            assert_eq!(err.to_string(), "Nothing to encode: KnSubject has no elements");
        }
    }
}
