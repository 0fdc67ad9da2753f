//! Transport boundary
//!
//! Delivering a payload is somebody else's job: a [`Transport`] takes an
//! opaque call and returns the response body. [`UpdateConnector`] only
//! renders the body in the transport's format and picks the verb.

use crate::tree::UpdateObject;
use crate::{Error, Result};
use std::fmt;
use tracing::{debug, warn};
use upc_encoding::{EncodeOptions, OutputFormat};
use upc_ir::Action;

/// Operation requested from the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// REST insert
    Post,
    /// REST update
    Put,
    /// REST delete
    Delete,
    /// SOAP update connector call; the action travels inside the XML
    Execute,
}

impl Verb {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Execute => "EXECUTE",
        }
    }

    /// Verb carrying `action` in `format`
    ///
    /// REST has no verb for "unspecified", so an unset action is sent as an
    /// insert and the payload's matching field decides the rest.
    #[must_use]
    pub fn for_action(format: OutputFormat, action: Option<Action>) -> Self {
        match (format, action) {
            (OutputFormat::Xml, _) => Verb::Execute,
            (OutputFormat::Json, Some(Action::Update)) => Verb::Put,
            (OutputFormat::Json, Some(Action::Delete)) => Verb::Delete,
            (OutputFormat::Json, Some(Action::Insert) | None) => Verb::Post,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request handed to a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorCall {
    pub verb: Verb,
    /// Connector name; for update connectors the root object type
    pub connector: String,
    /// Extra named arguments
    pub arguments: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Failure reported by a transport
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    /// Remote status code, when there was a response
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Something that can deliver a call to the remote API
pub trait Transport {
    /// Payload format the remote end expects
    fn format(&self) -> OutputFormat;

    /// Deliver `call` and return the response body
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when delivery fails or the remote side
    /// rejects the call.
    fn send(&self, call: &ConnectorCall) -> std::result::Result<String, TransportError>;
}

/// Sends update objects through a transport
#[derive(Debug, Clone)]
pub struct UpdateConnector<T> {
    transport: T,
    options: EncodeOptions,
}

impl<T: Transport> UpdateConnector<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            options: EncodeOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The call that [`UpdateConnector::send`] would make
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] when the object does not validate.
    pub fn prepare(&self, object: &UpdateObject) -> Result<ConnectorCall> {
        let format = self.transport.format();
        let body = object.output(format, &self.options)?;
        Ok(ConnectorCall {
            verb: Verb::for_action(format, object.action()),
            connector: object.object_type().to_string(),
            arguments: Vec::new(),
            body: Some(body),
        })
    }

    /// Validate, encode and deliver an object
    ///
    /// Nothing is sent when validation fails. There are no retries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] for invalid objects and
    /// [`Error::Transport`] when delivery fails.
    pub fn send(&self, object: &UpdateObject) -> Result<String> {
        let call = self.prepare(object)?;
        debug!("{} {} ({} bytes)", call.verb, call.connector, call.body.as_ref().map_or(0, String::len));
        self.transport.send(&call).map_err(|e| {
            warn!("{} {} failed: {}", call.verb, call.connector, e);
            Error::transport(call.verb.as_str(), &call.connector, e.message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UpdateFactory;
    use serde_json::json;
    use std::cell::RefCell;

    struct Recorder {
        format: OutputFormat,
        calls: RefCell<Vec<ConnectorCall>>,
        fail: bool,
    }

    impl Recorder {
        fn new(format: OutputFormat) -> Self {
            Self {
                format,
                calls: RefCell::new(Vec::new()),
                fail: false,
            }
        }
    }

    impl Transport for Recorder {
        fn format(&self) -> OutputFormat {
            self.format
        }

        fn send(&self, call: &ConnectorCall) -> std::result::Result<String, TransportError> {
            self.calls.borrow_mut().push(call.clone());
            if self.fail {
                Err(TransportError::new(Some(500), "remote rejected payload"))
            } else {
                Ok("{}".to_string())
            }
        }
    }

    fn subject(action: Action) -> UpdateObject {
        UpdateFactory::with_builtins()
            .create(
                "subject",
                Some(&json!({"#id": 5, "type": 1, "date": "2024-06-30"})),
                Some(action),
                None,
            )
            .unwrap()
    }

    #[test]
    fn test_verbs() {
        assert_eq!(Verb::for_action(OutputFormat::Json, Some(Action::Insert)), Verb::Post);
        assert_eq!(Verb::for_action(OutputFormat::Json, Some(Action::Update)), Verb::Put);
        assert_eq!(Verb::for_action(OutputFormat::Json, Some(Action::Delete)), Verb::Delete);
        assert_eq!(Verb::for_action(OutputFormat::Json, None), Verb::Post);
        assert_eq!(Verb::for_action(OutputFormat::Xml, Some(Action::Delete)), Verb::Execute);
    }

    #[test]
    fn test_transport_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(TransportError::new(Some(503), "unavailable"));
        assert_eq!(err.to_string(), "unavailable");
    }

    #[test]
    fn test_send_uses_transport_format() {
        let connector = UpdateConnector::new(Recorder::new(OutputFormat::Json));
        connector.send(&subject(Action::Update)).unwrap();

        let calls = connector.transport().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].verb, Verb::Put);
        assert_eq!(calls[0].connector, "KnSubject");
        assert!(calls[0].body.as_deref().unwrap().starts_with(r#"{"KnSubject":{"Element":{"@SbId":5"#));
    }

    #[test]
    fn test_nothing_sent_for_invalid_object() {
        let connector = UpdateConnector::new(Recorder::new(OutputFormat::Xml));
        let mut object = subject(Action::Insert);
        object.set_field("type", &json!(null), None, None).unwrap();

        let err = connector.send(&object).unwrap_err();
        assert!(matches!(err, Error::Output(_)));
        assert!(connector.transport().calls.borrow().is_empty());
    }

    #[test]
    fn test_transport_failure() {
        let mut recorder = Recorder::new(OutputFormat::Xml);
        recorder.fail = true;
        let connector = UpdateConnector::new(recorder);

        let err = connector.send(&subject(Action::Insert)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Transport error during EXECUTE on 'KnSubject': remote rejected payload"
        );
    }
}
