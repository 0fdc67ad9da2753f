//! XML encoder
//!
//! ```text
//! <KnSubject xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
//!   <Element SbId="1957">
//!     <Fields Action="insert">
//!       <StId>1</StId>
//!     </Fields>
//!     <Objects>
//!       <KnSubjectLink>
//!         <Element SbId="1957">...</Element>
//!       </KnSubjectLink>
//!     </Objects>
//!   </Element>
//! </KnSubject>
//! ```

use crate::{EncodeOptions, Error, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use tracing::trace;
use upc_ir::{ValidatedElement, ValidatedObject, Value};

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Encode as XML; `xmlns:xsi` is declared on the root tag only
///
/// # Errors
///
/// Returns [`Error::Empty`] for an object without elements and
/// [`Error::Xml`] if the writer fails.
pub fn to_xml(object: &ValidatedObject, options: &EncodeOptions) -> Result<String> {
    crate::ensure_elements(object)?;
    let writer = if options.pretty {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };
    let mut encoder = XmlEncoder { writer };
    encoder.write_object(object, true)?;

    let bytes = encoder.writer.into_inner();
    trace!("Encoded {} as {} bytes of XML", object.object_type, bytes.len());
    String::from_utf8(bytes).map_err(|e| Error::Xml(e.to_string()))
}

struct XmlEncoder {
    writer: Writer<Vec<u8>>,
}

impl XmlEncoder {
    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::Xml(e.to_string()))
    }

    fn write_object(&mut self, object: &ValidatedObject, root: bool) -> Result<()> {
        let mut start = BytesStart::new(object.object_type.as_str());
        if root {
            start.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
        }
        self.write(Event::Start(start))?;
        for element in &object.elements {
            self.write_element(element)?;
        }
        self.write(Event::End(BytesEnd::new(object.object_type.as_str())))
    }

    fn write_element(&mut self, element: &ValidatedElement) -> Result<()> {
        let mut start = BytesStart::new("Element");
        if let Some(id) = &element.id {
            let text = id.value.as_text().unwrap_or_default();
            start.push_attribute((id.name.as_str(), text.as_str()));
        }
        self.write(Event::Start(start))?;

        let mut fields = BytesStart::new("Fields");
        if let Some(action) = element.action {
            fields.push_attribute(("Action", action.as_str()));
        }
        if element.fields.is_empty() {
            self.write(Event::Empty(fields))?;
        } else {
            self.write(Event::Start(fields))?;
            for (tag, value) in &element.fields {
                self.write_field(tag, value)?;
            }
            self.write(Event::End(BytesEnd::new("Fields")))?;
        }

        if !element.objects.is_empty() {
            self.write(Event::Start(BytesStart::new("Objects")))?;
            for child in &element.objects {
                self.write_object(child, false)?;
            }
            self.write(Event::End(BytesEnd::new("Objects")))?;
        }

        self.write(Event::End(BytesEnd::new("Element")))
    }

    fn write_field(&mut self, tag: &str, value: &Value) -> Result<()> {
        match value.as_text() {
            Some(text) => {
                self.write(Event::Start(BytesStart::new(tag)))?;
                self.write(Event::Text(BytesText::new(&text)))?;
                self.write(Event::End(BytesEnd::new(tag)))
            }
            None => {
                let mut nil = BytesStart::new(tag);
                nil.push_attribute(("xsi:nil", "true"));
                self.write(Event::Empty(nil))
            }
        }
    }
}
