//! Update objects
//!
//! [`UpdateObject`] owns a payload tree. Nested objects are reached through
//! [`ObjectMut`], a handle borrowing the parent's child slot, so changes made
//! through it land directly in the tree and the handle cannot outlive it.

use crate::{Error, Result};
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::debug;
use upc_encoding::{EncodeOptions, OutputFormat, encode};
use upc_ir::{Action, Element, ObjectData, ObjectPath, ValidatedObject};
use upc_schema::SchemaContext;
use upc_validation::{ACTION_KEY, ID_KEY, ValidationEngine, ValidationLevel};

/// Root of an update payload
#[derive(Debug, Clone)]
pub struct UpdateObject {
    engine: Arc<ValidationEngine>,
    data: ObjectData,
}

/// Live handle to an object inside an [`UpdateObject`]
#[derive(Debug)]
pub struct ObjectMut<'a> {
    engine: &'a ValidationEngine,
    data: &'a mut ObjectData,
    parent: Option<String>,
    inherited_action: Option<Action>,
}

impl UpdateObject {
    /// Create a root object, optionally populated from caller data
    ///
    /// `initial_data` is a mapping for one element or a list of mappings for
    /// a batch. A `None` level uses the engine's configured level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] for an unknown type, [`Error::Input`] for
    /// bad data and, at the eager level, [`Error::Output`].
    pub fn create(
        engine: Arc<ValidationEngine>,
        object_type: &str,
        initial_data: Option<&Json>,
        action: Option<Action>,
        level: Option<ValidationLevel>,
    ) -> Result<Self> {
        let level = level.unwrap_or(engine.config().level);
        let data = match initial_data {
            Some(data) => engine.object_from_input(object_type, None, action, data, level)?,
            None => ObjectData::new(engine.registry().canonical_type(object_type)?)
                .with_action(action),
        };
        debug!(
            "Created {} with {} element(s) at level {:?}",
            data.object_type,
            data.len(),
            level
        );

        let mut object = Self { engine, data };
        object.handle().after_input(level)?;
        Ok(object)
    }

    #[must_use]
    pub fn object_type(&self) -> &str {
        &self.data.object_type
    }

    /// Object-level action
    #[must_use]
    pub fn action(&self) -> Option<Action> {
        self.data.action
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The unvalidated tree as supplied
    #[must_use]
    pub fn data(&self) -> &ObjectData {
        &self.data
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<ValidationEngine> {
        &self.engine
    }

    /// Handle onto the root itself
    pub fn handle(&mut self) -> ObjectMut<'_> {
        ObjectMut {
            engine: self.engine.as_ref(),
            data: &mut self.data,
            parent: None,
            inherited_action: None,
        }
    }

    /// See [`ObjectMut::set_field`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for unknown fields and invalid values.
    pub fn set_field(
        &mut self,
        name: &str,
        value: &Json,
        element_index: Option<usize>,
        level: Option<ValidationLevel>,
    ) -> Result<()> {
        self.handle().set_field(name, value, element_index, level)
    }

    /// See [`ObjectMut::set_object`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for objects that cannot be embedded here and
    /// for bad child data.
    pub fn set_object(
        &mut self,
        child_tag: &str,
        elements: &Json,
        action: Option<Action>,
        element_index: Option<usize>,
        level: Option<ValidationLevel>,
    ) -> Result<()> {
        self.handle()
            .set_object(child_tag, elements, action, element_index, level)
    }

    /// See [`ObjectMut::set_action`]; a root object takes no per-element
    /// override
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] when an element index is given.
    pub fn set_action(&mut self, action: Option<Action>, element_index: Option<usize>) -> Result<()> {
        self.handle().set_action(action, element_index)
    }

    /// See [`ObjectMut::add_elements`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] with every problem in the new elements.
    pub fn add_elements(&mut self, elements: &Json, level: Option<ValidationLevel>) -> Result<()> {
        self.handle().add_elements(elements, level)
    }

    /// See [`ObjectMut::get_object`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for unknown child objects and missing elements.
    pub fn get_object(
        &mut self,
        child_tag: &str,
        element_index: Option<usize>,
    ) -> Result<ObjectMut<'_>> {
        self.handle().into_object(child_tag, element_index)
    }

    /// See [`ObjectMut::object_at`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for malformed paths and missing objects.
    pub fn object_at(&mut self, element_index: Option<usize>, path: &str) -> Result<ObjectMut<'_>> {
        self.handle().into_object_at(element_index, path)
    }

    /// Fully validate the tree
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] with every issue in the tree.
    pub fn get_elements(&self) -> Result<ValidatedObject> {
        Ok(self.engine.validate_elements(&self.data, None, None)?)
    }

    /// Validate and encode the tree
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] when validation fails and
    /// [`Error::Encoding`] when the encoder does.
    pub fn output(&self, format: OutputFormat, options: &EncodeOptions) -> Result<String> {
        let validated = self.get_elements()?;
        Ok(encode(&validated, format, options)?)
    }
}

impl<'a> ObjectMut<'a> {
    #[must_use]
    pub fn object_type(&self) -> &str {
        &self.data.object_type
    }

    /// Object-level action
    #[must_use]
    pub fn action(&self) -> Option<Action> {
        self.data.action
    }

    /// Type of the object this one is embedded in
    #[must_use]
    pub fn parent_type(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn data(&self) -> &ObjectData {
        self.data
    }

    /// Set one field, or the `#id` / `#action` pseudo-field, of an element
    ///
    /// Index `None` means the first element; an index equal to the element
    /// count appends a new element. Only the value just set is checked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for unknown fields, invalid values and an
    /// index past the end.
    pub fn set_field(
        &mut self,
        name: &str,
        value: &Json,
        element_index: Option<usize>,
        level: Option<ValidationLevel>,
    ) -> Result<()> {
        let level = self.level(level);
        let index = element_index.unwrap_or(0);
        self.check_index(index)?;
        let context = self.context(index);

        match name {
            ID_KEY => {
                let id = self
                    .engine
                    .id_from_input(&self.data.object_type, &context, value, level)?;
                self.element_for_write(index)?.id = Some(id).filter(|v| !v.is_null());
            }
            ACTION_KEY => {
                let action = match value {
                    Json::Null => None,
                    Json::String(s) => Some(s.parse::<Action>()?),
                    _ => {
                        return Err(Error::Input(format!(
                            "{}[{index}]: '{ACTION_KEY}' must be a string",
                            self.data.object_type
                        )));
                    }
                };
                self.ensure_embedded(action, index)?;
                self.element_for_write(index)?.action = action;
            }
            _ => {
                let (tag, value) = self.engine.field_from_input(
                    &self.data.object_type,
                    &context,
                    name,
                    value,
                    level,
                )?;
                self.element_for_write(index)?.set_field(tag, value);
            }
        }

        self.after_input(level)
    }

    /// Put child elements into a child-object slot of an element
    ///
    /// `child_tag` is the child's type or alias. The slot's previous
    /// content is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for objects that cannot be embedded here and
    /// for bad child data.
    pub fn set_object(
        &mut self,
        child_tag: &str,
        elements: &Json,
        action: Option<Action>,
        element_index: Option<usize>,
        level: Option<ValidationLevel>,
    ) -> Result<()> {
        let level = self.level(level);
        let index = element_index.unwrap_or(0);
        self.check_index(index)?;
        let context = self.context(index);
        let child_type = self.child_type(child_tag, &context)?;

        let children = self.engine.elements_from_input(
            &child_type,
            Some(self.data.object_type.as_str()),
            action.or(context.action),
            elements,
            level,
        )?;
        self.element_for_write(index)?.set_object(
            ObjectData::new(child_type)
                .with_action(action)
                .with_elements(children),
        );

        self.after_input(level)
    }

    /// Set the object-level action, or one element's override
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for an override on a root object or an
    /// element that does not exist.
    pub fn set_action(&mut self, action: Option<Action>, element_index: Option<usize>) -> Result<()> {
        let Some(index) = element_index else {
            self.data.action = action;
            return Ok(());
        };

        self.ensure_embedded(action, index)?;
        let len = self.data.len();
        if index >= len {
            return Err(Error::element_out_of_range(&self.data.object_type, index, len));
        }
        self.element_for_write(index)?.action = action;
        Ok(())
    }

    /// Append elements from a mapping or a list of mappings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] with every problem in the new elements.
    pub fn add_elements(&mut self, elements: &Json, level: Option<ValidationLevel>) -> Result<()> {
        let level = self.level(level);
        let action = self.data.action.or(self.inherited_action);
        let added = self.engine.elements_from_input(
            &self.data.object_type,
            self.parent.as_deref(),
            action,
            elements,
            level,
        )?;
        debug!("Adding {} element(s) to {}", added.len(), self.data.object_type);
        self.data.elements.extend(added);

        self.after_input(level)
    }

    /// Handle onto a child-object slot of an element
    ///
    /// The slot is created empty when nothing was set yet, so actions can be
    /// set before data arrives. Empty slots are left out of the output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for unknown child objects and missing elements.
    pub fn get_object(
        &mut self,
        child_tag: &str,
        element_index: Option<usize>,
    ) -> Result<ObjectMut<'_>> {
        self.reborrow().into_object(child_tag, element_index)
    }

    /// Handle onto a nested object named by a path such as
    /// `KnContact[1]/KnPerson`, starting from element `element_index`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for malformed paths and missing objects.
    pub fn object_at(&mut self, element_index: Option<usize>, path: &str) -> Result<ObjectMut<'_>> {
        self.reborrow().into_object_at(element_index, path)
    }

    /// Fully validate this object as it sits in the tree
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] with every issue below this object.
    pub fn get_elements(&self) -> Result<ValidatedObject> {
        Ok(self.engine.validate_elements(
            self.data,
            self.parent.as_deref(),
            self.inherited_action,
        )?)
    }

    /// Validate and encode this object
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] when validation fails and
    /// [`Error::Encoding`] when the encoder does.
    pub fn output(&self, format: OutputFormat, options: &EncodeOptions) -> Result<String> {
        let validated = self.get_elements()?;
        Ok(encode(&validated, format, options)?)
    }

    fn reborrow(&mut self) -> ObjectMut<'_> {
        ObjectMut {
            engine: self.engine,
            data: &mut *self.data,
            parent: self.parent.clone(),
            inherited_action: self.inherited_action,
        }
    }

    fn into_object(self, child_tag: &str, element_index: Option<usize>) -> Result<ObjectMut<'a>> {
        let index = element_index.unwrap_or(0);
        let context = self.context(index);
        let child_type = self.child_type(child_tag, &context)?;

        let ObjectMut { engine, data, .. } = self;
        let parent_type = data.object_type.clone();
        let len = data.len();
        let Some(element) = data.element_mut(index) else {
            return Err(Error::element_out_of_range(&parent_type, index, len));
        };
        let slot = element
            .objects
            .entry(child_type.clone())
            .or_insert_with(|| ObjectData::new(child_type));

        Ok(ObjectMut {
            engine,
            data: slot,
            parent: Some(parent_type),
            inherited_action: context.action,
        })
    }

    fn into_object_at(self, element_index: Option<usize>, path: &str) -> Result<ObjectMut<'a>> {
        let path = ObjectPath::parse(path)?;
        let mut current = self;
        let mut index = element_index;
        for segment in path.segments() {
            current = current.into_object(&segment.object_type, index)?;
            index = Some(segment.index);
        }
        Ok(current)
    }

    fn level(&self, level: Option<ValidationLevel>) -> ValidationLevel {
        level.unwrap_or(self.engine.config().level)
    }

    /// Schema context of one element; an index past the end gets the
    /// object-level action
    fn context(&self, index: usize) -> SchemaContext {
        SchemaContext {
            parent: self.parent.clone(),
            action: self.data.element_action(index).or(self.inherited_action),
        }
    }

    fn child_type(&self, child_tag: &str, context: &SchemaContext) -> Result<String> {
        let object_type = &self.data.object_type;
        let schema = self.engine.registry().schema_for(object_type, context)?;
        if let Some(relation) = schema.relation(child_tag) {
            return Ok(relation.object_type.clone());
        }

        let declared = self
            .engine
            .registry()
            .get(object_type)
            .is_some_and(|full| full.relation(child_tag).is_some());
        Err(Error::Input(if declared {
            format!("object '{child_tag}' cannot be embedded in {object_type} here")
        } else {
            format!("unknown object '{child_tag}' for {object_type}")
        }))
    }

    fn ensure_embedded(&self, action: Option<Action>, index: usize) -> Result<()> {
        match action {
            Some(action) if self.parent.is_none() => Err(Error::Input(format!(
                "{}[{index}]: action override '{action}' is only allowed on embedded elements",
                self.data.object_type
            ))),
            _ => Ok(()),
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.data.len();
        if index > len {
            return Err(Error::element_out_of_range(&self.data.object_type, index, len));
        }
        Ok(())
    }

    /// Element at `index`, appending a fresh one when `index` is the count
    fn element_for_write(&mut self, index: usize) -> Result<&mut Element> {
        self.check_index(index)?;
        let len = self.data.len();
        if index == len {
            self.data.push(Element::new());
        }
        let object_type = self.data.object_type.clone();
        self.data
            .element_mut(index)
            .ok_or_else(|| Error::element_out_of_range(&object_type, index, len))
    }

    fn after_input(&self, level: ValidationLevel) -> Result<()> {
        if level == ValidationLevel::Eager {
            self.get_elements()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use upc_ir::Value;
    use upc_schema::{SchemaRegistry, builtin};
    use upc_validation::ValidationConfig;

    fn engine() -> Arc<ValidationEngine> {
        Arc::new(ValidationEngine::with_config(
            Arc::new(SchemaRegistry::with_builtins()),
            ValidationConfig {
                today: NaiveDate::from_ymd_opt(2024, 6, 30),
                ..Default::default()
            },
        ))
    }

    #[test]
    fn test_create_canonicalizes_type() {
        let object = UpdateObject::create(engine(), "person", None, Some(Action::Insert), None).unwrap();
        assert_eq!(object.object_type(), builtin::PERSON);
        assert!(object.is_empty());
        assert_eq!(object.action(), Some(Action::Insert));

        let err = UpdateObject::create(engine(), "nothing", None, None, None).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_empty_root_is_never_rendered() {
        let object = UpdateObject::create(
            engine(),
            "subject",
            None,
            Some(Action::Insert),
            Some(ValidationLevel::Eager),
        )
        .unwrap();

        let err = object.output(OutputFormat::Json, &EncodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Encoding(upc_encoding::Error::Empty(_))));
        assert_eq!(
            err.to_string(),
            "Encoding error: Nothing to encode: KnSubject has no elements"
        );
    }

    #[test]
    fn test_set_field_appends_at_element_count() {
        let mut object = UpdateObject::create(
            engine(),
            "subject",
            Some(&json!({"type": 1})),
            Some(Action::Insert),
            None,
        )
        .unwrap();

        object.set_field("type", &json!(2), Some(1), None).unwrap();
        object.set_field("#id", &json!(12), Some(1), None).unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object.data().elements[1].field("StId"), Some(&Value::Integer(2)));
        assert_eq!(object.data().elements[1].id, Some(Value::Integer(12)));

        let err = object.set_field("type", &json!(3), Some(5), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: KnSubject[5]: element index is out of range (2 element(s))"
        );
    }

    #[test]
    fn test_failed_set_field_leaves_tree_untouched() {
        let mut object = UpdateObject::create(engine(), "subject", None, Some(Action::Insert), None).unwrap();
        let err = object.set_field("type", &json!("abc"), None, None).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
        assert!(object.is_empty());
    }

    #[test]
    fn test_root_rejects_element_override() {
        let mut object = UpdateObject::create(
            engine(),
            "person",
            Some(&json!({"last_name": "Jansen"})),
            Some(Action::Update),
            None,
        )
        .unwrap();

        let err = object.set_action(Some(Action::Insert), Some(0)).unwrap_err();
        assert!(err.to_string().contains("only allowed on embedded elements"));
        let err = object
            .set_field("#action", &json!("insert"), None, None)
            .unwrap_err();
        assert!(err.to_string().contains("only allowed on embedded elements"));

        object.set_action(Some(Action::Insert), None).unwrap();
        assert_eq!(object.action(), Some(Action::Insert));
    }

    #[test]
    fn test_get_object_is_a_live_handle() {
        let mut org = UpdateObject::create(
            engine(),
            "organisation",
            Some(&json!({"name": "Acme", "contact": {"job_title": "Owner"}})),
            Some(Action::Update),
            None,
        )
        .unwrap();

        {
            let mut contact = org.get_object("contact", None).unwrap();
            assert_eq!(contact.parent_type(), Some(builtin::ORGANISATION));
            contact.set_action(Some(Action::Insert), Some(0)).unwrap();
        }

        let element = org.data().element(0).unwrap();
        assert_eq!(
            element.object(builtin::CONTACT).unwrap().elements[0].action,
            Some(Action::Insert)
        );
    }

    #[test]
    fn test_get_object_unknown_and_unembeddable() {
        let mut person = UpdateObject::create(
            engine(),
            "person",
            Some(&json!({"last_name": "Jansen"})),
            Some(Action::Insert),
            None,
        )
        .unwrap();

        let err = person.get_object("sales_order", None).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: unknown object 'sales_order' for KnPerson");
        let err = person.get_object("contact", Some(3)).unwrap_err();
        assert!(err.to_string().contains("KnPerson[3]"));
    }

    #[test]
    fn test_object_at_walks_nested_slots() {
        let mut org = UpdateObject::create(
            engine(),
            "organisation",
            Some(&json!({
                "name": "Acme",
                "contact": [
                    {"job_title": "Owner"},
                    {"job_title": "Buyer", "person": {"last_name": "Jansen"}}
                ]
            })),
            Some(Action::Update),
            None,
        )
        .unwrap();

        let person = org.object_at(None, "KnContact[1]/person").unwrap();
        assert_eq!(person.object_type(), builtin::PERSON);
        assert_eq!(person.parent_type(), Some(builtin::CONTACT));
        assert_eq!(person.len(), 1);

        let err = org.object_at(None, "KnContact[]").unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn test_eager_level_runs_output_validation() {
        let err = UpdateObject::create(
            engine(),
            "subject",
            Some(&json!({"description": "no type"})),
            Some(Action::Insert),
            Some(ValidationLevel::Eager),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Output validation failed: KnSubject[0]: 'StId' (type): a value is required"
        );

        let mut ok = UpdateObject::create(
            engine(),
            "subject",
            Some(&json!({"type": 1})),
            Some(Action::Insert),
            Some(ValidationLevel::Eager),
        )
        .unwrap();
        assert!(ok.set_field("description", &json!("x"), None, Some(ValidationLevel::Eager)).is_ok());
    }

    #[test]
    fn test_add_elements_extends_batch() {
        let mut subject = UpdateObject::create(
            engine(),
            "subject",
            Some(&json!({"#id": 1, "type": 1})),
            Some(Action::Insert),
            None,
        )
        .unwrap();
        subject
            .add_elements(&json!([{"#id": 2, "type": 2}, {"#id": 3, "type": 3}]), None)
            .unwrap();
        assert_eq!(subject.len(), 3);

        let err = subject.add_elements(&json!({"colour": "red"}), None).unwrap_err();
        assert!(err.to_string().contains("unknown field 'colour' for KnSubject"));
        assert_eq!(subject.len(), 3);
    }
}
