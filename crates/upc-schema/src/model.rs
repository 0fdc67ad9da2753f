//! Schema model definitions

use serde::{Deserialize, Serialize};
use upc_ir::{Action, Value};

/// Semantic type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Boolean,
    Integer,
    Decimal,
    Date,
}

/// Where a field or relation is available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldScope {
    /// Always available
    #[default]
    Always,
    /// Only on a root object
    Standalone,
    /// Only inside a parent object
    Embedded,
    /// Only while inserting (or while the action is still unknown)
    Insert,
}

impl FieldScope {
    /// Whether this scope is available in the given context
    #[must_use]
    pub fn applies(self, context: &SchemaContext) -> bool {
        match self {
            FieldScope::Always => true,
            FieldScope::Standalone => context.parent.is_none(),
            FieldScope::Embedded => context.parent.is_some(),
            FieldScope::Insert => context.action.is_none_or(|a| a == Action::Insert),
        }
    }
}

/// Default value of a field
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Fixed(Value),
    /// The date on which validation runs
    CurrentDate,
}

/// Context a schema is resolved in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaContext {
    /// Type of the object this one is embedded in
    pub parent: Option<String>,
    /// Action in effect for the element
    pub action: Option<Action>,
}

impl SchemaContext {
    /// Context for a root object
    #[must_use]
    pub fn root(action: Option<Action>) -> Self {
        Self {
            parent: None,
            action,
        }
    }

    /// Context for an object embedded in `parent`
    #[must_use]
    pub fn embedded(parent: impl Into<String>, action: Option<Action>) -> Self {
        Self {
            parent: Some(parent.into()),
            action,
        }
    }

    #[must_use]
    pub fn is_embedded(&self) -> bool {
        self.parent.is_some()
    }
}

/// Definition of one field of an object type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub tag: String,
    pub alias: Option<String>,
    pub field_type: FieldType,
    pub required: bool,
    pub default: Option<DefaultValue>,
    /// Apply the default even when the record is not provably new
    pub always_default: bool,
    pub scope: FieldScope,
    pub codes: Option<Vec<String>>,
    pub max_length: Option<usize>,
}

impl FieldDefinition {
    /// Create an optional field without default
    pub fn new(tag: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            tag: tag.into(),
            alias: None,
            field_type,
            required: false,
            default: None,
            always_default: false,
            scope: FieldScope::Always,
            codes: None,
            max_length: None,
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Fixed default, injected on provable inserts
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Fixed(value.into()));
        self
    }

    /// Default to the validation date, injected on provable inserts
    #[must_use]
    pub fn default_today(mut self) -> Self {
        self.default = Some(DefaultValue::CurrentDate);
        self
    }

    /// Inject the default whatever the action
    #[must_use]
    pub fn always_default(mut self) -> Self {
        self.always_default = true;
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: FieldScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codes = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Whether `name` is this field's tag or alias
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.tag == name || self.alias.as_deref() == Some(name)
    }

    /// Tag plus alias for messages, e.g. `'PbAd' (is_po_box)`
    #[must_use]
    pub fn label(&self) -> String {
        match &self.alias {
            Some(alias) => format!("'{}' ({alias})", self.tag),
            None => format!("'{}'", self.tag),
        }
    }
}

/// A child object type an element may embed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRelation {
    pub object_type: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub scope: FieldScope,
    /// Allow the child even if it equals this type or the parent's type
    #[serde(default)]
    pub recursive: bool,
}

impl ObjectRelation {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            alias: None,
            scope: FieldScope::Always,
            recursive: false,
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: FieldScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.object_type == name || self.alias.as_deref() == Some(name)
    }
}

/// The element-identifying attribute of a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
}

/// A unique identifier the remote system can match records on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierMatch {
    pub field: String,
    pub value: i64,
}

/// Resolution of the matching-method pseudo-field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingRule {
    /// Matching-method field tag
    pub field: String,
    /// Record code used for "match on primary key"
    pub primary_key: String,
    pub primary_key_value: i64,
    pub always_insert_value: i64,
    /// Checked in order; the first one present wins
    #[serde(default)]
    pub identifiers: Vec<IdentifierMatch>,
    /// On insert with the primary key present, match on it instead of
    /// always inserting
    #[serde(default)]
    pub primary_key_on_insert: bool,
}

/// Defaulting of the auto-number pseudo-field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoNumberRule {
    pub field: String,
    /// Field whose absence means the remote system must assign a number
    pub identifier: String,
}

/// Defaulting of the "postal address is address" flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddressRule {
    pub field: String,
    pub address: String,
    pub postal: String,
}

/// Named, type-specific field derivations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derivation {
    /// Uppercased copy of a name field, on insert
    SearchName { source: String, target: String },
    /// Initials from first names, on insert
    Initials { source: String, target: String },
    /// Split "Street 12a" into street, number and extension
    SplitStreet {
        street: String,
        number: String,
        extension: String,
    },
}

/// Definition of one object type
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    pub object_type: String,
    pub alias: Option<String>,
    pub id_field: Option<IdField>,
    pub fields: Vec<FieldDefinition>,
    pub relations: Vec<ObjectRelation>,
    pub matching: Option<MatchingRule>,
    pub auto_number: Option<AutoNumberRule>,
    pub postal_address: Option<PostalAddressRule>,
    pub derivations: Vec<Derivation>,
}

impl ObjectSchema {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            alias: None,
            id_field: None,
            fields: Vec::new(),
            relations: Vec::new(),
            matching: None,
            auto_number: None,
            postal_address: None,
            derivations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn with_id_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.id_field = Some(IdField {
            name: name.into(),
            field_type,
        });
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_relation(mut self, relation: ObjectRelation) -> Self {
        self.relations.push(relation);
        self
    }

    #[must_use]
    pub fn with_matching(mut self, rule: MatchingRule) -> Self {
        self.matching = Some(rule);
        self
    }

    #[must_use]
    pub fn with_auto_number(mut self, rule: AutoNumberRule) -> Self {
        self.auto_number = Some(rule);
        self
    }

    #[must_use]
    pub fn with_postal_address(mut self, rule: PostalAddressRule) -> Self {
        self.postal_address = Some(rule);
        self
    }

    #[must_use]
    pub fn with_derivation(mut self, derivation: Derivation) -> Self {
        self.derivations.push(derivation);
        self
    }

    /// Find a field by tag or alias
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields
            .iter()
            .find(|f| f.tag == name)
            .or_else(|| self.fields.iter().find(|f| f.answers_to(name)))
    }

    /// Find a relation by child type or alias
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&ObjectRelation> {
        self.relations
            .iter()
            .find(|r| r.object_type == name)
            .or_else(|| self.relations.iter().find(|r| r.answers_to(name)))
    }

    /// Narrow the schema to what is available in `context`.
    ///
    /// Drops fields and relations outside their scope, and child relations
    /// that would embed this type in itself or in its own parent type.
    #[must_use]
    pub fn resolve(&self, context: &SchemaContext) -> ObjectSchema {
        let mut resolved = self.clone();
        resolved.fields.retain(|f| f.scope.applies(context));
        resolved.relations.retain(|r| {
            if !r.scope.applies(context) {
                return false;
            }
            if r.recursive {
                return true;
            }
            r.object_type != self.object_type
                && context.parent.as_deref() != Some(r.object_type.as_str())
        });
        resolved
    }
}
