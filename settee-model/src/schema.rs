//! Schema descriptors: the validated, normalized form of a model definition.
//!
//! Two definition shapes are accepted:
//!
//! ```json
//! { "type": "message", "properties": { "content": { "view": true }, "subject": {} } }
//! { "type": "user", "properties": ["name", "email"] }
//! ```
//!
//! A bare array of field names (`["name", "email"]`) is still accepted as a
//! deprecated alias; it produces a schema without a type tag.

use crate::error::{ModelError, ModelResult};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

/// Keys every record may carry besides its declared fields.
pub const RESERVED_FIELDS: [&str; 3] = ["type", "_id", "_rev"];

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    /// Whether a `findBy<Name>` view lookup is generated for this field.
    pub view: bool,
}

/// A validated schema: type tag plus ordered, duplicate-free field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    type_tag: Option<String>,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Starts a typed schema definition.
    pub fn builder(type_tag: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            type_tag: type_tag.into(),
            fields: Vec::new(),
        }
    }

    /// Validates a JSON model definition.
    pub fn from_definition(definition: &Value) -> ModelResult<Self> {
        match definition {
            Value::Array(names) => {
                warn!("bare field-name arrays are deprecated; use {{\"type\", \"properties\"}}");
                let fields = fields_from_names(names)?;
                Self::new(None, fields)
            }
            Value::Object(options) => {
                let type_tag = match options.get("type") {
                    None => return Err(ModelError::config("schema is missing `type`")),
                    Some(Value::String(tag)) => tag.clone(),
                    Some(other) => {
                        return Err(ModelError::config(format!(
                            "schema `type` must be a string, got {}",
                            kind(other)
                        )));
                    }
                };
                let fields = match options.get("properties") {
                    None => return Err(ModelError::config("schema is missing `properties`")),
                    Some(Value::Array(names)) => fields_from_names(names)?,
                    Some(Value::Object(descriptors)) => fields_from_descriptors(descriptors)?,
                    Some(other) => {
                        return Err(ModelError::config(format!(
                            "schema `properties` must be an array or an object, got {}",
                            kind(other)
                        )));
                    }
                };
                Self::new(Some(type_tag), fields)
            }
            other => Err(ModelError::config(format!(
                "schema definition must be an object, got {}",
                kind(other)
            ))),
        }
    }

    fn new(type_tag: Option<String>, fields: Vec<FieldSpec>) -> ModelResult<Self> {
        if type_tag.as_deref() == Some("") {
            return Err(ModelError::config("schema `type` must not be empty"));
        }
        if fields.is_empty() {
            return Err(ModelError::config("schema must declare at least one field"));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(ModelError::config("field names must not be empty"));
            }
            if RESERVED_FIELDS.contains(&field.name.as_str()) {
                return Err(ModelError::config(format!(
                    "`{}` is reserved and cannot be declared",
                    field.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ModelError::config(format!(
                    "field `{}` is declared twice",
                    field.name
                )));
            }
        }

        Ok(Self { type_tag, fields })
    }

    /// The type tag stamped on every record, if the schema has one.
    pub fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Fields flagged `view: true`, in declaration order.
    pub fn queryable_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.view).map(|f| f.name.as_str())
    }

    /// Index of a declared field.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn is_queryable(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.view && f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<&Value> for Schema {
    type Error = ModelError;

    fn try_from(definition: &Value) -> ModelResult<Self> {
        Schema::from_definition(definition)
    }
}

/// Builder for schemas declared in code.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    type_tag: String,
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    /// Declares a plain field.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            view: false,
        });
        self
    }

    /// Declares a field with a generated view lookup.
    pub fn view(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            view: true,
        });
        self
    }

    pub fn build(self) -> ModelResult<Schema> {
        Schema::new(Some(self.type_tag), self.fields)
    }
}

fn fields_from_names(names: &[Value]) -> ModelResult<Vec<FieldSpec>> {
    names
        .iter()
        .map(|name| match name {
            Value::String(name) => Ok(FieldSpec {
                name: name.clone(),
                view: false,
            }),
            other => Err(ModelError::config(format!(
                "field names must be strings, got {}",
                kind(other)
            ))),
        })
        .collect()
}

fn fields_from_descriptors(descriptors: &Map<String, Value>) -> ModelResult<Vec<FieldSpec>> {
    descriptors
        .iter()
        .map(|(name, descriptor)| match descriptor {
            // Only a literal `true` makes a field queryable
            Value::Object(flags) => Ok(FieldSpec {
                name: name.clone(),
                view: flags.get("view") == Some(&Value::Bool(true)),
            }),
            other => Err(ModelError::config(format!(
                "descriptor for `{name}` must be an object, got {}",
                kind(other)
            ))),
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
