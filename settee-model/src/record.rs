//! Records and their persistence methods.

use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::schema::Schema;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use settee_store::DocumentStore;
use std::fmt;
use tracing::debug;

/// One schema-shaped document.
///
/// Holds exactly the declared fields (each possibly absent) plus the reserved
/// `type`, `_id` and `_rev`.
#[derive(Clone)]
pub struct Record {
    model: Model,
    values: Vec<Option<Value>>,
    id: Option<String>,
    rev: Option<String>,
}

impl Record {
    pub(crate) fn new(
        model: Model,
        values: Vec<Option<Value>>,
        id: Option<String>,
        rev: Option<String>,
    ) -> Self {
        Self {
            model,
            values,
            id,
            rev,
        }
    }

    /// The model that built this record.
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn schema(&self) -> &Schema {
        self.model.schema()
    }

    pub fn type_tag(&self) -> Option<&str> {
        self.model.type_tag()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    /// Overrides the document id, e.g. to choose it before the first save.
    pub fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    /// Overrides the revision token presented on the next save or delete.
    pub fn set_rev(&mut self, rev: Option<String>) {
        self.rev = rev;
    }

    /// The value of a declared field; `None` when undeclared or absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema()
            .position(name)
            .and_then(|index| self.values[index].as_ref())
    }

    /// Whether `name` is a key of this record: a declared field (even an
    /// absent one), `type` when the schema has a tag, or a present `_id`/`_rev`.
    pub fn has_field(&self, name: &str) -> bool {
        match name {
            "type" => self.type_tag().is_some(),
            "_id" => self.id.is_some(),
            "_rev" => self.rev.is_some(),
            _ => self.schema().is_declared(name),
        }
    }

    /// Assigns a declared field.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> ModelResult<()> {
        let index = self.declared(name)?;
        self.values[index] = Some(value.into());
        Ok(())
    }

    /// Makes a declared field absent again.
    pub fn unset(&mut self, name: &str) -> ModelResult<()> {
        let index = self.declared(name)?;
        self.values[index] = None;
        Ok(())
    }

    fn declared(&self, name: &str) -> ModelResult<usize> {
        self.schema().position(name).ok_or_else(|| {
            ModelError::config(format!("`{name}` is not a declared field of this model"))
        })
    }

    /// Declared fields and their values, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.schema()
            .field_names()
            .zip(self.values.iter().map(Option::as_ref))
    }

    /// The document sent to the store: `type`, `_id`, `_rev` when set, then
    /// every declared field that is not absent.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        if let Some(tag) = self.type_tag() {
            doc.insert("type".to_string(), Value::String(tag.to_string()));
        }
        if let Some(id) = &self.id {
            doc.insert("_id".to_string(), Value::String(id.clone()));
        }
        if let Some(rev) = &self.rev {
            doc.insert("_rev".to_string(), Value::String(rev.clone()));
        }
        for (name, value) in self.fields() {
            if let Some(value) = value {
                doc.insert(name.to_string(), value.clone());
            }
        }
        Value::Object(doc)
    }

    /// Writes the record to the store.
    ///
    /// Without an `_id` this creates the document; afterwards it updates it,
    /// presenting the last observed `_rev`. On success `_id` and `_rev` take
    /// the store's values. On failure the record is untouched and the store
    /// error is returned as is (a stale `_rev` yields a conflict).
    pub async fn save(&mut self) -> ModelResult<&mut Self> {
        let doc = self.to_document();
        debug!(
            "saving {:?} record {:?} at rev {:?}",
            self.type_tag(),
            self.id,
            self.rev
        );

        let meta = self.model.store().insert(&doc).await?;
        self.id = Some(meta.id);
        self.rev = Some(meta.rev);
        Ok(self)
    }

    /// Deletes the record's current revision from the store.
    ///
    /// On success `_rev` becomes the tombstone revision. A record that was
    /// never saved has no `_id` and is rejected before reaching the store.
    pub async fn delete(&mut self) -> ModelResult<&mut Self> {
        let Some(id) = self.id.as_deref() else {
            return Err(ModelError::config(
                "cannot delete a record without an _id; save it first",
            ));
        };
        let rev = self.rev.as_deref().unwrap_or_default();
        debug!("deleting {:?} record {} at rev {:?}", self.type_tag(), id, rev);

        let meta = self.model.store().destroy(id, rev).await?;
        self.rev = Some(meta.rev);
        Ok(self)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema() == other.schema()
            && self.values == other.values
            && self.id == other.id
            && self.rev == other.rev
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Record");
        out.field("type", &self.type_tag())
            .field("_id", &self.id)
            .field("_rev", &self.rev);
        for (name, value) in self.fields() {
            out.field(name, &value);
        }
        out.finish()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}
