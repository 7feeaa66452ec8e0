//! Record factory.
//!
//! [`Model::extend`] turns a definition into a constructor handle; every
//! record it creates goes through the same whitelist.

use crate::error::ModelResult;
use crate::record::Record;
use crate::schema::Schema;
use serde_json::Value;
use settee_store::DocumentStore;
use std::fmt;
use std::sync::Arc;

/// A record constructor bound to one schema and one store.
///
/// Cloning is cheap: the schema and the store handle are shared.
#[derive(Clone)]
pub struct Model {
    schema: Arc<Schema>,
    store: Arc<dyn DocumentStore>,
}

impl Model {
    /// Validates `definition` and returns the constructor for it.
    ///
    /// Fails immediately with a configuration error when the definition is
    /// malformed; nothing is sent to the store.
    pub fn extend(store: Arc<dyn DocumentStore>, definition: &Value) -> ModelResult<Self> {
        let schema = Schema::from_definition(definition)?;
        Ok(Self::from_schema(store, schema))
    }

    /// Binds an already validated schema.
    pub fn from_schema(store: Arc<dyn DocumentStore>, schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            store,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn type_tag(&self) -> Option<&str> {
        self.schema.type_tag()
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Builds a record from `initial`.
    ///
    /// Declared fields present in `initial` are copied (an explicit `null`
    /// included); every other declared field starts absent. Undeclared keys
    /// are dropped. Non-empty string `_id`/`_rev` values are kept so stored
    /// documents can be rehydrated.
    pub fn create(&self, initial: &Value) -> Record {
        let mut values = vec![None; self.schema.len()];
        let mut id = None;
        let mut rev = None;

        if let Some(input) = initial.as_object() {
            for (key, value) in input {
                if let Some(index) = self.schema.position(key) {
                    values[index] = Some(value.clone());
                }
            }
            id = non_empty_string(input.get("_id"));
            rev = non_empty_string(input.get("_rev"));
        }

        Record::new(self.clone(), values, id, rev)
    }

    /// A record with every declared field absent.
    pub fn blank(&self) -> Record {
        self.create(&Value::Null)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("schema", &self.schema)
            .field("store", &self.store.backend_name())
            .finish()
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
