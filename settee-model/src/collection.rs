//! Collection factory: read paths derived from a schema.
//!
//! Every field declared with `view: true` gets a finder named
//! `findBy<Field>` (first letter capitalized). The finder queries the store
//! view of the same name inside the design document named after the schema's
//! type tag.

use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::record::Record;
use serde_json::{Map, Value, json};
use settee_store::{DocumentStore, ViewQuery, ViewRow};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Prefix of every generated finder.
pub const FINDER_PREFIX: &str = "findBy";

/// The finder name for `field`: `content` → `findByContent`.
pub fn finder_name(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => format!("{FINDER_PREFIX}{}{}", first.to_uppercase(), chars.as_str()),
        None => FINDER_PREFIX.to_string(),
    }
}

/// A generated single-field view lookup.
#[derive(Clone)]
pub struct ViewFinder {
    name: String,
    field: String,
    design: String,
    store: Arc<dyn DocumentStore>,
}

impl ViewFinder {
    /// The finder (and view) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field the view is keyed on.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The design document holding the view.
    pub fn design(&self) -> &str {
        &self.design
    }

    /// Runs the view and returns its rows in store order; no match is an
    /// empty vector, never an error.
    pub async fn call(&self, query: &ViewQuery) -> ModelResult<Vec<ViewRow>> {
        debug!("{}/{} {:?}", self.design, self.name, query);
        let response = self.store.view(&self.design, &self.name, query).await?;
        Ok(response.rows)
    }
}

impl fmt::Debug for ViewFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewFinder")
            .field("name", &self.name)
            .field("field", &self.field)
            .field("design", &self.design)
            .finish()
    }
}

/// Retrieval operations for one schema: `get` by id and the generated finders.
#[derive(Clone)]
pub struct Collection {
    model: Model,
    type_tag: String,
    finders: BTreeMap<String, ViewFinder>,
}

impl Collection {
    /// Validates `definition` and builds the collection for it.
    pub fn extend(store: Arc<dyn DocumentStore>, definition: &Value) -> ModelResult<Self> {
        Self::for_model(&Model::extend(store, definition)?)
    }

    /// Builds the collection sharing `model`'s schema and store.
    ///
    /// The schema needs a type tag: it names the design document.
    pub fn for_model(model: &Model) -> ModelResult<Self> {
        let type_tag = model
            .type_tag()
            .ok_or_else(|| ModelError::config("a collection needs a schema with a `type`"))?
            .to_string();

        let mut finders = BTreeMap::new();
        for field in model.schema().queryable_fields() {
            let name = finder_name(field);
            if finders.contains_key(&name) {
                return Err(ModelError::config(format!(
                    "fields map to the same finder `{name}`"
                )));
            }
            let finder = ViewFinder {
                name: name.clone(),
                field: field.to_string(),
                design: type_tag.clone(),
                store: Arc::clone(model.store()),
            };
            finders.insert(name, finder);
        }

        Ok(Self {
            model: model.clone(),
            type_tag,
            finders,
        })
    }

    /// The record constructor this collection hydrates results with.
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Looks up a generated finder by name.
    pub fn finder(&self, name: &str) -> Option<&ViewFinder> {
        self.finders.get(name)
    }

    pub fn has_finder(&self, name: &str) -> bool {
        self.finders.contains_key(name)
    }

    /// Names of all generated finders, sorted.
    pub fn finder_names(&self) -> impl Iterator<Item = &str> {
        self.finders.keys().map(String::as_str)
    }

    /// Runs the finder `name`.
    pub async fn find_by(&self, name: &str, query: &ViewQuery) -> ModelResult<Vec<ViewRow>> {
        let finder = self
            .finder(name)
            .ok_or_else(|| ModelError::config(format!("no finder named `{name}`")))?;
        finder.call(query).await
    }

    /// Runs the finder `name` for rows whose key equals `key`.
    pub async fn find_by_key(&self, name: &str, key: impl Into<Value>) -> ModelResult<Vec<ViewRow>> {
        self.find_by(name, &ViewQuery::new().key(key)).await
    }

    /// Fetches a document by id and wraps it in a record.
    ///
    /// A missing or empty id is a configuration error raised before any
    /// store call. Store failures (`missing`, `deleted`) pass through.
    pub async fn get(&self, id: Option<&str>) -> ModelResult<Record> {
        let id = match id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(ModelError::config("id must be a non-empty string")),
        };

        let raw = self.model.store().get(id).await?;
        Ok(self.model.create(&raw))
    }

    /// Builds records from view rows, preferring the included `doc` and
    /// falling back to the emitted value. Rows carrying neither as an object
    /// are skipped.
    pub fn hydrate(&self, rows: &[ViewRow]) -> Vec<Record> {
        rows.iter()
            .filter_map(|row| {
                row.doc
                    .as_ref()
                    .filter(|doc| doc.is_object())
                    .or_else(|| Some(&row.value).filter(|value| value.is_object()))
            })
            .map(|doc| self.model.create(doc))
            .collect()
    }

    /// `(view name, field)` for every finder, for registering the same views
    /// on another store.
    pub fn view_definitions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.finders.values().map(|f| (f.name(), f.field()))
    }

    /// The CouchDB design document backing the finders.
    pub fn design_document(&self) -> Value {
        let tag = Value::String(self.type_tag.clone());
        let mut views = Map::new();
        for finder in self.finders.values() {
            let field = Value::String(finder.field.clone());
            let map = format!(
                "function (doc) {{ if (doc.type === {tag} && doc[{field}] !== undefined) {{ emit(doc[{field}], doc); }} }}"
            );
            views.insert(finder.name.clone(), json!({ "map": map }));
        }

        json!({
            "_id": format!("_design/{}", self.type_tag),
            "language": "javascript",
            "views": views,
        })
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("type_tag", &self.type_tag)
            .field("finders", &self.finders.keys().collect::<Vec<_>>())
            .finish()
    }
}
