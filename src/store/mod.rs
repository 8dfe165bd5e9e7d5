//! Document store used to publish articles.
//!
//! Documents are JSON objects. Stores assign a 20-character alphanumeric `id`
//! and maintain `createdAt` / `updatedAt` as RFC 3339 UTC strings.
//!
//! # Queries
//!
//! A [`Query`] filters on top-level fields, optionally orders by a field
//! (documents lacking it sort first), resumes after a cursor document and
//! limits the result. Without an explicit order, documents come back ordered
//! by id.

pub mod json;
pub mod memory;

use crate::error::StoreError;
use chrono::{SecondsFormat, Utc};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde_json::{Map, Value};
use std::cmp::Ordering;

pub type Document = Map<String, Value>;

pub const ID_LEN: usize = 20;

/// CRUD and query access to one collection.
///
/// Implementations own the `id`, `createdAt` and `updatedAt` fields; values
/// for them in caller data are overwritten.
pub trait DocumentStore {
    /// Store `data` under a new id.
    ///
    /// # Arguments
    ///
    /// * `data` - A JSON object with the document fields
    ///
    /// # Returns
    ///
    /// The generated 20-character id, or [`StoreError::InvalidDocument`] when
    /// `data` is not an object.
    async fn create(&self, data: Value) -> Result<String, StoreError>;

    /// Store `data` under `id`, replacing any existing document.
    async fn create_with_id(&self, id: &str, data: Value) -> Result<(), StoreError>;

    /// Fetch one document.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no document has this id.
    async fn get_by_id(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// Every document in the collection, ordered by id.
    async fn get_all(&self) -> Result<Vec<Document>, StoreError>;

    /// Merge the fields of `data` into an existing document.
    ///
    /// # Arguments
    ///
    /// * `id` - Id of the document to change
    /// * `data` - A JSON object whose top-level fields replace the stored ones
    ///
    /// # Returns
    ///
    /// [`StoreError::NotFound`] when the document does not exist. The `id` is
    /// never changed and `updatedAt` is refreshed.
    async fn update(&self, id: &str, data: Value) -> Result<(), StoreError>;

    /// Remove a document. Removing a missing document is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Run a filtered, ordered and paginated query.
    ///
    /// # Arguments
    ///
    /// * `query` - Conditions, optional order, cursor and limit
    ///
    /// # Returns
    ///
    /// The matching documents. A cursor id that is not in the result set
    /// yields an empty page.
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    ArrayContains,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: &str, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return self.op == Operator::Ne;
        };
        match self.op {
            Operator::Eq => actual == &self.value,
            Operator::Ne => actual != &self.value,
            Operator::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            Operator::Le => matches!(
                compare(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            Operator::Ge => matches!(
                compare(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::ArrayContains => actual
                .as_array()
                .is_some_and(|items| items.contains(&self.value)),
            Operator::In => self
                .value
                .as_array()
                .is_some_and(|options| options.contains(actual)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub conditions: Vec<Condition>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
    /// Id of the document to resume after.
    pub start_after: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, op: Operator, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::new(field, op, value));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, id: &str) -> Self {
        self.start_after = Some(id.to_string());
        self
    }

    /// Filter, order, page and limit `docs`.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs
            .into_iter()
            .filter(|doc| self.conditions.iter().all(|c| c.matches(doc)))
            .collect();

        matched.sort_by(|a, b| doc_id(a).cmp(doc_id(b)));
        if let Some((field, direction)) = &self.order_by {
            matched.sort_by(|a, b| {
                let ord = match (a.get(field), b.get(field)) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                };
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        let start = match &self.start_after {
            Some(cursor) => matched
                .iter()
                .position(|doc| doc_id(doc) == cursor)
                .map_or(matched.len(), |pos| pos + 1),
            None => 0,
        };

        matched
            .into_iter()
            .skip(start)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

pub(crate) fn doc_id(doc: &Document) -> &str {
    doc.get("id").and_then(Value::as_str).unwrap_or_default()
}

/// Order two JSON scalars of the same kind.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

pub fn new_id() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Turn `data` into a new document carrying `id` and fresh timestamps.
pub(crate) fn new_document(id: &str, data: Value) -> Result<Document, StoreError> {
    let Value::Object(mut doc) = data else {
        return Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got {data}"
        )));
    };
    let now = timestamp();
    doc.insert("id".to_string(), Value::String(id.to_string()));
    doc.insert("createdAt".to_string(), Value::String(now.clone()));
    doc.insert("updatedAt".to_string(), Value::String(now));
    Ok(doc)
}

/// Merge `data` into `doc`, keeping its id and refreshing `updatedAt`.
pub(crate) fn merge_update(doc: &mut Document, data: Value) -> Result<(), StoreError> {
    let Value::Object(fields) = data else {
        return Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got {data}"
        )));
    };
    for (key, value) in fields {
        if key != "id" {
            doc.insert(key, value);
        }
    }
    doc.insert("updatedAt".to_string(), Value::String(timestamp()));
    Ok(())
}
