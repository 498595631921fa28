use std::{error, result};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("document not found")]
    NotFound,
    /// A transaction was rolled back by its own action.
    #[error("transaction aborted: {0}")]
    Aborted(String),
    #[error(transparent)]
    Other(Box<dyn error::Error + Send + Sync>),
}

impl DatabaseError {
    pub fn other<E: error::Error + Send + Sync + 'static>(why: E) -> Self {
        Self::Other(Box::new(why))
    }
}

pub type Result<T> = result::Result<T, DatabaseError>;

/// A document of a collection together with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn field(&self, path: &str) -> Option<&Value> {
        lookup(&self.data, path)
    }
}

/// Resolves a dotted field path like `location.geopoint.latitude`.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

/// A predicate on a single document field. Documents lacking the field never
/// match.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Numeric range, both ends inclusive.
    Range { field: String, min: f64, max: f64 },
    Equals { field: String, value: Value },
    /// The field is an array holding `value`.
    ArrayContains { field: String, value: Value },
}

impl Filter {
    pub fn range(field: impl Into<String>, min: f64, max: f64) -> Self {
        Self::Range {
            field: field.into(),
            min,
            max,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayContains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::Range { field, min, max } => lookup(document, field)
                .and_then(Value::as_f64)
                .is_some_and(|number| *min <= number && number <= *max),
            Filter::Equals { field, value } => {
                lookup(document, field).is_some_and(|found| found == value)
            }
            Filter::ArrayContains { field, value } => lookup(document, field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

/// Handle to the document database.
///
/// Handles are cheap to clone; all clones talk to the same store.
#[async_trait]
pub trait DocumentStore: Clone + Send + Sync + Sized + 'static {
    /// All documents of `collection` matching every filter.
    async fn get(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>>;

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Document>;

    /// Atomically replaces the document `id` with the value returned by
    /// `action`, which receives the current value if the document exists.
    /// An error returned by `action` aborts the transaction and leaves the
    /// document untouched.
    async fn run_transaction<F>(
        &self,
        collection: &str,
        id: &str,
        action: F,
    ) -> Result<Value>
    where
        F: FnOnce(Option<Value>) -> Result<Value> + Send;
}
