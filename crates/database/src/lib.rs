use std::{
    collections::{BTreeMap, HashMap},
    env, io,
    path::PathBuf,
    sync::Arc,
};

use async_trait::async_trait;
use directory::database::{DatabaseError, Document, DocumentStore, Filter, Result};
use log::info;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

pub struct DatabaseSeedInfo {
    pub path: PathBuf,
}

impl DatabaseSeedInfo {
    pub fn from_env() -> Option<Self> {
        let path = env::var("DATABASE_SEED_FILE").ok()?;
        Some(Self { path: path.into() })
    }
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse seed file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed seed: {0}")]
    Malformed(String),
}

type Collection = BTreeMap<String, Value>;

/// Document store held in process memory.
///
/// Collections are addressed by their full path, so the special hours of a
/// store live in a collection named like `stores/{id}/specialHours`.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(seed_info: DatabaseSeedInfo) -> core::result::Result<Self, SeedError> {
        let raw = tokio::fs::read_to_string(&seed_info.path).await?;
        let database = Self::new();
        let count = database.seed(serde_json::from_str(&raw)?).await?;
        info!(
            "Loaded {} documents from {}",
            count,
            seed_info.path.display()
        );
        Ok(database)
    }

    /// Inserts every document of a `{ collection: { id: document } }` object.
    /// Returns the number of inserted documents.
    pub async fn seed(&self, seed: Value) -> core::result::Result<usize, SeedError> {
        let Value::Object(collections) = seed else {
            return Err(SeedError::Malformed(
                "expected an object of collections".to_owned(),
            ));
        };

        let mut count = 0;
        let mut guard = self.collections.write().await;
        for (name, documents) in collections {
            let Value::Object(documents) = documents else {
                return Err(SeedError::Malformed(format!(
                    "collection '{}' is not an object of documents",
                    name
                )));
            };
            count += documents.len();
            guard.entry(name).or_default().extend(documents);
        }
        Ok(count)
    }

    pub async fn insert(&self, collection: &str, id: &str, data: Value) {
        self.collections
            .write()
            .await
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), data);
    }
}

#[async_trait]
impl DocumentStore for MemoryDatabase {
    async fn get(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>> {
        let guard = self.collections.read().await;
        let Some(documents) = guard.get(collection) else {
            return Ok(vec![]);
        };

        Ok(documents
            .iter()
            .filter(|(_, data)| filters.iter().all(|filter| filter.matches(data)))
            .map(|(id, data)| Document::new(id.clone(), data.clone()))
            .collect())
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|data| Document::new(id, data.clone()))
            .ok_or(DatabaseError::NotFound)
    }

    async fn run_transaction<F>(
        &self,
        collection: &str,
        id: &str,
        action: F,
    ) -> Result<Value>
    where
        F: FnOnce(Option<Value>) -> Result<Value> + Send,
    {
        let mut guard = self.collections.write().await;
        let current = guard
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned();

        let next = action(current)?;
        guard
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), next.clone());
        Ok(next)
    }
}
