pub mod memory_repository;

use std::env;
use std::fmt;
use std::fmt::{Display, Formatter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::core::library::LibraryResult;

#[async_trait]
pub trait Repository<Entity>: Sync + Send {
    // all entities ordered by id
    async fn find_all(&self) -> LibraryResult<Vec<Entity>>;

    // get an entity if it exists
    async fn find_by_id(&self, id: i64) -> LibraryResult<Option<Entity>>;

    // exact, case-sensitive match on the unique field
    async fn exists_by_unique_key(&self, key: &str) -> LibraryResult<bool>;

    // creates the entity when it has no id yet, otherwise overwrites the stored one
    async fn save(&self, entity: &Entity) -> LibraryResult<Entity>;

    // delete an entity
    async fn delete(&self, entity: &Entity) -> LibraryResult<()>;
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Copy)]
pub enum RepositoryStore {
    DynamoDB,
    LocalDynamoDB,
    Memory,
}

impl RepositoryStore {
    pub fn from_env() -> Self {
        RepositoryStore::from(env::var("LMS_STORE").unwrap_or_default())
    }
}

impl From<String> for RepositoryStore {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamodb" => RepositoryStore::DynamoDB,
            "local" | "localdynamodb" => RepositoryStore::LocalDynamoDB,
            _ => RepositoryStore::Memory,
        }
    }
}

impl Display for RepositoryStore {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            RepositoryStore::DynamoDB => write!(f, "dynamodb"),
            RepositoryStore::LocalDynamoDB => write!(f, "local"),
            RepositoryStore::Memory => write!(f, "memory"),
        }
    }
}
