use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use crate::core::domain::{Identifiable, UniquelyKeyed};
use crate::core::library::LibraryResult;
use crate::core::repository::Repository;

// MemoryRepository keeps entities in a concurrent map keyed by id. Clones share the same
// records and sequence, so a handle can be kept next to the one owned by a service.
#[derive(Clone)]
pub struct MemoryRepository<Entity> {
    name: String,
    records: Arc<DashMap<i64, Entity>>,
    sequence: Arc<AtomicI64>,
}

impl<Entity> MemoryRepository<Entity> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Arc::new(DashMap::new()),
            sequence: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn next_id(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl<Entity> Repository<Entity> for MemoryRepository<Entity>
    where Entity: Identifiable + UniquelyKeyed + Clone + Send + Sync + 'static {
    async fn find_all(&self) -> LibraryResult<Vec<Entity>> {
        let mut records: Vec<Entity> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.id());
        debug!(store = self.name.as_str(), size = records.len(), "memory find_all");
        Ok(records)
    }

    async fn find_by_id(&self, id: i64) -> LibraryResult<Option<Entity>> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn exists_by_unique_key(&self, key: &str) -> LibraryResult<bool> {
        Ok(self.records.iter().any(|r| r.value().unique_key() == key))
    }

    async fn save(&self, entity: &Entity) -> LibraryResult<Entity> {
        let mut saved = entity.clone();
        let id = match entity.id() {
            Some(id) => {
                // keep generated ids ahead of any explicitly assigned one
                self.sequence.fetch_max(id, Ordering::SeqCst);
                id
            }
            None => {
                let id = self.next_id();
                saved.assign_id(id);
                id
            }
        };
        self.records.insert(id, saved.clone());
        debug!(store = self.name.as_str(), id, "memory save");
        Ok(saved)
    }

    async fn delete(&self, entity: &Entity) -> LibraryResult<()> {
        if let Some(id) = entity.id() {
            self.records.remove(&id);
            debug!(store = self.name.as_str(), id, "memory delete");
        }
        Ok(())
    }
}
