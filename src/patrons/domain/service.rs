use async_trait::async_trait;
use tracing::{info, warn};
use crate::core::cache::{ALL_KEY, CacheAside};
use crate::core::domain::Configuration;
use crate::core::library::{LibraryError, LibraryResult};
use crate::patrons::domain::model::PatronEntity;
use crate::patrons::domain::PatronService;
use crate::patrons::repository::PatronRepository;

pub struct PatronServiceImpl {
    config: Configuration,
    patron_repository: Box<dyn PatronRepository>,
    cache: CacheAside,
}

impl PatronServiceImpl {
    pub fn new(config: &Configuration, patron_repository: Box<dyn PatronRepository>, cache: CacheAside) -> Self {
        PatronServiceImpl {
            config: config.clone(),
            patron_repository,
            cache,
        }
    }

    async fn find_existing(&self, id: i64) -> LibraryResult<PatronEntity> {
        self.patron_repository.find_by_id(id).await?
            .ok_or_else(|| LibraryError::not_found(format!("Patron not found with id: {}", id).as_str()))
    }

    async fn ensure_contact_available(&self, contact_information: &str) -> LibraryResult<()> {
        if self.patron_repository.exists_by_contact_information(contact_information).await? {
            warn!(contact_information, "rejected duplicate contact information");
            return Err(LibraryError::duplicate_key(
                format!("Patron with contact information {} already exists.", contact_information).as_str()));
        }
        Ok(())
    }

    async fn evict_collection(&self) {
        if self.config.evict_collection_on_write {
            self.cache.evict_collection().await;
        }
    }
}

#[async_trait]
impl PatronService for PatronServiceImpl {
    async fn get_all_patrons(&self) -> LibraryResult<Vec<PatronEntity>> {
        self.cache.get_or_compute(ALL_KEY, || self.patron_repository.find_all()).await
    }

    async fn get_patron_by_id(&self, id: i64) -> LibraryResult<PatronEntity> {
        let key = id.to_string();
        self.cache.get_or_compute(key.as_str(), || self.find_existing(id)).await
    }

    async fn add_patron(&self, patron: &PatronEntity) -> LibraryResult<PatronEntity> {
        patron.validate()?;
        self.ensure_contact_available(patron.contact_information.as_str()).await?;

        let mut new_patron = patron.clone();
        new_patron.id = None;
        let saved = self.patron_repository.save(&new_patron).await?;
        self.evict_collection().await;
        info!(id = ?saved.id, "added patron");
        Ok(saved)
    }

    async fn update_patron(&self, id: i64, patron: &PatronEntity) -> LibraryResult<PatronEntity> {
        let mut existing = self.find_existing(id).await?;
        patron.validate()?;
        if existing.contact_information != patron.contact_information {
            self.ensure_contact_available(patron.contact_information.as_str()).await?;
        }

        existing.overwrite_with(patron);
        let saved = self.patron_repository.save(&existing).await?;
        self.cache.put(id.to_string().as_str(), &saved).await;
        self.evict_collection().await;
        info!(id, "updated patron");
        Ok(saved)
    }

    async fn delete_patron(&self, id: i64) -> LibraryResult<()> {
        let existing = self.find_existing(id).await?;
        self.patron_repository.delete(&existing).await?;
        self.cache.evict(id.to_string().as_str()).await;
        self.evict_collection().await;
        info!(id, "deleted patron");
        Ok(())
    }
}
