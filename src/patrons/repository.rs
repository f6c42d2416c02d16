pub mod ddb_patron_repository;

use async_trait::async_trait;
use crate::core::library::LibraryResult;
use crate::core::repository::memory_repository::MemoryRepository;
use crate::core::repository::Repository;
use crate::patrons::domain::model::PatronEntity;

pub(crate) const PATRONS_TABLE: &str = "patrons";
pub(crate) const CONTACT_INFORMATION_ATTR: &str = "contact_information";

#[async_trait]
pub trait PatronRepository: Repository<PatronEntity> {
    async fn exists_by_contact_information(&self, contact_information: &str) -> LibraryResult<bool> {
        self.exists_by_unique_key(contact_information).await
    }
}

impl PatronRepository for MemoryRepository<PatronEntity> {}
