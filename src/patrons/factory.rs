use crate::core::cache::{CacheAside, create_cache};
use crate::core::domain::Configuration;
use crate::core::repository::memory_repository::MemoryRepository;
use crate::core::repository::RepositoryStore;
use crate::patrons::domain::model::PatronEntity;
use crate::patrons::domain::PatronService;
use crate::patrons::domain::service::PatronServiceImpl;
use crate::patrons::repository::{CONTACT_INFORMATION_ATTR, PATRONS_TABLE, PatronRepository};
use crate::patrons::repository::ddb_patron_repository::DDBPatronRepository;
use crate::utils::ddb::{build_db_client, prepare_local_tables};

const PATRONS_CACHE: &str = "patrons";

pub async fn create_patron_repository(store: RepositoryStore) -> Box<dyn PatronRepository> {
    match store {
        RepositoryStore::DynamoDB => {
            let client = build_db_client(store).await;
            Box::new(DDBPatronRepository::new(client, PATRONS_TABLE))
        }
        RepositoryStore::LocalDynamoDB => {
            let client = build_db_client(store).await;
            prepare_local_tables(&client, PATRONS_TABLE, CONTACT_INFORMATION_ATTR).await;
            Box::new(DDBPatronRepository::new(client, PATRONS_TABLE))
        }
        RepositoryStore::Memory => {
            Box::new(MemoryRepository::<PatronEntity>::new(PATRONS_TABLE))
        }
    }
}

pub async fn create_patron_service(config: &Configuration, store: RepositoryStore) -> Box<dyn PatronService> {
    let patron_repo = create_patron_repository(store).await;
    let cache = CacheAside::new(create_cache(config, PATRONS_CACHE));
    Box::new(PatronServiceImpl::new(config, patron_repo, cache))
}
