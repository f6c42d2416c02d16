use crate::books::domain::BookService;
use crate::books::domain::model::BookEntity;
use crate::books::domain::service::BookServiceImpl;
use crate::books::repository::{BOOKS_TABLE, BookRepository, ISBN_ATTR};
use crate::books::repository::ddb_book_repository::DDBBookRepository;
use crate::core::cache::{CacheAside, create_cache};
use crate::core::domain::Configuration;
use crate::core::repository::memory_repository::MemoryRepository;
use crate::core::repository::RepositoryStore;
use crate::utils::ddb::{build_db_client, prepare_local_tables};

const BOOKS_CACHE: &str = "books";

pub async fn create_book_repository(store: RepositoryStore) -> Box<dyn BookRepository> {
    match store {
        RepositoryStore::DynamoDB => {
            let client = build_db_client(store).await;
            Box::new(DDBBookRepository::new(client, BOOKS_TABLE))
        }
        RepositoryStore::LocalDynamoDB => {
            let client = build_db_client(store).await;
            prepare_local_tables(&client, BOOKS_TABLE, ISBN_ATTR).await;
            Box::new(DDBBookRepository::new(client, BOOKS_TABLE))
        }
        RepositoryStore::Memory => {
            Box::new(MemoryRepository::<BookEntity>::new(BOOKS_TABLE))
        }
    }
}

pub async fn create_book_service(config: &Configuration, store: RepositoryStore) -> Box<dyn BookService> {
    let book_repo = create_book_repository(store).await;
    let cache = CacheAside::new(create_cache(config, BOOKS_CACHE));
    Box::new(BookServiceImpl::new(config, book_repo, cache))
}
