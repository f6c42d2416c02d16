pub mod ddb_book_repository;

use async_trait::async_trait;
use crate::books::domain::model::BookEntity;
use crate::core::library::LibraryResult;
use crate::core::repository::memory_repository::MemoryRepository;
use crate::core::repository::Repository;

pub(crate) const BOOKS_TABLE: &str = "books";
pub(crate) const ISBN_ATTR: &str = "isbn";

#[async_trait]
pub trait BookRepository: Repository<BookEntity> {
    async fn exists_by_isbn(&self, isbn: &str) -> LibraryResult<bool> {
        self.exists_by_unique_key(isbn).await
    }
}

impl BookRepository for MemoryRepository<BookEntity> {}
