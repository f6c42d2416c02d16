pub mod model;
pub mod service;

use async_trait::async_trait;
use crate::books::domain::model::BookEntity;
use crate::core::library::LibraryResult;

#[async_trait]
pub trait BookService: Sync + Send {
    async fn get_all_books(&self) -> LibraryResult<Vec<BookEntity>>;
    async fn get_book_by_id(&self, id: i64) -> LibraryResult<BookEntity>;
    async fn add_book(&self, book: &BookEntity) -> LibraryResult<BookEntity>;
    async fn update_book(&self, id: i64, book: &BookEntity) -> LibraryResult<BookEntity>;
    async fn delete_book(&self, id: i64) -> LibraryResult<()>;
}
