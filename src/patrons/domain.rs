pub mod model;
pub mod service;

use async_trait::async_trait;
use crate::core::library::LibraryResult;
use crate::patrons::domain::model::PatronEntity;

#[async_trait]
pub trait PatronService: Sync + Send {
    async fn get_all_patrons(&self) -> LibraryResult<Vec<PatronEntity>>;
    async fn get_patron_by_id(&self, id: i64) -> LibraryResult<PatronEntity>;
    async fn add_patron(&self, patron: &PatronEntity) -> LibraryResult<PatronEntity>;
    async fn update_patron(&self, id: i64, patron: &PatronEntity) -> LibraryResult<PatronEntity>;
    async fn delete_patron(&self, id: i64) -> LibraryResult<()>;
}
