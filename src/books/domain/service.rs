use async_trait::async_trait;
use tracing::{info, warn};
use crate::books::domain::BookService;
use crate::books::domain::model::BookEntity;
use crate::books::repository::BookRepository;
use crate::core::cache::{ALL_KEY, CacheAside};
use crate::core::domain::Configuration;
use crate::core::library::{LibraryError, LibraryResult};

pub struct BookServiceImpl {
    config: Configuration,
    book_repository: Box<dyn BookRepository>,
    cache: CacheAside,
}

impl BookServiceImpl {
    pub fn new(config: &Configuration, book_repository: Box<dyn BookRepository>, cache: CacheAside) -> Self {
        Self {
            config: config.clone(),
            book_repository,
            cache,
        }
    }

    // reads the store directly; mutations never trust a cached copy
    async fn find_existing(&self, id: i64) -> LibraryResult<BookEntity> {
        self.book_repository.find_by_id(id).await?
            .ok_or_else(|| LibraryError::not_found(format!("Book not found with id: {}", id).as_str()))
    }

    async fn ensure_isbn_available(&self, isbn: &str) -> LibraryResult<()> {
        if self.book_repository.exists_by_isbn(isbn).await? {
            warn!(isbn, "rejected duplicate isbn");
            return Err(LibraryError::duplicate_key(format!("Book with ISBN {} already exists.", isbn).as_str()));
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
impl BookService for BookServiceImpl {
    async fn get_all_books(&self) -> LibraryResult<Vec<BookEntity>> {
        self.cache.get_or_compute(ALL_KEY, || self.book_repository.find_all()).await
    }

    async fn get_book_by_id(&self, id: i64) -> LibraryResult<BookEntity> {
        let key = id.to_string();
        self.cache.get_or_compute(key.as_str(), || self.find_existing(id)).await
    }

    async fn add_book(&self, book: &BookEntity) -> LibraryResult<BookEntity> {
        book.validate()?;
        self.ensure_isbn_available(book.isbn.as_str()).await?;

        // the store always assigns the identifier of a new book
        let mut new_book = book.clone();
        new_book.id = None;
        let saved = self.book_repository.save(&new_book).await?;
        self.evict_collection().await;
        info!(id = ?saved.id, isbn = saved.isbn.as_str(), "added book");
        Ok(saved)
    }

    async fn update_book(&self, id: i64, book: &BookEntity) -> LibraryResult<BookEntity> {
        let mut existing = self.find_existing(id).await?;
        book.validate()?;
        if existing.isbn != book.isbn {
            self.ensure_isbn_available(book.isbn.as_str()).await?;
        }

        existing.overwrite_with(book);
        let saved = self.book_repository.save(&existing).await?;
        self.cache.put(id.to_string().as_str(), &saved).await;
        self.evict_collection().await;
        info!(id, "updated book");
        Ok(saved)
    }

    async fn delete_book(&self, id: i64) -> LibraryResult<()> {
        let existing = self.find_existing(id).await?;
        self.book_repository.delete(&existing).await?;
        self.cache.evict(id.to_string().as_str()).await;
        self.evict_collection().await;
        info!(id, "deleted book");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use async_trait::async_trait;
    use tokio::sync::Notify;
    use crate::books::domain::BookService;
    use crate::books::domain::model::BookEntity;
    use crate::books::domain::service::BookServiceImpl;
    use crate::books::repository::BookRepository;
    use crate::core::cache::{CacheAside, create_cache};
    use crate::core::domain::Configuration;
    use crate::core::library::{LibraryError, LibraryResult};
    use crate::core::repository::memory_repository::MemoryRepository;
    use crate::core::repository::Repository;

    // Holds the first find_all after its snapshot is taken until released.
    struct GatedBookRepository {
        inner: MemoryRepository<BookEntity>,
        gated: AtomicBool,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl Repository<BookEntity> for GatedBookRepository {
        async fn find_all(&self) -> LibraryResult<Vec<BookEntity>> {
            let snapshot = self.inner.find_all().await?;
            if self.gated.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(snapshot)
        }

        async fn find_by_id(&self, id: i64) -> LibraryResult<Option<BookEntity>> {
            self.inner.find_by_id(id).await
        }

        async fn exists_by_unique_key(&self, key: &str) -> LibraryResult<bool> {
            self.inner.exists_by_unique_key(key).await
        }

        async fn save(&self, entity: &BookEntity) -> LibraryResult<BookEntity> {
            self.inner.save(entity).await
        }

        async fn delete(&self, entity: &BookEntity) -> LibraryResult<()> {
            self.inner.delete(entity).await
        }
    }

    impl BookRepository for GatedBookRepository {}

    fn build_service(config: &Configuration) -> (BookServiceImpl, MemoryRepository<BookEntity>) {
        let repo = MemoryRepository::<BookEntity>::new("books");
        let svc = BookServiceImpl::new(config, Box::new(repo.clone()),
                                       CacheAside::new(create_cache(config, "books")));
        (svc, repo)
    }

    #[tokio::test]
    async fn test_should_run_book_lifecycle() {
        let (svc, _repo) = build_service(&Configuration::new("test"));

        let added = svc.add_book(&BookEntity::new("A", "author", 2000, "111")).await.expect("should add book");
        assert_eq!(Some(1), added.id);

        let res = svc.add_book(&BookEntity::new("B", "author", 2000, "111")).await;
        assert!(matches!(res, Err(LibraryError::DuplicateKey { .. })));

        let _ = svc.update_book(1, &BookEntity::new("A", "author", 2000, "222")).await.expect("should update book");
        let loaded = svc.get_book_by_id(1).await.expect("should get book");
        assert_eq!("222", loaded.isbn.as_str());

        svc.delete_book(1).await.expect("should delete book");
        let res = svc.get_book_by_id(1).await;
        assert!(matches!(res, Err(LibraryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_should_get_added_book() {
        let (svc, _repo) = build_service(&Configuration::new("test"));
        let added = svc.add_book(&BookEntity::new("Dune", "Herbert", 1965, "isbn-dune")).await.expect("should add book");
        let loaded = svc.get_book_by_id(added.id.unwrap()).await.expect("should get book");
        assert_eq!(added, loaded);
    }

    #[tokio::test]
    async fn test_should_ignore_supplied_id_on_add() {
        let (svc, repo) = build_service(&Configuration::new("test"));
        let mut book = BookEntity::new("Dune", "Herbert", 1965, "isbn-dune");
        book.id = Some(42);
        let added = svc.add_book(&book).await.expect("should add book");
        assert_eq!(Some(1), added.id);
        assert_eq!(None, repo.find_by_id(42).await.expect("should find"));
    }

    #[tokio::test]
    async fn test_should_leave_store_unchanged_on_duplicate_add() {
        let (svc, repo) = build_service(&Configuration::new("test"));
        let first = svc.add_book(&BookEntity::new("A", "author", 2000, "111")).await.expect("should add book");

        let res = svc.add_book(&BookEntity::new("B", "other", 2010, "111")).await;
        assert!(matches!(res, Err(LibraryError::DuplicateKey { .. })));
        assert_eq!(1, repo.len());
        let stored = repo.find_by_id(first.id.unwrap()).await.expect("should find").expect("should exist");
        assert_eq!(first, stored);
    }

    #[tokio::test]
    async fn test_should_reject_blank_isbn() {
        let (svc, repo) = build_service(&Configuration::new("test"));
        let res = svc.add_book(&BookEntity::new("A", "author", 2000, "")).await;
        assert!(matches!(res, Err(LibraryError::Validation { .. })));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_should_update_with_own_isbn() {
        let (svc, _repo) = build_service(&Configuration::new("test"));
        let added = svc.add_book(&BookEntity::new("A", "author", 2000, "111")).await.expect("should add book");

        let updated = svc.update_book(added.id.unwrap(), &BookEntity::new("A2", "author2", 2001, "111"))
            .await.expect("should update book");
        assert_eq!(added.id, updated.id);
        assert_eq!("A2", updated.title.as_str());
        assert_eq!("author2", updated.author.as_str());
        assert_eq!(2001, updated.publication_year);
    }

    #[tokio::test]
    async fn test_should_reject_update_to_other_isbn() {
        let (svc, repo) = build_service(&Configuration::new("test"));
        let first = svc.add_book(&BookEntity::new("A", "author", 2000, "111")).await.expect("should add book");
        let _ = svc.add_book(&BookEntity::new("B", "author", 2000, "222")).await.expect("should add book");

        let res = svc.update_book(first.id.unwrap(), &BookEntity::new("A", "author", 2000, "222")).await;
        assert!(matches!(res, Err(LibraryError::DuplicateKey { .. })));
        let stored = repo.find_by_id(first.id.unwrap()).await.expect("should find").expect("should exist");
        assert_eq!("111", stored.isbn.as_str());
    }

    #[tokio::test]
    async fn test_should_fail_update_of_missing_book() {
        let (svc, repo) = build_service(&Configuration::new("test"));
        let res = svc.update_book(5, &BookEntity::new("A", "author", 2000, "111")).await;
        assert!(matches!(res, Err(LibraryError::NotFound { .. })));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_should_fail_delete_of_missing_book() {
        let (svc, repo) = build_service(&Configuration::new("test"));
        let _ = svc.add_book(&BookEntity::new("A", "author", 2000, "111")).await.expect("should add book");

        let res = svc.delete_book(99).await;
        assert!(matches!(res, Err(LibraryError::NotFound { .. })));
        assert_eq!(1, repo.len());
    }

    #[tokio::test]
    async fn test_should_serve_book_from_cache() {
        let (svc, repo) = build_service(&Configuration::new("test"));
        let added = svc.add_book(&BookEntity::new("A", "author", 2000, "111")).await.expect("should add book");
        let _ = svc.get_book_by_id(added.id.unwrap()).await.expect("should get book");

        // change the store behind the service's back
        let mut changed = added.clone();
        changed.title = "changed".to_string();
        let _ = repo.save(&changed).await.expect("should save book");

        let cached = svc.get_book_by_id(added.id.unwrap()).await.expect("should get book");
        assert_eq!("A", cached.title.as_str());
    }

    #[tokio::test]
    async fn test_should_refresh_cached_book_on_update() {
        let (svc, repo) = build_service(&Configuration::new("test"));
        let added = svc.add_book(&BookEntity::new("A", "author", 2000, "111")).await.expect("should add book");
        let _ = svc.get_book_by_id(added.id.unwrap()).await.expect("should get book");

        let _ = svc.update_book(added.id.unwrap(), &BookEntity::new("B", "other", 2011, "333")).await.expect("should update book");
        let loaded = svc.get_book_by_id(added.id.unwrap()).await.expect("should get book");
        let stored = repo.find_by_id(added.id.unwrap()).await.expect("should find").expect("should exist");
        assert_eq!(stored, loaded);
        assert_eq!("B", loaded.title.as_str());
        assert_eq!("333", loaded.isbn.as_str());
    }

    #[tokio::test]
    async fn test_should_evict_collection_on_write() {
        let (svc, _repo) = build_service(&Configuration::new("test"));
        let first = svc.add_book(&BookEntity::new("A", "author", 2000, "111")).await.expect("should add book");
        assert_eq!(1, svc.get_all_books().await.expect("should list books").len());

        let second = svc.add_book(&BookEntity::new("B", "author", 2000, "222")).await.expect("should add book");
        assert_eq!(vec![first.clone(), second.clone()], svc.get_all_books().await.expect("should list books"));

        svc.delete_book(first.id.unwrap()).await.expect("should delete book");
        assert_eq!(vec![second], svc.get_all_books().await.expect("should list books"));
    }

    #[tokio::test]
    async fn test_should_keep_stale_collection_when_eviction_disabled() {
        let mut config = Configuration::new("test");
        config.evict_collection_on_write = false;
        let (svc, repo) = build_service(&config);
        let _ = svc.add_book(&BookEntity::new("A", "author", 2000, "111")).await.expect("should add book");
        assert_eq!(1, svc.get_all_books().await.expect("should list books").len());

        let _ = svc.add_book(&BookEntity::new("B", "author", 2000, "222")).await.expect("should add book");
        assert_eq!(1, svc.get_all_books().await.expect("should list books").len());
        assert_eq!(2, repo.len());
    }

    #[tokio::test]
    async fn test_should_read_store_when_cache_disabled() {
        let mut config = Configuration::new("test");
        config.cache_enabled = false;
        let (svc, repo) = build_service(&config);
        let added = svc.add_book(&BookEntity::new("A", "author", 2000, "111")).await.expect("should add book");
        let _ = svc.get_book_by_id(added.id.unwrap()).await.expect("should get book");

        let mut changed = added.clone();
        changed.title = "changed".to_string();
        let _ = repo.save(&changed).await.expect("should save book");

        let loaded = svc.get_book_by_id(added.id.unwrap()).await.expect("should get book");
        assert_eq!("changed", loaded.title.as_str());
    }

    #[tokio::test]
    async fn test_should_list_book_added_during_slow_collection_read() {
        let config = Configuration::new("test");
        let repo = MemoryRepository::<BookEntity>::new("books");
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let gated = GatedBookRepository {
            inner: repo.clone(),
            gated: AtomicBool::new(true),
            entered: entered.clone(),
            release: release.clone(),
        };
        let svc = BookServiceImpl::new(&config, Box::new(gated), CacheAside::new(create_cache(&config, "books")));

        let (snapshot, _) = tokio::join!(
            svc.get_all_books(),
            async {
                entered.notified().await;
                let _ = svc.add_book(&BookEntity::new("A", "author", 2000, "111")).await.expect("should add book");
                release.notify_one();
            });
        assert!(snapshot.expect("should list books").is_empty());

        let all = svc.get_all_books().await.expect("should list books");
        assert_eq!(1, repo.len());
        assert_eq!(1, all.len());
        assert_eq!("111", all[0].isbn.as_str());
    }
}
