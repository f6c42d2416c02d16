use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use tracing::debug;

use crate::books::domain::model::BookEntity;
use crate::books::repository::{BookRepository, ISBN_ATTR};
use crate::core::domain::Identifiable;
use crate::core::library::{LibraryError, LibraryResult};
use crate::core::repository::Repository;
use crate::utils::ddb::{delete_with_unique_key, exists_unique_key, Item, next_sequence, parse_item, put_with_unique_key, required_number_attribute, required_string_attribute, scan_all, SEQUENCES_TABLE, UniqueKey};

#[derive(Debug)]
pub struct DDBBookRepository {
    client: Client,
    table_name: String,
    isbn_key: UniqueKey,
}

impl DDBBookRepository {
    pub(crate) fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
            isbn_key: UniqueKey::new(table_name, ISBN_ATTR),
        }
    }
}

#[async_trait]
impl Repository<BookEntity> for DDBBookRepository {
    async fn find_all(&self) -> LibraryResult<Vec<BookEntity>> {
        let items = scan_all(&self.client, self.table_name.as_str()).await?;
        let mut books = items.iter().map(map_to_book).collect::<LibraryResult<Vec<BookEntity>>>()?;
        books.sort_by_key(|b| b.id);
        Ok(books)
    }

    async fn find_by_id(&self, id: i64) -> LibraryResult<Option<BookEntity>> {
        let table_name: &str = self.table_name.as_ref();
        let out = self.client
            .get_item()
            .table_name(table_name)
            .key("id", AttributeValue::N(id.to_string()))
            .consistent_read(true)
            .send()
            .await.map_err(LibraryError::from)?;
        out.item().map(map_to_book).transpose()
    }

    async fn exists_by_unique_key(&self, key: &str) -> LibraryResult<bool> {
        exists_unique_key(&self.client, &self.isbn_key, key).await
    }

    async fn save(&self, entity: &BookEntity) -> LibraryResult<BookEntity> {
        let table_name: &str = self.table_name.as_ref();
        let mut saved = entity.clone();
        let previous_isbn = match saved.id() {
            Some(id) => self.find_by_id(id).await?.map(|b| b.isbn),
            None => {
                saved.assign_id(next_sequence(&self.client, SEQUENCES_TABLE, table_name).await?);
                None
            }
        };
        let item = parse_item(serde_json::to_value(&saved)?)?;
        put_with_unique_key(&self.client, table_name, item, &self.isbn_key,
                            saved.isbn.as_str(), previous_isbn.as_deref()).await?;
        debug!(table = table_name, id = ?saved.id, "ddb save book");
        Ok(saved)
    }

    async fn delete(&self, entity: &BookEntity) -> LibraryResult<()> {
        let table_name: &str = self.table_name.as_ref();
        if let Some(id) = entity.id() {
            let key = Item::from([("id".to_string(), AttributeValue::N(id.to_string()))]);
            delete_with_unique_key(&self.client, table_name, key, &self.isbn_key, entity.isbn.as_str()).await?;
        }
        Ok(())
    }
}

impl BookRepository for DDBBookRepository {}

fn map_to_book(map: &Item) -> LibraryResult<BookEntity> {
    Ok(BookEntity {
        id: Some(required_number_attribute("id", map)?),
        title: required_string_attribute("title", map)?,
        author: required_string_attribute("author", map)?,
        publication_year: i32::try_from(required_number_attribute("publication_year", map)?)
            .map_err(|_| LibraryError::serialization("publication_year out of range"))?,
        isbn: required_string_attribute(ISBN_ATTR, map)?,
    })
}
