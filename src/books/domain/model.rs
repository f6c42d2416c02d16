use serde::{Deserialize, Serialize};
use crate::core::domain::{Identifiable, UniquelyKeyed};
use crate::core::library::{LibraryError, LibraryResult};

// BookEntity abstracts a catalogued title; the isbn is unique across all books.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub author: String,
    pub publication_year: i32,
    pub isbn: String,
}

impl BookEntity {
    pub fn new(title: &str, author: &str, publication_year: i32, isbn: &str) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            author: author.to_string(),
            publication_year,
            isbn: isbn.to_string(),
        }
    }

    pub(crate) fn validate(&self) -> LibraryResult<()> {
        if self.isbn.trim().is_empty() {
            return Err(LibraryError::validation("Book isbn must not be blank.", Some("isbn".to_string())));
        }
        Ok(())
    }

    // copies every mutable field, the id stays untouched
    pub(crate) fn overwrite_with(&mut self, other: &BookEntity) {
        self.title = other.title.to_string();
        self.author = other.author.to_string();
        self.publication_year = other.publication_year;
        self.isbn = other.isbn.to_string();
    }
}

impl Identifiable for BookEntity {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl UniquelyKeyed for BookEntity {
    fn unique_key(&self) -> &str {
        self.isbn.as_str()
    }
}
