use serde::{Deserialize, Serialize};
use crate::core::domain::{Identifiable, UniquelyKeyed};
use crate::core::library::{LibraryError, LibraryResult};

// Patron abstracts library member, reachable through unique contact information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatronEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub contact_information: String,
}

impl PatronEntity {
    pub fn new(name: &str, contact_information: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            contact_information: contact_information.to_string(),
        }
    }

    pub(crate) fn validate(&self) -> LibraryResult<()> {
        if self.contact_information.trim().is_empty() {
            return Err(LibraryError::validation("Patron contact information must not be blank.",
                                                Some("contact_information".to_string())));
        }
        Ok(())
    }

    pub(crate) fn overwrite_with(&mut self, other: &PatronEntity) {
        self.name = other.name.to_string();
        self.contact_information = other.contact_information.to_string();
    }
}

impl Identifiable for PatronEntity {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl UniquelyKeyed for PatronEntity {
    fn unique_key(&self) -> &str {
        self.contact_information.as_str()
    }
}
