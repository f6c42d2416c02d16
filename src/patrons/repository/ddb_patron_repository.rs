use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use tracing::debug;

use crate::core::domain::Identifiable;
use crate::core::library::{LibraryError, LibraryResult};
use crate::core::repository::Repository;
use crate::patrons::domain::model::PatronEntity;
use crate::patrons::repository::{CONTACT_INFORMATION_ATTR, PatronRepository};
use crate::utils::ddb::{delete_with_unique_key, exists_unique_key, Item, next_sequence, parse_item, put_with_unique_key, required_number_attribute, required_string_attribute, scan_all, SEQUENCES_TABLE, UniqueKey};

#[derive(Debug)]
pub struct DDBPatronRepository {
    client: Client,
    table_name: String,
    contact_key: UniqueKey,
}

impl DDBPatronRepository {
    pub(crate) fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
            contact_key: UniqueKey::new(table_name, CONTACT_INFORMATION_ATTR),
        }
    }
}

#[async_trait]
impl Repository<PatronEntity> for DDBPatronRepository {
    async fn find_all(&self) -> LibraryResult<Vec<PatronEntity>> {
        let items = scan_all(&self.client, self.table_name.as_str()).await?;
        let mut patrons = items.iter().map(map_to_patron).collect::<LibraryResult<Vec<PatronEntity>>>()?;
        patrons.sort_by_key(|p| p.id);
        Ok(patrons)
    }

    async fn find_by_id(&self, id: i64) -> LibraryResult<Option<PatronEntity>> {
        let table_name: &str = self.table_name.as_ref();
        let out = self.client
            .get_item()
            .table_name(table_name)
            .key("id", AttributeValue::N(id.to_string()))
            .consistent_read(true)
            .send()
            .await.map_err(LibraryError::from)?;
        out.item().map(map_to_patron).transpose()
    }

    async fn exists_by_unique_key(&self, key: &str) -> LibraryResult<bool> {
        exists_unique_key(&self.client, &self.contact_key, key).await
    }

    async fn save(&self, entity: &PatronEntity) -> LibraryResult<PatronEntity> {
        let table_name: &str = self.table_name.as_ref();
        let mut saved = entity.clone();
        let previous_contact = match saved.id() {
            Some(id) => self.find_by_id(id).await?.map(|p| p.contact_information),
            None => {
                saved.assign_id(next_sequence(&self.client, SEQUENCES_TABLE, table_name).await?);
                None
            }
        };
        let item = parse_item(serde_json::to_value(&saved)?)?;
        put_with_unique_key(&self.client, table_name, item, &self.contact_key,
                            saved.contact_information.as_str(), previous_contact.as_deref()).await?;
        debug!(table = table_name, id = ?saved.id, "ddb save patron");
        Ok(saved)
    }

    async fn delete(&self, entity: &PatronEntity) -> LibraryResult<()> {
        let table_name: &str = self.table_name.as_ref();
        if let Some(id) = entity.id() {
            let key = Item::from([("id".to_string(), AttributeValue::N(id.to_string()))]);
            delete_with_unique_key(&self.client, table_name, key, &self.contact_key,
                                   entity.contact_information.as_str()).await?;
        }
        Ok(())
    }
}

impl PatronRepository for DDBPatronRepository {}

fn map_to_patron(map: &Item) -> LibraryResult<PatronEntity> {
    Ok(PatronEntity {
        id: Some(required_number_attribute("id", map)?),
        name: required_string_attribute("name", map)?,
        contact_information: required_string_attribute(CONTACT_INFORMATION_ATTR, map)?,
    })
}
