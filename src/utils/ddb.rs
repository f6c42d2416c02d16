use std::collections::HashMap;
use std::env;
use std::time::Duration;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::config::{Credentials, Region};
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::{AttributeDefinition, AttributeValue, Delete, KeySchemaElement, KeyType, ProvisionedThroughput, Put, ReturnValue, ScalarAttributeType, TableStatus, TransactWriteItem};
use serde_json::Value;
use tracing::debug;
use crate::core::library::{LibraryError, LibraryResult};
use crate::core::repository::RepositoryStore;

pub(crate) const SEQUENCES_TABLE: &str = "sequences";
const UNIQUE_KEY: &str = "value";
const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:8000";

pub(crate) type Item = HashMap<String, AttributeValue>;

// Unique attribute of an entity table together with the table holding one guard item per claimed value.
#[derive(Debug, Clone)]
pub(crate) struct UniqueKey {
    pub(crate) attr: String,
    pub(crate) table_name: String,
}

impl UniqueKey {
    pub(crate) fn new(table_name: &str, attr: &str) -> Self {
        Self {
            attr: attr.to_string(),
            table_name: unique_keys_table(table_name, attr),
        }
    }

    fn guard_key(&self, value: &str) -> Item {
        HashMap::from([(UNIQUE_KEY.to_string(), AttributeValue::S(value.to_string()))])
    }
}

pub(crate) fn unique_keys_table(table_name: &str, unique_attr: &str) -> String {
    format!("{}_{}_keys", table_name, unique_attr)
}

pub(crate) async fn create_table(client: &Client,
                                 table_name: &str, pk: &str, pk_type: ScalarAttributeType) -> LibraryResult<()> {
    let request = client
        .create_table()
        .table_name(table_name)
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(pk)
                .key_type(KeyType::Hash)
                .build(),
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(pk)
                .attribute_type(pk_type)
                .build(),
        )
        .provisioned_throughput(
            ProvisionedThroughput::builder()
                .read_capacity_units(10)
                .write_capacity_units(10)
                .build(),
        );

    match request.send().await {
        Ok(_k) => {
            wait_until_table_status_is_not(client, table_name, TableStatus::Creating).await;
            Ok(())
        }
        Err(err) => {
            Err(LibraryError::database_or_unavailable(format!("failed to create {} table due to {}",
                                                              table_name, err).as_str(), None, false))
        }
    }
}

pub async fn delete_table(client: &Client, table_name: &str) -> LibraryResult<()> {
    match client.delete_table().table_name(table_name).send().await {
        Ok(_k) => {
            wait_until_table_status_is_not(client, table_name, TableStatus::Deleting).await;
            Ok(())
        }
        Err(err) => {
            Err(LibraryError::database_or_unavailable(format!("failed to delete {} table due to {}",
                                                              table_name, err).as_str(), None, false))
        }
    }
}

async fn wait_until_table_status_is_not(client: &Client, table_name: &str, other_status: TableStatus) {
    for _i in 0..30 {
        if let Ok(status) = describe_table(client, table_name).await {
            if status != other_status {
                return;
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

async fn describe_table(client: &Client, table_name: &str) -> LibraryResult<TableStatus> {
    match client
        .describe_table()
        .table_name(table_name)
        .send()
        .await
    {
        Ok(out) => {
            if let Some(table) = out.table() {
                if let Some(status) = table.table_status() {
                    return Ok(status.clone());
                }
            }
            Err(LibraryError::runtime(format!("failed to describe {} table",
                                              table_name).as_str(), None))
        }
        Err(err) => {
            Err(LibraryError::database_or_unavailable(format!("failed to describe {} table due to {}",
                                                              table_name, err).as_str(), None, false))
        }
    }
}

// Atomically increments the named counter and returns its new value, starting at 1.
pub(crate) async fn next_sequence(client: &Client, table_name: &str, name: &str) -> LibraryResult<i64> {
    let out = client
        .update_item()
        .table_name(table_name)
        .key("name", AttributeValue::S(name.to_string()))
        .update_expression("ADD #value :one")
        .expression_attribute_names("#value", "value")
        .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
        .return_values(ReturnValue::UpdatedNew)
        .send()
        .await?;
    out.attributes()
        .and_then(|map| parse_opt_number_attribute("value", map))
        .ok_or_else(|| LibraryError::runtime(format!("sequence {} returned no value", name).as_str(), None))
}

// Reads every item of the table, following pagination until the scan is exhausted.
pub(crate) async fn scan_all(client: &Client, table_name: &str) -> LibraryResult<Vec<Item>> {
    let mut items = vec![];
    let mut exclusive_start_key: Option<Item> = None;
    loop {
        let out = client
            .scan()
            .table_name(table_name)
            .consistent_read(true)
            .set_exclusive_start_key(exclusive_start_key.take())
            .send()
            .await?;
        items.extend(out.items().unwrap_or_default().iter().cloned());
        match out.last_evaluated_key() {
            Some(key) if !key.is_empty() => exclusive_start_key = Some(key.clone()),
            _ => break,
        }
    }
    debug!(table = table_name, size = items.len(), "ddb scan_all");
    Ok(items)
}

// Strongly consistent lookup of the guard item claiming `value`.
pub(crate) async fn exists_unique_key(client: &Client, unique: &UniqueKey, value: &str) -> LibraryResult<bool> {
    let out = client
        .get_item()
        .table_name(unique.table_name.as_str())
        .set_key(Some(unique.guard_key(value)))
        .consistent_read(true)
        .send()
        .await?;
    Ok(out.item().is_some())
}

// Writes the entity item and, when its unique value changes, claims the new value and releases
// the previous one in a single transaction. A value already claimed fails with DuplicateKey.
pub(crate) async fn put_with_unique_key(client: &Client, table_name: &str, item: Item,
                                        unique: &UniqueKey, value: &str,
                                        previous: Option<&str>) -> LibraryResult<()> {
    let mut writes = vec![
        TransactWriteItem::builder()
            .put(Put::builder().table_name(table_name).set_item(Some(item)).build())
            .build(),
    ];
    if previous != Some(value) {
        writes.push(TransactWriteItem::builder()
            .put(Put::builder()
                .table_name(unique.table_name.as_str())
                .set_item(Some(unique.guard_key(value)))
                .condition_expression("attribute_not_exists(#value)")
                .expression_attribute_names("#value", UNIQUE_KEY)
                .build())
            .build());
        if let Some(old) = previous {
            writes.push(release_guard(unique, old));
        }
    }
    transact(client, unique, value, writes).await
}

// Deletes the entity item and releases its unique value in a single transaction.
pub(crate) async fn delete_with_unique_key(client: &Client, table_name: &str, key: Item,
                                           unique: &UniqueKey, value: &str) -> LibraryResult<()> {
    let writes = vec![
        TransactWriteItem::builder()
            .delete(Delete::builder().table_name(table_name).set_key(Some(key)).build())
            .build(),
        release_guard(unique, value),
    ];
    transact(client, unique, value, writes).await
}

fn release_guard(unique: &UniqueKey, value: &str) -> TransactWriteItem {
    TransactWriteItem::builder()
        .delete(Delete::builder()
            .table_name(unique.table_name.as_str())
            .set_key(Some(unique.guard_key(value)))
            .build())
        .build()
}

async fn transact(client: &Client, unique: &UniqueKey, value: &str, writes: Vec<TransactWriteItem>) -> LibraryResult<()> {
    client
        .transact_write_items()
        .set_transact_items(Some(writes))
        .send()
        .await
        .map(|_| ())
        .map_err(|err| {
            if is_condition_failure(&err) {
                LibraryError::duplicate_key(format!("{} {} already exists.", unique.attr, value).as_str())
            } else {
                LibraryError::from(err)
            }
        })
}

fn is_condition_failure(err: &SdkError<TransactWriteItemsError>) -> bool {
    let service_err = match err {
        SdkError::ServiceError(ctx) => Some(ctx.err()),
        _ => None,
    };
    match service_err {
        Some(TransactWriteItemsError::TransactionCanceledException(ex)) => {
            ex.cancellation_reasons().unwrap_or_default().iter()
                .any(|reason| reason.code() == Some("ConditionalCheckFailed"))
        }
        _ => false,
    }
}

pub(crate) fn parse_item(value: Value) -> Result<Item, String> {
    match value_to_item(value) {
        AttributeValue::M(map) => Ok(map),
        other => Err(format!("failed to parse{:?}", other)),
    }
}

pub(crate) fn parse_string_attribute(name: &str, map: &Item) -> Option<String> {
    if let Some(AttributeValue::S(str)) = map.get(name) {
        return Some(str.clone());
    }
    None
}

pub(crate) fn parse_opt_number_attribute(name: &str, map: &Item) -> Option<i64> {
    if let Some(AttributeValue::N(str)) = map.get(name) {
        return str.parse::<i64>().ok();
    }
    None
}

pub(crate) fn required_string_attribute(name: &str, map: &Item) -> LibraryResult<String> {
    parse_string_attribute(name, map).ok_or_else(|| missing_attribute(name))
}

pub(crate) fn required_number_attribute(name: &str, map: &Item) -> LibraryResult<i64> {
    parse_opt_number_attribute(name, map).ok_or_else(|| missing_attribute(name))
}

fn missing_attribute(name: &str) -> LibraryError {
    LibraryError::serialization(format!("missing or malformed attribute {}", name).as_str())
}

fn value_to_item(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(a) => AttributeValue::L(a.into_iter().map(value_to_item).collect()),
        Value::Object(o) => {
            AttributeValue::M(o.into_iter().map(|(k, v)| (k, value_to_item(v))).collect())
        }
    }
}

// helper method to build db-client
pub(crate) async fn build_db_client(store: RepositoryStore) -> Client {
    match store {
        RepositoryStore::LocalDynamoDB => {
            // See https://docs.aws.amazon.com/sdk-for-rust/latest/dg/dynamodb-local.html
            let endpoint = env::var("DYNAMODB_ENDPOINT").unwrap_or_else(|_| DEFAULT_LOCAL_ENDPOINT.to_string());
            let dynamodb_local_config = aws_sdk_dynamodb::Config::builder()
                .region(Region::new("local"))
                .credentials_provider(
                    Credentials::new("AKIDLOCALSTACK", "localstacksecret", None, None, "faked"))
                .endpoint_url(endpoint)
                .build();
            Client::from_conf(dynamodb_local_config)
        }
        _ => {
            //Get config from environment.
            let config = aws_config::load_from_env().await;
            //Create the DynamoDB client.
            Client::new(&config)
        }
    }
}

// Creates the entity table, its unique keys table and the shared sequences table when running
// against DynamoDB local.
pub(crate) async fn prepare_local_tables(client: &Client, table_name: &str, unique_attr: &str) {
    let _ = create_table(client, SEQUENCES_TABLE, "name", ScalarAttributeType::S).await;
    let _ = create_table(client, table_name, "id", ScalarAttributeType::N).await;
    let _ = create_table(client, unique_keys_table(table_name, unique_attr).as_str(),
                         UNIQUE_KEY, ScalarAttributeType::S).await;
}

impl From<SdkError<UpdateItemError>> for LibraryError {
    fn from(err: SdkError<UpdateItemError>) -> Self {
        let (retryable, reason) = retryable_sdk_error(&err);
        LibraryError::database_or_unavailable(format!("{:?}", err).as_str(), reason, retryable)
    }
}

impl From<SdkError<PutItemError>> for LibraryError {
    fn from(err: SdkError<PutItemError>) -> Self {
        let (retryable, reason) = retryable_sdk_error(&err);
        LibraryError::database_or_unavailable(format!("{:?}", err).as_str(), reason, retryable)
    }
}

impl From<SdkError<GetItemError>> for LibraryError {
    fn from(err: SdkError<GetItemError>) -> Self {
        let (retryable, reason) = retryable_sdk_error(&err);
        LibraryError::database_or_unavailable(format!("{:?}", err).as_str(), reason, retryable)
    }
}

impl From<SdkError<DeleteItemError>> for LibraryError {
    fn from(err: SdkError<DeleteItemError>) -> Self {
        let (retryable, reason) = retryable_sdk_error(&err);
        LibraryError::database_or_unavailable(format!("{:?}", err).as_str(), reason, retryable)
    }
}

impl From<SdkError<QueryError>> for LibraryError {
    fn from(err: SdkError<QueryError>) -> Self {
        let (retryable, reason) = retryable_sdk_error(&err);
        LibraryError::database_or_unavailable(format!("{:?}", err).as_str(), reason, retryable)
    }
}

impl From<SdkError<TransactWriteItemsError>> for LibraryError {
    fn from(err: SdkError<TransactWriteItemsError>) -> Self {
        let (retryable, reason) = retryable_sdk_error(&err);
        LibraryError::database_or_unavailable(format!("{:?}", err).as_str(), reason, retryable)
    }
}

impl From<SdkError<ScanError>> for LibraryError {
    fn from(err: SdkError<ScanError>) -> Self {
        let (retryable, reason) = retryable_sdk_error(&err);
        LibraryError::database_or_unavailable(format!("{:?}", err).as_str(), reason, retryable)
    }
}

fn retryable_sdk_error<T>(err: &SdkError<T>) -> (bool, Option<String>) {
    match err {
        SdkError::ConstructionFailure(_) => { (false, Some("ConstructionFailure".to_string())) }
        SdkError::TimeoutError(_) => { (true, Some("TimeoutError".to_string())) }
        SdkError::DispatchFailure(_) => { (true, Some("DispatchFailure".to_string())) }
        SdkError::ResponseError { .. } => { (true, Some("ResponseError".to_string())) }
        SdkError::ServiceError(ctx) => {
            (ctx.raw().http().status().is_server_error() || has_exceeded_limit(ctx.raw().http().body().bytes()), Some(ctx.raw().http().status().to_string()))
        }
        _ => { (true, Some("Unknown".to_string())) }
    }
}

// throttling responses carry "...LimitExceeded..." / "...ThroughputExceeded..." in the body
fn has_exceeded_limit(opts: Option<&[u8]>) -> bool {
    if let Some(b) = opts {
        return b.windows(6).any(|w| w == b"ceeded".as_slice());
    }
    false
}
