//! DynamoDB scan source.
//!
//! Implements [`PageSource`] over the DynamoDB `Scan` API. Each call returns
//! at most `page_size` items plus the `LastEvaluatedKey`, which becomes the
//! `ExclusiveStartKey` of the next call.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Number, Value};

use crate::core::{Page, PageSource, SourceRecord};
use crate::error::{MigrateError, Result};

/// DynamoDB item as returned by the SDK.
pub type Item = HashMap<String, AttributeValue>;

/// Build a DynamoDB client from shared SDK config, honouring an endpoint
/// override (LocalStack, DynamoDB Local).
pub fn dynamo_client(sdk_config: &aws_config::SdkConfig, endpoint: Option<&str>) -> Client {
    let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);
    if let Some(endpoint) = endpoint {
        builder = builder.endpoint_url(endpoint);
    }
    Client::from_conf(builder.build())
}

/// Full-table scan of one DynamoDB table.
#[derive(Clone)]
pub struct DynamoScanSource {
    client: Client,
    table_name: String,
    page_size: Option<i32>,
}

impl std::fmt::Debug for DynamoScanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoScanSource")
            .field("table_name", &self.table_name)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl DynamoScanSource {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            page_size: None,
        }
    }

    /// Limit the number of items evaluated per scan call.
    pub fn with_page_size(mut self, page_size: Option<i32>) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl PageSource for DynamoScanSource {
    type Cursor = Item;

    fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn fetch_page(&self, cursor: Option<Item>) -> Result<Page<Item>> {
        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_exclusive_start_key(cursor)
            .set_limit(self.page_size)
            .send()
            .await
            .map_err(|e| {
                MigrateError::source_fetch(&self.table_name, DisplayErrorContext(&e).to_string())
            })?;

        let records = output
            .items
            .unwrap_or_default()
            .iter()
            .map(item_to_record)
            .collect();
        let next = output.last_evaluated_key.filter(|key| !key.is_empty());

        Ok(Page { records, next })
    }
}

/// Unmarshall a DynamoDB item into a source record.
pub fn item_to_record(item: &Item) -> SourceRecord {
    SourceRecord::new(item_to_map(item))
}

fn item_to_map(item: &Item) -> Map<String, Value> {
    item.iter()
        .map(|(k, v)| (k.clone(), attribute_to_json(v)))
        .collect()
}

/// Convert one attribute to JSON, following the document client's mapping.
///
/// Binary values are base64 encoded; sets become arrays.
pub fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number_to_json(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::M(m) => Value::Object(item_to_map(m)),
        AttributeValue::L(l) => Value::Array(l.iter().map(attribute_to_json).collect()),
        AttributeValue::Ss(ss) => Value::Array(ss.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(ns) => Value::Array(ns.iter().map(|n| number_to_json(n)).collect()),
        AttributeValue::B(b) => Value::String(STANDARD.encode(b.as_ref())),
        AttributeValue::Bs(bs) => Value::Array(
            bs.iter()
                .map(|b| Value::String(STANDARD.encode(b.as_ref())))
                .collect(),
        ),
        _ => Value::Null,
    }
}

// Integers stay integers so epoch-millisecond timestamps validate as such.
fn number_to_json(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::from(i);
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(n.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::primitives::Blob;
    use serde_json::json;

    #[test]
    fn test_item_to_record_scalars() {
        let mut item = Item::new();
        item.insert("id".into(), AttributeValue::S("a1".into()));
        item.insert("updatedAt".into(), AttributeValue::N("1600000000123".into()));
        item.insert("ratio".into(), AttributeValue::N("0.5".into()));
        item.insert("encrypted".into(), AttributeValue::Bool(true));
        item.insert("taskArn".into(), AttributeValue::Null(true));

        let record = item_to_record(&item);
        assert_eq!(record.id(), Some("a1"));
        assert_eq!(record.i64_field("updatedAt"), Some(1_600_000_000_123));
        assert_eq!(record.get("ratio"), Some(&json!(0.5)));
        assert_eq!(record.bool_field("encrypted"), Some(true));
        assert!(!record.contains("taskArn"));
    }

    #[test]
    fn test_nested_and_set_attributes() {
        let mut inner = Item::new();
        inner.insert("k".into(), AttributeValue::S("v".into()));

        let mut item = Item::new();
        item.insert("meta".into(), AttributeValue::M(inner));
        item.insert(
            "allowedRedirects".into(),
            AttributeValue::Ss(vec!["a.example".into(), "b.example".into()]),
        );
        item.insert(
            "list".into(),
            AttributeValue::L(vec![AttributeValue::N("1".into()), AttributeValue::Bool(false)]),
        );
        item.insert("blob".into(), AttributeValue::B(Blob::new(b"hi".to_vec())));

        let record = item_to_record(&item);
        assert_eq!(record.get("meta"), Some(&json!({"k": "v"})));
        assert_eq!(
            record.get("allowedRedirects"),
            Some(&json!(["a.example", "b.example"]))
        );
        assert_eq!(record.get("list"), Some(&json!([1, false])));
        assert_eq!(record.get("blob"), Some(&json!("aGk=")));
    }

    #[test]
    fn test_unparseable_number_kept_as_string() {
        assert_eq!(number_to_json("NaN"), json!("NaN"));
        assert_eq!(number_to_json("12"), json!(12));
    }
}
