/*!
Conversion from a decoded record to a DynamoDB item.

The record value must be a JSON object; its fields become item attributes
alongside the partition key and the replication bookkeeping attributes.
*/

use crate::error::Error;
use aws_sdk_dynamodb::types::AttributeValue;
use replsink_record::{Record, Value, VectorClocks};
use std::collections::HashMap;

/// Partition key attribute of the sink table.
pub(crate) const PARTITION_KEY: &str = "pkey";
/// Modification time of the item's source record. Kept as a string:
/// the concatenated textual form orders lexicographically, not
/// numerically.
pub(crate) const LAST_MODIFIED: &str = "_riak_lm";
/// Vector clocks of the item's source record.
pub(crate) const VCLOCKS: &str = "_riak_vclocks";

pub(crate) fn item_for(key: &str, record: &Record) -> Result<HashMap<String, AttributeValue>, Error> {
    let value = record
        .value
        .as_ref()
        .and_then(Value::as_binary)
        .ok_or(Error::Missing("value"))?;
    let serde_json::Value::Object(fields) = serde_json::from_slice(value)? else {
        return Err(Error::NotAnObject);
    };

    let mut item: HashMap<String, AttributeValue> = fields
        .into_iter()
        .map(|(name, value)| (name, to_attribute(value)))
        .collect();

    item.insert(PARTITION_KEY.to_string(), AttributeValue::S(key.to_string()));
    item.insert(
        LAST_MODIFIED.to_string(),
        AttributeValue::S(last_modified(record)?.to_string()),
    );
    if let Some(clocks) = &record.vector_clocks {
        item.insert(VCLOCKS.to_string(), clocks_attribute(clocks));
    }
    Ok(item)
}

pub(crate) fn last_modified(record: &Record) -> Result<&str, Error> {
    record
        .last_modified
        .as_deref()
        .ok_or(Error::Missing("modification time"))
}

fn clocks_attribute(clocks: &VectorClocks) -> AttributeValue {
    match clocks {
        VectorClocks::Base64(raw) => AttributeValue::S(raw.clone()),
        VectorClocks::Dict(actors) => AttributeValue::M(
            actors
                .iter()
                .map(|(actor, counter)| (actor.clone(), AttributeValue::N(counter.to_string())))
                .collect(),
        ),
    }
}

fn to_attribute(value: serde_json::Value) -> AttributeValue {
    match value {
        serde_json::Value::Null => AttributeValue::Null(true),
        serde_json::Value::Bool(b) => AttributeValue::Bool(b),
        serde_json::Value::Number(n) => AttributeValue::N(n.to_string()),
        serde_json::Value::String(s) => AttributeValue::S(s),
        serde_json::Value::Array(values) => {
            AttributeValue::L(values.into_iter().map(to_attribute).collect())
        }
        serde_json::Value::Object(fields) => AttributeValue::M(
            fields
                .into_iter()
                .map(|(name, value)| (name, to_attribute(value)))
                .collect(),
        ),
    }
}
