//! JSON encoding of values and records.
//!
//! A record reference is `{"__entity_type__": <type>, <pk name>: <pk value>, ...}`;
//! a collection is a list of references; timestamps use the tagged
//! `{"__type__": "datetime", "value": <rfc3339>}` form.
//!
//! Which attributes of a record are written depends on the
//! [`EncodeStrategy`]. Whether reading an attribute may fetch it is decided by
//! the owning session's auto-populate flag, so callers normally go through
//! [`Session::encode`](crate::Session::encode), which sets the flag to match
//! the strategy.

use serde_json::{Map, Value as Json};
use trackwire_model::{Record, Value};
use trackwire_types::Result;

/// Key carrying the record type in an encoded reference.
pub const ENTITY_TYPE_KEY: &str = "__entity_type__";

/// Which attributes of a record to include when encoding it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncodeStrategy {
    /// Every attribute, fetching any that are not yet known.
    All,
    /// Attributes with a local or remote value, without fetching.
    #[default]
    SetOnly,
    /// Attributes with a local value only.
    ModifiedOnly,
}

/// Encodes any value. Records are encoded in full, per `strategy`.
pub fn encode_value(value: &Value, strategy: EncodeStrategy) -> Result<Json> {
    match value {
        Value::Record(record) => encode_record(record, strategy),
        other => encode_attribute_value(other),
    }
}

/// Encodes `record` as its reference plus the attributes `strategy` selects.
///
/// Attributes whose value is not set are left out entirely.
pub fn encode_record(record: &Record, strategy: EncodeStrategy) -> Result<Json> {
    let mut data = entity_reference(record)?;

    for attribute in record.attributes() {
        let value = match strategy {
            EncodeStrategy::All | EncodeStrategy::SetOnly => attribute.get_value(record)?,
            EncodeStrategy::ModifiedOnly => attribute.get_local_value(record),
        };
        if value.is_not_set() {
            continue;
        }
        data.insert(attribute.name().to_string(), encode_attribute_value(&value)?);
    }

    Ok(Json::Object(data))
}

/// The reference form of `record`: its type plus primary-key values.
pub fn entity_reference(record: &Record) -> Result<Map<String, Json>> {
    let mut reference = Map::new();
    reference.insert(ENTITY_TYPE_KEY.to_string(), Json::from(record.record_type()));

    let primary_key = record.primary_key()?;
    for name in primary_key.names() {
        let value = record.attribute(name)?.peek(record);
        let encoded = value.scalar_to_json().unwrap_or(Json::Null);
        reference.insert(name.to_string(), encoded);
    }
    Ok(reference)
}

/// True if `json` is an object carrying a record type.
pub fn is_entity(json: &Json) -> bool {
    json.get(ENTITY_TYPE_KEY).is_some_and(Json::is_string)
}

/// Nested records and collections are written as references.
fn encode_attribute_value(value: &Value) -> Result<Json> {
    match value {
        Value::Record(record) => Ok(Json::Object(entity_reference(record)?)),
        Value::Collection(collection) => collection
            .iter()
            .map(|record| entity_reference(record).map(Json::Object))
            .collect::<Result<Vec<_>>>()
            .map(Json::Array),
        other => Ok(other.scalar_to_json().unwrap_or(Json::Null)),
    }
}
