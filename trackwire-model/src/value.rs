use crate::{Collection, Record};
use chrono::{DateTime, Utc};
use serde_json::json;

/// The "no value known yet" sentinel.
pub const NOT_SET: Value = Value::NotSet;

/// Tag used on the wire to mark a timestamp object.
pub(crate) const DATETIME_TAG: &str = "datetime";

/// A value held in an attribute slot.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Nothing known yet. Distinct from [`Value::Null`].
    #[default]
    NotSet,
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
    /// Structured data the model does not interpret.
    Json(serde_json::Value),
    Record(Record),
    Collection(Collection),
}

impl Value {
    pub fn is_set(&self) -> bool {
        !self.is_not_set()
    }

    pub fn is_not_set(&self) -> bool {
        matches!(self, Value::NotSet)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Value::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NotSet => "not set",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::Json(_) => "json",
            Value::Record(_) => "record",
            Value::Collection(_) => "collection",
        }
    }

    /// String form used for primary-key values and identities.
    ///
    /// Returns `None` when the value cannot key a record (not set, null,
    /// references and collections).
    pub fn key_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(n) => Some(n.to_string()),
            Value::Float(n) => Some(n.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::DateTime(dt) => Some(dt.to_rfc3339()),
            Value::Json(json) => Some(json.to_string()),
            Value::NotSet | Value::Null | Value::Record(_) | Value::Collection(_) => None,
        }
    }

    /// Decodes a plain JSON value, recognising tagged timestamps.
    ///
    /// Record references are not resolved here; that needs a session.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Float).unwrap_or_else(|| Value::Json(json.clone())),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Object(map) => {
                let tagged_datetime = map.get("__type__").and_then(|t| t.as_str()) == Some(DATETIME_TAG);
                if tagged_datetime {
                    let parsed = map
                        .get("value")
                        .and_then(|v| v.as_str())
                        .and_then(|s| DateTime::parse_from_rfc3339(s).ok());
                    if let Some(dt) = parsed {
                        return Value::DateTime(dt.with_timezone(&Utc));
                    }
                }
                Value::Json(json.clone())
            }
            serde_json::Value::Array(_) => Value::Json(json.clone()),
        }
    }

    /// Encodes a scalar value as JSON.
    ///
    /// Returns `None` for the sentinel, records and collections, whose
    /// encoding depends on the caller's strategy.
    pub fn scalar_to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Null => Some(serde_json::Value::Null),
            Value::Boolean(b) => Some(json!(b)),
            Value::Integer(n) => Some(json!(n)),
            Value::Float(n) => Some(json!(n)),
            Value::String(s) => Some(json!(s)),
            Value::DateTime(dt) => Some(json!({
                "__type__": DATETIME_TAG,
                "value": dt.to_rfc3339(),
            })),
            Value::Json(json) => Some(json.clone()),
            Value::NotSet | Value::Record(_) | Value::Collection(_) => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::NotSet, Value::NotSet) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Collection(a), Value::Collection(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

impl From<Collection> for Value {
    fn from(value: Collection) -> Self {
        Value::Collection(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
