use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A record shape as reported by the server's `query_schemas` action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Type name records of this schema are known by.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Properties that may not be written locally.
    #[serde(default)]
    pub immutable: Vec<String>,
    /// Projections fetched by a query that does not name its own.
    #[serde(default)]
    pub default_projections: Vec<String>,
    #[serde(default)]
    pub bases: Vec<String>,
}

impl Schema {
    /// The record type name, falling back to the title when no id is given.
    pub fn type_name(&self) -> &str {
        match (&self.id, &self.title) {
            (id, Some(title)) if id.is_empty() => title,
            (id, _) => id,
        }
    }

    pub fn is_immutable(&self, property: &str) -> bool {
        self.immutable.iter().any(|name| name == property)
    }
}

/// One entry of a schema's `properties` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Target type name of a reference.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Element description of an array property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl PropertySchema {
    pub fn typed(data_type: &str) -> Self {
        Self {
            data_type: Some(data_type.to_string()),
            ..Default::default()
        }
    }

    pub fn reference_to(target: &str) -> Self {
        Self {
            reference: Some(target.to_string()),
            ..Default::default()
        }
    }

    pub fn array_of(target: &str) -> Self {
        Self {
            data_type: Some("array".to_string()),
            items: Some(Box::new(Self::reference_to(target))),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Target type when this property is an array of references.
    pub fn collection_target(&self) -> Option<&str> {
        if self.data_type.as_deref() != Some("array") {
            return None;
        }
        self.items.as_ref()?.reference.as_deref()
    }
}
