//! Runtime record types.
//!
//! A [`RecordType`] is built once per schema when a session starts and then
//! shared (behind an `Rc`) by every record of that type.

use crate::{Attribute, Attributes, DefaultValue, Schema, Value};
use tracing::debug;
use trackwire_types::{Error, Result, ScalarKind, UID_DEFAULT_MARKER};

/// Shared description of one record type.
#[derive(Debug, Clone)]
pub struct RecordType {
    name: String,
    attributes: Attributes,
    primary_key: Vec<String>,
    default_projections: Vec<String>,
    bases: Vec<String>,
    schema: Option<Schema>,
}

impl RecordType {
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder::new(name)
    }

    /// Builds a type carrying the schema's scalar properties.
    ///
    /// Reference and collection properties are left for the caller to attach
    /// through [`RecordTypeBuilder::from_schema`].
    pub fn from_schema(schema: &Schema) -> Result<RecordType> {
        RecordTypeBuilder::from_schema(schema).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Projections used when a query does not specify any.
    ///
    /// Falls back to the primary key when the schema declares none.
    pub fn default_projections(&self) -> &[String] {
        if self.default_projections.is_empty() {
            &self.primary_key
        } else {
            &self.default_projections
        }
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// True if this type is `name` or declares it as a base.
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.bases.iter().any(|base| base == name)
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }
}

/// Incremental construction of a [`RecordType`].
#[derive(Debug, Clone)]
pub struct RecordTypeBuilder {
    name: String,
    attributes: Attributes,
    primary_key: Vec<String>,
    default_projections: Vec<String>,
    bases: Vec<String>,
    schema: Option<Schema>,
}

impl RecordTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            primary_key: Vec::new(),
            default_projections: Vec::new(),
            bases: Vec::new(),
            schema: None,
        }
    }

    /// Starts from a schema, adding one attribute per scalar property.
    pub fn from_schema(schema: &Schema) -> Self {
        let mut builder = Self::new(schema.type_name())
            .primary_key(schema.primary_key.iter().cloned())
            .default_projections(schema.default_projections.iter().cloned())
            .bases(schema.bases.iter().cloned());

        for (name, property) in &schema.properties {
            let Some(data_type) = property.data_type.as_deref().and_then(ScalarKind::from_schema_type)
            else {
                continue;
            };

            let mut attribute = Attribute::scalar(name.clone(), data_type)
                .with_mutable(!schema.is_immutable(name));
            if let Some(default) = &property.default {
                attribute = attribute.with_default(default_from_json(default));
            }
            builder = builder.attribute(attribute);
        }

        builder.schema = Some(schema.clone());
        builder
    }

    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.add(attribute);
        self
    }

    #[must_use]
    pub fn primary_key<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn default_projections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_projections = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn bases<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bases = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    /// Finishes the type, checking that the primary key is resolvable.
    pub fn build(self) -> Result<RecordType> {
        if self.primary_key.is_empty() {
            return Err(Error::Configuration(format!(
                "entity type {:?} declares no primary key",
                self.name
            )));
        }
        if let Some(missing) = self
            .primary_key
            .iter()
            .find(|name| !self.attributes.contains(name))
        {
            return Err(Error::Configuration(format!(
                "primary key attribute {missing:?} not defined on entity type {:?}",
                self.name
            )));
        }

        debug!(
            record_type = %self.name,
            attributes = self.attributes.len(),
            "Built entity type"
        );

        Ok(RecordType {
            name: self.name,
            attributes: self.attributes,
            primary_key: self.primary_key,
            default_projections: self.default_projections,
            bases: self.bases,
            schema: self.schema,
        })
    }
}

fn default_from_json(default: &serde_json::Value) -> DefaultValue {
    match default.as_str() {
        Some(UID_DEFAULT_MARKER) => DefaultValue::uid(),
        _ => DefaultValue::Value(Value::from_json(default)),
    }
}
