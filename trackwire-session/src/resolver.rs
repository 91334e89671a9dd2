//! Record type resolution.
//!
//! When a session starts it asks every registered [`TypeConstructor`] which
//! record type represents each server schema. Exactly one constructor must
//! answer per schema.

use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;
use trackwire_model::{Attribute, RecordType, RecordTypeBuilder, Schema};
use trackwire_types::{Error, Result};

/// Builds the record type for a schema, or declines it.
pub trait TypeConstructor {
    /// Returns `Ok(None)` if this constructor does not handle `schema`.
    ///
    /// `schemas` is the full set reported by the server, for constructors
    /// that need to look at related types.
    fn construct(&self, schema: &Schema, schemas: &[Schema]) -> Result<Option<RecordType>>;
}

impl<F> TypeConstructor for F
where
    F: Fn(&Schema, &[Schema]) -> Result<Option<RecordType>>,
{
    fn construct(&self, schema: &Schema, schemas: &[Schema]) -> Result<Option<RecordType>> {
        self(schema, schemas)
    }
}

/// Builds a type for every schema, with scalar, reference and collection
/// attributes taken from its properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaTypeConstructor;

impl TypeConstructor for SchemaTypeConstructor {
    fn construct(&self, schema: &Schema, _schemas: &[Schema]) -> Result<Option<RecordType>> {
        let mut builder = RecordTypeBuilder::from_schema(schema);

        for (name, property) in &schema.properties {
            let mutable = !schema.is_immutable(name);
            if let Some(target) = &property.reference {
                builder = builder.attribute(
                    Attribute::reference(name.clone(), target.clone()).with_mutable(mutable),
                );
            } else if let Some(target) = property.collection_target() {
                builder = builder
                    .attribute(Attribute::collection(name.clone(), target).with_mutable(mutable));
            }
        }

        builder.build().map(Some)
    }
}

/// The set of constructors consulted for each schema.
#[derive(Default)]
pub struct TypeResolver {
    constructors: Vec<Box<dyn TypeConstructor>>,
}

impl TypeResolver {
    pub fn new(constructors: Vec<Box<dyn TypeConstructor>>) -> Self {
        Self { constructors }
    }

    /// Adds a constructor to consult.
    pub fn subscribe(&mut self, constructor: impl TypeConstructor + 'static) {
        self.constructors.push(Box::new(constructor));
    }

    /// Resolves one record type per schema, keyed by type name.
    ///
    /// No answer or more than one answer for any schema is a configuration
    /// error.
    pub fn resolve(&self, schemas: &[Schema]) -> Result<HashMap<String, Rc<RecordType>>> {
        let mut types = HashMap::with_capacity(schemas.len());

        for schema in schemas {
            let mut answers = Vec::new();
            for constructor in &self.constructors {
                if let Some(record_type) = constructor.construct(schema, schemas)? {
                    answers.push(record_type);
                }
            }

            let record_type = match answers.len() {
                1 => answers.remove(0),
                count => {
                    return Err(Error::Configuration(format!(
                        "expected a single entity type to represent schema {:?} but received {count}",
                        schema.type_name()
                    )));
                }
            };

            debug!(record_type = record_type.name(), "Resolved entity type");
            types.insert(record_type.name().to_string(), Rc::new(record_type));
        }

        Ok(types)
    }
}
