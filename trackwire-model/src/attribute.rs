//! Attribute descriptors and per-record dual-value access.
//!
//! An [`Attribute`] is shared by every record of a type. The values it
//! describes live on each [`Record`] in two independent slots: the local slot
//! (set by the client, not yet committed) and the remote slot (last value
//! known from the server).

use crate::record::Slot;
use crate::{Collection, Record, Value};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use trackwire_types::{AttributeKind, Error, Result, ScalarKind};

/// Default applied to new records that do not supply a value.
#[derive(Clone, Default)]
pub enum DefaultValue {
    /// Leave the local slot unset.
    #[default]
    NotSet,
    /// A literal, cloned into every new record.
    Value(Value),
    /// Evaluated once per new record.
    Generate(Rc<dyn Fn() -> Value>),
}

impl DefaultValue {
    /// A fresh unique identifier per record.
    pub fn uid() -> Self {
        DefaultValue::Generate(Rc::new(|| Value::String(trackwire_types::generate_uid())))
    }

    /// Produces the value for one new record.
    pub fn realize(&self) -> Value {
        match self {
            DefaultValue::NotSet => Value::NotSet,
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::Generate(generate) => generate(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::NotSet => f.write_str("NotSet"),
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Generate(_) => f.write_str("Generate(..)"),
        }
    }
}

/// One named field of a record type.
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    kind: AttributeKind,
    mutable: bool,
    default: DefaultValue,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mutable: true,
            default: DefaultValue::NotSet,
        }
    }

    pub fn scalar(name: impl Into<String>, data_type: ScalarKind) -> Self {
        Self::new(name, AttributeKind::scalar(data_type))
    }

    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::reference(target))
    }

    pub fn collection(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::collection(target))
    }

    #[must_use]
    pub fn with_mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = default;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn default_value(&self) -> &DefaultValue {
        &self.default
    }

    pub fn get_local_value(&self, record: &Record) -> Value {
        record
            .read_slot(&self.name, |slot| slot.local.clone())
            .unwrap_or_default()
    }

    pub fn get_remote_value(&self, record: &Record) -> Value {
        record
            .read_slot(&self.name, |slot| slot.remote.clone())
            .unwrap_or_default()
    }

    /// Stores `value` as the local value on `record`.
    ///
    /// Fails on an immutable attribute. Storing [`Value::NotSet`] clears the
    /// local slot and is always allowed.
    pub fn set_local_value(&self, record: &Record, value: Value) -> Result<()> {
        if value.is_set() {
            self.validate(&value)?;
        }
        self.store_local(record, value)
    }

    /// Stores `value` as the remote value on `record`.
    ///
    /// Server data always lands, so mutability is not checked.
    pub fn set_remote_value(&self, record: &Record, value: Value) -> Result<()> {
        let name = &self.name;
        record
            .write_slot(name, |slot| slot.remote = value)
            .ok_or_else(|| self.unknown_on(record))
    }

    /// True if the local slot holds a value.
    pub fn is_modified(&self, record: &Record) -> bool {
        self.get_local_value(record).is_set()
    }

    /// True if either slot holds a value.
    pub fn is_set(&self, record: &Record) -> bool {
        self.peek(record).is_set()
    }

    /// Local value if set, else remote value, without fetching.
    pub fn peek(&self, record: &Record) -> Value {
        record
            .read_slot(&self.name, |slot| {
                if slot.local.is_set() {
                    slot.local.clone()
                } else {
                    slot.remote.clone()
                }
            })
            .unwrap_or_default()
    }

    /// Local value if set, else remote value.
    ///
    /// When neither is known and the owning session has auto-populate
    /// enabled, the attribute is fetched from the server and the remote slot
    /// re-read.
    pub fn get_value(&self, record: &Record) -> Result<Value> {
        let value = self.peek(record);
        if value.is_set() {
            return Ok(value);
        }

        if let Some(context) = record.context() {
            if context.auto_populate() {
                context.populate(record, &[self.name.as_str()])?;
                return Ok(self.get_remote_value(record));
            }
        }

        Ok(Value::NotSet)
    }

    /// Checks that a local write of `value` is allowed.
    pub fn validate(&self, value: &Value) -> Result<()> {
        if !self.mutable {
            return Err(Error::ImmutableAttribute {
                attribute: self.name.clone(),
            });
        }
        self.check_kind(value)
    }

    /// Checks that `value` has the shape this attribute's kind holds.
    pub(crate) fn check_kind(&self, value: &Value) -> Result<()> {
        let fits = match (&self.kind, value) {
            (_, Value::NotSet | Value::Null) => true,
            (AttributeKind::Reference { .. }, Value::Record(_)) => true,
            (AttributeKind::Collection { .. }, Value::Collection(_)) => true,
            (AttributeKind::Scalar { .. }, Value::Record(_) | Value::Collection(_)) => false,
            (AttributeKind::Scalar { .. }, _) => true,
            _ => false,
        };

        if fits {
            Ok(())
        } else {
            Err(Error::InvalidValue {
                attribute: self.name.clone(),
                reason: format!("{} attribute cannot hold a {}", self.kind_name(), value.type_name()),
            })
        }
    }

    /// Value a brand-new record starts with when none was supplied.
    pub(crate) fn initial_value(&self) -> Value {
        let value = self.default.realize();
        if value.is_not_set() && self.kind.is_collection() {
            return Value::Collection(Collection::new(self.name.clone(), self.mutable, Vec::new()));
        }
        value
    }

    /// Writes the local slot without the mutability check.
    pub(crate) fn store_local(&self, record: &Record, value: Value) -> Result<()> {
        let name = &self.name;
        record
            .write_slot(name, |slot: &mut Slot| slot.local = value)
            .ok_or_else(|| self.unknown_on(record))
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            AttributeKind::Scalar { .. } => "scalar",
            AttributeKind::Reference { .. } => "reference",
            AttributeKind::Collection { .. } => "collection",
        }
    }

    fn unknown_on(&self, record: &Record) -> Error {
        Error::UnknownAttribute {
            record_type: record.record_type().to_string(),
            attribute: self.name.clone(),
        }
    }
}

/// Ordered attribute table shared by all records of a type.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    items: Vec<Attribute>,
    index: HashMap<String, usize>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute, replacing any existing one of the same name in place.
    pub fn add(&mut self, attribute: Attribute) {
        match self.index.get(attribute.name()) {
            Some(&position) => self.items[position] = attribute,
            None => {
                self.index.insert(attribute.name().to_string(), self.items.len());
                self.items.push(attribute);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.position(name).map(|position| &self.items[position])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(Attribute::name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
