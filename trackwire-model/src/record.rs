//! Generic records.
//!
//! A [`Record`] is a cheap, clonable handle; clones share the same slots, so
//! the identity-map cache can hand the same instance to every caller. Use
//! [`Record::ptr_eq`] to ask "same instance", and `==` to ask "same identity".

use crate::{Attribute, Attributes, RecordContext, RecordType, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use tracing::debug;
use trackwire_types::{Error, Identity, PrimaryKey, RecordState, Result};

/// Dual-value storage for one attribute on one record.
#[derive(Debug, Clone, Default)]
pub(crate) struct Slot {
    pub(crate) local: Value,
    pub(crate) remote: Value,
}

struct RecordInner {
    record_type: Rc<RecordType>,
    slots: RefCell<Vec<Slot>>,
    context: Option<Weak<dyn RecordContext>>,
}

/// A dynamically-typed instance of a server-defined schema.
#[derive(Clone)]
pub struct Record(Rc<RecordInner>);

impl Record {
    /// Constructs a brand-new record.
    ///
    /// Supplied values become local values, missing attributes receive their
    /// defaults and the record is registered as `created` with its context.
    pub fn new<I, K>(
        record_type: Rc<RecordType>,
        data: I,
        context: Option<Weak<dyn RecordContext>>,
    ) -> Result<Record>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::build(record_type, data, false, context)
    }

    /// Reconstructs a record from server data.
    ///
    /// Supplied values become remote values; nothing else is touched and no
    /// lifecycle state is assigned.
    pub fn reconstruct<I, K>(
        record_type: Rc<RecordType>,
        data: I,
        context: Option<Weak<dyn RecordContext>>,
    ) -> Result<Record>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::build(record_type, data, true, context)
    }

    fn build<I, K>(
        record_type: Rc<RecordType>,
        data: I,
        reconstructing: bool,
        context: Option<Weak<dyn RecordContext>>,
    ) -> Result<Record>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        debug!(
            record_type = record_type.name(),
            "{} entity",
            if reconstructing { "Reconstructing" } else { "Constructing" }
        );

        let slots = vec![Slot::default(); record_type.attributes().len()];
        let record = Record(Rc::new(RecordInner {
            record_type,
            slots: RefCell::new(slots),
            context,
        }));

        let mut supplied = HashSet::new();
        for (key, value) in data {
            let key = key.into();
            let Some(attribute) = record.attributes().get(&key) else {
                debug!(
                    "Cannot populate {key:?} attribute as no such attribute found on entity type {}",
                    record.record_type()
                );
                continue;
            };

            if reconstructing {
                attribute.set_remote_value(&record, value)?;
            } else {
                attribute.check_kind(&value)?;
                attribute.store_local(&record, value)?;
            }
            supplied.insert(key);
        }

        if !reconstructing {
            for attribute in record.attributes() {
                if !supplied.contains(attribute.name()) {
                    attribute.store_local(&record, attribute.initial_value())?;
                }
            }
        }

        record.primary_key()?;

        if !reconstructing {
            if let Some(context) = record.context() {
                context.transition(&record, RecordState::Created)?;
            }
        }

        Ok(record)
    }

    /// Name of this record's type.
    pub fn record_type(&self) -> &str {
        self.0.record_type.name()
    }

    pub fn type_info(&self) -> &Rc<RecordType> {
        &self.0.record_type
    }

    pub fn attributes(&self) -> &Attributes {
        self.0.record_type.attributes()
    }

    /// Looks up an attribute of this record's type.
    pub fn attribute(&self, name: &str) -> Result<&Attribute> {
        self.attributes()
            .get(name)
            .ok_or_else(|| Error::UnknownAttribute {
                record_type: self.record_type().to_string(),
                attribute: name.to_string(),
            })
    }

    /// The session this record belongs to, if it is still alive.
    pub fn context(&self) -> Option<Rc<dyn RecordContext>> {
        self.0.context.as_ref().and_then(Weak::upgrade)
    }

    /// True if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Reads an attribute, fetching it if unset and auto-populate is on.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.attribute(name)?.get_value(self)
    }

    /// Sets a local value and marks the record modified.
    ///
    /// Setting [`Value::NotSet`] clears the local value instead, reverting
    /// reads to the remote value.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let attribute = self.attribute(name)?;
        if value.is_not_set() {
            return attribute.store_local(self, value);
        }

        attribute.validate(&value)?;
        if let Some(context) = self.context() {
            context.transition(self, RecordState::Modified)?;
        }
        attribute.store_local(self, value)
    }

    /// Clears the local value of `name`, reverting to the remote value.
    pub fn remove(&self, name: &str) -> Result<()> {
        self.attribute(name)?.store_local(self, Value::NotSet)
    }

    /// Clears every local value.
    pub fn clear(&self) {
        for slot in self.0.slots.borrow_mut().iter_mut() {
            slot.local = Value::NotSet;
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes().names()
    }

    pub fn len(&self) -> usize {
        self.attributes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes().is_empty()
    }

    /// All attribute values in declaration order.
    ///
    /// With auto-populate on, unset scalar attributes are fetched in a single
    /// round trip first.
    pub fn values(&self) -> Result<Vec<Value>> {
        Ok(self.items()?.into_iter().map(|(_, value)| value).collect())
    }

    /// All `(name, value)` pairs in declaration order.
    pub fn items(&self) -> Result<Vec<(String, Value)>> {
        self.populate_unset_scalars()?;

        let mut items = Vec::with_capacity(self.len());
        for attribute in self.attributes() {
            let value = if attribute.kind().is_scalar() {
                attribute.peek(self)
            } else {
                attribute.get_value(self)?
            };
            items.push((attribute.name().to_string(), value));
        }
        Ok(items)
    }

    /// True if any attribute carries a local value.
    pub fn is_modified(&self) -> bool {
        self.0.slots.borrow().iter().any(|slot| slot.local.is_set())
    }

    /// Current lifecycle state as tracked by the owning session.
    pub fn state(&self) -> Option<RecordState> {
        self.context().and_then(|context| context.state(self))
    }

    /// Primary key as an ordered mapping of attribute name to string value.
    ///
    /// Never fetches: a key attribute with no local or remote value is an
    /// error.
    pub fn primary_key(&self) -> Result<PrimaryKey> {
        let mut primary_key = PrimaryKey::new();
        for name in self.0.record_type.primary_key() {
            let value = self.attribute(name)?.peek(self);
            let Some(key) = value.key_string() else {
                return Err(Error::MissingPrimaryKey {
                    record_type: self.record_type().to_string(),
                    attribute: name.clone(),
                });
            };
            primary_key.push(name.clone(), key);
        }
        Ok(primary_key)
    }

    pub fn identity(&self) -> Result<Identity> {
        Ok(Identity::from_primary_key(self.record_type(), &self.primary_key()?))
    }

    pub(crate) fn read_slot<R>(&self, name: &str, read: impl FnOnce(&Slot) -> R) -> Option<R> {
        let position = self.attributes().position(name)?;
        let slots = self.0.slots.borrow();
        slots.get(position).map(read)
    }

    pub(crate) fn write_slot(&self, name: &str, write: impl FnOnce(&mut Slot)) -> Option<()> {
        let position = self.attributes().position(name)?;
        let mut slots = self.0.slots.borrow_mut();
        slots.get_mut(position).map(write)
    }

    fn populate_unset_scalars(&self) -> Result<()> {
        let Some(context) = self.context() else {
            return Ok(());
        };
        if !context.auto_populate() {
            return Ok(());
        }

        let projections: Vec<&str> = self
            .attributes()
            .iter()
            .filter(|attribute| attribute.kind().is_scalar())
            .filter(|attribute| attribute.get_remote_value(self).is_not_set())
            .map(Attribute::name)
            .collect();

        if projections.is_empty() {
            return Ok(());
        }
        context.populate(self, &projections)
    }
}

impl PartialEq for Record {
    /// Records are equal when their identities are. Attribute values are not
    /// compared.
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.identity(), other.identity()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.identity() {
            Ok(identity) => identity.hash(state),
            Err(_) => Rc::as_ptr(&self.0).hash(state),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Record");
        debug.field("type", &self.record_type());
        match self.primary_key() {
            Ok(key) => debug.field("key", &key.values()),
            Err(_) => debug.field("key", &"<unresolved>"),
        };
        debug.finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identity() {
            Ok(identity) => write!(f, "{identity}"),
            Err(_) => write!(f, "{}(<unresolved>)", self.record_type()),
        }
    }
}
