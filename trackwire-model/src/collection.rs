use crate::Record;
use std::fmt;
use trackwire_types::{Error, Identity, Result};

/// An ordered sequence of records bound to one collection attribute.
///
/// Duplicates are not rejected by the plain mutators; use
/// [`Collection::append_unique`] where the caller needs that guarantee.
///
/// Equality compares the sorted member identities: order is ignored but
/// duplicate counts are not.
#[derive(Clone)]
pub struct Collection {
    attribute: String,
    mutable: bool,
    items: Vec<Record>,
}

impl Collection {
    pub fn new(attribute: impl Into<String>, mutable: bool, items: Vec<Record>) -> Self {
        Self {
            attribute: attribute.into(),
            mutable,
            items,
        }
    }

    /// Name of the attribute this collection is bound to.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn set_mutable(&mut self, mutable: bool) {
        self.mutable = mutable;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.items.iter()
    }

    /// Inserts `record` before `index`; an index past the end appends.
    pub fn insert(&mut self, index: usize, record: Record) -> Result<()> {
        self.ensure_mutable()?;
        let index = index.min(self.items.len());
        self.items.insert(index, record);
        Ok(())
    }

    pub fn append(&mut self, record: Record) -> Result<()> {
        self.ensure_mutable()?;
        self.items.push(record);
        Ok(())
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = Record>) -> Result<()> {
        self.ensure_mutable()?;
        self.items.extend(records);
        Ok(())
    }

    /// Appends `record` unless a member with the same identity is present.
    pub fn append_unique(&mut self, record: Record) -> Result<()> {
        self.ensure_mutable()?;
        if self.contains(&record) {
            return Err(Error::DuplicateItemInCollection {
                item: record.to_string(),
                attribute: self.attribute.clone(),
            });
        }
        self.items.push(record);
        Ok(())
    }

    /// Replaces the member at `index`, returning the previous one.
    pub fn set(&mut self, index: usize, record: Record) -> Result<Record> {
        self.ensure_mutable()?;
        if index >= self.items.len() {
            return Err(self.out_of_range(index));
        }
        Ok(std::mem::replace(&mut self.items[index], record))
    }

    pub fn remove(&mut self, index: usize) -> Result<Record> {
        self.ensure_mutable()?;
        if index >= self.items.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.items.remove(index))
    }

    /// True if a member shares `record`'s identity.
    pub fn contains(&self, record: &Record) -> bool {
        self.items.iter().any(|item| item == record)
    }

    /// Identities of all members, sorted, duplicates kept.
    pub fn identities(&self) -> Result<Vec<Identity>> {
        let mut identities = self
            .items
            .iter()
            .map(Record::identity)
            .collect::<Result<Vec<_>>>()?;
        identities.sort();
        Ok(identities)
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.mutable {
            Ok(())
        } else {
            Err(Error::ImmutableCollection {
                attribute: self.attribute.clone(),
            })
        }
    }

    fn out_of_range(&self, index: usize) -> Error {
        Error::InvalidValue {
            attribute: self.attribute.clone(),
            reason: format!("index {index} out of range for collection of {}", self.items.len()),
        }
    }
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        match (self.identities(), other.identities()) {
            (Ok(ours), Ok(theirs)) => ours == theirs,
            _ => false,
        }
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("attribute", &self.attribute)
            .field("mutable", &self.mutable)
            .field("items", &self.items)
            .finish()
    }
}
