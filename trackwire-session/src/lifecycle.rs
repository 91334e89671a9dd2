//! Per-session lifecycle buckets.
//!
//! Membership is by instance, not identity: a reconstructed copy of a record
//! does not inherit the state of the cached instance it merges into.

use trackwire_model::Record;
use trackwire_types::{RecordState, Result, Transition};

#[derive(Debug, Default)]
pub(crate) struct Buckets {
    created: Vec<Record>,
    modified: Vec<Record>,
    deleted: Vec<Record>,
    /// Deleted records that were created in the same uncommitted window.
    unpersisted: Vec<Record>,
}

impl Buckets {
    pub(crate) fn state(&self, record: &Record) -> Option<RecordState> {
        [
            (RecordState::Created, &self.created),
            (RecordState::Modified, &self.modified),
            (RecordState::Deleted, &self.deleted),
        ]
        .into_iter()
        .find(|(_, bucket)| contains(bucket, record))
        .map(|(state, _)| state)
    }

    pub(crate) fn transition(&mut self, record: &Record, target: RecordState) -> Result<()> {
        let current = self.state(record);
        if RecordState::transition(current, target, record)? == Transition::Stay {
            return Ok(());
        }

        if let Some(current) = current {
            self.bucket_mut(current).retain(|member| !member.ptr_eq(record));
        }
        if current == Some(RecordState::Created) && target == RecordState::Deleted {
            self.unpersisted.push(record.clone());
        }
        self.bucket_mut(target).push(record.clone());
        Ok(())
    }

    pub(crate) fn created(&self) -> &[Record] {
        &self.created
    }

    pub(crate) fn modified(&self) -> &[Record] {
        &self.modified
    }

    pub(crate) fn deleted(&self) -> &[Record] {
        &self.deleted
    }

    /// True if `record` was deleted before it was ever committed.
    pub(crate) fn is_unpersisted(&self, record: &Record) -> bool {
        contains(&self.unpersisted, record)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.created.clear();
        self.modified.clear();
        self.deleted.clear();
        self.unpersisted.clear();
    }

    fn bucket_mut(&mut self, state: RecordState) -> &mut Vec<Record> {
        match state {
            RecordState::Created => &mut self.created,
            RecordState::Modified => &mut self.modified,
            RecordState::Deleted => &mut self.deleted,
        }
    }
}

fn contains(bucket: &[Record], record: &Record) -> bool {
    bucket.iter().any(|member| member.ptr_eq(record))
}
