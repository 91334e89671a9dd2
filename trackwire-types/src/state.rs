//! Record lifecycle states.
//!
//! A record tracked by a session is either clean (no state) or sits in
//! exactly one of the `created`, `modified` or `deleted` buckets until the
//! next commit drains them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pending lifecycle state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Created,
    Modified,
    Deleted,
}

impl RecordState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Created => "created",
            RecordState::Modified => "modified",
            RecordState::Deleted => "deleted",
        }
    }

    /// Decides what a request to move from `current` to `target` does.
    ///
    /// `identity` is only used to describe the record in the error.
    ///
    /// | current  | target   | outcome |
    /// |----------|----------|---------|
    /// | none     | any      | move    |
    /// | created  | created  | stay    |
    /// | created  | modified | stay    |
    /// | created  | deleted  | move    |
    /// | modified | modified | stay    |
    /// | modified | deleted  | move    |
    /// | modified | created  | error   |
    /// | deleted  | any      | error   |
    pub fn transition(
        current: Option<RecordState>,
        target: RecordState,
        identity: impl fmt::Display,
    ) -> Result<Transition> {
        use RecordState::*;

        let invalid = |current: RecordState| Error::InvalidStateTransition {
            current,
            target,
            identity: identity.to_string(),
        };

        match (current, target) {
            (None, _) => Ok(Transition::Move),
            (Some(Deleted), _) => Err(invalid(Deleted)),
            (Some(Created), Created | Modified) => Ok(Transition::Stay),
            (Some(Created), Deleted) => Ok(Transition::Move),
            (Some(Modified), Modified) => Ok(Transition::Stay),
            (Some(Modified), Deleted) => Ok(Transition::Move),
            (Some(Modified), Created) => Err(invalid(Modified)),
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a valid state transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move the record into the requested bucket.
    Move,
    /// Leave the record where it is.
    Stay,
}
