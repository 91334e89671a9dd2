//! Core type definitions for trackwire.
//!
//! This crate defines the schema-agnostic types shared by the record model
//! and the session:
//! - The error taxonomy ([`Error`], [`AccessorError`])
//! - Record identities and ordered primary keys
//! - Attribute kind descriptors for runtime schemas
//! - The record lifecycle state machine
//!
//! Nothing in here knows about a particular server schema; record shapes are
//! only known once a session has fetched them.

mod error;
mod identity;
mod kind;
mod state;

pub use error::{AccessorError, Error, Result};
pub use identity::{Identity, PrimaryKey};
pub use kind::{AttributeKind, ScalarKind};
pub use state::{RecordState, Transition};

/// Schema default marker that asks for a fresh identifier per new record.
pub const UID_DEFAULT_MARKER: &str = "{uid}";

/// Generates a fresh server-compatible unique identifier.
#[must_use]
pub fn generate_uid() -> String {
    uuid::Uuid::new_v4().to_string()
}
