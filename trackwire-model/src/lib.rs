//! Dynamic record model for trackwire.
//!
//! Record shapes are defined by the server and only known at runtime, so
//! there are no generated structs here. Instead:
//! - [`RecordType`] is a shared, per-type table of [`Attribute`]s built from a
//!   [`Schema`] once per session
//! - [`Record`] is a generic instance keyed by attribute name, holding a local
//!   and a remote [`Value`] per attribute
//! - [`Collection`] is an ordered sequence of records bound to one attribute
//! - [`RecordContext`] is the seam through which a record reaches the session
//!   that owns it (lifecycle state, auto-populate)
//!
//! [`Value::NotSet`] is the sentinel for "no value known yet" and is never
//! conflated with [`Value::Null`].

mod attribute;
mod collection;
mod context;
mod record;
mod record_type;
mod schema;
mod value;

pub use attribute::{Attribute, Attributes, DefaultValue};
pub use collection::Collection;
pub use context::RecordContext;
pub use record::Record;
pub use record_type::{RecordType, RecordTypeBuilder};
pub use schema::{PropertySchema, Schema};
pub use value::{NOT_SET, Value};

pub use trackwire_types::{
    AttributeKind, Error, Identity, PrimaryKey, RecordState, Result, ScalarKind,
};
