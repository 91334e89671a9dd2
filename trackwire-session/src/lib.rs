//! Session runtime for trackwire.
//!
//! A [`Session`] is the entry point for working with server records:
//!
//! - **Bootstrap**: fetches the server's schemas and resolves one record type
//!   per schema through the registered [`TypeConstructor`]s
//! - **Identity map**: every record that enters the session is merged into a
//!   cache holding one canonical instance per identity
//! - **Change tracking**: local writes move records through the
//!   `created` / `modified` / `deleted` lifecycle
//! - **Commit**: pending work is sent as one ordered batch of deletes,
//!   creates and updates through a [`Transport`]
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use trackwire_model::Value;
//! use trackwire_session::transport::mock::MockTransport;
//! use trackwire_session::{Session, SessionConfig};
//!
//! let transport = MockTransport::with_schemas(vec![json!({
//!     "id": "User",
//!     "primary_key": ["id"],
//!     "properties": {
//!         "id": {"type": "string", "default": "{uid}"},
//!         "username": {"type": "string"}
//!     }
//! })]);
//!
//! let session = Session::new(SessionConfig::default(), transport.clone()).unwrap();
//! let user = session.create("User", [("username", Value::from("bob"))]).unwrap();
//! assert_eq!(session.created().len(), 1);
//!
//! session.commit().unwrap();
//! assert_eq!(transport.last_actions(), vec!["create"]);
//! assert_eq!(user.get("username").unwrap(), Value::from("bob"));
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod instruction;
mod lifecycle;
mod query;
pub mod resolver;
mod session;
pub mod transport;

pub use cache::Cache;
pub use codec::EncodeStrategy;
pub use config::SessionConfig;
pub use instruction::Instruction;
pub use query::QueryResult;
pub use resolver::{SchemaTypeConstructor, TypeConstructor, TypeResolver};
pub use session::{AutoPopulateGuard, Session};
pub use transport::Transport;
