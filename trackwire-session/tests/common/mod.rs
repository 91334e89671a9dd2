#![allow(dead_code)]

use serde_json::{Value as Json, json};
use tracing_subscriber::EnvFilter;
use trackwire_session::transport::mock::MockTransport;
use trackwire_session::{Session, SessionConfig};

pub fn schemas() -> Vec<Json> {
    vec![
        json!({
            "id": "User",
            "primary_key": ["id"],
            "immutable": ["id"],
            "default_projections": ["username", "email"],
            "properties": {
                "id": {"type": "string", "default": "{uid}"},
                "username": {"type": "string"},
                "email": {"type": "string"},
                "is_active": {"type": "boolean", "default": true},
                "manager": {"$ref": "User"},
                "groups": {"type": "array", "items": {"$ref": "Group"}}
            }
        }),
        json!({
            "id": "Group",
            "primary_key": ["id"],
            "immutable": ["id", "members"],
            "properties": {
                "id": {"type": "string", "default": "{uid}"},
                "name": {"type": "string"},
                "members": {"type": "array", "items": {"$ref": "User"}}
            }
        }),
        json!({
            "id": "Task",
            "primary_key": ["id"],
            "default_projections": ["name"],
            "properties": {
                "id": {"type": "string", "default": "{uid}"},
                "name": {"type": "string"},
                "parent": {"$ref": "Task"},
                "children": {"type": "array", "items": {"$ref": "Task"}}
            }
        }),
        json!({
            "id": "Membership",
            "primary_key": ["user_id", "group_id"],
            "properties": {
                "user_id": {"type": "string"},
                "group_id": {"type": "string"}
            }
        }),
    ]
}

pub fn config() -> SessionConfig {
    SessionConfig::new("https://trackwire.test", "secret", "tester")
}

/// Routes `RUST_LOG`-filtered events to the test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A session over a mock transport, plus a handle on that transport.
pub fn session() -> (Session, MockTransport) {
    init_tracing();
    let transport = MockTransport::with_schemas(schemas());
    let session = Session::new(config(), transport.clone()).unwrap();
    (session, transport)
}

pub fn user_row(id: &str, username: &str) -> Json {
    json!({"__entity_type__": "User", "id": id, "username": username})
}

pub fn reference(entity_type: &str, id: &str) -> Json {
    json!({"__entity_type__": entity_type, "id": id})
}

/// The instructions of the last batch the transport received.
pub fn last_batch(transport: &MockTransport) -> Vec<Json> {
    transport
        .last_call()
        .and_then(|batch| batch.as_array().cloned())
        .unwrap_or_default()
}
