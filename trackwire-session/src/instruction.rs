//! Remote call instructions.
//!
//! A batch is a JSON array of instructions; the server answers with one
//! result per instruction, in order.

use serde::{Deserialize, Serialize};

/// One operation in a remote batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Instruction {
    Query {
        expression: String,
    },
    Create {
        entity_type: String,
        entity_data: serde_json::Value,
    },
    Update {
        entity_type: String,
        entity_key: Vec<String>,
        entity_data: serde_json::Value,
    },
    Delete {
        entity_type: String,
        entity_key: Vec<String>,
    },
    QuerySchemas,
}

impl Instruction {
    /// Wire name of the action.
    pub fn action(&self) -> &'static str {
        match self {
            Instruction::Query { .. } => "query",
            Instruction::Create { .. } => "create",
            Instruction::Update { .. } => "update",
            Instruction::Delete { .. } => "delete",
            Instruction::QuerySchemas => "query_schemas",
        }
    }

    /// Record type the instruction targets, if any.
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            Instruction::Create { entity_type, .. }
            | Instruction::Update { entity_type, .. }
            | Instruction::Delete { entity_type, .. } => Some(entity_type),
            Instruction::Query { .. } | Instruction::QuerySchemas => None,
        }
    }
}
