use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared primitive type of a scalar attribute.
///
/// Carried for documentation and validation only; values are never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    String,
    Boolean,
    Integer,
    Float,
}

impl ScalarKind {
    /// Maps a schema `type` keyword to a scalar kind.
    ///
    /// `number` is accepted as an alias of `float`. Anything else (objects,
    /// arrays, untyped properties) is not a scalar.
    pub fn from_schema_type(name: &str) -> Option<Self> {
        match name {
            "string" => Some(ScalarKind::String),
            "boolean" => Some(ScalarKind::Boolean),
            "integer" => Some(ScalarKind::Integer),
            "float" | "number" => Some(ScalarKind::Float),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an attribute holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKind {
    /// A primitive value.
    Scalar { data_type: ScalarKind },
    /// A reference to a single record of `target` type.
    Reference { target: String },
    /// An ordered collection of records of `target` type.
    Collection { target: String },
}

impl AttributeKind {
    pub fn scalar(data_type: ScalarKind) -> Self {
        AttributeKind::Scalar { data_type }
    }

    pub fn reference(target: impl Into<String>) -> Self {
        AttributeKind::Reference {
            target: target.into(),
        }
    }

    pub fn collection(target: impl Into<String>) -> Self {
        AttributeKind::Collection {
            target: target.into(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, AttributeKind::Scalar { .. })
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, AttributeKind::Reference { .. })
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, AttributeKind::Collection { .. })
    }

    /// Target record type for reference and collection attributes.
    pub fn target(&self) -> Option<&str> {
        match self {
            AttributeKind::Scalar { .. } => None,
            AttributeKind::Reference { target } | AttributeKind::Collection { target } => {
                Some(target)
            }
        }
    }
}
