//! Schema type definitions
//!
//! Supported field types:
//! - string: UTF-8 string
//! - int: 64-bit signed integer
//! - bool: Boolean
//! - float: 64-bit floating point
//! - object: Nested object with field schema
//! - array: Homogeneous array with element type

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KegError, Result};

/// Name of the field the store injects into items for addressing
const ID_FIELD: &str = "id";

/// Supported field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// Boolean
    Bool,
    /// 64-bit floating point
    Float,
    /// Nested object with its own field schema
    Object {
        /// Nested field definitions
        fields: HashMap<String, FieldDef>,
    },
    /// Homogeneous array with single element type
    Array {
        /// Element type (boxed to allow recursive types)
        element: Box<FieldType>,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::Float => "float",
            FieldType::Object { .. } => "object",
            FieldType::Array { .. } => "array",
        }
    }
}

/// A named field inside an object schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether the field must be present
    pub required: bool,
}

impl FieldDef {
    /// Create a required field of the given type
    pub fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
        }
    }

    /// Create an optional field of the given type
    pub fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
        }
    }
}

/// A bucket schema: a typed root that items are validated against.
///
/// Item buckets use an object root. The registry's internal schema uses an
/// array root for its entry list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    root: FieldType,
}

impl Schema {
    /// Build an object-rooted schema from named fields.
    ///
    /// The reserved `id` field is declared implicitly (optional string) when
    /// the caller does not declare it — the store injects generated ids into
    /// stored items.
    pub fn from_fields(fields: HashMap<String, FieldDef>) -> Self {
        Self {
            root: FieldType::Object {
                fields: with_implicit_id(fields),
            },
        }
    }

    /// Build an array-rooted schema with the given element type
    pub fn array_of(element: FieldType) -> Self {
        Self {
            root: FieldType::Array {
                element: Box::new(element),
            },
        }
    }

    /// Infer an object schema from an example item.
    ///
    /// Every field present in the example becomes a required field of the
    /// matching type; array element types come from the first element.
    pub fn infer(example: &Value) -> Result<Self> {
        let map = example.as_object().ok_or_else(|| {
            KegError::SchemaViolation("schema example must be an object".to_string())
        })?;

        let mut fields = HashMap::new();
        for (name, value) in map {
            fields.insert(name.clone(), FieldDef::required(infer_type(name, value)?));
        }

        Ok(Self::from_fields(fields))
    }

    /// The root type items are validated against
    pub fn root(&self) -> &FieldType {
        &self.root
    }

    /// Serialize for registry persistence
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| KegError::Codec(format!("schema encode failed: {}", e)))
    }

    /// Parse a schema previously produced by [`Schema::to_json`]
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| KegError::Codec(format!("schema decode failed: {}", e)))
    }
}

/// Infer the type of a single example value
fn infer_type(name: &str, value: &Value) -> Result<FieldType> {
    match value {
        Value::String(_) => Ok(FieldType::String),
        Value::Bool(_) => Ok(FieldType::Bool),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Ok(FieldType::Int)
            } else {
                Ok(FieldType::Float)
            }
        }
        Value::Object(map) => {
            let mut fields = HashMap::new();
            for (child, value) in map {
                fields.insert(child.clone(), FieldDef::required(infer_type(child, value)?));
            }
            Ok(FieldType::Object { fields })
        }
        Value::Array(items) => match items.first() {
            Some(first) => Ok(FieldType::Array {
                element: Box::new(infer_type(name, first)?),
            }),
            None => Err(KegError::SchemaViolation(format!(
                "cannot infer element type of empty array field '{}'",
                name
            ))),
        },
        Value::Null => Err(KegError::SchemaViolation(format!(
            "cannot infer a type for null field '{}'",
            name
        ))),
    }
}

/// Declare the reserved `id` field when the schema does not already carry one
fn with_implicit_id(mut fields: HashMap<String, FieldDef>) -> HashMap<String, FieldDef> {
    fields
        .entry(ID_FIELD.to_string())
        .or_insert_with(|| FieldDef::optional(FieldType::String));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_fields() -> HashMap<String, FieldDef> {
        let mut fields = HashMap::new();
        fields.insert("name".into(), FieldDef::required(FieldType::String));
        fields.insert("active".into(), FieldDef::required(FieldType::Bool));
        fields.insert("age".into(), FieldDef::required(FieldType::Int));
        fields
    }

    #[test]
    fn from_fields_declares_implicit_id() {
        let schema = Schema::from_fields(sample_fields());
        match schema.root() {
            FieldType::Object { fields } => {
                let id = fields.get("id").expect("implicit id field");
                assert!(!id.required);
                assert_eq!(id.field_type, FieldType::String);
            }
            other => panic!("expected object root, got {}", other.type_name()),
        }
    }

    #[test]
    fn explicit_id_is_preserved() {
        let mut fields = sample_fields();
        fields.insert("id".into(), FieldDef::required(FieldType::Int));
        let schema = Schema::from_fields(fields);
        match schema.root() {
            FieldType::Object { fields } => {
                assert_eq!(fields["id"].field_type, FieldType::Int);
                assert!(fields["id"].required);
            }
            other => panic!("expected object root, got {}", other.type_name()),
        }
    }

    #[test]
    fn infer_from_example() {
        let example = json!({
            "name": "string",
            "active": true,
            "age": 49,
            "score": 1.5,
            "tags": ["a", "b"],
            "address": { "city": "x" }
        });
        let schema = Schema::infer(&example).expect("inferable");
        match schema.root() {
            FieldType::Object { fields } => {
                assert_eq!(fields["name"].field_type, FieldType::String);
                assert_eq!(fields["active"].field_type, FieldType::Bool);
                assert_eq!(fields["age"].field_type, FieldType::Int);
                assert_eq!(fields["score"].field_type, FieldType::Float);
                assert!(matches!(fields["tags"].field_type, FieldType::Array { .. }));
                assert!(matches!(
                    fields["address"].field_type,
                    FieldType::Object { .. }
                ));
            }
            other => panic!("expected object root, got {}", other.type_name()),
        }
    }

    #[test]
    fn infer_rejects_non_objects_and_nulls() {
        assert!(Schema::infer(&json!("flat")).is_err());
        assert!(Schema::infer(&json!({ "field": null })).is_err());
        assert!(Schema::infer(&json!({ "tags": [] })).is_err());
    }

    #[test]
    fn json_round_trip() {
        let schema = Schema::from_fields(sample_fields());
        let raw = schema.to_json().expect("encode");
        let parsed = Schema::from_json(&raw).expect("decode");
        assert_eq!(schema, parsed);
    }
}
