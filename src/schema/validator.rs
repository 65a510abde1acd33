//! Schema validation for JSON items
//!
//! Validation semantics:
//! - All required fields are present
//! - No undeclared fields exist
//! - Field types exactly match schema types (no implicit coercion)
//! - Null values are rejected everywhere

use serde_json::Value;

use crate::error::{KegError, Result};

use super::types::{FieldDef, FieldType, Schema};

/// Validate an item against a schema.
///
/// Walks the value alongside the schema's type tree and reports the first
/// mismatch with its field path.
pub fn validate(schema: &Schema, item: &Value) -> Result<()> {
    validate_type(schema.root(), item, "$")
}

fn validate_type(expected: &FieldType, value: &Value, path: &str) -> Result<()> {
    match expected {
        FieldType::String => match value {
            Value::String(_) => Ok(()),
            other => Err(mismatch(path, expected, other)),
        },
        FieldType::Int => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(()),
            other => Err(mismatch(path, expected, other)),
        },
        FieldType::Bool => match value {
            Value::Bool(_) => Ok(()),
            other => Err(mismatch(path, expected, other)),
        },
        FieldType::Float => match value {
            Value::Number(n) if n.is_f64() => Ok(()),
            other => Err(mismatch(path, expected, other)),
        },
        FieldType::Object { fields } => match value {
            Value::Object(map) => validate_object(fields, map, path),
            other => Err(mismatch(path, expected, other)),
        },
        FieldType::Array { element } => match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    validate_type(element, item, &format!("{}[{}]", path, i))?;
                }
                Ok(())
            }
            other => Err(mismatch(path, expected, other)),
        },
    }
}

fn validate_object(
    fields: &std::collections::HashMap<String, FieldDef>,
    map: &serde_json::Map<String, Value>,
    path: &str,
) -> Result<()> {
    for (name, def) in fields {
        match map.get(name) {
            Some(value) => {
                validate_type(&def.field_type, value, &format!("{}.{}", path, name))?
            }
            None if def.required => {
                return Err(KegError::SchemaViolation(format!(
                    "missing required field {}.{}",
                    path, name
                )))
            }
            None => {}
        }
    }

    for name in map.keys() {
        if !fields.contains_key(name) {
            return Err(KegError::SchemaViolation(format!(
                "undeclared field {}.{}",
                path, name
            )));
        }
    }

    Ok(())
}

fn mismatch(path: &str, expected: &FieldType, got: &Value) -> KegError {
    KegError::SchemaViolation(format!(
        "{}: expected {}, got {}",
        path,
        expected.type_name(),
        json_type_name(got)
    ))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> Schema {
        Schema::infer(&json!({ "name": "string", "active": true, "age": 49 }))
            .expect("inferable")
    }

    #[test]
    fn valid_item_passes() {
        let schema = sample_schema();
        let item = json!({ "name": "bob", "active": false, "age": 30 });
        assert!(validate(&schema, &item).is_ok());
    }

    #[test]
    fn implicit_id_is_accepted() {
        let schema = sample_schema();
        let item = json!({ "id": "abc", "name": "bob", "active": false, "age": 30 });
        assert!(validate(&schema, &item).is_ok());
    }

    #[test]
    fn missing_required_field_fails() {
        let schema = sample_schema();
        let item = json!({ "name": "bob", "active": false });
        let err = validate(&schema, &item).unwrap_err();
        assert!(err.to_string().contains("missing required field"));
    }

    #[test]
    fn undeclared_field_fails() {
        let schema = sample_schema();
        let item = json!({ "name": "bob", "active": false, "age": 30, "extra": 1 });
        let err = validate(&schema, &item).unwrap_err();
        assert!(err.to_string().contains("undeclared field"));
    }

    #[test]
    fn type_mismatch_fails() {
        let schema = sample_schema();
        let item = json!({ "name": 7, "active": false, "age": 30 });
        let err = validate(&schema, &item).unwrap_err();
        assert!(err.to_string().contains("expected string"));
    }

    #[test]
    fn no_int_float_coercion() {
        let schema = Schema::infer(&json!({ "ratio": 0.5 })).expect("inferable");
        assert!(validate(&schema, &json!({ "ratio": 1 })).is_err());

        let schema = Schema::infer(&json!({ "count": 1 })).expect("inferable");
        assert!(validate(&schema, &json!({ "count": 0.5 })).is_err());
    }

    #[test]
    fn null_is_rejected() {
        let schema = sample_schema();
        let item = json!({ "name": null, "active": false, "age": 30 });
        assert!(validate(&schema, &item).is_err());
    }

    #[test]
    fn nested_paths_in_errors() {
        let schema =
            Schema::infer(&json!({ "address": { "city": "x" } })).expect("inferable");
        let item = json!({ "address": { "city": 5 } });
        let err = validate(&schema, &item).unwrap_err();
        assert!(err.to_string().contains("$.address.city"));
    }
}
