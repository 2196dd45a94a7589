//! Response body validation rules.
//!
//! Three independent rule sets are applied to a response payload: a small
//! JSON-Schema subset, required dotted paths and expected field values.
//! Errors from all three accumulate, and the payload passes only when none
//! were produced. Everything here is pure and deterministic.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Rules applied to a response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSpec {
    #[serde(default)]
    pub schema: Option<SchemaNode>,

    /// Dotted paths (`a.b.c`) that must exist, checked in order
    #[serde(default)]
    pub required_fields: Vec<String>,

    /// Dotted path to the value it must strictly equal
    #[serde(default)]
    pub field_values: BTreeMap<String, Value>,
}

impl ValidationSpec {
    pub fn is_empty(&self) -> bool {
        self.schema.is_none() && self.required_fields.is_empty() && self.field_values.is_empty()
    }
}

/// JSON type names understood by the schema subset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl SchemaType {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (SchemaType::Object, Value::Object(_)) => true,
            (SchemaType::Array, Value::Array(_)) => true,
            (SchemaType::String, Value::String(_)) => true,
            (SchemaType::Number, Value::Number(_)) => true,
            (SchemaType::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            (SchemaType::Boolean, Value::Bool(_)) => true,
            (SchemaType::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Null => "null",
        };
        f.write_str(name)
    }
}

/// One node of the supported JSON-Schema subset: `type`, `properties`,
/// `required` and `items`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SchemaType>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaNode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
}

/// Outcome of validating one payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub errors: Vec<String>,
}

/// Validate `body` against every rule in `spec`
pub fn validate(body: &Value, spec: &ValidationSpec) -> ValidationOutcome {
    let mut errors = Vec::new();

    if let Some(schema) = &spec.schema {
        check_schema(body, schema, "", &mut errors);
    }

    for path in &spec.required_fields {
        if lookup(body, path).is_none() {
            errors.push(format!("Missing required field: {path}"));
        }
    }

    for (path, expected) in &spec.field_values {
        match lookup(body, path) {
            Some(actual) if strictly_equal(actual, expected) => {}
            Some(actual) => {
                errors.push(format!("Field {path}: expected {expected}, got {actual}"));
            }
            None => errors.push(format!("Field {path}: expected {expected}, got missing")),
        }
    }

    ValidationOutcome { passed: errors.is_empty(), errors }
}

/// Walk a dotted path through nested objects
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| current.as_object()?.get(segment))
}

fn check_schema(value: &Value, schema: &SchemaNode, path: &str, errors: &mut Vec<String>) {
    if let Some(kind) = schema.kind {
        if !kind.matches(value) {
            errors.push(format!(
                "{}: expected type {}, got {}",
                display_path(path),
                kind,
                json_type_name(value)
            ));
            return;
        }
    }

    if let Value::Object(map) = value {
        check_object(map, schema, path, errors);
    }

    if let (Value::Array(items), Some(item_schema)) = (value, &schema.items) {
        for (index, item) in items.iter().enumerate() {
            check_schema(item, item_schema, &format!("{path}[{index}]"), errors);
        }
    }
}

fn check_object(map: &Map<String, Value>, schema: &SchemaNode, path: &str, errors: &mut Vec<String>) {
    for name in &schema.required {
        if !map.contains_key(name) {
            errors.push(format!("Missing required property: {}", join_path(path, name)));
        }
    }

    for (name, child) in &schema.properties {
        if let Some(value) = map.get(name) {
            check_schema(value, child, &join_path(path, name), errors);
        }
    }
}

/// Strict equality, except that `1` and `1.0` are the same number
fn strictly_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() { name.to_string() } else { format!("{parent}.{name}") }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "(root)" } else { path }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
