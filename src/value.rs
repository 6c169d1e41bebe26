//! Typed values of the declarative framework and their lowering to plain JSON.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::error::ConvertError;

/// A value as produced by the declarative framework's value system.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypedValue {
    #[default]
    Null,
    /// A value not yet known; never a legitimate static default.
    Unknown,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Arbitrary-precision number, kept as its exact decimal text.
    Number(Number),
    String(String),
    List(Vec<TypedValue>),
    Set(Vec<TypedValue>),
    Tuple(Vec<TypedValue>),
    Map(BTreeMap<String, TypedValue>),
    Object(BTreeMap<String, TypedValue>),
    /// Dynamically-typed wrapper around a concrete value.
    Dynamic(Box<TypedValue>),
    /// A value of a custom type this crate has no lowering for.
    Custom(String),
}

impl TypedValue {
    /// Short name of the value's kind, for error messages.
    pub fn kind_name(&self) -> &str {
        match self {
            TypedValue::Null => "null",
            TypedValue::Unknown => "unknown",
            TypedValue::Bool(_) => "bool",
            TypedValue::Int32(_) => "int32",
            TypedValue::Int64(_) => "int64",
            TypedValue::Float32(_) => "float32",
            TypedValue::Float64(_) => "float64",
            TypedValue::Number(_) => "number",
            TypedValue::String(_) => "string",
            TypedValue::List(_) => "list",
            TypedValue::Set(_) => "set",
            TypedValue::Tuple(_) => "tuple",
            TypedValue::Map(_) => "map",
            TypedValue::Object(_) => "object",
            TypedValue::Dynamic(_) => "dynamic",
            TypedValue::Custom(name) => name,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }
}

/// Lower a typed value into a plain JSON value.
///
/// Null lowers to `Value::Null`. Collections and objects are lowered
/// recursively; dynamic wrappers lower to their underlying value.
///
/// # Errors
///
/// Returns `ConvertError::UnknownValue` if an unknown value is reached
/// anywhere in the tree, and `ConvertError::UnhandledValue` for values of
/// custom types or non-finite floats.
pub fn lower(value: &TypedValue) -> Result<Value, ConvertError> {
    match value {
        TypedValue::Null => Ok(Value::Null),
        TypedValue::Unknown => Err(ConvertError::UnknownValue),
        TypedValue::Bool(b) => Ok(Value::Bool(*b)),
        TypedValue::Int32(n) => Ok(Value::from(*n)),
        TypedValue::Int64(n) => Ok(Value::from(*n)),
        TypedValue::Float32(n) => float32(*n),
        TypedValue::Float64(n) => float(*n, "float64"),
        TypedValue::Number(n) => Ok(Value::Number(n.clone())),
        TypedValue::String(s) => Ok(Value::String(s.clone())),
        TypedValue::List(items) | TypedValue::Set(items) | TypedValue::Tuple(items) => items
            .iter()
            .map(lower)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        TypedValue::Map(entries) | TypedValue::Object(entries) => {
            let mut out = Map::new();
            for (key, item) in entries {
                out.insert(key.clone(), lower(item)?);
            }
            Ok(Value::Object(out))
        }
        TypedValue::Dynamic(inner) => lower(inner),
        TypedValue::Custom(type_name) => Err(ConvertError::UnhandledValue {
            type_name: type_name.clone(),
        }),
    }
}

// Widening to f64 would print rounding digits the f32 never had.
fn float32(n: f32) -> Result<Value, ConvertError> {
    if !n.is_finite() {
        return Err(ConvertError::UnhandledValue {
            type_name: "non-finite float32".to_string(),
        });
    }
    format!("{:?}", n)
        .parse::<Number>()
        .map(Value::Number)
        .map_err(|_| ConvertError::UnhandledValue {
            type_name: "float32".to_string(),
        })
}

fn float(n: f64, kind: &str) -> Result<Value, ConvertError> {
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| ConvertError::UnhandledValue {
            type_name: format!("non-finite {kind}"),
        })
}
