//! Semantic type descriptors for schema attributes.
//!
//! [`CtyType`] is the structural type carried by canonical attributes. It
//! travels over the wire in the same JSON encoding the plugin protocol uses
//! for attribute types:
//!
//! | Type | Transport JSON |
//! |------|----------------|
//! | primitive | `"string"`, `"number"`, `"bool"` |
//! | dynamic | `"dynamic"` |
//! | collection | `["list", T]`, `["set", T]`, `["map", T]` |
//! | object | `["object", {"a": T}]` or `["object", {"a": T}, ["a"]]` |
//! | tuple | `["tuple", [T, U]]` |

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Structural type of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CtyType {
    Bool,
    Number,
    String,
    /// Placeholder for a type only known at runtime.
    Dynamic,
    List(Box<CtyType>),
    Set(Box<CtyType>),
    Map(Box<CtyType>),
    Object {
        attributes: BTreeMap<String, CtyType>,
        /// Names of attributes that may be omitted.
        optional: BTreeSet<String>,
    },
    Tuple(Vec<CtyType>),
}

impl CtyType {
    pub fn list(element: CtyType) -> Self {
        Self::List(Box::new(element))
    }

    pub fn set(element: CtyType) -> Self {
        Self::Set(Box::new(element))
    }

    pub fn map(element: CtyType) -> Self {
        Self::Map(Box::new(element))
    }

    /// Object type with every attribute mandatory.
    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, CtyType)>,
        K: Into<String>,
    {
        Self::Object {
            attributes: attributes.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            optional: BTreeSet::new(),
        }
    }

    /// The object type with no attributes.
    pub fn empty_object() -> Self {
        Self::Object {
            attributes: BTreeMap::new(),
            optional: BTreeSet::new(),
        }
    }

    pub fn tuple(elements: Vec<CtyType>) -> Self {
        Self::Tuple(elements)
    }

    /// Returns true if this type is, or contains, [`CtyType::Dynamic`].
    pub fn has_dynamic_types(&self) -> bool {
        match self {
            CtyType::Dynamic => true,
            CtyType::Bool | CtyType::Number | CtyType::String => false,
            CtyType::List(elem) | CtyType::Set(elem) | CtyType::Map(elem) => {
                elem.has_dynamic_types()
            }
            CtyType::Object { attributes, .. } => {
                attributes.values().any(CtyType::has_dynamic_types)
            }
            CtyType::Tuple(elems) => elems.iter().any(CtyType::has_dynamic_types),
        }
    }

    /// Encode this type as transport JSON.
    pub fn to_json(&self) -> Value {
        match self {
            CtyType::Bool => json!("bool"),
            CtyType::Number => json!("number"),
            CtyType::String => json!("string"),
            CtyType::Dynamic => json!("dynamic"),
            CtyType::List(elem) => json!(["list", elem.to_json()]),
            CtyType::Set(elem) => json!(["set", elem.to_json()]),
            CtyType::Map(elem) => json!(["map", elem.to_json()]),
            CtyType::Object {
                attributes,
                optional,
            } => {
                let attrs: Map<String, Value> = attributes
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_json()))
                    .collect();
                if optional.is_empty() {
                    json!(["object", attrs])
                } else {
                    json!(["object", attrs, optional])
                }
            }
            CtyType::Tuple(elems) => {
                let elems: Vec<Value> = elems.iter().map(CtyType::to_json).collect();
                json!(["tuple", elems])
            }
        }
    }

    /// Decode a type from its transport encoding.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if the bytes are not JSON or do not
    /// describe a type.
    pub fn from_transport(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    fn from_json(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) => match s.as_str() {
                "bool" => Ok(CtyType::Bool),
                "number" => Ok(CtyType::Number),
                "string" => Ok(CtyType::String),
                "dynamic" => Ok(CtyType::Dynamic),
                other => Err(format!("invalid primitive type name {other:?}")),
            },
            Value::Array(parts) => {
                let Some(kind) = parts.first().and_then(Value::as_str) else {
                    return Err("type constructor must start with a string".to_string());
                };
                match (kind, parts.len()) {
                    ("list", 2) => Ok(CtyType::list(Self::from_json(&parts[1])?)),
                    ("set", 2) => Ok(CtyType::set(Self::from_json(&parts[1])?)),
                    ("map", 2) => Ok(CtyType::map(Self::from_json(&parts[1])?)),
                    ("object", 2 | 3) => {
                        let Value::Object(raw) = &parts[1] else {
                            return Err(format!(
                                "object attributes must be an object, got {}",
                                json_type_name(&parts[1])
                            ));
                        };
                        let mut attributes = BTreeMap::new();
                        for (name, ty) in raw {
                            attributes.insert(name.clone(), Self::from_json(ty)?);
                        }
                        let mut optional = BTreeSet::new();
                        if let Some(opt) = parts.get(2) {
                            let names = opt
                                .as_array()
                                .ok_or("optional attribute list must be an array")?;
                            for name in names {
                                let name = name
                                    .as_str()
                                    .ok_or("optional attribute names must be strings")?;
                                if !attributes.contains_key(name) {
                                    return Err(format!(
                                        "optional attribute {name:?} is not declared"
                                    ));
                                }
                                optional.insert(name.to_string());
                            }
                        }
                        Ok(CtyType::Object {
                            attributes,
                            optional,
                        })
                    }
                    ("tuple", 2) => {
                        let elems = parts[1]
                            .as_array()
                            .ok_or("tuple elements must be an array")?;
                        let elems = elems
                            .iter()
                            .map(Self::from_json)
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(CtyType::Tuple(elems))
                    }
                    (other, n) => Err(format!(
                        "invalid type constructor {other:?} with {} argument(s)",
                        n - 1
                    )),
                }
            }
            other => Err(format!(
                "type must be a string or array, got {}",
                json_type_name(other)
            )),
        }
    }
}

impl Serialize for CtyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CtyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        CtyType::from_json(&value).map_err(de::Error::custom)
    }
}

impl fmt::Display for CtyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtyType::Bool => f.write_str("bool"),
            CtyType::Number => f.write_str("number"),
            CtyType::String => f.write_str("string"),
            CtyType::Dynamic => f.write_str("dynamic"),
            CtyType::List(elem) => write!(f, "list({elem})"),
            CtyType::Set(elem) => write!(f, "set({elem})"),
            CtyType::Map(elem) => write!(f, "map({elem})"),
            CtyType::Object {
                attributes,
                optional,
            } => {
                f.write_str("object({")?;
                for (i, (name, ty)) in attributes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if optional.contains(name) {
                        write!(f, "{name}: optional({ty})")?;
                    } else {
                        write!(f, "{name}: {ty}")?;
                    }
                }
                f.write_str("})")
            }
            CtyType::Tuple(elems) => {
                f.write_str("tuple([")?;
                for (i, ty) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str("])")
            }
        }
    }
}
