//! Canonical schema tree.
//!
//! Every conversion produces a fresh [`ProviderSchema`]. Attributes and
//! nested blocks are kept in name order so serialized output is reproducible
//! regardless of how the source representation iterated its fields.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConvertError;
use crate::types::CtyType;

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// Repetition discipline of a nested block or nested-object attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingMode {
    /// Not set. Never produced by a successful conversion.
    #[default]
    Invalid,
    Single,
    Group,
    List,
    Set,
    Map,
}

impl NestingMode {
    pub fn is_invalid(&self) -> bool {
        matches!(self, NestingMode::Invalid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NestingMode::Invalid => "invalid",
            NestingMode::Single => "single",
            NestingMode::Group => "group",
            NestingMode::List => "list",
            NestingMode::Set => "set",
            NestingMode::Map => "map",
        }
    }
}

impl fmt::Display for NestingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schemas of a provider, its resources and its data sources.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProviderSchema {
    pub provider: Schema,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_schemas: BTreeMap<String, Schema>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data_source_schemas: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    pub fn resource(&self, type_name: &str) -> Option<&Schema> {
        self.resource_schemas.get(type_name)
    }

    pub fn data_source(&self, type_name: &str) -> Option<&Schema> {
        self.data_source_schemas.get(type_name)
    }
}

/// Configuration shape of one provider, resource or data source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub version: u64,
    #[serde(default)]
    pub block: Block,
}

/// Attributes and nested blocks at one level of a schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_types: Vec<NestedBlock>,
}

impl Block {
    /// Assemble a block from converted fields.
    ///
    /// Both sequences are sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::NameCollision` if an attribute and a nested
    /// block share a name.
    pub fn from_parts(
        attributes: Vec<Attribute>,
        block_types: Vec<NestedBlock>,
    ) -> Result<Self, ConvertError> {
        let names: BTreeSet<&str> = attributes.iter().map(|a| a.name.as_str()).collect();
        if let Some(clash) = block_types
            .iter()
            .find(|b| names.contains(b.type_name.as_str()))
        {
            return Err(ConvertError::NameCollision {
                name: clash.type_name.clone(),
            });
        }

        let mut block = Block {
            attributes,
            block_types,
        };
        block.sort();
        Ok(block)
    }

    /// Order attributes and nested blocks by name.
    pub fn sort(&mut self) {
        self.attributes.sort_by(|a, b| a.name.cmp(&b.name));
        self.block_types.sort_by(|a, b| a.type_name.cmp(&b.type_name));
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn block_type(&self, type_name: &str) -> Option<&NestedBlock> {
        self.block_types.iter().find(|b| b.type_name == type_name)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.block_types.is_empty()
    }
}

/// A leaf or nested-object field.
///
/// `attr_type` and `nested_type` are mutually exclusive: attributes whose
/// value is a nested object describe it through `nested_type` only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub attr_type: Option<CtyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_type: Option<NestedType>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub computed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub force_new: bool,

    /// Default value, already lowered to plain JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub sensitive: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts_with: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exactly_one_of: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub at_least_one_of: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_with: Vec<String>,
}

impl Attribute {
    /// Create an attribute of a plain type with no flags set.
    pub fn new(name: impl Into<String>, attr_type: CtyType) -> Self {
        Self {
            name: name.into(),
            attr_type: Some(attr_type),
            ..Default::default()
        }
    }
}

/// Object value of a nested attribute.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NestedType {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    pub nesting_mode: NestingMode,
}

impl NestedType {
    /// Create a nested object, ordering its attributes by name.
    pub fn new(mut attributes: Vec<Attribute>, nesting_mode: NestingMode) -> Self {
        attributes.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            attributes,
            nesting_mode,
        }
    }
}

/// A repeatable (or single) group of fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NestedBlock {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "NestingMode::is_invalid")]
    pub nesting_mode: NestingMode,
    #[serde(default)]
    pub block: Block,

    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub computed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub force_new: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts_with: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exactly_one_of: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub at_least_one_of: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_with: Vec<String>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub min_items: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_items: u64,
}

impl NestedBlock {
    /// Create a nested block with no flags or bounds set.
    pub fn new(type_name: impl Into<String>, nesting_mode: NestingMode, block: Block) -> Self {
        Self {
            type_name: type_name.into(),
            nesting_mode,
            block,
            ..Default::default()
        }
    }
}
