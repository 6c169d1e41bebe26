//! Implied structural type of a canonical block.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ConvertError;
use crate::schema::{Attribute, Block, NestedType, NestingMode};
use crate::types::CtyType;

/// Compute the object type implied by a block, bottom-up.
///
/// A missing block implies the empty object type.
///
/// # Errors
///
/// Returns `ConvertError::NameCollision` if an attribute and a nested block
/// share a name, `ConvertError::DynamicInSet` if a set-nested block contains
/// dynamic types, and `ConvertError::InvalidNesting` for an unset nesting mode.
pub fn implied_type(block: Option<&Block>) -> Result<CtyType, ConvertError> {
    match block {
        Some(block) => block.implied_type(),
        None => Ok(CtyType::empty_object()),
    }
}

impl Block {
    /// Compute the object type implied by this block.
    ///
    /// See [`implied_type`].
    pub fn implied_type(&self) -> Result<CtyType, ConvertError> {
        let mut atys: BTreeMap<String, CtyType> = BTreeMap::new();

        for attr in &self.attributes {
            atys.insert(attr.name.clone(), attribute_type(attr)?);
        }

        for nested in &self.block_types {
            if atys.contains_key(&nested.type_name) {
                return Err(ConvertError::NameCollision {
                    name: nested.type_name.clone(),
                });
            }

            let child = nested.block.implied_type()?;
            let ty = wrap(&nested.type_name, nested.nesting_mode, child)?;
            atys.insert(nested.type_name.clone(), ty);
        }

        Ok(CtyType::Object {
            attributes: atys,
            optional: BTreeSet::new(),
        })
    }
}

/// The value type of a single attribute, including nested-object attributes.
pub fn attribute_type(attr: &Attribute) -> Result<CtyType, ConvertError> {
    match (&attr.nested_type, &attr.attr_type) {
        (Some(nested), _) => nested_object_type(&attr.name, nested),
        (None, Some(ty)) => Ok(ty.clone()),
        (None, None) => Err(ConvertError::InvalidType {
            path: attr.name.clone(),
            kind: "none".to_string(),
        }),
    }
}

fn nested_object_type(name: &str, nested: &NestedType) -> Result<CtyType, ConvertError> {
    let mut attributes = BTreeMap::new();
    let mut optional = BTreeSet::new();
    for attr in &nested.attributes {
        attributes.insert(attr.name.clone(), attribute_type(attr)?);
        if attr.optional {
            optional.insert(attr.name.clone());
        }
    }
    let object = CtyType::Object {
        attributes,
        optional,
    };
    wrap(name, nested.nesting_mode, object)
}

fn wrap(name: &str, mode: NestingMode, child: CtyType) -> Result<CtyType, ConvertError> {
    match mode {
        NestingMode::Single | NestingMode::Group => Ok(child),
        NestingMode::List => {
            // A list cannot hold elements of differing types.
            if child.has_dynamic_types() {
                Ok(CtyType::Dynamic)
            } else {
                Ok(CtyType::list(child))
            }
        }
        NestingMode::Set => {
            if child.has_dynamic_types() {
                return Err(ConvertError::DynamicInSet {
                    name: name.to_string(),
                });
            }
            Ok(CtyType::set(child))
        }
        NestingMode::Map => {
            if child.has_dynamic_types() {
                Ok(CtyType::Dynamic)
            } else {
                Ok(CtyType::map(child))
            }
        }
        NestingMode::Invalid => Err(ConvertError::InvalidNesting {
            name: name.to_string(),
            mode: mode.to_string(),
        }),
    }
}
