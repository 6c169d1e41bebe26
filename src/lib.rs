//! Provider Schema Normalizer
//!
//! Converts Terraform provider schemas into one canonical, serializable tree.
//!
//! Two source representations are supported:
//!
//! - the legacy field-descriptor map ([`legacy`]), where each field's element
//!   slot decides whether it becomes an attribute or a nested block;
//! - the declarative plugin framework ([`framework`]), converted by
//!   [`declarative`], which also extracts static defaults of resource
//!   attributes.
//!
//! Both produce a [`ProviderSchema`] whose attributes and nested blocks are
//! ordered by name. The structural type a block implies can be computed with
//! [`implied_type`].
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use provider_schema::legacy::{self, Elem, LegacyResource, LegacySchema, ValueKind};
//! use provider_schema::{CtyType, NestingMode};
//! use serde_json::json;
//!
//! let mut disk = BTreeMap::new();
//! disk.insert(
//!     "size".to_string(),
//!     LegacySchema { required: true, ..LegacySchema::new(ValueKind::Int) },
//! );
//!
//! let mut fields = BTreeMap::new();
//! fields.insert(
//!     "name".to_string(),
//!     LegacySchema { required: true, ..LegacySchema::new(ValueKind::String) },
//! );
//! fields.insert(
//!     "disk".to_string(),
//!     LegacySchema {
//!         optional: true,
//!         elem: Some(Elem::Resource(LegacyResource { schema_version: 0, schema: disk })),
//!         ..LegacySchema::new(ValueKind::List)
//!     },
//! );
//!
//! let block = legacy::from_schema_map(&fields).unwrap();
//! assert_eq!(block.attribute("name").unwrap().attr_type, Some(CtyType::String));
//! assert_eq!(block.block_type("disk").unwrap().nesting_mode, NestingMode::List);
//!
//! let ty = block.implied_type().unwrap();
//! assert_eq!(
//!     ty.to_json(),
//!     json!(["object", {"disk": ["list", ["object", {"size": "number"}]], "name": "string"}])
//! );
//! ```
//!
//! # Implied Type Rules
//!
//! | Nesting mode | Implied type of a nested block |
//! |--------------|--------------------------------|
//! | `single`, `group` | the child object |
//! | `list` | `list(object)`, or `dynamic` if the child has dynamic types |
//! | `map` | `map(object)`, or `dynamic` if the child has dynamic types |
//! | `set` | `set(object)`; dynamic types inside are an error |

pub mod declarative;
mod error;
pub mod framework;
mod implied_type;
pub mod legacy;
mod loader;
mod schema;
mod types;
mod value;

pub use error::{ConvertError, LoadError};
pub use implied_type::{attribute_type, implied_type};
pub use loader::{
    is_url, load_document, load_document_auto, load_document_str, DocumentProvider,
    ProviderDocument,
};
pub use schema::{Attribute, Block, NestedBlock, NestedType, NestingMode, ProviderSchema, Schema};
pub use types::CtyType;
pub use value::{lower, TypedValue};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
