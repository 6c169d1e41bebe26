//! Legacy field-descriptor maps and their conversion into the canonical tree.
//!
//! A legacy schema is a flat `name -> descriptor` map where each descriptor
//! carries a value kind and an optional element slot. The element slot is
//! what decides whether a field becomes an [`Attribute`] or a
//! [`NestedBlock`]; see [`classify`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::ConvertError;
use crate::schema::{Attribute, Block, NestedBlock, NestingMode, ProviderSchema, Schema};
use crate::types::{json_type_name, CtyType};

/// Value kind of a legacy descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    Invalid,
    Bool,
    Int,
    Float,
    String,
    List,
    Set,
    Map,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Invalid => "invalid",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Set => "set",
            ValueKind::Map => "map",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit attribute/block override on a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigMode {
    #[default]
    Auto,
    Attr,
    Block,
}

pub type DefaultFuncResult = Result<Option<Value>, Box<dyn std::error::Error + Send + Sync>>;

/// Runtime default of a legacy descriptor (typically an environment lookup).
#[derive(Clone)]
pub struct DefaultFunc(Arc<dyn Fn() -> DefaultFuncResult + Send + Sync>);

impl DefaultFunc {
    pub fn new(f: impl Fn() -> DefaultFuncResult + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self) -> DefaultFuncResult {
        (self.0)()
    }
}

impl fmt::Debug for DefaultFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultFunc(..)")
    }
}

/// Element slot of a collection descriptor.
#[derive(Debug, Clone)]
pub enum Elem {
    /// Bare value kind, shorthand for a descriptor of that kind.
    Kind(ValueKind),
    Schema(Box<LegacySchema>),
    Resource(LegacyResource),
}

impl<'de> Deserialize<'de> for Elem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let elem = match &value {
            Value::String(_) => serde_json::from_value(value).map(Elem::Kind),
            Value::Object(map)
                if map.contains_key("schema") || map.contains_key("schema_version") =>
            {
                serde_json::from_value(value).map(Elem::Resource)
            }
            Value::Object(_) => {
                serde_json::from_value(value).map(|s| Elem::Schema(Box::new(s)))
            }
            other => {
                return Err(D::Error::custom(format!(
                    "elem must be a kind, a descriptor or a resource, got {}",
                    json_type_name(other)
                )))
            }
        };
        elem.map_err(D::Error::custom)
    }
}

/// One legacy field descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegacySchema {
    #[serde(rename = "type")]
    pub kind: ValueKind,
    pub elem: Option<Elem>,
    pub config_mode: ConfigMode,

    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    pub sensitive: bool,

    pub default: Option<Value>,
    #[serde(skip)]
    pub default_func: Option<DefaultFunc>,

    pub conflicts_with: Vec<String>,
    pub exactly_one_of: Vec<String>,
    pub at_least_one_of: Vec<String>,
    pub required_with: Vec<String>,

    pub min_items: u64,
    pub max_items: u64,
}

impl LegacySchema {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }
}

/// A legacy resource: a versioned descriptor map.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegacyResource {
    pub schema_version: u64,
    pub schema: BTreeMap<String, LegacySchema>,
}

/// A legacy provider with its resources and data sources.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyProvider {
    #[serde(rename = "provider")]
    pub schema: BTreeMap<String, LegacySchema>,
    #[serde(rename = "resources")]
    pub resources_map: BTreeMap<String, LegacyResource>,
    #[serde(rename = "data_sources")]
    pub data_sources_map: BTreeMap<String, LegacyResource>,
}

/// Shape a descriptor takes in the canonical tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Attribute,
    Block,
}

/// A converted field.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Attribute(Attribute),
    Block(NestedBlock),
}

/// Decide whether a descriptor is an attribute or a nested block.
///
/// Maps of resources are always attributes (they are coerced to
/// `map(string)`). An explicit config mode wins over the element shape, and
/// computed-only fields are attributes regardless of their element.
pub fn classify(descriptor: &LegacySchema) -> FieldShape {
    let Some(elem) = &descriptor.elem else {
        return FieldShape::Attribute;
    };
    if descriptor.kind == ValueKind::Map && matches!(elem, Elem::Resource(_)) {
        return FieldShape::Attribute;
    }
    match descriptor.config_mode {
        ConfigMode::Attr => FieldShape::Attribute,
        ConfigMode::Block => FieldShape::Block,
        ConfigMode::Auto => {
            if descriptor.computed && !descriptor.optional {
                return FieldShape::Attribute;
            }
            match elem {
                Elem::Kind(_) | Elem::Schema(_) => FieldShape::Attribute,
                Elem::Resource(_) => FieldShape::Block,
            }
        }
    }
}

/// Convert a descriptor map into a canonical block.
///
/// # Errors
///
/// Returns a `ConvertError` for descriptors of an invalid kind, block
/// classification of a field without a resource element, or an attribute
/// and block sharing a name.
pub fn from_schema_map(map: &BTreeMap<String, LegacySchema>) -> Result<Block, ConvertError> {
    block_at(map, "")
}

/// Convert a legacy resource, carrying its schema version.
pub fn from_resource(resource: &LegacyResource) -> Result<Schema, ConvertError> {
    Ok(Schema {
        version: resource.schema_version,
        block: from_schema_map(&resource.schema)?,
    })
}

/// Convert a whole legacy provider.
///
/// Resource and data source errors are wrapped with the failing type name.
pub fn from_provider(provider: &LegacyProvider) -> Result<ProviderSchema, ConvertError> {
    let mut out = ProviderSchema {
        provider: Schema {
            version: 0,
            block: from_schema_map(&provider.schema)?,
        },
        ..Default::default()
    };

    for (name, resource) in &provider.resources_map {
        debug!(resource = %name, "converting legacy resource schema");
        let schema = from_resource(resource).map_err(|e| e.in_schema("resource", name))?;
        out.resource_schemas.insert(name.clone(), schema);
    }
    for (name, resource) in &provider.data_sources_map {
        debug!(data_source = %name, "converting legacy data source schema");
        let schema = from_resource(resource).map_err(|e| e.in_schema("data source", name))?;
        out.data_source_schemas.insert(name.clone(), schema);
    }

    Ok(out)
}

/// Convert one named descriptor.
///
/// # Errors
///
/// Returns `ConvertError::MissingRequiredness` if none of required, optional
/// or computed is set. Element-slot descriptors never pass through here and
/// carry no flags.
pub fn convert_field(
    name: &str,
    path: &str,
    descriptor: &LegacySchema,
) -> Result<Field, ConvertError> {
    if !(descriptor.required || descriptor.optional || descriptor.computed) {
        return Err(ConvertError::MissingRequiredness {
            path: path.to_string(),
        });
    }
    match classify(descriptor) {
        FieldShape::Attribute => attribute(name, path, descriptor).map(Field::Attribute),
        FieldShape::Block => nested_block(name, path, descriptor).map(Field::Block),
    }
}

fn block_at(map: &BTreeMap<String, LegacySchema>, prefix: &str) -> Result<Block, ConvertError> {
    let mut attributes = Vec::new();
    let mut block_types = Vec::new();

    for (name, descriptor) in map {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        match convert_field(name, &path, descriptor)? {
            Field::Attribute(attr) => attributes.push(attr),
            Field::Block(block) => block_types.push(block),
        }
    }

    Block::from_parts(attributes, block_types)
}

fn attribute(name: &str, path: &str, descriptor: &LegacySchema) -> Result<Attribute, ConvertError> {
    let mut required = descriptor.required;
    let mut optional = descriptor.optional;
    if required {
        if let Some(default_func) = &descriptor.default_func {
            match default_func.call() {
                Ok(Some(value)) if !value.is_null() => {
                    debug!(path, "default function yields a value, demoting to optional");
                    required = false;
                    optional = true;
                }
                Ok(_) => {}
                Err(err) => {
                    debug!(path, error = %err, "default function failed, attribute stays required");
                }
            }
        }
    }

    let attr_type = match (&descriptor.kind, &descriptor.elem) {
        (ValueKind::Map, Some(Elem::Resource(_))) => {
            debug!(path, "map of resource coerced to map(string)");
            CtyType::map(CtyType::String)
        }
        _ => value_type(descriptor, path)?,
    };

    Ok(Attribute {
        name: name.to_string(),
        attr_type: Some(attr_type),
        nested_type: None,
        required,
        optional,
        computed: descriptor.computed,
        force_new: descriptor.force_new,
        default: descriptor.default.clone(),
        sensitive: descriptor.sensitive,
        conflicts_with: descriptor.conflicts_with.clone(),
        exactly_one_of: descriptor.exactly_one_of.clone(),
        at_least_one_of: descriptor.at_least_one_of.clone(),
        required_with: descriptor.required_with.clone(),
    })
}

fn nested_block(
    name: &str,
    path: &str,
    descriptor: &LegacySchema,
) -> Result<NestedBlock, ConvertError> {
    let Some(Elem::Resource(resource)) = &descriptor.elem else {
        return Err(ConvertError::InvalidElement {
            path: path.to_string(),
            message: "a block needs a resource element".to_string(),
        });
    };

    let nesting_mode = match descriptor.kind {
        ValueKind::List => NestingMode::List,
        ValueKind::Set => NestingMode::Set,
        ValueKind::Map => NestingMode::Map,
        other => {
            return Err(ConvertError::InvalidElement {
                path: path.to_string(),
                message: format!("type {} cannot hold a resource element", other),
            })
        }
    };

    let mut min_items = descriptor.min_items;
    let mut max_items = descriptor.max_items;
    if descriptor.required && min_items == 0 {
        min_items = 1;
    }
    if descriptor.optional && min_items > 0 {
        min_items = 0;
    }
    if descriptor.computed && !descriptor.optional {
        min_items = 0;
        max_items = 0;
    }

    Ok(NestedBlock {
        type_name: name.to_string(),
        nesting_mode,
        block: block_at(&resource.schema, path)?,
        required: descriptor.required,
        optional: descriptor.optional,
        computed: descriptor.computed,
        force_new: descriptor.force_new,
        conflicts_with: descriptor.conflicts_with.clone(),
        exactly_one_of: descriptor.exactly_one_of.clone(),
        at_least_one_of: descriptor.at_least_one_of.clone(),
        required_with: descriptor.required_with.clone(),
        min_items,
        max_items,
    })
}

/// Semantic type of a descriptor's value.
fn value_type(descriptor: &LegacySchema, path: &str) -> Result<CtyType, ConvertError> {
    match descriptor.kind {
        ValueKind::String => Ok(CtyType::String),
        ValueKind::Bool => Ok(CtyType::Bool),
        ValueKind::Int | ValueKind::Float => Ok(CtyType::Number),
        ValueKind::List | ValueKind::Set | ValueKind::Map => {
            let elem = match &descriptor.elem {
                None => CtyType::String,
                Some(Elem::Kind(kind)) => value_type(&LegacySchema::new(*kind), path)?,
                Some(Elem::Schema(inner)) => value_type(inner, path)?,
                Some(Elem::Resource(resource)) => block_at(&resource.schema, path)?.implied_type()?,
            };
            Ok(match descriptor.kind {
                ValueKind::List => CtyType::list(elem),
                ValueKind::Set => CtyType::set(elem),
                _ => CtyType::map(elem),
            })
        }
        ValueKind::Invalid => Err(ConvertError::InvalidType {
            path: path.to_string(),
            kind: descriptor.kind.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(entries: Vec<(&str, LegacySchema)>) -> BTreeMap<String, LegacySchema> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn resource(schema: BTreeMap<String, LegacySchema>) -> Elem {
        Elem::Resource(LegacyResource {
            schema_version: 0,
            schema,
        })
    }

    fn empty_resource() -> Elem {
        resource(BTreeMap::new())
    }

    fn elem_schema(kind: ValueKind) -> Option<Elem> {
        Some(Elem::Schema(Box::new(LegacySchema::new(kind))))
    }

    // === Classification Tests ===

    #[test]
    fn classify_without_elem_is_attribute() {
        assert_eq!(
            classify(&LegacySchema::new(ValueKind::String)),
            FieldShape::Attribute
        );
    }

    #[test]
    fn classify_resource_elem_is_block() {
        let d = LegacySchema {
            elem: Some(empty_resource()),
            optional: true,
            ..LegacySchema::new(ValueKind::List)
        };
        assert_eq!(classify(&d), FieldShape::Block);
    }

    #[test]
    fn classify_computed_only_is_attribute() {
        let d = LegacySchema {
            elem: Some(empty_resource()),
            computed: true,
            ..LegacySchema::new(ValueKind::List)
        };
        assert_eq!(classify(&d), FieldShape::Attribute);
    }

    #[test]
    fn classify_config_mode_overrides_shape() {
        let d = LegacySchema {
            elem: Some(empty_resource()),
            optional: true,
            config_mode: ConfigMode::Attr,
            ..LegacySchema::new(ValueKind::List)
        };
        assert_eq!(classify(&d), FieldShape::Attribute);
    }

    #[test]
    fn classify_map_of_resource_ignores_config_mode() {
        let d = LegacySchema {
            elem: Some(empty_resource()),
            config_mode: ConfigMode::Block,
            ..LegacySchema::new(ValueKind::Map)
        };
        assert_eq!(classify(&d), FieldShape::Attribute);
    }

    // === Conversion Tests ===

    #[test]
    fn empty_map() {
        assert_eq!(from_schema_map(&BTreeMap::new()).unwrap(), Block::default());
    }

    #[test]
    fn primitives() {
        let block = from_schema_map(&map(vec![
            (
                "int",
                LegacySchema {
                    required: true,
                    ..LegacySchema::new(ValueKind::Int)
                },
            ),
            (
                "float",
                LegacySchema {
                    optional: true,
                    ..LegacySchema::new(ValueKind::Float)
                },
            ),
            (
                "bool",
                LegacySchema {
                    computed: true,
                    ..LegacySchema::new(ValueKind::Bool)
                },
            ),
        ]))
        .unwrap();

        let names: Vec<_> = block.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["bool", "float", "int"]);
        let int = block.attribute("int").unwrap();
        assert_eq!(int.attr_type, Some(CtyType::Number));
        assert!(int.required);
        assert_eq!(block.attribute("bool").unwrap().attr_type, Some(CtyType::Bool));
    }

    #[test]
    fn collections_with_and_without_elem() {
        let block = from_schema_map(&map(vec![
            (
                "list",
                LegacySchema {
                    elem: elem_schema(ValueKind::Int),
                    required: true,
                    ..LegacySchema::new(ValueKind::List)
                },
            ),
            (
                "shorthand",
                LegacySchema {
                    elem: Some(Elem::Kind(ValueKind::Bool)),
                    optional: true,
                    ..LegacySchema::new(ValueKind::Set)
                },
            ),
            (
                "map_default_type",
                LegacySchema {
                    optional: true,
                    ..LegacySchema::new(ValueKind::Map)
                },
            ),
        ]))
        .unwrap();

        assert_eq!(
            block.attribute("list").unwrap().attr_type,
            Some(CtyType::list(CtyType::Number))
        );
        assert_eq!(
            block.attribute("shorthand").unwrap().attr_type,
            Some(CtyType::set(CtyType::Bool))
        );
        assert_eq!(
            block.attribute("map_default_type").unwrap().attr_type,
            Some(CtyType::map(CtyType::String))
        );
    }

    #[test]
    fn map_of_resource_becomes_string_map() {
        let block = from_schema_map(&map(vec![(
            "labels",
            LegacySchema {
                elem: Some(resource(map(vec![(
                    "x",
                    LegacySchema {
                        optional: true,
                        ..LegacySchema::new(ValueKind::Int)
                    },
                )]))),
                optional: true,
                conflicts_with: vec!["tags".into()],
                required_with: vec!["name".into()],
                ..LegacySchema::new(ValueKind::Map)
            },
        )]))
        .unwrap();

        assert!(block.block_types.is_empty());
        let labels = block.attribute("labels").unwrap();
        assert_eq!(labels.attr_type, Some(CtyType::map(CtyType::String)));
        assert!(labels.optional);
        assert_eq!(labels.conflicts_with, ["tags"]);
        assert_eq!(labels.required_with, ["name"]);
    }

    #[test]
    fn sub_resource_collections_apply_min_items_rules() {
        let block = from_schema_map(&map(vec![
            (
                "list",
                LegacySchema {
                    elem: Some(empty_resource()),
                    required: true,
                    min_items: 1,
                    max_items: 2,
                    ..LegacySchema::new(ValueKind::List)
                },
            ),
            (
                "set",
                LegacySchema {
                    elem: Some(empty_resource()),
                    required: true,
                    ..LegacySchema::new(ValueKind::Set)
                },
            ),
            (
                "opt",
                LegacySchema {
                    elem: Some(empty_resource()),
                    optional: true,
                    min_items: 1,
                    max_items: 1,
                    ..LegacySchema::new(ValueKind::List)
                },
            ),
        ]))
        .unwrap();

        let list = block.block_type("list").unwrap();
        assert_eq!(list.nesting_mode, NestingMode::List);
        assert_eq!((list.min_items, list.max_items), (1, 2));
        assert!(list.required);

        let set = block.block_type("set").unwrap();
        assert_eq!(set.nesting_mode, NestingMode::Set);
        assert_eq!(set.min_items, 1);

        let opt = block.block_type("opt").unwrap();
        assert_eq!((opt.min_items, opt.max_items), (0, 1));
        assert!(opt.optional);
    }

    #[test]
    fn computed_sub_resource_is_object_collection_attribute() {
        let block = from_schema_map(&map(vec![(
            "list",
            LegacySchema {
                elem: Some(empty_resource()),
                computed: true,
                min_items: 1,
                max_items: 1,
                ..LegacySchema::new(ValueKind::List)
            },
        )]))
        .unwrap();

        let list = block.attribute("list").unwrap();
        assert_eq!(
            list.attr_type,
            Some(CtyType::list(CtyType::empty_object()))
        );
        assert!(list.computed);
    }

    #[test]
    fn computed_block_zeroes_item_bounds() {
        let block = from_schema_map(&map(vec![(
            "list",
            LegacySchema {
                elem: Some(empty_resource()),
                computed: true,
                config_mode: ConfigMode::Block,
                min_items: 1,
                max_items: 3,
                ..LegacySchema::new(ValueKind::List)
            },
        )]))
        .unwrap();

        let list = block.block_type("list").unwrap();
        assert_eq!((list.min_items, list.max_items), (0, 0));
    }

    #[test]
    fn nested_attributes_and_blocks() {
        let inner = map(vec![
            (
                "bar",
                LegacySchema {
                    elem: Some(Elem::Schema(Box::new(LegacySchema {
                        elem: elem_schema(ValueKind::String),
                        ..LegacySchema::new(ValueKind::List)
                    }))),
                    required: true,
                    ..LegacySchema::new(ValueKind::List)
                },
            ),
            (
                "baz",
                LegacySchema {
                    elem: Some(empty_resource()),
                    optional: true,
                    ..LegacySchema::new(ValueKind::Set)
                },
            ),
        ]);
        let block = from_schema_map(&map(vec![(
            "foo",
            LegacySchema {
                elem: Some(resource(inner)),
                required: true,
                ..LegacySchema::new(ValueKind::List)
            },
        )]))
        .unwrap();

        let foo = block.block_type("foo").unwrap();
        assert_eq!(foo.min_items, 1);
        assert_eq!(
            foo.block.attribute("bar").unwrap().attr_type,
            Some(CtyType::list(CtyType::list(CtyType::String)))
        );
        let baz = foo.block.block_type("baz").unwrap();
        assert_eq!(baz.nesting_mode, NestingMode::Set);
        assert!(baz.optional);
    }

    #[test]
    fn flags_defaults_and_constraints_are_copied() {
        let block = from_schema_map(&map(vec![
            (
                "secret",
                LegacySchema {
                    optional: true,
                    sensitive: true,
                    force_new: true,
                    default: Some(json!("foo")),
                    conflicts_with: vec!["other".into()],
                    ..LegacySchema::new(ValueKind::String)
                },
            ),
            (
                "other",
                LegacySchema {
                    optional: true,
                    at_least_one_of: vec!["secret".into(), "other".into()],
                    required_with: vec!["secret".into()],
                    exactly_one_of: vec!["other".into()],
                    ..LegacySchema::new(ValueKind::Int)
                },
            ),
        ]))
        .unwrap();

        let secret = block.attribute("secret").unwrap();
        assert!(secret.sensitive);
        assert!(secret.force_new);
        assert_eq!(secret.default, Some(json!("foo")));
        assert_eq!(secret.conflicts_with, ["other"]);

        let other = block.attribute("other").unwrap();
        assert_eq!(other.at_least_one_of, ["secret", "other"]);
        assert_eq!(other.required_with, ["secret"]);
        assert_eq!(other.exactly_one_of, ["other"]);
    }

    // === Requiredness Tests ===

    fn required_with_default(f: DefaultFunc) -> BTreeMap<String, LegacySchema> {
        map(vec![(
            "string",
            LegacySchema {
                required: true,
                default_func: Some(f),
                ..LegacySchema::new(ValueKind::String)
            },
        )])
    }

    #[test]
    fn default_func_returning_nothing_keeps_required() {
        let block = from_schema_map(&required_with_default(DefaultFunc::new(|| Ok(None)))).unwrap();
        let attr = block.attribute("string").unwrap();
        assert!(attr.required);
        assert!(!attr.optional);
    }

    #[test]
    fn default_func_returning_value_demotes_to_optional() {
        let block =
            from_schema_map(&required_with_default(DefaultFunc::new(|| Ok(Some(json!("boop"))))))
                .unwrap();
        let attr = block.attribute("string").unwrap();
        assert!(!attr.required);
        assert!(attr.optional);
    }

    #[test]
    fn default_func_error_keeps_required() {
        let block = from_schema_map(&required_with_default(DefaultFunc::new(|| {
            Err("placeholder error".into())
        })))
        .unwrap();
        assert!(block.attribute("string").unwrap().required);
    }

    // === Error Tests ===

    #[test]
    fn invalid_kind_is_fatal() {
        let result = from_schema_map(&map(vec![(
            "x",
            LegacySchema {
                optional: true,
                ..LegacySchema::default()
            },
        )]));
        assert!(matches!(
            result,
            Err(ConvertError::InvalidType { path, .. }) if path == "x"
        ));
    }

    #[test]
    fn block_mode_without_resource_is_fatal() {
        let result = from_schema_map(&map(vec![(
            "x",
            LegacySchema {
                elem: elem_schema(ValueKind::String),
                config_mode: ConfigMode::Block,
                optional: true,
                ..LegacySchema::new(ValueKind::List)
            },
        )]));
        assert!(matches!(result, Err(ConvertError::InvalidElement { .. })));
    }

    #[test]
    fn resource_on_scalar_kind_is_fatal() {
        let result = from_schema_map(&map(vec![(
            "x",
            LegacySchema {
                elem: Some(empty_resource()),
                optional: true,
                ..LegacySchema::new(ValueKind::String)
            },
        )]));
        assert!(matches!(result, Err(ConvertError::InvalidElement { .. })));
    }

    #[test]
    fn nested_error_reports_dotted_path() {
        let inner = map(vec![("bad", LegacySchema::new(ValueKind::String))]);
        let result = from_schema_map(&map(vec![(
            "outer",
            LegacySchema {
                elem: Some(resource(inner)),
                optional: true,
                ..LegacySchema::new(ValueKind::List)
            },
        )]));
        assert!(matches!(
            result,
            Err(ConvertError::MissingRequiredness { path }) if path == "outer.bad"
        ));
    }

    #[test]
    fn field_without_requiredness_is_fatal() {
        let result = from_schema_map(&map(vec![("name", LegacySchema::new(ValueKind::String))]));
        assert!(matches!(
            result,
            Err(ConvertError::MissingRequiredness { path }) if path == "name"
        ));
    }

    #[test]
    fn block_without_requiredness_is_fatal() {
        let result = from_schema_map(&map(vec![(
            "disk",
            LegacySchema {
                elem: Some(empty_resource()),
                config_mode: ConfigMode::Block,
                ..LegacySchema::new(ValueKind::List)
            },
        )]));
        assert!(matches!(
            result,
            Err(ConvertError::MissingRequiredness { path }) if path == "disk"
        ));
    }

    #[test]
    fn element_descriptor_needs_no_flags() {
        let block = from_schema_map(&map(vec![(
            "ports",
            LegacySchema {
                elem: elem_schema(ValueKind::Int),
                optional: true,
                ..LegacySchema::new(ValueKind::List)
            },
        )]))
        .unwrap();
        assert_eq!(
            block.attribute("ports").unwrap().attr_type,
            Some(CtyType::list(CtyType::Number))
        );
    }

    // === Provider Tests ===

    #[test]
    fn from_provider_carries_versions() {
        let mut provider = LegacyProvider::default();
        provider.schema.insert(
            "region".into(),
            LegacySchema {
                optional: true,
                ..LegacySchema::new(ValueKind::String)
            },
        );
        provider.resources_map.insert(
            "foo_instance".into(),
            LegacyResource {
                schema_version: 3,
                schema: map(vec![(
                    "name",
                    LegacySchema {
                        required: true,
                        ..LegacySchema::new(ValueKind::String)
                    },
                )]),
            },
        );
        provider
            .data_sources_map
            .insert("foo_image".into(), LegacyResource::default());

        let schema = from_provider(&provider).unwrap();
        assert!(schema.provider.block.attribute("region").is_some());
        assert_eq!(schema.resource("foo_instance").unwrap().version, 3);
        assert!(schema.data_source("foo_image").unwrap().block.is_empty());
    }

    #[test]
    fn from_provider_names_failing_resource() {
        let mut provider = LegacyProvider::default();
        provider.resources_map.insert(
            "foo_broken".into(),
            LegacyResource {
                schema_version: 0,
                schema: map(vec![(
                    "x",
                    LegacySchema {
                        optional: true,
                        ..LegacySchema::default()
                    },
                )]),
            },
        );
        let err = from_provider(&provider).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("converting resource schema (foo_broken)"));
    }

    // === Deserialization Tests ===

    #[test]
    fn descriptor_from_json() {
        let d: LegacySchema = serde_json::from_value(json!({
            "type": "list",
            "elem": {"schema": {"port": {"type": "int", "required": true}}},
            "optional": true,
            "max_items": 1
        }))
        .unwrap();
        assert_eq!(d.kind, ValueKind::List);
        assert!(matches!(d.elem, Some(Elem::Resource(_))));
        assert_eq!(d.max_items, 1);

        let d: LegacySchema =
            serde_json::from_value(json!({"type": "set", "elem": "string"})).unwrap();
        assert!(matches!(d.elem, Some(Elem::Kind(ValueKind::String))));

        let d: LegacySchema =
            serde_json::from_value(json!({"type": "list", "elem": {"type": "int"}})).unwrap();
        assert!(matches!(d.elem, Some(Elem::Schema(_))));
    }

    #[test]
    fn descriptor_rejects_misspelled_flag() {
        let result: Result<LegacySchema, _> =
            serde_json::from_value(json!({"type": "string", "requried": true}));
        assert!(result.unwrap_err().to_string().contains("requried"));
    }

    #[test]
    fn elem_with_only_schema_version_is_resource() {
        let d: LegacySchema = serde_json::from_value(json!({
            "type": "list",
            "optional": true,
            "elem": {"schema_version": 1}
        }))
        .unwrap();
        assert!(matches!(
            d.elem,
            Some(Elem::Resource(LegacyResource { schema_version: 1, .. }))
        ));

        let block = from_schema_map(&map(vec![("x", d)])).unwrap();
        assert_eq!(block.block_type("x").unwrap().nesting_mode, NestingMode::List);
    }

    #[test]
    fn descriptor_rejects_bad_elem() {
        let result: Result<LegacySchema, _> =
            serde_json::from_value(json!({"type": "list", "elem": 5}));
        assert!(result.is_err());
    }
}
