//! Conversion of declarative framework schemas into the canonical tree.
//!
//! Provider, resource and data source schemas share one conversion; only
//! resource schemas read attribute defaults.

use tracing::debug;

use crate::error::ConvertError;
use crate::framework::{self, AttributeKind, BlockNestingMode, DefaultRequest, Provider};
use crate::schema::{Attribute, Block, NestedBlock, NestedType, NestingMode, ProviderSchema, Schema};
use crate::types::CtyType;
use crate::value::{lower, TypedValue};

/// Which kind of schema is being converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    Provider,
    Resource,
    DataSource,
}

impl SchemaVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVariant::Provider => "provider",
            SchemaVariant::Resource => "resource",
            SchemaVariant::DataSource => "data source",
        }
    }

    fn reads_defaults(&self) -> bool {
        matches!(self, SchemaVariant::Resource)
    }
}

/// Convert a provider-level schema.
pub fn provider_schema(schema: &framework::Schema) -> Result<Schema, ConvertError> {
    convert_schema(schema, SchemaVariant::Provider)
}

/// Convert a resource schema, including attribute defaults.
pub fn resource_schema(schema: &framework::Schema) -> Result<Schema, ConvertError> {
    convert_schema(schema, SchemaVariant::Resource)
}

/// Convert a data source schema.
pub fn data_source_schema(schema: &framework::Schema) -> Result<Schema, ConvertError> {
    convert_schema(schema, SchemaVariant::DataSource)
}

/// Convert a framework schema of the given variant.
///
/// # Errors
///
/// Returns a `ConvertError` carrying the dotted field path when an attribute
/// has no requiredness flag, a block has an unset nesting mode, or (for
/// resources) a default provider fails or yields an unusable value.
pub fn convert_schema(
    schema: &framework::Schema,
    variant: SchemaVariant,
) -> Result<Schema, ConvertError> {
    let block = convert_block(&schema.attributes, &schema.blocks, "", variant)?;
    Ok(Schema {
        version: schema.version,
        block,
    })
}

/// Convert a whole provider: its own schema and every resource and data source.
///
/// Resources and data sources are keyed by the type name their metadata
/// reports for the provider's type name.
///
/// # Errors
///
/// Returns `ConvertError::Upstream` when an upstream schema call reports an
/// error diagnostic. Conversion failures of a resource or data source are
/// wrapped with its type name.
pub fn from_provider<P: Provider + ?Sized>(provider: &P) -> Result<ProviderSchema, ConvertError> {
    let type_name = provider.metadata();

    let response = provider.schema();
    if response.diagnostics.has_error() {
        return Err(ConvertError::Upstream {
            kind: SchemaVariant::Provider.as_str(),
            diagnostics: response.diagnostics,
        });
    }

    let resources: Vec<_> = provider.resources().iter().map(|factory| factory()).collect();
    let data_sources: Vec<_> = provider.data_sources().iter().map(|factory| factory()).collect();

    let mut out = ProviderSchema {
        provider: provider_schema(&response.schema)
            .map_err(|e| e.in_schema(SchemaVariant::Provider.as_str(), &type_name))?,
        ..Default::default()
    };

    let kind = SchemaVariant::Resource.as_str();
    for resource in resources {
        let name = resource.metadata(&type_name);
        debug!(resource = %name, "converting resource schema");
        let response = resource.schema();
        if response.diagnostics.has_error() {
            let err = ConvertError::Upstream {
                kind,
                diagnostics: response.diagnostics,
            };
            return Err(err.in_schema(kind, &name));
        }
        let schema = resource_schema(&response.schema).map_err(|e| e.in_schema(kind, &name))?;
        out.resource_schemas.insert(name, schema);
    }

    let kind = SchemaVariant::DataSource.as_str();
    for data_source in data_sources {
        let name = data_source.metadata(&type_name);
        debug!(data_source = %name, "converting data source schema");
        let response = data_source.schema();
        if response.diagnostics.has_error() {
            let err = ConvertError::Upstream {
                kind,
                diagnostics: response.diagnostics,
            };
            return Err(err.in_schema(kind, &name));
        }
        let schema = data_source_schema(&response.schema).map_err(|e| e.in_schema(kind, &name))?;
        out.data_source_schemas.insert(name, schema);
    }

    Ok(out)
}

fn child_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn convert_block<'a>(
    attributes: impl IntoIterator<Item = (&'a String, &'a framework::Attribute)>,
    blocks: impl IntoIterator<Item = (&'a String, &'a framework::Block)>,
    prefix: &str,
    variant: SchemaVariant,
) -> Result<Block, ConvertError> {
    let mut attrs = Vec::new();
    for (name, attr) in attributes {
        attrs.push(convert_attribute(name, &child_path(prefix, name), attr, variant)?);
    }

    let mut block_types = Vec::new();
    for (name, block) in blocks {
        block_types.push(convert_nested_block(name, &child_path(prefix, name), block, variant)?);
    }

    Block::from_parts(attrs, block_types)
}

fn convert_attribute(
    name: &str,
    path: &str,
    attr: &framework::Attribute,
    variant: SchemaVariant,
) -> Result<Attribute, ConvertError> {
    if !attr.required && !attr.optional && !attr.computed {
        return Err(ConvertError::MissingRequiredness {
            path: path.to_string(),
        });
    }

    let mut out = Attribute {
        name: name.to_string(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        ..Default::default()
    };

    if variant.reads_defaults() {
        out.default = default_value(attr, path)?;
    }

    // Round-trip through the transport encoding, the only stable view of a
    // framework type.
    let transport = serde_json::to_vec(&attr.terraform_type()).map_err(|source| {
        ConvertError::TypeDecode {
            path: path.to_string(),
            source,
        }
    })?;
    let attr_type = CtyType::from_transport(&transport).map_err(|source| ConvertError::TypeDecode {
        path: path.to_string(),
        source,
    })?;
    out.attr_type = Some(attr_type);

    let Some((nesting_mode, object)) = attr.nested() else {
        return Ok(out);
    };

    let mut nested = Vec::with_capacity(object.attributes.len());
    for (nested_name, nested_attr) in &object.attributes {
        nested.push(convert_attribute(
            nested_name,
            &child_path(path, nested_name),
            nested_attr,
            variant,
        )?);
    }
    out.nested_type = Some(NestedType::new(nested, nesting_mode));
    out.attr_type = None;

    Ok(out)
}

fn convert_nested_block(
    name: &str,
    path: &str,
    block: &framework::Block,
    variant: SchemaVariant,
) -> Result<NestedBlock, ConvertError> {
    let nesting_mode = match block.nesting_mode {
        BlockNestingMode::List => NestingMode::List,
        BlockNestingMode::Set => NestingMode::Set,
        BlockNestingMode::Single => NestingMode::Single,
        BlockNestingMode::Unknown => {
            return Err(ConvertError::UnrecognizedNestingMode {
                path: path.to_string(),
                mode: "unknown".to_string(),
            })
        }
    };

    let object = &block.nested_object;
    let inner = convert_block(&object.attributes, &object.blocks, path, variant)?;
    Ok(NestedBlock::new(name, nesting_mode, inner))
}

/// Checks that a plan value has the kind an attribute kind expects.
type KindCheck = fn(&TypedValue) -> bool;

fn default_check(path: &str, kind: &AttributeKind) -> Result<KindCheck, ConvertError> {
    let check: KindCheck = match kind {
        AttributeKind::Bool => |v: &TypedValue| matches!(v, TypedValue::Bool(_)),
        AttributeKind::Float32 => |v: &TypedValue| matches!(v, TypedValue::Float32(_)),
        AttributeKind::Float64 => |v: &TypedValue| matches!(v, TypedValue::Float64(_)),
        AttributeKind::Int32 => |v: &TypedValue| matches!(v, TypedValue::Int32(_)),
        AttributeKind::Int64 => |v: &TypedValue| matches!(v, TypedValue::Int64(_)),
        AttributeKind::Number => |v: &TypedValue| matches!(v, TypedValue::Number(_)),
        AttributeKind::String => |v: &TypedValue| matches!(v, TypedValue::String(_)),
        AttributeKind::Dynamic => |_: &TypedValue| true,
        AttributeKind::List { .. } | AttributeKind::ListNested(_) => {
            |v: &TypedValue| matches!(v, TypedValue::List(_))
        }
        AttributeKind::Set { .. } | AttributeKind::SetNested(_) => {
            |v: &TypedValue| matches!(v, TypedValue::Set(_))
        }
        AttributeKind::Map { .. } | AttributeKind::MapNested(_) => {
            |v: &TypedValue| matches!(v, TypedValue::Map(_))
        }
        AttributeKind::Object { .. } | AttributeKind::SingleNested(_) => {
            |v: &TypedValue| matches!(v, TypedValue::Object(_))
        }
        AttributeKind::Custom { name, .. } => {
            return Err(ConvertError::UnhandledDefault {
                path: path.to_string(),
                kind: name.clone(),
            })
        }
    };
    Ok(check)
}

/// Run an attribute's default provider and lower its plan value.
///
/// A null plan value means the attribute has no default.
fn default_value(
    attr: &framework::Attribute,
    path: &str,
) -> Result<Option<serde_json::Value>, ConvertError> {
    let Some(provider) = &attr.default else {
        return Ok(None);
    };
    let check = default_check(path, &attr.kind)?;

    let response = provider.default_value(&DefaultRequest::default());
    if response.diagnostics.has_error() {
        return Err(ConvertError::DefaultDiagnostics {
            path: path.to_string(),
            diagnostics: response.diagnostics,
        });
    }

    let plan = response.plan_value;
    if plan.is_null() {
        return Ok(None);
    }
    if !matches!(plan, TypedValue::Unknown) && !check(&plan) {
        return Err(ConvertError::DefaultMismatch {
            path: path.to_string(),
            kind: attr.kind.name().to_string(),
            actual: plan.kind_name().to_string(),
        });
    }

    let lowered = lower(&plan).map_err(|source| ConvertError::DefaultValue {
        path: path.to_string(),
        source: Box::new(source),
    })?;
    debug!(path, "extracted attribute default");
    Ok(Some(lowered))
}
