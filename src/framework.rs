//! Schema model of the declarative plugin framework.
//!
//! These types are the read-only input of the declarative converter. A
//! framework schema is a tree of typed attributes and blocks; resource-level
//! attributes may carry a [`DefaultProvider`] that computes the value used
//! when the practitioner leaves the field unset.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::ConvertError;
use crate::schema::NestingMode;
use crate::types::json_type_name;
use crate::value::TypedValue;

/// Value type of a framework attribute.
///
/// The framework distinguishes numeric widths; they all travel as the
/// transport type `"number"`.
///
/// Deserializes from a primitive name (`"int32"`) or a single-key object
/// (`{"list": "string"}`, `{"object": {"a": "bool"}}`, `{"tuple": [...]}`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FwType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    Number,
    String,
    Dynamic,
    List(Box<FwType>),
    Set(Box<FwType>),
    Map(Box<FwType>),
    Object(BTreeMap<String, FwType>),
    Tuple(Vec<FwType>),
}

impl FwType {
    pub fn list(element: FwType) -> Self {
        Self::List(Box::new(element))
    }

    pub fn set(element: FwType) -> Self {
        Self::Set(Box::new(element))
    }

    pub fn map(element: FwType) -> Self {
        Self::Map(Box::new(element))
    }

    pub fn object<I, K>(attribute_types: I) -> Self
    where
        I: IntoIterator<Item = (K, FwType)>,
        K: Into<String>,
    {
        Self::Object(
            attribute_types
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Encode this type in the plugin protocol's transport JSON.
    pub fn terraform_type(&self) -> Value {
        match self {
            FwType::Bool => json!("bool"),
            FwType::Int32 | FwType::Int64 | FwType::Float32 | FwType::Float64 | FwType::Number => {
                json!("number")
            }
            FwType::String => json!("string"),
            FwType::Dynamic => json!("dynamic"),
            FwType::List(elem) => json!(["list", elem.terraform_type()]),
            FwType::Set(elem) => json!(["set", elem.terraform_type()]),
            FwType::Map(elem) => json!(["map", elem.terraform_type()]),
            FwType::Object(attrs) => {
                let attrs: Map<String, Value> = attrs
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.terraform_type()))
                    .collect();
                json!(["object", attrs])
            }
            FwType::Tuple(elems) => {
                let elems: Vec<Value> = elems.iter().map(FwType::terraform_type).collect();
                json!(["tuple", elems])
            }
        }
    }

    /// Build a typed value of this type from plain JSON.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::DefaultMismatch` when the JSON does not fit
    /// this type.
    pub fn value_from_json(&self, value: &Value, path: &str) -> Result<TypedValue, ConvertError> {
        let mismatch = || ConvertError::DefaultMismatch {
            path: path.to_string(),
            kind: self.to_string(),
            actual: json_type_name(value).to_string(),
        };

        if value.is_null() {
            return Ok(TypedValue::Null);
        }

        match self {
            FwType::Bool => value.as_bool().map(TypedValue::Bool).ok_or_else(mismatch),
            FwType::Int32 => value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(TypedValue::Int32)
                .ok_or_else(mismatch),
            FwType::Int64 => value.as_i64().map(TypedValue::Int64).ok_or_else(mismatch),
            FwType::Float32 => value
                .as_f64()
                .map(|n| TypedValue::Float32(n as f32))
                .ok_or_else(mismatch),
            FwType::Float64 => value.as_f64().map(TypedValue::Float64).ok_or_else(mismatch),
            FwType::Number => match value {
                Value::Number(n) => Ok(TypedValue::Number(n.clone())),
                _ => Err(mismatch()),
            },
            FwType::String => value
                .as_str()
                .map(|s| TypedValue::String(s.to_string()))
                .ok_or_else(mismatch),
            FwType::Dynamic => Ok(TypedValue::Dynamic(Box::new(infer(value)))),
            FwType::List(elem) | FwType::Set(elem) => {
                let items = value.as_array().ok_or_else(mismatch)?;
                let items = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| elem.value_from_json(item, &format!("{path}[{i}]")))
                    .collect::<Result<Vec<_>, _>>()?;
                if matches!(self, FwType::Set(_)) {
                    Ok(TypedValue::Set(items))
                } else {
                    Ok(TypedValue::List(items))
                }
            }
            FwType::Map(elem) => {
                let entries = value.as_object().ok_or_else(mismatch)?;
                let mut out = BTreeMap::new();
                for (key, item) in entries {
                    out.insert(
                        key.clone(),
                        elem.value_from_json(item, &format!("{path}.{key}"))?,
                    );
                }
                Ok(TypedValue::Map(out))
            }
            FwType::Object(attrs) => {
                let entries = value.as_object().ok_or_else(mismatch)?;
                if let Some(extra) = entries.keys().find(|k| !attrs.contains_key(*k)) {
                    return Err(ConvertError::DefaultMismatch {
                        path: format!("{path}.{extra}"),
                        kind: self.to_string(),
                        actual: "undeclared attribute".to_string(),
                    });
                }
                let mut out = BTreeMap::new();
                for (key, attr_ty) in attrs {
                    let item = entries.get(key).unwrap_or(&Value::Null);
                    out.insert(
                        key.clone(),
                        attr_ty.value_from_json(item, &format!("{path}.{key}"))?,
                    );
                }
                Ok(TypedValue::Object(out))
            }
            FwType::Tuple(elems) => {
                let items = value.as_array().ok_or_else(mismatch)?;
                if items.len() != elems.len() {
                    return Err(mismatch());
                }
                let items = items
                    .iter()
                    .zip(elems)
                    .enumerate()
                    .map(|(i, (item, elem))| elem.value_from_json(item, &format!("{path}[{i}]")))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TypedValue::Tuple(items))
            }
        }
    }
}

impl fmt::Display for FwType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FwType::Bool => f.write_str("bool"),
            FwType::Int32 => f.write_str("int32"),
            FwType::Int64 => f.write_str("int64"),
            FwType::Float32 => f.write_str("float32"),
            FwType::Float64 => f.write_str("float64"),
            FwType::Number => f.write_str("number"),
            FwType::String => f.write_str("string"),
            FwType::Dynamic => f.write_str("dynamic"),
            FwType::List(elem) => write!(f, "list({elem})"),
            FwType::Set(elem) => write!(f, "set({elem})"),
            FwType::Map(elem) => write!(f, "map({elem})"),
            FwType::Object(attrs) => {
                f.write_str("object({")?;
                for (i, (name, ty)) in attrs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str("})")
            }
            FwType::Tuple(elems) => {
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

/// Untyped JSON as the value a dynamic attribute would hold.
fn infer(value: &Value) -> TypedValue {
    match value {
        Value::Null => TypedValue::Null,
        Value::Bool(b) => TypedValue::Bool(*b),
        Value::Number(n) => TypedValue::Number(n.clone()),
        Value::String(s) => TypedValue::String(s.clone()),
        Value::Array(items) => TypedValue::Tuple(items.iter().map(infer).collect()),
        Value::Object(entries) => TypedValue::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), infer(v)))
                .collect(),
        ),
    }
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A problem reported by an upstream schema or default provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if self.detail.is_empty() {
            write!(f, "{}: {}", severity, self.summary)
        } else {
            write!(f, "{}: {}: {}", severity, self.summary, self.detail)
        }
    }
}

/// Diagnostics collected from one upstream call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self(diagnostics)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Request passed to a [`DefaultProvider`]. Always empty here.
#[derive(Debug, Clone, Default)]
pub struct DefaultRequest {}

/// Value produced by a [`DefaultProvider`].
#[derive(Debug, Clone, Default)]
pub struct DefaultResponse {
    pub plan_value: TypedValue,
    pub diagnostics: Diagnostics,
}

/// Computes the value of a resource attribute left unset in configuration.
pub trait DefaultProvider: Send + Sync {
    fn default_value(&self, request: &DefaultRequest) -> DefaultResponse;
}

/// A default provider returning a fixed value.
#[derive(Debug, Clone)]
pub struct StaticDefault(pub TypedValue);

impl DefaultProvider for StaticDefault {
    fn default_value(&self, _request: &DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            plan_value: self.0.clone(),
            diagnostics: Diagnostics::default(),
        }
    }
}

/// Object of a nested attribute.
#[derive(Debug, Clone, Default)]
pub struct NestedAttributeObject {
    pub attributes: BTreeMap<String, Attribute>,
}

impl NestedAttributeObject {
    fn fw_type(&self) -> FwType {
        FwType::Object(
            self.attributes
                .iter()
                .map(|(name, attr)| (name.clone(), attr.fw_type()))
                .collect(),
        )
    }
}

/// The concrete kind of a framework attribute.
#[derive(Debug, Clone)]
pub enum AttributeKind {
    Bool,
    Float32,
    Float64,
    Int32,
    Int64,
    Number,
    String,
    Dynamic,
    List { element_type: FwType },
    Set { element_type: FwType },
    Map { element_type: FwType },
    Object { attribute_types: BTreeMap<String, FwType> },
    SingleNested(NestedAttributeObject),
    ListNested(NestedAttributeObject),
    SetNested(NestedAttributeObject),
    MapNested(NestedAttributeObject),
    /// An attribute implemented outside the framework's built-in set.
    Custom { name: String, ty: FwType },
}

impl AttributeKind {
    pub fn name(&self) -> &str {
        match self {
            AttributeKind::Bool => "bool",
            AttributeKind::Float32 => "float32",
            AttributeKind::Float64 => "float64",
            AttributeKind::Int32 => "int32",
            AttributeKind::Int64 => "int64",
            AttributeKind::Number => "number",
            AttributeKind::String => "string",
            AttributeKind::Dynamic => "dynamic",
            AttributeKind::List { .. } => "list",
            AttributeKind::Set { .. } => "set",
            AttributeKind::Map { .. } => "map",
            AttributeKind::Object { .. } => "object",
            AttributeKind::SingleNested(_) => "single_nested",
            AttributeKind::ListNested(_) => "list_nested",
            AttributeKind::SetNested(_) => "set_nested",
            AttributeKind::MapNested(_) => "map_nested",
            AttributeKind::Custom { name, .. } => name,
        }
    }
}

/// One framework attribute.
#[derive(Clone)]
pub struct Attribute {
    pub kind: AttributeKind,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Only honoured on resource schemas.
    pub default: Option<Arc<dyn DefaultProvider>>,
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("default", &self.default.as_ref().map(|_| "DefaultProvider"))
            .finish()
    }
}

impl Attribute {
    /// Create an attribute of the given kind with no flags set.
    pub fn new(kind: AttributeKind) -> Self {
        Self {
            kind,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Attach a default value provider.
    pub fn with_default(mut self, provider: impl DefaultProvider + 'static) -> Self {
        self.default = Some(Arc::new(provider));
        self
    }

    /// The attribute's value type.
    pub fn fw_type(&self) -> FwType {
        match &self.kind {
            AttributeKind::Bool => FwType::Bool,
            AttributeKind::Float32 => FwType::Float32,
            AttributeKind::Float64 => FwType::Float64,
            AttributeKind::Int32 => FwType::Int32,
            AttributeKind::Int64 => FwType::Int64,
            AttributeKind::Number => FwType::Number,
            AttributeKind::String => FwType::String,
            AttributeKind::Dynamic => FwType::Dynamic,
            AttributeKind::List { element_type } => FwType::list(element_type.clone()),
            AttributeKind::Set { element_type } => FwType::set(element_type.clone()),
            AttributeKind::Map { element_type } => FwType::map(element_type.clone()),
            AttributeKind::Object { attribute_types } => FwType::Object(attribute_types.clone()),
            AttributeKind::SingleNested(object) => object.fw_type(),
            AttributeKind::ListNested(object) => FwType::list(object.fw_type()),
            AttributeKind::SetNested(object) => FwType::set(object.fw_type()),
            AttributeKind::MapNested(object) => FwType::map(object.fw_type()),
            AttributeKind::Custom { ty, .. } => ty.clone(),
        }
    }

    /// Transport encoding of the attribute's value type.
    pub fn terraform_type(&self) -> Value {
        self.fw_type().terraform_type()
    }

    /// Nesting mode and object of a nested attribute.
    pub fn nested(&self) -> Option<(NestingMode, &NestedAttributeObject)> {
        match &self.kind {
            AttributeKind::SingleNested(object) => Some((NestingMode::Single, object)),
            AttributeKind::ListNested(object) => Some((NestingMode::List, object)),
            AttributeKind::SetNested(object) => Some((NestingMode::Set, object)),
            AttributeKind::MapNested(object) => Some((NestingMode::Map, object)),
            _ => None,
        }
    }
}

/// Nesting mode of a framework block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockNestingMode {
    /// Not set; rejected during conversion.
    #[default]
    Unknown,
    List,
    Set,
    Single,
}

/// Contents of a framework block.
#[derive(Debug, Clone, Default)]
pub struct NestedBlockObject {
    pub attributes: BTreeMap<String, Attribute>,
    pub blocks: BTreeMap<String, Block>,
}

/// A framework block.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub nesting_mode: BlockNestingMode,
    pub nested_object: NestedBlockObject,
}

impl Block {
    pub fn new(nesting_mode: BlockNestingMode, nested_object: NestedBlockObject) -> Self {
        Self {
            nesting_mode,
            nested_object,
        }
    }
}

/// Top-level schema of a provider, resource or data source.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub version: u64,
    pub attributes: BTreeMap<String, Attribute>,
    pub blocks: BTreeMap<String, Block>,
}

/// Result of asking an upstream object for its schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaResponse {
    pub schema: Schema,
    pub diagnostics: Diagnostics,
}

impl From<Schema> for SchemaResponse {
    fn from(schema: Schema) -> Self {
        Self {
            schema,
            diagnostics: Diagnostics::default(),
        }
    }
}

pub type ResourceFactory = Box<dyn Fn() -> Box<dyn Resource>>;
pub type DataSourceFactory = Box<dyn Fn() -> Box<dyn DataSource>>;

/// A provider built on the declarative framework.
pub trait Provider {
    /// The provider's type name (e.g. `aws`).
    fn metadata(&self) -> String;
    fn schema(&self) -> SchemaResponse;
    fn resources(&self) -> Vec<ResourceFactory>;
    fn data_sources(&self) -> Vec<DataSourceFactory>;
}

pub trait Resource {
    /// The resource's type name, given its provider's type name.
    fn metadata(&self, provider_type_name: &str) -> String;
    fn schema(&self) -> SchemaResponse;
}

pub trait DataSource {
    /// The data source's type name, given its provider's type name.
    fn metadata(&self, provider_type_name: &str) -> String;
    fn schema(&self) -> SchemaResponse;
}
