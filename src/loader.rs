//! Provider document loading from various sources.
//!
//! A provider document is JSON describing a provider in either the legacy
//! descriptor-map form (`"format": "legacy"`) or the declarative framework
//! form (`"format": "framework"`). Documents load from files, strings, and
//! HTTP URLs.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::declarative;
use crate::error::{ConvertError, LoadError};
use crate::framework::{
    self, AttributeKind, BlockNestingMode, DataSource, DataSourceFactory, FwType,
    NestedAttributeObject, NestedBlockObject, Provider, Resource, ResourceFactory, SchemaResponse,
    StaticDefault,
};
use crate::legacy::{self, LegacyProvider};
use crate::schema::ProviderSchema;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A provider described by a document, in one of the two representations.
#[derive(Debug, Clone)]
pub enum ProviderDocument {
    Legacy(LegacyProvider),
    Framework(DocumentProvider),
}

impl ProviderDocument {
    /// Parse a document from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidDocument` with a JSON pointer to the
    /// offending member when the document is malformed.
    pub fn from_value(value: Value) -> Result<Self, LoadError> {
        let format = value
            .get("format")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| invalid("/format", "missing format"))?;

        match format.as_str() {
            "legacy" => {
                let provider: LegacyProvider = serde_json::from_value(value)
                    .map_err(|e| invalid("", &e.to_string()))?;
                Ok(ProviderDocument::Legacy(provider))
            }
            "framework" => {
                let document: FrameworkDocument = serde_json::from_value(value)
                    .map_err(|e| invalid("", &e.to_string()))?;
                document.into_provider().map(ProviderDocument::Framework)
            }
            other => Err(invalid("/format", &format!("unknown format \"{}\"", other))),
        }
    }

    /// Convert the described provider into the canonical tree.
    pub fn convert(&self) -> Result<ProviderSchema, ConvertError> {
        match self {
            ProviderDocument::Legacy(provider) => legacy::from_provider(provider),
            ProviderDocument::Framework(provider) => declarative::from_provider(provider),
        }
    }
}

/// A declarative framework provider whose schemas come from a document.
#[derive(Debug, Clone, Default)]
pub struct DocumentProvider {
    pub type_name: String,
    pub schema: framework::Schema,
    pub resources: BTreeMap<String, framework::Schema>,
    pub data_sources: BTreeMap<String, framework::Schema>,
}

#[derive(Debug, Clone)]
struct DocumentSchema {
    type_name: String,
    schema: framework::Schema,
}

impl Resource for DocumentSchema {
    fn metadata(&self, _provider_type_name: &str) -> String {
        self.type_name.clone()
    }

    fn schema(&self) -> SchemaResponse {
        self.schema.clone().into()
    }
}

impl DataSource for DocumentSchema {
    fn metadata(&self, _provider_type_name: &str) -> String {
        self.type_name.clone()
    }

    fn schema(&self) -> SchemaResponse {
        self.schema.clone().into()
    }
}

impl Provider for DocumentProvider {
    fn metadata(&self) -> String {
        self.type_name.clone()
    }

    fn schema(&self) -> SchemaResponse {
        self.schema.clone().into()
    }

    fn resources(&self) -> Vec<ResourceFactory> {
        self.resources
            .iter()
            .map(|(name, schema)| {
                let doc = DocumentSchema {
                    type_name: name.clone(),
                    schema: schema.clone(),
                };
                let factory: ResourceFactory =
                    Box::new(move || -> Box<dyn Resource> { Box::new(doc.clone()) });
                factory
            })
            .collect()
    }

    fn data_sources(&self) -> Vec<DataSourceFactory> {
        self.data_sources
            .iter()
            .map(|(name, schema)| {
                let doc = DocumentSchema {
                    type_name: name.clone(),
                    schema: schema.clone(),
                };
                let factory: DataSourceFactory =
                    Box::new(move || -> Box<dyn DataSource> { Box::new(doc.clone()) });
                factory
            })
            .collect()
    }
}

fn invalid(path: &str, message: &str) -> LoadError {
    LoadError::InvalidDocument {
        path: if path.is_empty() { "/".to_string() } else { path.to_string() },
        message: message.to_string(),
    }
}

fn present<T>(value: Option<T>, path: &str, message: &str) -> Result<T, LoadError> {
    value.ok_or_else(|| invalid(path, message))
}

/// Framework provider document as written.
///
/// The derived structs only check shape. Kinds, nesting modes and defaults
/// are checked while building the framework model, so those errors carry a
/// JSON pointer.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrameworkDocument {
    type_name: String,
    provider: Option<SchemaDocument>,
    resources: BTreeMap<String, SchemaDocument>,
    data_sources: BTreeMap<String, SchemaDocument>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SchemaDocument {
    version: u64,
    attributes: BTreeMap<String, AttributeDocument>,
    blocks: BTreeMap<String, BlockDocument>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct BlockDocument {
    nesting: Option<String>,
    attributes: BTreeMap<String, AttributeDocument>,
    blocks: BTreeMap<String, BlockDocument>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AttributeDocument {
    kind: Option<String>,
    required: bool,
    optional: bool,
    computed: bool,
    sensitive: bool,
    default: Option<Value>,
    element_type: Option<FwType>,
    attribute_types: Option<BTreeMap<String, FwType>>,
    /// Members of a nested attribute.
    attributes: BTreeMap<String, AttributeDocument>,
    /// Name and type of a custom kind.
    name: Option<String>,
    #[serde(rename = "type")]
    ty: Option<FwType>,
}

impl FrameworkDocument {
    fn into_provider(self) -> Result<DocumentProvider, LoadError> {
        let schema = match self.provider {
            Some(provider) => provider.into_schema("/provider")?,
            None => framework::Schema::default(),
        };

        Ok(DocumentProvider {
            type_name: self.type_name,
            schema,
            resources: schemas(self.resources, "/resources")?,
            data_sources: schemas(self.data_sources, "/data_sources")?,
        })
    }
}

impl SchemaDocument {
    fn into_schema(self, path: &str) -> Result<framework::Schema, LoadError> {
        Ok(framework::Schema {
            version: self.version,
            attributes: attributes(self.attributes, path)?,
            blocks: blocks(self.blocks, path)?,
        })
    }
}

impl BlockDocument {
    fn into_block(self, path: &str) -> Result<framework::Block, LoadError> {
        // An absent nesting mode is kept as unknown and rejected at conversion.
        let nesting_mode = match self.nesting.as_deref() {
            None => BlockNestingMode::Unknown,
            Some("list") => BlockNestingMode::List,
            Some("set") => BlockNestingMode::Set,
            Some("single") => BlockNestingMode::Single,
            Some(other) => {
                return Err(invalid(
                    &format!("{}/nesting", path),
                    &format!("unknown block nesting \"{}\"", other),
                ))
            }
        };

        Ok(framework::Block::new(
            nesting_mode,
            NestedBlockObject {
                attributes: attributes(self.attributes, path)?,
                blocks: blocks(self.blocks, path)?,
            },
        ))
    }
}

impl AttributeDocument {
    fn into_attribute(self, path: &str) -> Result<framework::Attribute, LoadError> {
        let AttributeDocument {
            kind,
            required,
            optional,
            computed,
            sensitive,
            default,
            element_type,
            attribute_types,
            attributes: members,
            name,
            ty,
        } = self;

        let kind_path = format!("{}/kind", path);
        let kind = present(kind, &kind_path, "missing attribute kind")?;
        let element_path = format!("{}/element_type", path);

        let kind = match kind.as_str() {
            "bool" => AttributeKind::Bool,
            "float32" => AttributeKind::Float32,
            "float64" => AttributeKind::Float64,
            "int32" => AttributeKind::Int32,
            "int64" => AttributeKind::Int64,
            "number" => AttributeKind::Number,
            "string" => AttributeKind::String,
            "dynamic" => AttributeKind::Dynamic,
            "list" => AttributeKind::List {
                element_type: present(element_type, &element_path, "missing element type")?,
            },
            "set" => AttributeKind::Set {
                element_type: present(element_type, &element_path, "missing element type")?,
            },
            "map" => AttributeKind::Map {
                element_type: present(element_type, &element_path, "missing element type")?,
            },
            "object" => AttributeKind::Object {
                attribute_types: present(
                    attribute_types,
                    &format!("{}/attribute_types", path),
                    "missing attribute types",
                )?,
            },
            "single_nested" => AttributeKind::SingleNested(nested(members, path)?),
            "list_nested" => AttributeKind::ListNested(nested(members, path)?),
            "set_nested" => AttributeKind::SetNested(nested(members, path)?),
            "map_nested" => AttributeKind::MapNested(nested(members, path)?),
            "custom" => AttributeKind::Custom {
                name: present(name, &format!("{}/name", path), "missing custom kind name")?,
                ty: present(ty, &format!("{}/type", path), "missing custom kind type")?,
            },
            other => {
                return Err(invalid(
                    &kind_path,
                    &format!("unknown attribute kind \"{}\"", other),
                ))
            }
        };

        let mut attr = framework::Attribute::new(kind);
        attr.required = required;
        attr.optional = optional;
        attr.computed = computed;
        attr.sensitive = sensitive;

        if let Some(default) = default {
            let default_path = format!("{}/default", path);
            let plan_value = attr
                .fw_type()
                .value_from_json(&default, &default_path)
                .map_err(|e| invalid(&default_path, &e.to_string()))?;
            attr = attr.with_default(StaticDefault(plan_value));
        }

        Ok(attr)
    }
}

fn schemas(
    entries: BTreeMap<String, SchemaDocument>,
    path: &str,
) -> Result<BTreeMap<String, framework::Schema>, LoadError> {
    entries
        .into_iter()
        .map(|(name, doc)| {
            let schema = doc.into_schema(&format!("{}/{}", path, name))?;
            Ok((name, schema))
        })
        .collect()
}

fn attributes(
    entries: BTreeMap<String, AttributeDocument>,
    path: &str,
) -> Result<BTreeMap<String, framework::Attribute>, LoadError> {
    entries
        .into_iter()
        .map(|(name, doc)| {
            let attr = doc.into_attribute(&format!("{}/attributes/{}", path, name))?;
            Ok((name, attr))
        })
        .collect()
}

fn blocks(
    entries: BTreeMap<String, BlockDocument>,
    path: &str,
) -> Result<BTreeMap<String, framework::Block>, LoadError> {
    entries
        .into_iter()
        .map(|(name, doc)| {
            let block = doc.into_block(&format!("{}/blocks/{}", path, name))?;
            Ok((name, block))
        })
        .collect()
}

fn nested(
    members: BTreeMap<String, AttributeDocument>,
    path: &str,
) -> Result<NestedAttributeObject, LoadError> {
    Ok(NestedAttributeObject {
        attributes: attributes(members, path)?,
    })
}

/// Load raw JSON from a file path.
fn load_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a provider document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::InvalidJson` if the file isn't valid JSON, or
/// `LoadError::InvalidDocument` if it isn't a provider document.
pub fn load_document(path: &Path) -> Result<ProviderDocument, LoadError> {
    debug!(path = %path.display(), "loading provider document");
    ProviderDocument::from_value(load_json(path)?)
}

/// Load a provider document from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON,
/// or `LoadError::InvalidDocument` if it isn't a provider document.
pub fn load_document_str(content: &str) -> Result<ProviderDocument, LoadError> {
    let value = serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
    ProviderDocument::from_value(value)
}

/// Load a provider document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails,
/// or `LoadError::InvalidDocument` if the response isn't a provider document.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<ProviderDocument, LoadError> {
    debug!(url, "fetching provider document");
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    // Check for HTTP errors before parsing
    let response = response
        .error_for_status()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let value: Value = response.json().map_err(|source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    })?;
    ProviderDocument::from_value(value)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a provider document from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_document_auto(source: &str) -> Result<ProviderDocument, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CtyType;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LEGACY_DOC: &str = r#"{
        "format": "legacy",
        "provider": {"region": {"type": "string", "optional": true}},
        "resources": {
            "foo_instance": {
                "schema_version": 1,
                "schema": {"name": {"type": "string", "required": true}}
            }
        }
    }"#;

    #[test]
    fn load_document_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", LEGACY_DOC).unwrap();

        let doc = load_document(file.path()).unwrap();
        assert!(matches!(doc, ProviderDocument::Legacy(_)));
    }

    #[test]
    fn load_document_file_not_found() {
        let result = load_document(Path::new("/nonexistent/provider.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_document_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_document(file.path());
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_document_str_legacy_converts() {
        let schema = load_document_str(LEGACY_DOC).unwrap().convert().unwrap();
        assert!(schema.provider.block.attribute("region").unwrap().optional);
        assert_eq!(schema.resource("foo_instance").unwrap().version, 1);
    }

    #[test]
    fn missing_format_rejected() {
        let result = load_document_str(r#"{"provider": {}}"#);
        assert!(matches!(
            result,
            Err(LoadError::InvalidDocument { path, .. }) if path == "/format"
        ));
    }

    #[test]
    fn unknown_format_rejected() {
        let result = load_document_str(r#"{"format": "hcl"}"#);
        assert!(matches!(result, Err(LoadError::InvalidDocument { .. })));
    }

    #[test]
    fn framework_document_converts() {
        let doc = ProviderDocument::from_value(json!({
            "format": "framework",
            "type_name": "foo",
            "provider": {
                "attributes": {"endpoint": {"kind": "string", "optional": true}}
            },
            "resources": {
                "foo_bucket": {
                    "version": 2,
                    "attributes": {
                        "tags": {
                            "kind": "map",
                            "element_type": "string",
                            "optional": true,
                            "computed": true,
                            "default": {"env": "dev"}
                        },
                        "rule": {
                            "kind": "list_nested",
                            "optional": true,
                            "attributes": {"port": {"kind": "int64", "required": true}}
                        }
                    },
                    "blocks": {
                        "timeouts": {
                            "nesting": "single",
                            "attributes": {"create": {"kind": "string", "optional": true}}
                        }
                    }
                }
            },
            "data_sources": {
                "foo_region": {"attributes": {"id": {"kind": "string", "computed": true}}}
            }
        }))
        .unwrap();

        let schema = doc.convert().unwrap();
        let bucket = schema.resource("foo_bucket").unwrap();
        assert_eq!(bucket.version, 2);
        assert_eq!(
            bucket.block.attribute("tags").unwrap().default,
            Some(json!({"env": "dev"}))
        );
        assert!(bucket.block.attribute("rule").unwrap().nested_type.is_some());
        assert!(bucket.block.block_type("timeouts").is_some());
        assert_eq!(
            schema
                .data_source("foo_region")
                .unwrap()
                .block
                .attribute("id")
                .unwrap()
                .attr_type,
            Some(CtyType::String)
        );
    }

    #[test]
    fn framework_type_objects_decode() {
        let doc: AttributeDocument = serde_json::from_value(json!({
            "kind": "list",
            "element_type": {"object": {"a": "int32", "b": {"tuple": ["bool", "string"]}}},
            "optional": true
        }))
        .unwrap();
        assert_eq!(
            doc.element_type,
            Some(FwType::object([
                ("a", FwType::Int32),
                ("b", FwType::Tuple(vec![FwType::Bool, FwType::String])),
            ]))
        );
    }

    #[test]
    fn framework_unknown_member_rejected() {
        let result = ProviderDocument::from_value(json!({
            "format": "framework",
            "resources": {
                "foo_x": {"attributes": {"a": {"kind": "string", "requried": true}}}
            }
        }));
        assert!(matches!(
            result,
            Err(LoadError::InvalidDocument { message, .. }) if message.contains("requried")
        ));
    }

    #[test]
    fn framework_collection_without_element_type() {
        let result = ProviderDocument::from_value(json!({
            "format": "framework",
            "resources": {"foo_x": {"attributes": {"tags": {"kind": "set", "optional": true}}}}
        }));
        assert!(matches!(
            result,
            Err(LoadError::InvalidDocument { path, .. })
                if path == "/resources/foo_x/attributes/tags/element_type"
        ));
    }

    #[test]
    fn framework_bad_kind_reports_pointer() {
        let result = ProviderDocument::from_value(json!({
            "format": "framework",
            "resources": {"foo_x": {"attributes": {"a": {"kind": "widget"}}}}
        }));
        assert!(matches!(
            result,
            Err(LoadError::InvalidDocument { path, .. })
                if path == "/resources/foo_x/attributes/a/kind"
        ));
    }

    #[test]
    fn framework_default_must_fit_type() {
        let result = ProviderDocument::from_value(json!({
            "format": "framework",
            "resources": {
                "foo_x": {"attributes": {"n": {"kind": "int32", "optional": true, "default": "x"}}}
            }
        }));
        assert!(matches!(
            result,
            Err(LoadError::InvalidDocument { path, .. })
                if path == "/resources/foo_x/attributes/n/default"
        ));
    }

    #[test]
    fn framework_block_without_nesting_fails_conversion() {
        let doc = ProviderDocument::from_value(json!({
            "format": "framework",
            "provider": {"blocks": {"b": {}}}
        }))
        .unwrap();
        assert!(matches!(
            doc.convert(),
            Err(ConvertError::Schema { .. })
        ));
    }

    #[test]
    fn is_url_https() {
        assert!(is_url("https://example.com/provider.json"));
    }

    #[test]
    fn is_url_http() {
        assert!(is_url("http://example.com/provider.json"));
    }

    #[test]
    fn is_url_file_path() {
        assert!(!is_url("/path/to/provider.json"));
        assert!(!is_url("./provider.json"));
        assert!(!is_url("provider.json"));
    }

    #[test]
    fn load_document_auto_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", LEGACY_DOC).unwrap();

        let doc = load_document_auto(file.path().to_str().unwrap()).unwrap();
        assert!(matches!(doc, ProviderDocument::Legacy(_)));
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_document_url_valid() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/provider.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(LEGACY_DOC)
                .create();

            let url = format!("{}/provider.json", server.url());
            let doc = load_document_url(&url).unwrap();
            assert!(matches!(doc, ProviderDocument::Legacy(_)));
            mock.assert();
        }

        #[test]
        fn load_document_url_404() {
            let mut server = mockito::Server::new();
            let _mock = server.mock("GET", "/missing.json").with_status(404).create();

            let url = format!("{}/missing.json", server.url());
            let result = load_document_url(&url);
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
            assert_eq!(result.unwrap_err().exit_code(), 3);
        }

        #[test]
        fn load_document_auto_url() {
            let mut server = mockito::Server::new();
            let _mock = server
                .mock("GET", "/provider.json")
                .with_status(200)
                .with_body(r#"{"format": "framework", "type_name": "foo"}"#)
                .create();

            let url = format!("{}/provider.json", server.url());
            let doc = load_document_auto(&url).unwrap();
            assert!(matches!(doc, ProviderDocument::Framework(_)));
        }
    }
}
