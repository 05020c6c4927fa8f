use crate::schema::{Schema, SchemaNode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Version written to the `openapi` field of generated documents
pub const OPENAPI_VERSION: &str = "3.0.0";

/// Operations of one URL, keyed by lower-case HTTP verb
pub type PathItem = BTreeMap<String, Operation>;

/// Security requirement: scheme name to required scopes
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    #[serde(default)]
    pub info: Info,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// API paths (URL -> verb -> operation)
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    /// Components (schemas, security schemes)
    #[serde(default)]
    pub components: Components,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
    /// Passed through untouched
    #[serde(rename = "x-tagGroups", default, skip_serializing_if = "Vec::is_empty")]
    pub x_tag_groups: Vec<Value>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info::default(),
            servers: Vec::new(),
            paths: BTreeMap::new(),
            tags: Vec::new(),
            components: Components::default(),
            security: Vec::new(),
            x_tag_groups: Vec::new(),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operation registered for `url` and `verb`, if any.
    pub fn operation(&self, url: &str, verb: &str) -> Option<&Operation> {
        self.paths.get(url).and_then(|item| item.get(verb))
    }

    /// Inserts an operation, replacing whatever was registered for the same verb.
    pub fn add_operation(&mut self, url: &str, verb: &str, operation: Operation) {
        self.paths
            .entry(url.to_string())
            .or_default()
            .insert(verb.to_string(), operation);
    }
}

/// OpenAPI Info object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "x-logo", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub x_logo: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contact: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub license: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, ServerVariable>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerVariable {
    #[serde(default)]
    pub default: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    #[serde(default)]
    pub schemas: BTreeMap<String, Schema>,
    #[serde(rename = "securitySchemes", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub security_schemes: BTreeMap<String, SecurityScheme>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flows: BTreeMap<String, OAuthFlow>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scheme: String,
    #[serde(rename = "bearerFormat", default, skip_serializing_if = "String::is_empty")]
    pub bearer_format: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "in", default, skip_serializing_if = "String::is_empty")]
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthFlow {
    #[serde(rename = "authorizationUrl", default, skip_serializing_if = "String::is_empty")]
    pub authorization_url: String,
    #[serde(rename = "tokenUrl", default, skip_serializing_if = "String::is_empty")]
    pub token_url: String,
    #[serde(default)]
    pub scopes: BTreeMap<String, String>,
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "operationId", default, skip_serializing_if = "String::is_empty")]
    pub operation_id: String,
    #[serde(default)]
    pub responses: BTreeMap<String, Response>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Header>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    #[serde(rename = "externalDocs", skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Parameter location (path, query, header, cookie)
    #[serde(rename = "in")]
    pub location: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    /// Content types and their schemas
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Header>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalDocs {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PETSTORE: &str = r##"
openapi: 3.0.0
info:
  version: 1.0.0
  title: Petstore
  x-logo:
    url: https://example.com/logo.png
servers:
  - url: https://api.example.com/v1
    description: production
paths:
  /pets:
    get:
      summary: List all pets
      operationId: listPets
      tags: [pets]
      parameters:
        - name: limit
          in: query
          schema:
            type: integer
            format: int32
      responses:
        "200":
          description: A paged array of pets
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Pets"
components:
  schemas:
    Pet:
      type: object
      required: [id]
      properties:
        id:
          type: integer
          format: int64
    Status:
      type: integer
      enum: [3, 4]
  securitySchemes:
    petstore_auth:
      type: oauth2
      flows:
        implicit:
          authorizationUrl: https://example.com/oauth
          scopes:
            write:pets: modify pets
security:
  - petstore_auth: [write:pets]
x-tagGroups:
  - name: Animals
    tags: [pets]
"##;

    #[test]
    fn test_document_defaults() {
        let doc = Document::new();
        assert_eq!(doc.openapi, "3.0.0");
        assert!(doc.paths.is_empty());
        let yaml = serde_yaml::to_string(&doc).unwrap();
        assert!(!yaml.contains("servers"));
        assert!(!yaml.contains("x-tagGroups"));
    }

    #[test]
    fn test_read_full_document() {
        let doc: Document = serde_yaml::from_str(PETSTORE).unwrap();
        assert_eq!(doc.info.title, "Petstore");
        assert_eq!(doc.info.x_logo["url"], "https://example.com/logo.png");
        assert_eq!(doc.servers.len(), 1);
        assert_eq!(doc.x_tag_groups.len(), 1);
        assert_eq!(doc.security[0]["petstore_auth"], vec!["write:pets".to_string()]);

        let op = doc.operation("/pets", "get").unwrap();
        assert_eq!(op.operation_id, "listPets");
        assert_eq!(op.parameters[0].location, "query");
        let schema = op.responses["200"].content["application/json"].schema.as_ref().unwrap();
        assert_eq!(schema.referenced_name(), Some("Pets"));

        let status = doc.components.schemas["Status"].clone().into_node();
        assert_eq!(status.enum_values, Some(vec![Value::from(3), Value::from(4)]));
        assert_eq!(doc.components.security_schemes["petstore_auth"].scheme_type, "oauth2");
    }

    #[test]
    fn test_document_yaml_roundtrip_is_stable() {
        let doc: Document = serde_yaml::from_str(PETSTORE).unwrap();
        let yaml = serde_yaml::to_string(&doc).unwrap();
        let back: Document = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_add_operation() {
        let mut doc = Document::new();
        doc.add_operation(
            "/pets",
            "post",
            Operation {
                summary: "Add a pet".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(doc.operation("/pets", "post").unwrap().summary, "Add a pet");
        assert!(doc.operation("/pets", "get").is_none());
    }
}
