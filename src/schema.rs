//! Schema nodes produced by the compiler and published under `components.schemas`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Prefix of every component reference
pub const REF_PREFIX: &str = "#/components/schemas/";

/// Name of the sentinel schema used for dynamically typed values
pub const ANY_VALUE: &str = "AnyValue";

/// Builds `#/components/schemas/<name>`.
pub fn ref_path(name: &str) -> String {
    format!("{}{}", REF_PREFIX, name)
}

/// Returns the schema name of a `#/components/schemas/<name>` reference.
pub fn ref_name(reference: &str) -> Option<&str> {
    let segments: Vec<&str> = reference.split('/').collect();
    if segments.len() != 4 || segments[3].is_empty() {
        return None;
    }
    Some(segments[3])
}

/// Names attached to a schema that are never serialized.
#[derive(Debug, Clone, Default)]
pub struct SchemaMeta {
    /// Identifier the schema was declared or referenced with
    pub real_name: Option<String>,
    /// Name the schema is published under, when overridden
    pub custom_name: Option<String>,
}

/// One OpenAPI schema fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaNode {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<SchemaNode>>,
    #[serde(rename = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<SchemaNode>>,
    #[serde(rename = "anyOf", skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<SchemaNode>>,
    #[serde(rename = "allOf", skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip)]
    pub meta: SchemaMeta,
}

/// Structural equality: names in `meta` are not part of a schema's content.
impl PartialEq for SchemaNode {
    fn eq(&self, other: &Self) -> bool {
        self.schema_type == other.schema_type
            && self.format == other.format
            && self.nullable == other.nullable
            && self.reference == other.reference
            && self.description == other.description
            && self.items == other.items
            && self.properties == other.properties
            && self.required == other.required
            && self.enum_values == other.enum_values
            && self.additional_properties == other.additional_properties
            && self.one_of == other.one_of
            && self.any_of == other.any_of
            && self.all_of == other.all_of
            && self.example == other.example
    }
}

impl SchemaNode {
    pub fn primitive(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            format: format.map(str::to_string),
            ..Default::default()
        }
    }

    /// A `$ref` leaf pointing at the component `name`.
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(ref_path(name)),
            meta: SchemaMeta {
                real_name: Some(name.to_string()),
                custom_name: None,
            },
            ..Default::default()
        }
    }

    pub fn object() -> Self {
        Self::primitive("object", None)
    }

    pub fn array(items: SchemaNode) -> Self {
        Self {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Name of the referenced component, if this node is a `$ref`.
    pub fn referenced_name(&self) -> Option<&str> {
        self.reference.as_deref().and_then(ref_name)
    }

    pub fn is_type(&self, schema_type: &str) -> bool {
        self.schema_type.as_deref() == Some(schema_type)
    }

    pub fn with_property(mut self, name: &str, property: SchemaNode) -> Self {
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), property);
        self
    }

    pub fn with_required(mut self, names: &[&str]) -> Self {
        let required = self.required.get_or_insert_with(Vec::new);
        required.extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Visits every node of the owned tree, depth first, parents before children.
    ///
    /// `$ref` nodes are leaves: the referenced schema is never looked up, so
    /// reference cycles cannot cause unbounded recursion.
    pub fn walk_mut(&mut self, visit: &mut dyn FnMut(&mut SchemaNode)) {
        visit(self);
        if self.is_reference() {
            return;
        }
        if let Some(properties) = self.properties.as_mut() {
            for property in properties.values_mut() {
                property.walk_mut(visit);
            }
        }
        if let Some(additional) = self.additional_properties.as_mut() {
            additional.walk_mut(visit);
        }
        if let Some(items) = self.items.as_mut() {
            items.walk_mut(visit);
        }
        for list in [&mut self.one_of, &mut self.any_of, &mut self.all_of] {
            if let Some(members) = list.as_mut() {
                for member in members.iter_mut() {
                    member.walk_mut(visit);
                }
            }
        }
    }
}

/// Structural composition of other schemas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComposedSchema {
    #[serde(rename = "allOf")]
    pub all_of: Vec<SchemaNode>,
    #[serde(skip)]
    pub meta: SchemaMeta,
}

impl PartialEq for ComposedSchema {
    fn eq(&self, other: &Self) -> bool {
        self.all_of == other.all_of
    }
}

/// A component schema: either a plain node or an `allOf` composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schema {
    Composed(ComposedSchema),
    Plain(SchemaNode),
}

impl Schema {
    pub fn meta(&self) -> &SchemaMeta {
        match self {
            Schema::Composed(composed) => &composed.meta,
            Schema::Plain(node) => &node.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut SchemaMeta {
        match self {
            Schema::Composed(composed) => &mut composed.meta,
            Schema::Plain(node) => &mut node.meta,
        }
    }

    pub fn custom_name(&self) -> Option<&str> {
        self.meta().custom_name.as_deref()
    }

    pub fn set_custom_name(&mut self, name: &str) {
        self.meta_mut().custom_name = Some(name.to_string());
    }

    /// Converts a composition into a node carrying `allOf`, for use as a property.
    pub fn into_node(self) -> SchemaNode {
        match self {
            Schema::Plain(node) => node,
            Schema::Composed(composed) => SchemaNode {
                all_of: Some(composed.all_of),
                meta: composed.meta,
                ..Default::default()
            },
        }
    }

    /// Visits every node owned by this schema; see [`SchemaNode::walk_mut`].
    pub fn walk_mut(&mut self, visit: &mut dyn FnMut(&mut SchemaNode)) {
        match self {
            Schema::Plain(node) => node.walk_mut(visit),
            Schema::Composed(composed) => {
                for member in composed.all_of.iter_mut() {
                    member.walk_mut(visit);
                }
            }
        }
    }
}

impl From<SchemaNode> for Schema {
    fn from(node: SchemaNode) -> Self {
        Schema::Plain(node)
    }
}

/// The sentinel schema every document carries.
pub fn any_value_schema() -> Schema {
    Schema::Plain(SchemaNode {
        description: Some(
            "Can be anything: string, number, array, object, etc., including `null`".to_string(),
        ),
        ..Default::default()
    })
}
