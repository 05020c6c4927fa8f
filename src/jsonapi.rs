//! JSON:API resource envelopes.
//!
//! A declaration whose fields all carry a `#[jsonapi(..)]` role is published as
//! eight envelope schemas instead of a plain object:
//!
//! | schema                   | shape                                          |
//! |--------------------------|------------------------------------------------|
//! | `N`                      | `{data: NData, includes?}`                     |
//! | `NCollection`            | `{data: [NData]}`                              |
//! | `NData`                  | `{id, type, attributes, relationships}`        |
//! | `NIdentifier`            | `{data: NIdentifierData}`                      |
//! | `NIdentifierCollection`  | `{data: [NIdentifierData]}`                    |
//! | `NIdentifierData`        | `{id, type}`                                   |
//! | `NAttributes`            | attribute fields                               |
//! | `NRelationships`         | relation name to identifier envelope           |

use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::schema::{Schema, SchemaNode};
use crate::tags::ResourceRole;
use crate::type_resolver::{AnnotatedField, TypeResolver};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// A relation field of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Member name inside `relationships`
    pub name: String,
    /// Real name of the related declaration
    pub target: String,
    pub collection: bool,
}

/// A declaration recognised as a JSON:API resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub real_name: String,
    pub custom_name: Option<String>,
    pub resource_type: String,
    /// Object schema of the attribute fields
    pub attributes: SchemaNode,
    pub relations: Vec<Relation>,
}

impl Resource {
    /// Prefix of the envelope names.
    pub fn display_name(&self) -> &str {
        self.custom_name.as_deref().unwrap_or(&self.real_name)
    }
}

/// Inspects the annotated fields of a composite declaration.
///
/// Returns `Ok(None)` when no field carries a JSON:API role.
pub fn analyze(
    resolver: &mut TypeResolver,
    real_name: &str,
    custom_name: Option<&str>,
    annotated: &[AnnotatedField<'_>],
) -> Result<Option<Resource>> {
    if annotated.iter().all(|(_, a)| a.role == ResourceRole::None) {
        return Ok(None);
    }

    let untagged: Vec<String> = annotated
        .iter()
        .filter(|(_, a)| a.role == ResourceRole::None)
        .map(|(field, _)| field.name.clone().unwrap_or_else(|| "<embedded>".to_string()))
        .collect();
    if !untagged.is_empty() {
        return Err(structural(real_name, format!("missing fields: {}", untagged.join(", "))));
    }

    let primaries: Vec<_> = annotated
        .iter()
        .filter_map(|(field, a)| match &a.role {
            ResourceRole::Primary { resource_type } => Some((*field, resource_type.clone())),
            _ => None,
        })
        .collect();
    let resource_type = match primaries.as_slice() {
        [(field, resource_type)] if field.name.as_deref() == Some("id") => resource_type.clone(),
        [_] => return Err(structural(real_name, "the primary field must be named `id`")),
        [] => return Err(structural(real_name, "no primary field")),
        _ => return Err(structural(real_name, "more than one primary field")),
    };

    let mut attributes = SchemaNode::object();
    let mut required = Vec::new();
    let mut relations = Vec::new();

    for (field, annotation) in annotated {
        let Some(name) = annotation.name.clone() else {
            continue;
        };
        match annotation.role {
            ResourceRole::Attribute { omitempty } => {
                let Some(mut node) = resolver.resolve_field(real_name, field, annotation) else {
                    continue;
                };
                if omitempty {
                    node.nullable = Some(true);
                }
                if annotation.required {
                    required.push(name.clone());
                }
                attributes = attributes.with_property(&name, node);
            }
            ResourceRole::Relation { collection } => {
                let Some(node) = resolver.resolve_field(real_name, field, annotation) else {
                    continue;
                };
                let target = node
                    .items
                    .as_deref()
                    .unwrap_or(&node)
                    .referenced_name()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        structural(real_name, format!("relation {} must reference another resource", name))
                    })?;
                debug!("Resource {} relates to {} through {}", real_name, target, name);
                relations.push(Relation {
                    name,
                    target,
                    collection,
                });
            }
            ResourceRole::Primary { .. } | ResourceRole::None => {}
        }
    }
    if !required.is_empty() {
        attributes.required = Some(required);
    }

    info!("Parsed JSON:API resource {} ({})", real_name, resource_type);
    Ok(Some(Resource {
        real_name: real_name.to_string(),
        custom_name: custom_name.map(str::to_string),
        resource_type,
        attributes,
        relations,
    }))
}

fn structural(declaration: &str, reason: impl Into<String>) -> Error {
    Error::JsonApi {
        declaration: declaration.to_string(),
        reason: reason.into(),
    }
}

/// Resources found during a run, keyed by real name.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    resources: BTreeMap<String, Resource>,
    /// Real names declared again with different content
    conflicts: Vec<String>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource. The first declaration of a real name wins; a later
    /// one with different content is reported by [`ResourceGraph::register_envelopes`].
    pub fn insert(&mut self, resource: Resource) {
        match self.resources.get(&resource.real_name) {
            None => {
                self.resources.insert(resource.real_name.clone(), resource);
            }
            Some(existing) if *existing == resource => {
                debug!("Resource {} declared again with identical content", resource.real_name);
            }
            Some(_) => {
                warn!("Resource {} declared again with different content", resource.real_name);
                if !self.conflicts.contains(&resource.real_name) {
                    self.conflicts.push(resource.real_name);
                }
            }
        }
    }

    pub fn get(&self, real_name: &str) -> Option<&Resource> {
        self.resources.get(real_name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resource-to-resource edges. Relations to undeclared resources are left out.
    pub fn edges(&self) -> BTreeMap<String, Vec<String>> {
        self.resources
            .values()
            .map(|resource| {
                let targets = resource
                    .relations
                    .iter()
                    .filter(|r| self.resources.contains_key(&r.target))
                    .map(|r| r.target.clone())
                    .collect();
                (resource.real_name.clone(), targets)
            })
            .collect()
    }

    /// Registers the envelope schemas of every resource.
    ///
    /// Fails with [`Error::DuplicateSchema`] when a resource was declared twice
    /// with different content.
    pub fn register_envelopes(&self, registry: &mut Registry, includes: bool) -> Result<()> {
        if let Some(name) = self.conflicts.first() {
            return Err(Error::DuplicateSchema { name: name.clone() });
        }
        let edges = self.edges();
        for resource in self.resources.values() {
            let closure = if includes {
                transitive_closure(&edges, &resource.real_name)
            } else {
                BTreeSet::new()
            };
            for (name, schema) in self.envelopes(resource, registry, &closure) {
                registry.register(&name, schema);
            }
        }
        debug!("Registered envelopes for {} resources", self.resources.len());
        Ok(())
    }

    fn prefix(&self, real_name: &str, registry: &Registry) -> String {
        match self.resources.get(real_name) {
            Some(resource) => resource.display_name().to_string(),
            None => registry.display_name(real_name),
        }
    }

    /// Builds the eight envelopes of `resource`, keyed by real name.
    fn envelopes(
        &self,
        resource: &Resource,
        registry: &Registry,
        closure: &BTreeSet<String>,
    ) -> Vec<(String, Schema)> {
        let prefix = resource.display_name();
        let name = |suffix: &str| format!("{}{}", prefix, suffix);
        let data_of = |node: SchemaNode| SchemaNode::object().with_property("data", node).with_required(&["data"]);

        let identifier_data = SchemaNode::object()
            .with_property("id", SchemaNode::primitive("string", None))
            .with_property(
                "type",
                SchemaNode {
                    enum_values: Some(vec![Value::String(resource.resource_type.clone())]),
                    ..SchemaNode::primitive("string", None)
                },
            )
            .with_required(&["id", "type"]);

        let mut relationships = SchemaNode::object();
        for relation in &resource.relations {
            let target = self.prefix(&relation.target, registry);
            let suffix = if relation.collection {
                "IdentifierCollection"
            } else {
                "Identifier"
            };
            relationships = relationships.with_property(
                &relation.name,
                SchemaNode::reference(&format!("{}{}", target, suffix)),
            );
        }

        let data = identifier_data
            .clone()
            .with_property("attributes", SchemaNode::reference(&name("Attributes")))
            .with_property("relationships", relationships.clone());

        let mut root = data_of(SchemaNode::reference(&name("Data")));
        if !closure.is_empty() {
            let members = closure
                .iter()
                .map(|member| SchemaNode::reference(&format!("{}Data", self.prefix(member, registry))))
                .collect();
            root = root.with_property(
                "includes",
                SchemaNode {
                    nullable: Some(true),
                    ..SchemaNode::array(SchemaNode {
                        any_of: Some(members),
                        ..Default::default()
                    })
                },
            );
        }

        let mut root = Schema::from(root);
        if let Some(custom) = &resource.custom_name {
            root.set_custom_name(custom);
        }

        vec![
            (resource.real_name.clone(), root),
            (name("Collection"), data_of(SchemaNode::array(SchemaNode::reference(&name("Data")))).into()),
            (name("Data"), data.into()),
            (name("Identifier"), data_of(SchemaNode::reference(&name("IdentifierData"))).into()),
            (
                name("IdentifierCollection"),
                data_of(SchemaNode::array(SchemaNode::reference(&name("IdentifierData")))).into(),
            ),
            (name("IdentifierData"), identifier_data.into()),
            (name("Attributes"), resource.attributes.clone().into()),
            (name("Relationships"), relationships.into()),
        ]
    }
}

/// Resources reachable from `root`, sorted by name.
///
/// `root` itself is a member only when a cycle leads back to it.
pub fn transitive_closure(edges: &BTreeMap<String, Vec<String>>, root: &str) -> BTreeSet<String> {
    let mut reached = BTreeSet::new();
    let mut pending: Vec<&str> = edges
        .get(root)
        .map(|targets| targets.iter().map(String::as_str).collect())
        .unwrap_or_default();

    while let Some(current) = pending.pop() {
        if !reached.insert(current.to_string()) {
            continue;
        }
        if let Some(targets) = edges.get(current) {
            pending.extend(targets.iter().map(String::as_str));
        }
    }
    reached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDecl, TypeDescriptor};
    use crate::external_types::ExternalTypes;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn prim(name: &str) -> TypeDescriptor {
        TypeDescriptor::primitive(name)
    }

    fn id(resource_type: &str) -> FieldDecl {
        FieldDecl::new("id", prim("String")).with_tag("jsonapi", &format!(r#"primary = "{}""#, resource_type))
    }

    fn analyze_fields(resolver: &mut TypeResolver, real_name: &str, fields: &[FieldDecl]) -> Result<Option<Resource>> {
        let annotated = resolver.annotate_fields(real_name, fields);
        analyze(resolver, real_name, None, &annotated)
    }

    fn edges(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(from, to)| (from.to_string(), to.iter().map(|t| t.to_string()).collect()))
            .collect()
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_closure_of_chain_excludes_root() {
        let graph = edges(&[("A", &["B"]), ("B", &["C"]), ("C", &[])]);
        assert_eq!(names(&transitive_closure(&graph, "A")), vec!["B", "C"]);
        assert!(transitive_closure(&graph, "C").is_empty());
    }

    #[test]
    fn test_closure_of_cycle_includes_root() {
        let graph = edges(&[("A", &["B"]), ("B", &["A"])]);
        assert_eq!(names(&transitive_closure(&graph, "A")), vec!["A", "B"]);

        let graph = edges(&[("A", &["A"])]);
        assert_eq!(names(&transitive_closure(&graph, "A")), vec!["A"]);
    }

    #[test]
    fn test_closure_is_order_independent() {
        let one = edges(&[("A", &["C", "B"]), ("B", &["D"]), ("C", &["D"]), ("D", &[])]);
        let two = edges(&[("A", &["B", "C"]), ("C", &["D"]), ("B", &["D"]), ("D", &[])]);
        assert_eq!(transitive_closure(&one, "A"), transitive_closure(&two, "A"));
        assert_eq!(names(&transitive_closure(&one, "A")), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_analyze_plain_struct_is_not_a_resource() {
        let external = ExternalTypes::new();
        let mut resolver = TypeResolver::new(&external);
        let fields = vec![FieldDecl::new("name", prim("String"))];
        assert!(analyze_fields(&mut resolver, "Plain", &fields).unwrap().is_none());
    }

    #[test]
    fn test_analyze_partial_tagging_is_fatal() {
        let external = ExternalTypes::new();
        let mut resolver = TypeResolver::new(&external);
        let fields = vec![id("foos"), FieldDecl::new("name", prim("String"))];
        let err = analyze_fields(&mut resolver, "Foo", &fields).unwrap_err();
        assert_eq!(err.to_string(), "JSON:API resource Foo: missing fields: name");
        assert!(err.is_structural());
    }

    #[test]
    fn test_analyze_primary_must_be_id() {
        let external = ExternalTypes::new();
        let mut resolver = TypeResolver::new(&external);
        let fields = vec![FieldDecl::new("key", prim("String")).with_tag("jsonapi", r#"primary = "foos""#)];
        assert!(matches!(
            analyze_fields(&mut resolver, "Foo", &fields),
            Err(Error::JsonApi { .. })
        ));

        let fields = vec![FieldDecl::new("name", prim("String")).with_tag("jsonapi", r#"attr = "name""#)];
        assert!(analyze_fields(&mut resolver, "Foo", &fields).is_err());
    }

    #[test]
    fn test_analyze_relation_must_be_reference() {
        let external = ExternalTypes::new();
        let mut resolver = TypeResolver::new(&external);
        let fields = vec![
            id("foos"),
            FieldDecl::new("count", prim("i32")).with_tag("jsonapi", r#"relation = "count""#),
        ];
        assert!(analyze_fields(&mut resolver, "Foo", &fields).is_err());
    }

    #[test]
    fn test_analyze_resource() {
        let external = ExternalTypes::new();
        let mut resolver = TypeResolver::new(&external);
        let fields = vec![
            id("foos"),
            FieldDecl::new("field", prim("String"))
                .with_tag("jsonapi", r#"attr = "field2""#)
                .with_tag("validate", "required"),
            FieldDecl::new("nullable", prim("String")).with_tag("jsonapi", r#"attr = "field3", omitempty"#),
            FieldDecl::new("reference", prim("Bar")).with_tag("jsonapi", r#"relation = "ref1""#),
            FieldDecl::new("references", TypeDescriptor::sequence(prim("Baz")))
                .with_tag("jsonapi", r#"relation = "ref2""#),
            FieldDecl::new("cache", prim("String")).with_tag("serde", "skip"),
        ];
        let resource = analyze_fields(&mut resolver, "Foo", &fields).unwrap().unwrap();

        assert_eq!(resource.resource_type, "foos");
        assert_eq!(
            serde_json::to_value(&resource.attributes).unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "field2": {"type": "string"},
                    "field3": {"type": "string", "nullable": true}
                },
                "required": ["field2"]
            })
        );
        assert_eq!(
            resource.relations,
            vec![
                Relation {
                    name: "ref1".to_string(),
                    target: "Bar".to_string(),
                    collection: false,
                },
                Relation {
                    name: "ref2".to_string(),
                    target: "Baz".to_string(),
                    collection: true,
                },
            ]
        );
    }

    fn resource(name: &str, relations: &[(&str, &str, bool)]) -> Resource {
        Resource {
            real_name: name.to_string(),
            custom_name: None,
            resource_type: format!("{}s", name.to_lowercase()),
            attributes: SchemaNode::object(),
            relations: relations
                .iter()
                .map(|(field, target, collection)| Relation {
                    name: field.to_string(),
                    target: target.to_string(),
                    collection: *collection,
                })
                .collect(),
        }
    }

    #[test]
    fn test_register_envelopes() {
        let mut graph = ResourceGraph::new();
        graph.insert(resource("Foo", &[("bar", "Bar", false), ("bars", "Bar", true)]));
        graph.insert(resource("Bar", &[]));

        let mut registry = Registry::new();
        graph.register_envelopes(&mut registry, true).unwrap();
        let published = registry.finalize().unwrap();

        let mut names: Vec<_> = published.keys().map(String::as_str).collect();
        names.retain(|n| *n != "AnyValue");
        assert_eq!(names.len(), 16);
        for suffix in [
            "",
            "Collection",
            "Data",
            "Identifier",
            "IdentifierCollection",
            "IdentifierData",
            "Attributes",
            "Relationships",
        ] {
            assert!(published.contains_key(&format!("Foo{}", suffix)), "Foo{}", suffix);
            assert!(published.contains_key(&format!("Bar{}", suffix)), "Bar{}", suffix);
        }

        let data = serde_json::to_value(&published["FooData"]).unwrap();
        assert_eq!(
            data["properties"]["relationships"]["properties"]["bar"]["$ref"],
            json!("#/components/schemas/BarIdentifier")
        );
        assert_eq!(
            data["properties"]["relationships"]["properties"]["bars"]["$ref"],
            json!("#/components/schemas/BarIdentifierCollection")
        );
        assert_eq!(data["properties"]["type"]["enum"], json!(["foos"]));
        assert_eq!(data["required"], json!(["id", "type"]));

        let root = serde_json::to_value(&published["Foo"]).unwrap();
        assert_eq!(
            root,
            json!({
                "type": "object",
                "properties": {
                    "data": {"$ref": "#/components/schemas/FooData"},
                    "includes": {
                        "type": "array",
                        "nullable": true,
                        "items": {"anyOf": [{"$ref": "#/components/schemas/BarData"}]}
                    }
                },
                "required": ["data"]
            })
        );
        let bar = serde_json::to_value(&published["Bar"]).unwrap();
        assert!(bar["properties"].get("includes").is_none());
    }

    #[test]
    fn test_includes_can_be_disabled() {
        let mut graph = ResourceGraph::new();
        graph.insert(resource("Foo", &[("bar", "Bar", false)]));
        graph.insert(resource("Bar", &[("foo", "Foo", false)]));

        let mut registry = Registry::new();
        graph.register_envelopes(&mut registry, false).unwrap();
        let published = registry.finalize().unwrap();
        for name in ["Foo", "Bar"] {
            let root = serde_json::to_value(&published[name]).unwrap();
            assert!(root["properties"].get("includes").is_none());
        }
    }

    #[test]
    fn test_first_resource_declaration_wins() {
        let mut graph = ResourceGraph::new();
        graph.insert(resource("Foo", &[("bar", "Bar", false)]));
        graph.insert(resource("Foo", &[("bar", "Bar", false)]));
        assert_eq!(graph.len(), 1);
        graph.register_envelopes(&mut Registry::new(), true).unwrap();

        graph.insert(resource("Foo", &[]));
        assert_eq!(graph.get("Foo").unwrap().relations.len(), 1);
        match graph.register_envelopes(&mut Registry::new(), true) {
            Err(Error::DuplicateSchema { name }) => assert_eq!(name, "Foo"),
            other => panic!("expected a duplicate schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_envelopes_use_custom_names() {
        let mut graph = ResourceGraph::new();
        let mut foo = resource("Foo", &[("bar", "Bar", false)]);
        foo.custom_name = Some("Thing".to_string());
        graph.insert(foo);
        graph.insert(resource("Bar", &[("foo", "Foo", true)]));

        let mut registry = Registry::new();
        graph.register_envelopes(&mut registry, true).unwrap();
        let published = registry.finalize().unwrap();

        assert!(published.contains_key("Thing"));
        assert!(published.contains_key("ThingData"));
        assert!(!published.contains_key("Foo"));
        let bar_data = serde_json::to_value(&published["BarData"]).unwrap();
        assert_eq!(
            bar_data["properties"]["relationships"]["properties"]["foo"]["$ref"],
            json!("#/components/schemas/ThingIdentifierCollection")
        );
    }
}
