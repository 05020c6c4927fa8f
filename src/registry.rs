//! Registry of component schemas keyed by their declared name.

use crate::error::{Error, Result};
use crate::schema::{any_value_schema, ref_path, Schema, ANY_VALUE};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

/// Schemas accumulated during a compilation run.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: BTreeMap<String, Schema>,
    /// Real names registered twice with different content
    conflicts: Vec<String>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry holding only the `AnyValue` sentinel.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(ANY_VALUE.to_string(), any_value_schema());
        Self {
            entries,
            conflicts: Vec::new(),
        }
    }

    /// Registers `schema` under `real_name`. The first registration of a name wins.
    pub fn register(&mut self, real_name: &str, mut schema: Schema) {
        schema.meta_mut().real_name = Some(real_name.to_string());

        match self.entries.get(real_name) {
            None => {
                debug!("Registered schema {}", real_name);
                self.entries.insert(real_name.to_string(), schema);
            }
            Some(existing) if *existing == schema && existing.custom_name() == schema.custom_name() => {
                debug!("Schema {} registered again with identical content", real_name);
            }
            Some(_) => {
                warn!("Schema {} registered again with different content", real_name);
                if !self.conflicts.iter().any(|c| c == real_name) {
                    self.conflicts.push(real_name.to_string());
                }
            }
        }
    }

    pub fn get(&self, real_name: &str) -> Option<&Schema> {
        self.entries.get(real_name)
    }

    pub fn contains(&self, real_name: &str) -> bool {
        self.entries.contains_key(real_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name a schema is published under: its custom name if set, else `real_name`.
    pub fn display_name(&self, real_name: &str) -> String {
        self.entries
            .get(real_name)
            .and_then(Schema::custom_name)
            .unwrap_or(real_name)
            .to_string()
    }

    /// Produces the published component map.
    ///
    /// Every `$ref` whose target was registered with a custom name is rewritten
    /// to that name, and each entry is keyed by its display name. The registry
    /// itself is left untouched, so finalizing twice yields the same map.
    pub fn finalize(&self) -> Result<BTreeMap<String, Schema>> {
        if let Some(name) = self.conflicts.first() {
            return Err(Error::DuplicateSchema { name: name.clone() });
        }

        let renames: HashMap<&str, &str> = self
            .entries
            .iter()
            .filter_map(|(real, schema)| schema.custom_name().map(|custom| (real.as_str(), custom)))
            .collect();

        let mut published = BTreeMap::new();
        for (real_name, schema) in &self.entries {
            let mut schema = schema.clone();
            if real_name != ANY_VALUE && !renames.is_empty() {
                schema.walk_mut(&mut |node| {
                    let target = node.referenced_name().and_then(|name| renames.get(name));
                    if let Some(custom) = target {
                        node.reference = Some(ref_path(custom));
                    }
                });
            }

            let display_name = schema.custom_name().unwrap_or(real_name).to_string();
            if published.contains_key(&display_name) {
                return Err(Error::DuplicateSchema { name: display_name });
            }
            published.insert(display_name, schema);
        }

        debug!("Finalized {} schemas", published.len());
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ComposedSchema, SchemaMeta, SchemaNode};
    use pretty_assertions::assert_eq;

    fn named(schema: SchemaNode, custom: &str) -> Schema {
        let mut schema = Schema::from(schema);
        schema.set_custom_name(custom);
        schema
    }

    #[test]
    fn test_new_registry_has_any_value() {
        let registry = Registry::new();
        let published = registry.finalize().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[ANY_VALUE], any_value_schema());
    }

    #[test]
    fn test_references_are_rewritten_to_custom_names() {
        let mut registry = Registry::new();
        registry.register("Pet", named(SchemaNode::object(), "Animal"));
        registry.register(
            "Owner",
            SchemaNode::object()
                .with_property("pet", SchemaNode::reference("Pet"))
                .with_property("pets", SchemaNode::array(SchemaNode::reference("Pet")))
                .with_property("other", SchemaNode::reference("Unknown"))
                .into(),
        );

        let published = registry.finalize().unwrap();
        assert!(published.contains_key("Animal"));
        assert!(!published.contains_key("Pet"));

        let owner = published["Owner"].clone().into_node();
        let props = owner.properties.unwrap();
        assert_eq!(props["pet"].reference.as_deref(), Some("#/components/schemas/Animal"));
        assert_eq!(
            props["pets"].items.as_ref().unwrap().reference.as_deref(),
            Some("#/components/schemas/Animal")
        );
        assert_eq!(props["other"].reference.as_deref(), Some("#/components/schemas/Unknown"));
    }

    #[test]
    fn test_composed_members_are_rewritten() {
        let mut registry = Registry::new();
        registry.register("Base", named(SchemaNode::object(), "BaseModel"));
        registry.register(
            "Dog",
            Schema::Composed(ComposedSchema {
                all_of: vec![
                    SchemaNode::reference("Base"),
                    SchemaNode::object().with_property(
                        "friends",
                        SchemaNode {
                            additional_properties: Some(Box::new(SchemaNode::reference("Base"))),
                            ..SchemaNode::object()
                        },
                    ),
                ],
                meta: SchemaMeta::default(),
            }),
        );

        let published = registry.finalize().unwrap();
        let yaml = serde_yaml::to_string(&published["Dog"]).unwrap();
        assert!(!yaml.contains("schemas/Base\n"));
        assert_eq!(yaml.matches("#/components/schemas/BaseModel").count(), 2);
    }

    #[test]
    fn test_finalize_is_idempotent_with_cycles() {
        let mut registry = Registry::new();
        registry.register(
            "Node",
            named(
                SchemaNode::object().with_property("next", SchemaNode::reference("Node")),
                "ListNode",
            ),
        );
        let first = registry.finalize().unwrap();
        let second = registry.finalize().unwrap();
        assert_eq!(first, second);
        let node = first["ListNode"].clone().into_node();
        assert_eq!(
            node.properties.unwrap()["next"].reference.as_deref(),
            Some("#/components/schemas/ListNode")
        );
    }

    #[test]
    fn test_identical_registration_is_noop() {
        let mut registry = Registry::new();
        registry.register("Pet", SchemaNode::object().into());
        registry.register("Pet", SchemaNode::object().into());
        assert_eq!(registry.len(), 2);
        assert!(registry.finalize().is_ok());
    }

    #[test]
    fn test_conflicting_registration_fails_at_finalize() {
        let mut registry = Registry::new();
        registry.register("Pet", SchemaNode::object().into());
        registry.register("Pet", SchemaNode::primitive("string", None).into());
        assert!(registry.get("Pet").unwrap().clone().into_node().is_type("object"));
        match registry.finalize() {
            Err(Error::DuplicateSchema { name }) => assert_eq!(name, "Pet"),
            other => panic!("expected a duplicate schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_name_collision_fails() {
        let mut registry = Registry::new();
        registry.register("Pet", SchemaNode::object().into());
        registry.register("Animal", named(SchemaNode::primitive("string", None), "Pet"));
        assert!(matches!(
            registry.finalize(),
            Err(Error::DuplicateSchema { name }) if name == "Pet"
        ));
    }

    #[test]
    fn test_display_name() {
        let mut registry = Registry::new();
        registry.register("Pet", named(SchemaNode::object(), "Animal"));
        assert_eq!(registry.display_name("Pet"), "Animal");
        assert_eq!(registry.display_name("Other"), "Other");
    }
}
