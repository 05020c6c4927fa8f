use crate::descriptor::{FieldDecl, TypeDescriptor};
use crate::error::{Diagnostic, DiagnosticKind, ResolveError, TagError};
use crate::external_types::ExternalTypes;
use crate::schema::{ComposedSchema, Schema, SchemaMeta, SchemaNode, ANY_VALUE};
use crate::tags::{extract_annotation, FieldAnnotation};
use log::{debug, warn};
use serde_json::Value;

/// Type resolver - translates type descriptors into schema nodes
pub struct TypeResolver<'a> {
    /// Externally defined types consulted before falling back to a reference
    external_types: &'a ExternalTypes,
    /// Problems that skipped a field but did not stop resolution
    diagnostics: Vec<Diagnostic>,
    /// Subject that nested inline composites report their fields under
    scope: Option<String>,
}

/// A field together with its extracted annotation.
pub type AnnotatedField<'f> = (&'f FieldDecl, FieldAnnotation);

/// Maps a primitive identifier to its `type`/`format` pair.
pub fn primitive_schema(name: &str) -> Option<SchemaNode> {
    let (schema_type, format) = match name {
        "String" | "str" | "char" => ("string", None),
        "bool" => ("boolean", None),
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => ("integer", Some("int32")),
        "i64" | "i128" | "isize" | "u64" | "u128" | "usize" => ("integer", Some("int64")),
        "f32" => ("number", Some("float")),
        "f64" => ("number", Some("double")),
        "DateTime" | "NaiveDateTime" | "SystemTime" | "OffsetDateTime" => ("string", Some("date-time")),
        "NaiveDate" | "Date" => ("string", Some("date")),
        "Uuid" => ("string", Some("uuid")),
        "Bytes" | "ByteBuf" | "RawValue" => ("string", Some("binary")),
        _ => return None,
    };
    Some(SchemaNode::primitive(schema_type, format))
}

fn is_binary(node: &SchemaNode) -> bool {
    node.is_type("string") && node.format.as_deref() == Some("binary")
}

impl<'a> TypeResolver<'a> {
    pub fn new(external_types: &'a ExternalTypes) -> Self {
        Self {
            external_types,
            diagnostics: Vec::new(),
            scope: None,
        }
    }

    /// Names the declaration being resolved, so that inline composites
    /// report their fields under it.
    pub fn scoped(mut self, owner: &str) -> Self {
        self.scope = Some(owner.to_string());
        self
    }

    /// Resolve a descriptor. `disambiguator` is the qualifying path of a named type.
    pub fn resolve(
        &mut self,
        descriptor: &TypeDescriptor,
        disambiguator: Option<&str>,
    ) -> Result<SchemaNode, ResolveError> {
        match descriptor {
            TypeDescriptor::Primitive(name) => Ok(self.resolve_identifier(name, disambiguator)),
            TypeDescriptor::Optional(inner) => {
                let mut node = self.resolve(inner, disambiguator)?;
                node.nullable = Some(true);
                Ok(node)
            }
            TypeDescriptor::Sequence(element) => self.resolve_sequence(element, disambiguator),
            TypeDescriptor::Mapping { key, value } => self.resolve_mapping(key, value),
            TypeDescriptor::Named { qualifier, inner } => self.resolve(inner, Some(qualifier)),
            TypeDescriptor::Composite(fields) => {
                let owner = self.scope.clone().unwrap_or_else(|| "<inline>".to_string());
                Ok(self.resolve_composite(&owner, fields).into_node())
            }
            TypeDescriptor::Enumeration(variants) => Ok(SchemaNode {
                enum_values: Some(variants.iter().map(|v| Value::String(v.clone())).collect()),
                ..SchemaNode::primitive("string", None)
            }),
            TypeDescriptor::Dynamic => Ok(SchemaNode::reference(ANY_VALUE)),
            TypeDescriptor::Unsupported(shape) => Err(ResolveError::Unsupported(shape.clone())),
        }
    }

    fn resolve_identifier(&self, name: &str, disambiguator: Option<&str>) -> SchemaNode {
        if let Some(external) = self.external_types.lookup(name, disambiguator) {
            debug!("Type {} resolved from the external types table", name);
            return SchemaNode::primitive(&external.schema_type, external.format.as_deref());
        }
        if let Some(node) = primitive_schema(name) {
            return node;
        }
        debug!("Type {} is not a primitive, emitting a reference", name);
        SchemaNode::reference(name)
    }

    fn resolve_sequence(
        &mut self,
        element: &TypeDescriptor,
        disambiguator: Option<&str>,
    ) -> Result<SchemaNode, ResolveError> {
        if matches!(element.innermost(), TypeDescriptor::Primitive(name) if name == "u8") {
            return Ok(SchemaNode::primitive("string", Some("binary")));
        }

        let mut items = self.resolve(element, disambiguator)?;
        if is_binary(&items) {
            return Ok(SchemaNode::primitive("string", Some("binary")));
        }
        items.nullable = None;
        Ok(SchemaNode::array(items))
    }

    fn resolve_mapping(
        &mut self,
        key: &TypeDescriptor,
        value: &TypeDescriptor,
    ) -> Result<SchemaNode, ResolveError> {
        let key_node = self.resolve(key, None)?;
        if !(key_node.is_type("string") || key_node.is_type("integer")) {
            let shown = key_node
                .referenced_name()
                .map(str::to_string)
                .or_else(|| key_node.schema_type.clone())
                .unwrap_or_else(|| format!("{:?}", key));
            return Err(ResolveError::UnsupportedMapKey(shown));
        }

        let additional = match value {
            TypeDescriptor::Dynamic => SchemaNode::default(),
            other => self.resolve(other, None)?,
        };
        Ok(SchemaNode {
            additional_properties: Some(Box::new(additional)),
            ..SchemaNode::object()
        })
    }

    /// Reads the annotation of a field, recording a diagnostic when its tags are malformed.
    pub fn annotate(&mut self, owner: &str, field: &FieldDecl) -> Option<FieldAnnotation> {
        match extract_annotation(field) {
            Ok(annotation) => Some(annotation),
            Err(e) => {
                self.record(DiagnosticKind::Extraction, owner, field, e.to_string());
                None
            }
        }
    }

    /// Annotates every field once. Malformed fields are dropped with a
    /// diagnostic, ignored ones silently.
    pub fn annotate_fields<'f>(&mut self, owner: &str, fields: &'f [FieldDecl]) -> Vec<AnnotatedField<'f>> {
        fields
            .iter()
            .filter_map(|field| self.annotate(owner, field).map(|a| (field, a)))
            .filter(|(_, annotation)| !annotation.ignored)
            .collect()
    }

    /// Resolve one field and apply what its annotation says about the value.
    pub fn resolve_field(
        &mut self,
        owner: &str,
        field: &FieldDecl,
        annotation: &FieldAnnotation,
    ) -> Option<SchemaNode> {
        let outer = self.scope.replace(subject(owner, field));
        let resolved = self.resolve(&field.descriptor, None);
        self.scope = outer;
        let mut node = match resolved {
            Ok(node) => node,
            Err(e) => {
                self.record(DiagnosticKind::Resolution, owner, field, e.to_string());
                return None;
            }
        };

        if annotation.string_coercion {
            let coercible = !node.is_reference()
                && ["string", "integer", "number", "boolean"]
                    .iter()
                    .any(|t| node.is_type(t));
            if !coercible {
                self.record(
                    DiagnosticKind::Extraction,
                    owner,
                    field,
                    TagError::InvalidStringCoercion.to_string(),
                );
                return None;
            }
            node.schema_type = Some("string".to_string());
        }

        if !annotation.enum_values.is_empty() {
            let values = annotation
                .enum_values
                .iter()
                .map(|v| Value::String(v.clone()))
                .collect();
            match node.items.as_mut() {
                Some(items) => items.enum_values = Some(values),
                None => node.enum_values = Some(values),
            }
        }
        if annotation.nullable {
            node.nullable = Some(true);
        }
        if annotation.description.is_some() {
            node.description = annotation.description.clone();
        }
        if annotation.example.is_some() {
            node.example = annotation.example.clone();
        }
        Some(node)
    }

    /// Resolve the fields of a struct-like declaration.
    ///
    /// Named fields become properties of an object schema. Embedded fields are
    /// appended to an `allOf` list, in which case the object holding the named
    /// fields becomes its trailing member.
    pub fn resolve_composite(&mut self, owner: &str, fields: &[FieldDecl]) -> Schema {
        let annotated = self.annotate_fields(owner, fields);
        self.resolve_annotated(owner, &annotated)
    }

    /// Like [`TypeResolver::resolve_composite`], for fields already annotated.
    pub fn resolve_annotated(&mut self, owner: &str, fields: &[AnnotatedField<'_>]) -> Schema {
        debug!("Resolving {} fields of {}", fields.len(), owner);

        let mut all_of = Vec::new();
        let mut object = SchemaNode::object();
        let mut required = Vec::new();

        for (field, annotation) in fields {
            let Some(node) = self.resolve_field(owner, field, annotation) else {
                continue;
            };

            match &annotation.name {
                None => all_of.push(node),
                Some(name) => {
                    if annotation.required {
                        required.push(name.clone());
                    }
                    object = object.with_property(name, node);
                }
            }
        }

        if !required.is_empty() {
            object.required = Some(required);
        }

        if all_of.is_empty() {
            Schema::Plain(object)
        } else {
            all_of.push(object);
            Schema::Composed(ComposedSchema {
                all_of,
                meta: SchemaMeta::default(),
            })
        }
    }

    fn record(&mut self, kind: DiagnosticKind, owner: &str, field: &FieldDecl, message: String) {
        let subject = subject(owner, field);
        warn!("Skipping field {}: {}", subject, message);
        self.diagnostics.push(Diagnostic::error(kind, subject, message));
    }

    /// Drains the diagnostics recorded so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

fn subject(owner: &str, field: &FieldDecl) -> String {
    format!("{}.{}", owner, field.name.as_deref().unwrap_or("<embedded>"))
}
