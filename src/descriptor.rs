//! Structural declarations handed to the compiler by the source front end.
//!
//! These types are the boundary between the Rust-source parser and the schema
//! compiler: the compiler never looks at syntax trees, only at descriptors,
//! raw tag strings and documentation text.

use std::path::PathBuf;

/// Shape of a declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// A bare identifier (`String`, `i64`, `Pet`, ...). Unknown names become references.
    Primitive(String),
    /// `Option<T>`
    Optional(Box<TypeDescriptor>),
    /// `Vec<T>`, slices, arrays and sets
    Sequence(Box<TypeDescriptor>),
    /// `HashMap<K, V>` and friends
    Mapping {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    /// A path such as `chrono::DateTime`; `qualifier` holds the leading segments.
    Named {
        qualifier: String,
        inner: Box<TypeDescriptor>,
    },
    /// A struct with its fields
    Composite(Vec<FieldDecl>),
    /// A fieldless enum, serialized as one of its variant names
    Enumeration(Vec<String>),
    /// `serde_json::Value` and trait objects
    Dynamic,
    /// Anything the compiler cannot express; the payload names the shape
    Unsupported(String),
}

impl TypeDescriptor {
    pub fn primitive(name: &str) -> Self {
        TypeDescriptor::Primitive(name.to_string())
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    pub fn sequence(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Sequence(Box::new(inner))
    }

    pub fn mapping(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Mapping {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn named(qualifier: &str, inner: TypeDescriptor) -> Self {
        TypeDescriptor::Named {
            qualifier: qualifier.to_string(),
            inner: Box::new(inner),
        }
    }

    /// Strips `Optional` and `Named` wrappers.
    pub fn innermost(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Optional(inner) => inner.innermost(),
            TypeDescriptor::Named { inner, .. } => inner.innermost(),
            other => other,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeDescriptor::Optional(_))
    }

    /// True for sequences, looking through `Optional`.
    pub fn is_sequence(&self) -> bool {
        match self {
            TypeDescriptor::Optional(inner) => inner.is_sequence(),
            TypeDescriptor::Sequence(_) => true,
            _ => false,
        }
    }
}

/// A raw attribute attached to a field, e.g. `serde` + `rename = "userName"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTag {
    pub key: String,
    pub value: String,
}

impl RawTag {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// One field of a composite declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Declared identifier; `None` for positional fields
    pub name: Option<String>,
    pub descriptor: TypeDescriptor,
    pub doc: String,
    pub tags: Vec<RawTag>,
}

impl FieldDecl {
    pub fn new(name: &str, descriptor: TypeDescriptor) -> Self {
        Self {
            name: Some(name.to_string()),
            descriptor,
            doc: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push(RawTag::new(key, value));
        self
    }

    pub fn with_doc(mut self, doc: &str) -> Self {
        self.doc = doc.to_string();
        self
    }
}

/// A named type declaration with its documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub doc: String,
}

impl Declaration {
    pub fn new(name: &str, descriptor: TypeDescriptor, doc: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptor,
            doc: doc.to_string(),
        }
    }
}

/// Everything the compiler needs from one source file.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub path: PathBuf,
    pub declarations: Vec<Declaration>,
    /// Documentation comment groups, in source order
    pub doc_blocks: Vec<String>,
}
