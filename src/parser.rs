use crate::descriptor::{Declaration, FieldDecl, RawTag, SourceFile, TypeDescriptor};
use crate::tags;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use syn::visit::{self, Visit};
use syn::{Attribute, Expr, Fields, GenericArgument, Item, Lit, Meta, PathArguments, Type};

/// Attributes whose arguments are handed to the tag extractor
const TAG_ATTRIBUTES: &[&str] = &["serde", "validate", "jsonapi", "openapi"];

/// Rust source front end.
///
/// The `AstParser` uses the `syn` crate to parse Rust source code and lowers
/// it into the declarations, field tags and documentation blocks the compiler
/// works from.
///
/// # Example
///
/// ```no_run
/// use openapi_from_annotations::parser::AstParser;
/// use std::path::Path;
///
/// let source = AstParser::parse_file(Path::new("src/models.rs")).unwrap();
/// println!("Found {} declarations", source.declarations.len());
/// ```
pub struct AstParser;

impl AstParser {
    /// Parses a single Rust source file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid Rust syntax
    pub fn parse_file(path: &Path) -> Result<SourceFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Self::parse_source(path, &content)
    }

    /// Parses source text as if it had been read from `path`.
    pub fn parse_source(path: &Path, content: &str) -> Result<SourceFile> {
        let syntax_tree = syn::parse_file(content)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

        let mut declarations = Vec::new();
        collect_declarations(&syntax_tree.items, &mut declarations);

        let mut collector = DocCollector::default();
        collector.visit_file(&syntax_tree);

        debug!(
            "Parsed {}: {} declarations, {} doc blocks",
            path.display(),
            declarations.len(),
            collector.blocks.len()
        );

        Ok(SourceFile {
            path: path.to_path_buf(),
            declarations,
            doc_blocks: collector.blocks,
        })
    }

    /// Parses multiple Rust source files, continuing even if some fail.
    ///
    /// Files that fail to parse are logged as warnings, but parsing continues for remaining files.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<SourceFile>> {
        debug!("Parsing {} files", paths.len());

        let results: Vec<Result<SourceFile>> = paths
            .iter()
            .map(|path| {
                Self::parse_file(path).map_err(|e| {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    e
                })
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}

/// Joined text of the `///` or `//!` comments among `attrs`.
pub fn doc_text(attrs: &[Attribute]) -> String {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(expr) => match &expr.lit {
                    Lit::Str(s) => Some(s.value()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .flat_map(|text| {
            text.lines()
                .map(|line| line.strip_prefix(' ').unwrap_or(line).to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    lines.join("\n")
}

fn raw_tags(attrs: &[Attribute]) -> Vec<RawTag> {
    attrs
        .iter()
        .filter_map(|attr| {
            let key = TAG_ATTRIBUTES.iter().find(|key| attr.path().is_ident(**key))?;
            let list = attr.meta.require_list().ok()?;
            Some(RawTag::new(key, &list.tokens.to_string()))
        })
        .collect()
}

fn collect_declarations(items: &[Item], declarations: &mut Vec<Declaration>) {
    for item in items {
        match item {
            Item::Struct(item_struct) => {
                let descriptor = match &item_struct.fields {
                    Fields::Named(named) => TypeDescriptor::Composite(named.named.iter().map(lower_field).collect()),
                    Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => lower_type(&unnamed.unnamed[0].ty),
                    Fields::Unnamed(_) => TypeDescriptor::Unsupported("tuple struct".to_string()),
                    Fields::Unit => TypeDescriptor::Composite(Vec::new()),
                };
                declarations.push(Declaration::new(
                    &item_struct.ident.to_string(),
                    descriptor,
                    &doc_text(&item_struct.attrs),
                ));
            }
            Item::Enum(item_enum) => {
                let unit_only = item_enum.variants.iter().all(|v| matches!(v.fields, Fields::Unit));
                let descriptor = if unit_only {
                    TypeDescriptor::Enumeration(item_enum.variants.iter().map(variant_name).collect())
                } else {
                    TypeDescriptor::Unsupported("enum with data".to_string())
                };
                declarations.push(Declaration::new(
                    &item_enum.ident.to_string(),
                    descriptor,
                    &doc_text(&item_enum.attrs),
                ));
            }
            Item::Type(item_type) => {
                declarations.push(Declaration::new(
                    &item_type.ident.to_string(),
                    lower_type(&item_type.ty),
                    &doc_text(&item_type.attrs),
                ));
            }
            Item::Mod(item_mod) => {
                if let Some((_, items)) = &item_mod.content {
                    collect_declarations(items, declarations);
                }
            }
            _ => {}
        }
    }
}

/// Serialized name of a unit variant, honouring `#[serde(rename = "..")]`.
fn variant_name(variant: &syn::Variant) -> String {
    raw_tags(&variant.attrs)
        .iter()
        .filter(|tag| tag.key == "serde")
        .filter_map(|tag| tags::tokenize(&tag.value).ok())
        .flatten()
        .find(|token| token.key == "rename" && !token.nested)
        .and_then(|token| token.value)
        .unwrap_or_else(|| variant.ident.to_string())
}

fn lower_field(field: &syn::Field) -> FieldDecl {
    FieldDecl {
        name: field.ident.as_ref().map(|ident| ident.to_string()),
        descriptor: lower_type(&field.ty),
        doc: doc_text(&field.attrs),
        tags: raw_tags(&field.attrs),
    }
}

fn type_args(arguments: &PathArguments) -> Vec<&Type> {
    match arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Lowers a syntactic type into a descriptor.
pub fn lower_type(ty: &Type) -> TypeDescriptor {
    match ty {
        Type::Path(type_path) => lower_path(&type_path.path),
        Type::Reference(reference) => lower_type(&reference.elem),
        Type::Slice(slice) => TypeDescriptor::sequence(lower_type(&slice.elem)),
        Type::Array(array) => TypeDescriptor::sequence(lower_type(&array.elem)),
        Type::Paren(paren) => lower_type(&paren.elem),
        Type::Group(group) => lower_type(&group.elem),
        Type::TraitObject(_) => TypeDescriptor::Dynamic,
        Type::Tuple(tuple) if tuple.elems.is_empty() => TypeDescriptor::Unsupported("unit".to_string()),
        Type::Tuple(_) => TypeDescriptor::Unsupported("tuple".to_string()),
        Type::BareFn(_) => TypeDescriptor::Unsupported("function pointer".to_string()),
        Type::ImplTrait(_) => TypeDescriptor::Unsupported("impl trait".to_string()),
        Type::Ptr(_) => TypeDescriptor::Unsupported("raw pointer".to_string()),
        Type::Never(_) => TypeDescriptor::Unsupported("never".to_string()),
        _ => TypeDescriptor::Unsupported("type".to_string()),
    }
}

fn lower_path(path: &syn::Path) -> TypeDescriptor {
    let Some(last) = path.segments.last() else {
        return TypeDescriptor::Unsupported("empty path".to_string());
    };
    let ident = last.ident.to_string();
    let args = type_args(&last.arguments);
    let qualifier: Vec<String> = path
        .segments
        .iter()
        .take(path.segments.len() - 1)
        .map(|segment| segment.ident.to_string())
        .collect();

    match (ident.as_str(), args.as_slice()) {
        ("Option", [inner]) => TypeDescriptor::optional(lower_type(inner)),
        ("Box" | "Rc" | "Arc" | "Cow", [inner, ..]) => lower_type(inner),
        ("Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet", [inner, ..]) => {
            TypeDescriptor::sequence(lower_type(inner))
        }
        ("HashMap" | "BTreeMap" | "IndexMap", [key, value, ..]) => {
            TypeDescriptor::mapping(lower_type(key), lower_type(value))
        }
        ("Value", []) if qualifier.is_empty() || qualifier.last().map(String::as_str) == Some("serde_json") => {
            TypeDescriptor::Dynamic
        }
        ("Option" | "Vec" | "HashMap" | "BTreeMap", _) => {
            TypeDescriptor::Unsupported(format!("{} without type arguments", ident))
        }
        _ if qualifier.is_empty() => TypeDescriptor::Primitive(ident),
        _ => TypeDescriptor::named(&qualifier.join("::"), TypeDescriptor::Primitive(ident)),
    }
}

/// Collects the documentation of the file and of every item in it.
#[derive(Default)]
struct DocCollector {
    blocks: Vec<String>,
}

impl DocCollector {
    fn push(&mut self, attrs: &[Attribute]) {
        let text = doc_text(attrs);
        if !text.trim().is_empty() {
            self.blocks.push(text);
        }
    }
}

impl<'ast> Visit<'ast> for DocCollector {
    fn visit_file(&mut self, node: &'ast syn::File) {
        self.push(&node.attrs);
        visit::visit_file(self, node);
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.push(&node.attrs);
        visit::visit_item_fn(self, node);
    }

    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        self.push(&node.attrs);
        visit::visit_item_struct(self, node);
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        self.push(&node.attrs);
        visit::visit_item_enum(self, node);
    }

    fn visit_item_type(&mut self, node: &'ast syn::ItemType) {
        self.push(&node.attrs);
        visit::visit_item_type(self, node);
    }

    fn visit_item_const(&mut self, node: &'ast syn::ItemConst) {
        self.push(&node.attrs);
        visit::visit_item_const(self, node);
    }

    fn visit_item_static(&mut self, node: &'ast syn::ItemStatic) {
        self.push(&node.attrs);
        visit::visit_item_static(self, node);
    }

    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        self.push(&node.attrs);
        visit::visit_item_mod(self, node);
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        self.push(&node.attrs);
        visit::visit_item_impl(self, node);
    }

    fn visit_item_trait(&mut self, node: &'ast syn::ItemTrait) {
        self.push(&node.attrs);
        visit::visit_item_trait(self, node);
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        self.push(&node.attrs);
        visit::visit_impl_item_fn(self, node);
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        self.push(&node.attrs);
        visit::visit_trait_item_fn(self, node);
    }
}
