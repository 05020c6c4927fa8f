//! Compilation of source files into one OpenAPI document.
//!
//! A [`Compiler`] owns everything a run accumulates: the schema registry, the
//! JSON:API resources, the paths and info of the document, and the
//! diagnostics. Files are folded in one at a time; [`Compiler::finalize`]
//! then publishes the component schemas.

use crate::annotations::{self, BlockKind};
use crate::descriptor::{Declaration, SourceFile, TypeDescriptor};
use crate::document::Document;
use crate::error::{Diagnostic, DiagnosticKind, Error, Result};
use crate::external_types::ExternalTypes;
use crate::jsonapi::{self, ResourceGraph};
use crate::registry::Registry;
use crate::schema::Schema;
use crate::tags::{convert_example, find_example};
use crate::type_resolver::TypeResolver;
use log::{debug, info, warn};

/// Run-mode settings of a compilation.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Abort as soon as a file produces an error diagnostic
    pub strict: bool,
    /// Add `includes` to JSON:API resource envelopes
    pub jsonapi_includes: bool,
    pub external_types: ExternalTypes,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            strict: false,
            jsonapi_includes: true,
            external_types: ExternalTypes::new(),
        }
    }
}

pub struct Compiler {
    config: CompilerConfig,
    registry: Registry,
    resources: ResourceGraph,
    document: Document,
    diagnostics: Vec<Diagnostic>,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        debug!("Initializing Compiler (strict: {}, includes: {})", config.strict, config.jsonapi_includes);
        Self {
            config,
            registry: Registry::new(),
            resources: ResourceGraph::new(),
            document: Document::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Diagnostics recorded so far, in the order they were produced.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Compiles the files in the given order.
    pub fn compile_files(&mut self, files: &[SourceFile]) -> Result<()> {
        for file in files {
            self.process_file(file)?;
        }
        Ok(())
    }

    /// Folds one file into the document: info blocks, then schemas, then path blocks.
    ///
    /// A structural error abandons the rest of the file. In strict mode it is
    /// returned, as is any error diagnostic the file produced.
    pub fn process_file(&mut self, file: &SourceFile) -> Result<()> {
        debug!("Processing {}", file.path.display());
        let start = self.diagnostics.len();

        let outcome = self.process_contents(file);
        for diagnostic in &mut self.diagnostics[start..] {
            diagnostic.file = Some(file.path.clone());
        }

        match outcome {
            Err(e) if e.is_structural() && !self.config.strict => {
                warn!("Abandoning {}: {}", file.path.display(), e);
                let mut diagnostic = Diagnostic::error(
                    DiagnosticKind::Structural,
                    file.path.display().to_string(),
                    e.to_string(),
                );
                diagnostic.file = Some(file.path.clone());
                self.diagnostics.push(diagnostic);
            }
            Err(e) => return Err(e),
            Ok(()) => {}
        }

        if self.config.strict {
            strict_check(&self.diagnostics[start..])?;
        }
        Ok(())
    }

    fn process_contents(&mut self, file: &SourceFile) -> Result<()> {
        let blocks: Vec<_> = file
            .doc_blocks
            .iter()
            .flat_map(|doc| annotations::find_blocks(doc))
            .collect();
        let base_dir = file.path.parent();

        for block in blocks.iter().filter(|b| b.kind == BlockKind::Info) {
            let found = annotations::apply_info_block(&mut self.document, &block.content, base_dir);
            self.diagnostics.extend(found);
        }

        for declaration in &file.declarations {
            self.process_declaration(declaration)?;
        }

        for block in blocks.iter().filter(|b| b.kind == BlockKind::Path) {
            let found = annotations::apply_path_block(&mut self.document, &block.content);
            self.diagnostics.extend(found);
        }

        Ok(())
    }

    /// Compiles a declaration documented with `@openapi:schema`; others are ignored.
    pub fn process_declaration(&mut self, declaration: &Declaration) -> Result<()> {
        let Some(marker) = annotations::schema_marker(&declaration.doc) else {
            return Ok(());
        };
        let name = declaration.name.as_str();
        let custom_name = marker.custom_name.as_deref();

        let mut resolver = TypeResolver::new(&self.config.external_types).scoped(name);
        let outcome = match &declaration.descriptor {
            TypeDescriptor::Composite(fields) => {
                let annotated = resolver.annotate_fields(name, fields);
                match jsonapi::analyze(&mut resolver, name, custom_name, &annotated) {
                    Ok(Some(resource)) => {
                        self.resources.insert(resource);
                        Ok(None)
                    }
                    Ok(None) => Ok(Some(resolver.resolve_annotated(name, &annotated))),
                    Err(e) => Err(e),
                }
            }
            other => match resolver.resolve(other, None) {
                Ok(node) => Ok(Some(Schema::from(node))),
                Err(e) => {
                    warn!("Skipping schema {}: {}", name, e);
                    self.diagnostics
                        .push(Diagnostic::error(DiagnosticKind::Resolution, name, e.to_string()));
                    Ok(None)
                }
            },
        };
        self.diagnostics.extend(resolver.take_diagnostics());

        let Some(mut schema) = outcome? else {
            return Ok(());
        };

        if let Some(raw) = find_example(&declaration.doc) {
            match convert_example(raw, &declaration.descriptor) {
                Ok(example) => {
                    if let Schema::Plain(node) = &mut schema {
                        node.example = Some(example);
                    }
                }
                Err(e) => self
                    .diagnostics
                    .push(Diagnostic::error(DiagnosticKind::Extraction, name, e.to_string())),
            }
        }
        if let Some(custom) = custom_name {
            schema.set_custom_name(custom);
        }

        info!("Parsing schema {}", custom_name.unwrap_or(name));
        self.registry.register(name, schema);
        Ok(())
    }

    /// Builds the document: JSON:API envelopes are generated and every schema
    /// reference is rewritten to its published name. Does not consume the compiler.
    pub fn finalize(&self) -> Result<Document> {
        let mut registry = self.registry.clone();
        self.resources
            .register_envelopes(&mut registry, self.config.jsonapi_includes)?;

        let mut document = self.document.clone();
        document.components.schemas = registry.finalize()?;
        Ok(document)
    }

    /// Ends the run, returning the document with the diagnostics accumulated on the way.
    pub fn finish(self) -> Result<(Document, Vec<Diagnostic>)> {
        if self.config.strict {
            strict_check(&self.diagnostics)?;
        }
        let document = self.finalize()?;
        info!(
            "Compiled {} paths and {} schemas with {} diagnostics",
            document.paths.len(),
            document.components.schemas.len(),
            self.diagnostics.len()
        );
        Ok((document, self.diagnostics))
    }
}

fn strict_check(diagnostics: &[Diagnostic]) -> Result<()> {
    let errors: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.is_error()).collect();
    match errors.first() {
        Some(first) => Err(Error::Strict {
            count: errors.len(),
            first: first.to_string(),
        }),
        None => Ok(()),
    }
}
