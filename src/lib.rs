//! OpenAPI from annotations - compile OpenAPI 3.0 documents from annotated Rust sources.
//!
//! Declarations documented with `@openapi:schema` become component schemas,
//! `@openapi:path` and `@openapi:info` doc comment blocks carry YAML fragments
//! that are folded into the document, and structs tagged with `#[jsonapi(..)]`
//! get a full set of JSON:API envelope schemas.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Walks source roots for Rust files
//! 2. [`parser`] - Lowers each file into [`descriptor`] values with `syn`
//! 3. [`tags`] - Reads field attributes and example annotations
//! 4. [`type_resolver`] - Translates descriptors into schema nodes
//! 5. [`registry`] - Collects component schemas and publishes them under their final names
//! 6. [`jsonapi`] - Generates relationship envelopes for JSON:API resources
//! 7. [`annotations`] - Extracts path and info blocks from documentation
//! 8. [`compiler`] - Drives the above over a set of files
//! 9. [`merge`] - Combines independently generated documents
//! 10. [`serializer`] - Writes documents as YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_annotations::{
//!     compiler::{Compiler, CompilerConfig},
//!     parser::AstParser,
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//! };
//! use std::path::PathBuf;
//!
//! let scan_result = FileScanner::new(vec![PathBuf::from("./my-project")]).scan().unwrap();
//! let sources: Vec<_> = AstParser::parse_files(&scan_result.rust_files)
//!     .into_iter()
//!     .filter_map(Result::ok)
//!     .collect();
//!
//! let mut compiler = Compiler::new(CompilerConfig::default());
//! compiler.compile_files(&sources).unwrap();
//! let (document, diagnostics) = compiler.finish().unwrap();
//!
//! for diagnostic in &diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotations;
pub mod cli;
pub mod compiler;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod external_types;
pub mod jsonapi;
pub mod merge;
pub mod parser;
pub mod registry;
pub mod scanner;
pub mod schema;
pub mod serializer;
pub mod tags;
pub mod type_resolver;
