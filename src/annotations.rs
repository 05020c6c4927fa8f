//! Markers and YAML blocks embedded in documentation comments.
//!
//! ```text
//! /// @openapi:schema:Animal
//! pub struct Pet { .. }
//!
//! /// @openapi:path
//! /// /pets:
//! ///   get:
//! ///     summary: List pets
//! ///     responses:
//! ///       "200":
//! ///         description: the pets
//! pub async fn list_pets() {}
//! ```

use crate::document::{Document, Info, PathItem};
use crate::error::{Diagnostic, DiagnosticKind};
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

static SCHEMA_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"@openapi:schema(?::(\w+))?").unwrap());
static IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"import\(([^)]+)\)").unwrap());

const MARKER_PREFIX: &str = "@openapi:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Path,
    Info,
}

/// A YAML payload following an `@openapi:path` or `@openapi:info` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocBlock {
    pub kind: BlockKind,
    pub content: String,
}

/// Result of looking for `@openapi:schema` in a declaration's documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMarker {
    pub custom_name: Option<String>,
}

pub fn schema_marker(doc: &str) -> Option<SchemaMarker> {
    SCHEMA_MARKER.captures(doc).map(|captures| SchemaMarker {
        custom_name: captures.get(1).map(|m| m.as_str().to_string()),
    })
}

/// Splits a documentation comment group into its path and info blocks.
///
/// A block runs from its marker line to the next `@openapi:` line or the end
/// of the group. Tabs are replaced by two spaces.
pub fn find_blocks(doc: &str) -> Vec<DocBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<(BlockKind, Vec<&str>)> = None;

    for line in doc.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with(MARKER_PREFIX) {
            if let Some((_, lines)) = current.as_mut() {
                lines.push(line);
            }
            continue;
        }

        if let Some((kind, lines)) = current.take() {
            blocks.push(block(kind, &lines));
        }
        current = match trimmed {
            "@openapi:path" => Some((BlockKind::Path, Vec::new())),
            "@openapi:info" => Some((BlockKind::Info, Vec::new())),
            _ => None,
        };
    }
    if let Some((kind, lines)) = current {
        blocks.push(block(kind, &lines));
    }

    blocks
}

fn block(kind: BlockKind, lines: &[&str]) -> DocBlock {
    DocBlock {
        kind,
        content: lines.join("\n").replace('\t', "  "),
    }
}

/// Folds a path block into `doc`. The first operation declared for a verb wins.
pub fn apply_path_block(doc: &mut Document, content: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let paths = match serde_yaml::from_str::<Option<BTreeMap<String, PathItem>>>(content) {
        Ok(Some(paths)) => paths,
        Ok(None) => return diagnostics,
        Err(e) => {
            error!("Unable to decode path block: {}", e);
            diagnostics.push(Diagnostic::error(
                DiagnosticKind::Decode,
                "path block",
                format!("unable to decode path: {}", e),
            ));
            return diagnostics;
        }
    };

    for (url, item) in paths {
        let verbs: Vec<&str> = item.keys().map(String::as_str).collect();
        info!("Parsing path {} {:?}", url, verbs);

        for (verb, operation) in item {
            match doc.operation(&url, &verb) {
                Some(existing) if *existing == operation => {
                    debug!("Operation {} {} declared again with identical content", verb, url);
                }
                Some(_) => {
                    error!("Verb {} for path {} already exists", verb, url);
                    diagnostics.push(Diagnostic::error(
                        DiagnosticKind::PathConflict,
                        format!("{} {}", verb, url),
                        "verb for this path already exists",
                    ));
                }
                None => doc.add_operation(&url, &verb, operation),
            }
        }
    }

    diagnostics
}

/// Folds an info block into `doc`. Each field keeps the first non-empty value it receives.
///
/// `base_dir` resolves `import(<path>)` descriptions.
pub fn apply_info_block(doc: &mut Document, content: &str, base_dir: Option<&Path>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let incoming = match serde_yaml::from_str::<Option<Info>>(content) {
        Ok(Some(incoming)) => incoming,
        Ok(None) => return diagnostics,
        Err(e) => {
            error!("Unable to decode info block: {}", e);
            diagnostics.push(Diagnostic::error(
                DiagnosticKind::Decode,
                "info block",
                format!("unable to decode info: {}", e),
            ));
            return diagnostics;
        }
    };

    let description = match import_path(&incoming.description) {
        Some(relative) if !doc.info.description.is_empty() => {
            debug!("Info description already set, not importing {}", relative);
            String::new()
        }
        Some(relative) => {
            let path = match base_dir {
                Some(dir) => dir.join(relative),
                None => Path::new(relative).to_path_buf(),
            };
            match fs::read_to_string(&path) {
                Ok(text) => {
                    info!("Parsing info description from {}", path.display());
                    text
                }
                Err(e) => {
                    error!("Could not import {}: {}", path.display(), e);
                    diagnostics.push(Diagnostic::error(
                        DiagnosticKind::Import,
                        "info.description",
                        format!("could not import {}: {}", path.display(), e),
                    ));
                    String::new()
                }
            }
        }
        None => incoming.description,
    };

    let info = &mut doc.info;
    for (field, current, value) in [
        ("version", &mut info.version, incoming.version),
        ("title", &mut info.title, incoming.title),
        ("description", &mut info.description, description),
    ] {
        if value.is_empty() || *current == value {
            continue;
        }
        if current.is_empty() {
            info!("Parsing info {}: {}", field, value);
            *current = value;
        } else {
            warn!("Info {} already exists and is different: {:?} != {:?}", field, current, value);
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::InfoConflict,
                format!("info.{}", field),
                format!("already set to {:?}, ignoring {:?}", current, value),
            ));
        }
    }

    for (current, value) in [
        (&mut info.x_logo, incoming.x_logo),
        (&mut info.contact, incoming.contact),
        (&mut info.license, incoming.license),
    ] {
        if current.is_empty() {
            *current = value;
        }
    }

    diagnostics
}

fn import_path(description: &str) -> Option<&str> {
    IMPORT
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const LIST_PETS: &str = "/pets:\n  get:\n    summary: List pets\n    responses:\n      \"200\":\n        description: the pets\n";

    #[test]
    fn test_schema_marker() {
        assert_eq!(schema_marker("Pet\n@openapi:schema"), Some(SchemaMarker { custom_name: None }));
        assert_eq!(
            schema_marker("@openapi:schema:Animal"),
            Some(SchemaMarker {
                custom_name: Some("Animal".to_string())
            })
        );
        assert_eq!(schema_marker("just a pet"), None);
    }

    #[test]
    fn test_find_blocks() {
        let doc = "Handlers\n@openapi:path\n/pets:\n\tget:\n\t\tsummary: x\n@openapi:info\nversion: 1.0.0\n";
        let blocks = find_blocks(doc);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, BlockKind::Path);
        assert_eq!(blocks[0].content, "/pets:\n  get:\n    summary: x");
        assert_eq!(blocks[1].kind, BlockKind::Info);
        assert_eq!(blocks[1].content, "version: 1.0.0");
    }

    #[test]
    fn test_block_ends_at_other_marker() {
        let doc = "@openapi:path\n/pets:\n  get: {}\n@openapi:example 3\ntrailing";
        let blocks = find_blocks(doc);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "/pets:\n  get: {}");
    }

    #[test]
    fn test_apply_path_block() {
        let mut doc = Document::new();
        let diagnostics = apply_path_block(&mut doc, LIST_PETS);
        assert!(diagnostics.is_empty());
        let op = doc.operation("/pets", "get").unwrap();
        assert_eq!(op.summary, "List pets");
        assert_eq!(op.responses["200"].description, "the pets");
    }

    #[test]
    fn test_duplicate_verb_keeps_first() {
        let mut doc = Document::new();
        apply_path_block(&mut doc, LIST_PETS);
        assert!(apply_path_block(&mut doc, LIST_PETS).is_empty());

        let other = "/pets:\n  get:\n    summary: Other\n  post:\n    summary: Add\n";
        let diagnostics = apply_path_block(&mut doc, other);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::PathConflict);
        assert_eq!(diagnostics[0].subject, "get /pets");
        assert_eq!(doc.operation("/pets", "get").unwrap().summary, "List pets");
        assert_eq!(doc.operation("/pets", "post").unwrap().summary, "Add");
    }

    #[test]
    fn test_malformed_path_block() {
        let mut doc = Document::new();
        let diagnostics = apply_path_block(&mut doc, "/pets:\n  get: [unclosed");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Decode);
        assert!(diagnostics[0].is_error());
        assert!(doc.paths.is_empty());
    }

    #[test]
    fn test_info_first_wins_with_warning() {
        let mut doc = Document::new();
        let first = apply_info_block(&mut doc, "version: 1.2.3\ntitle: Pets\ndescription: Pet API", None);
        assert!(first.is_empty());

        let repeated = apply_info_block(&mut doc, "version: 1.2.3\ntitle: Pets", None);
        assert!(repeated.is_empty());

        let second = apply_info_block(&mut doc, "version: 2.0.0\ntitle: \"\"", None);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].severity, Severity::Warning);
        assert_eq!(second[0].kind, DiagnosticKind::InfoConflict);
        assert_eq!(second[0].subject, "info.version");

        assert_eq!(doc.info.version, "1.2.3");
        assert_eq!(doc.info.title, "Pets");
        assert_eq!(doc.info.description, "Pet API");
    }

    #[test]
    fn test_info_extras_are_set_once() {
        let mut doc = Document::new();
        apply_info_block(&mut doc, "x-logo:\n  url: a.png\ncontact:\n  email: a@example.com", None);
        apply_info_block(&mut doc, "x-logo:\n  url: b.png\nlicense:\n  name: MIT", None);
        assert_eq!(doc.info.x_logo["url"], "a.png");
        assert_eq!(doc.info.contact["email"], "a@example.com");
        assert_eq!(doc.info.license["name"], "MIT");
    }

    #[test]
    fn test_info_description_import() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("intro.md"), "# Pets\nWelcome").unwrap();

        let mut doc = Document::new();
        let diagnostics = apply_info_block(&mut doc, "description: import(intro.md)", Some(temp_dir.path()));
        assert!(diagnostics.is_empty());
        assert_eq!(doc.info.description, "# Pets\nWelcome");

        let mut doc = Document::new();
        let diagnostics = apply_info_block(&mut doc, "description: import(missing.md)", Some(temp_dir.path()));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Import);
        assert!(doc.info.description.is_empty());
    }

    #[test]
    fn test_import_is_skipped_once_description_is_set() {
        let temp_dir = TempDir::new().unwrap();
        let mut doc = Document::new();
        apply_info_block(&mut doc, "description: Pet API", Some(temp_dir.path()));

        let diagnostics = apply_info_block(&mut doc, "description: import(missing.md)", Some(temp_dir.path()));
        assert!(diagnostics.is_empty());
        assert_eq!(doc.info.description, "Pet API");
    }

    #[test]
    fn test_malformed_info_block() {
        let mut doc = Document::new();
        let diagnostics = apply_info_block(&mut doc, "version: [1", None);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Decode);
    }
}
