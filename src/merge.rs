//! Combines independently generated documents into one.
//!
//! Auxiliary documents may only add: a path verb or a schema that already
//! exists in the main document must be structurally equal, otherwise the merge
//! fails naming the offending entry and source.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::serializer::read_document;
use anyhow::Context;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Merges `aux` into `main`. `source_name` identifies `aux` in conflict errors.
pub fn merge(main: &mut Document, aux: &Document, source_name: &str) -> Result<()> {
    for (url, item) in &aux.paths {
        for (verb, operation) in item {
            match main.operation(url, verb) {
                Some(existing) if existing == operation => {
                    debug!("Skipping identical {} {} from {}", verb, url, source_name);
                }
                Some(_) => {
                    return Err(Error::PathConflict {
                        url: url.clone(),
                        verb: verb.clone(),
                        source_name: source_name.to_string(),
                    });
                }
                None => {
                    info!("Adding path {} {} from {}", verb, url, source_name);
                    main.add_operation(url, verb, operation.clone());
                }
            }
        }
    }

    for (name, schema) in &aux.components.schemas {
        match main.components.schemas.get(name) {
            Some(existing) if existing == schema => continue,
            Some(_) => {
                return Err(Error::SchemaConflict {
                    name: name.clone(),
                    source_name: source_name.to_string(),
                });
            }
            None => {
                info!("Adding schema {} from {}", name, source_name);
                main.components.schemas.insert(name.clone(), schema.clone());
            }
        }
    }

    Ok(())
}

/// `*.yaml` files directly inside `dir`, sorted by name.
pub fn yaml_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yaml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads `main_path` and merges every `*.yaml` document of `dir` into it.
pub fn merge_directory(main_path: &Path, dir: &Path) -> anyhow::Result<Document> {
    let mut main = read_document(main_path)?;
    let files = yaml_files(dir)?;
    if files.is_empty() {
        warn!("No YAML files found in {}", dir.display());
    }

    for path in files {
        let aux = read_document(&path)?;
        let source_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        merge(&mut main, &aux, &source_name)?;
    }

    Ok(main)
}
