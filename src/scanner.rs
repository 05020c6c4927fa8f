use anyhow::Result;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File scanner for annotated source trees.
///
/// The `FileScanner` walks one or more roots and collects every `.rs` file.
/// It skips `target` and hidden entries (those starting with `.`), and drops
/// anything under a `vendor` directory unless the path below it contains one
/// of the configured inclusion names as whole components.
///
/// # Example
///
/// ```no_run
/// use openapi_from_annotations::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(vec![PathBuf::from("./my-project")]);
/// let result = scanner.scan().unwrap();
/// println!("Found {} Rust files", result.rust_files.len());
/// ```
pub struct FileScanner {
    roots: Vec<PathBuf>,
    vendor_inclusions: Vec<String>,
}

/// Result of a scan.
pub struct ScanResult {
    /// Discovered `.rs` files, sorted by path
    pub rust_files: Vec<PathBuf>,
    /// Warning messages for entries that could not be accessed
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            vendor_inclusions: Vec::new(),
        }
    }

    /// Vendored paths containing one of `names` are kept. A name may span
    /// several components, as in `github.com/acme/models`.
    pub fn with_vendor_inclusions(mut self, names: Vec<String>) -> Self {
        self.vendor_inclusions = names;
        self
    }

    /// Scans every root and returns the deduplicated, sorted file list.
    ///
    /// Inaccessible entries are recorded as warnings and scanning continues.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        for root in &self.roots {
            debug!("Scanning {}", root.display());

            for entry in WalkDir::new(root).into_iter().filter_entry(|e| {
                if e.path() == root.as_path() {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            }) {
                match entry {
                    Ok(entry) => {
                        let path = entry.path();
                        if entry.file_type().is_file() && self.accepts(path) {
                            rust_files.push(path.to_path_buf());
                        }
                    }
                    Err(e) => {
                        let warning = format!("Failed to access path: {}", e);
                        warn!("{}", warning);
                        warnings.push(warning);
                    }
                }
            }
        }

        rust_files.sort();
        rust_files.dedup();
        debug!("Scan found {} source files", rust_files.len());

        Ok(ScanResult {
            rust_files,
            warnings,
        })
    }

    fn accepts(&self, path: &Path) -> bool {
        if path.extension().and_then(|s| s.to_str()) != Some("rs") {
            return false;
        }
        let components: Vec<_> = path.components().map(|c| c.as_os_str().to_string_lossy()).collect();
        let Some(vendor) = components.iter().rposition(|c| c == "vendor") else {
            return true;
        };
        let vendored = &components[vendor + 1..];
        self.vendor_inclusions.iter().any(|name| {
            let parts: Vec<&str> = name.split('/').filter(|p| !p.is_empty()).collect();
            !parts.is_empty()
                && vendored
                    .windows(parts.len())
                    .any(|window| window.iter().zip(&parts).all(|(c, p)| c == p))
        })
    }
}
