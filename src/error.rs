use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors. Anything returned as `Err` aborts the current file or the whole run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON:API resource {declaration}: {reason}")]
    JsonApi { declaration: String, reason: String },

    #[error("schema {name} is defined more than once with different content")]
    DuplicateSchema { name: String },

    #[error("path conflict in {source_name}: verb {verb} already exists for {url}")]
    PathConflict {
        url: String,
        verb: String,
        source_name: String,
    },

    #[error("schema conflict in {source_name}: schema {name} already exists and is different")]
    SchemaConflict { name: String, source_name: String },

    #[error("{count} error(s) while generating the OpenAPI document (first: {first})")]
    Strict { count: usize, first: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Structural errors abandon the file being processed; in lenient mode the run goes on.
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::JsonApi { .. })
    }
}

/// Errors raised while translating a type descriptor into a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("type {0} is unsupported for a schema")]
    Unsupported(String),

    #[error("map keys can only be strings or integers, found {0}")]
    UnsupportedMapKey(String),
}

/// Errors raised while reading field tags and annotations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("unterminated quoted value in tag `{0}`")]
    UnterminatedQuote(String),

    #[error("malformed tag token `{0}`")]
    MalformedToken(String),

    #[error("unknown {attribute} key `{key}`")]
    UnknownKey { attribute: String, key: String },

    #[error("`{0}` needs a value")]
    MissingValue(String),

    #[error("field carries more than one JSON:API role")]
    ConflictingRoles,

    #[error("string coercion is only allowed on string, integer, number or boolean fields")]
    InvalidStringCoercion,

    #[error("could not parse example `{value}`: {reason}")]
    InvalidExample { value: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Where a non-fatal problem came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Malformed tag or annotation on a field
    Extraction,
    /// Unsupported type shape
    Resolution,
    /// Embedded YAML block that could not be decoded
    Decode,
    /// Verb declared twice for the same URL
    PathConflict,
    /// Info field declared twice with different values
    InfoConflict,
    /// Description import that could not be read
    Import,
    /// JSON:API problem that did not stop the run
    Structural,
}

/// A non-fatal problem recorded during a compilation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub file: Option<PathBuf>,
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            file: None,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn warning(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            file: None,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}: ", file.display())?;
        }
        write!(f, "{}: {}", self.subject, self.message)
    }
}
