//! Field tag extraction.
//!
//! Each field attribute the front end keeps (`serde`, `validate`, `jsonapi`,
//! `openapi`) arrives as a raw token string such as `rename = "userName"` or
//! `required, enum = "a b"`. The tokenizer splits it into `key[=value]` tokens
//! and [`extract_annotation`] folds the tokens of every attribute into one
//! [`FieldAnnotation`].

use crate::descriptor::{FieldDecl, TypeDescriptor};
use crate::error::TagError;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EXAMPLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@openapi:example ([^\n]+)").unwrap());

/// One `key`, `key = value` or `key(...)` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken {
    pub key: String,
    pub value: Option<String>,
    /// `key(...)` group; `value` holds the text between the parentheses
    pub nested: bool,
}

/// Role of a field in a JSON:API resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResourceRole {
    #[default]
    None,
    Primary { resource_type: String },
    Attribute { omitempty: bool },
    Relation { collection: bool },
}

/// Everything the tags and documentation of one field say about it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAnnotation {
    /// Serialization name; `None` marks an embedded field
    pub name: Option<String>,
    pub ignored: bool,
    pub required: bool,
    pub enum_values: Vec<String>,
    pub string_coercion: bool,
    pub nullable: bool,
    pub description: Option<String>,
    pub role: ResourceRole,
    pub example: Option<Value>,
}

impl FieldAnnotation {
    pub fn is_embedded(&self) -> bool {
        self.name.is_none()
    }
}

/// Splits a tag string on top-level commas.
pub fn tokenize(input: &str) -> Result<Vec<TagToken>, TagError> {
    let mut raw_tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut escaped = false;
    let mut depth = 0usize;

    for c in input.chars() {
        if in_quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quote = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_quote = true;
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => raw_tokens.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_quote {
        return Err(TagError::UnterminatedQuote(input.to_string()));
    }
    raw_tokens.push(current);

    raw_tokens
        .iter()
        .map(|raw| raw.trim())
        .filter(|raw| !raw.is_empty())
        .map(parse_token)
        .collect()
}

fn parse_token(raw: &str) -> Result<TagToken, TagError> {
    let eq = raw.find('=');
    let paren = raw.find('(');

    if let Some(open) = paren.filter(|open| eq.map_or(true, |eq| *open < eq)) {
        let key = raw[..open].trim();
        let inner = raw[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| TagError::MalformedToken(raw.to_string()))?;
        return Ok(TagToken {
            key: validate_key(key, raw)?,
            value: Some(inner.trim().to_string()),
            nested: true,
        });
    }

    match eq {
        Some(eq) => {
            let key = raw[..eq].trim();
            let value = parse_value(raw[eq + 1..].trim(), raw)?;
            Ok(TagToken {
                key: validate_key(key, raw)?,
                value: Some(value),
                nested: false,
            })
        }
        None => Ok(TagToken {
            key: validate_key(raw, raw)?,
            value: None,
            nested: false,
        }),
    }
}

fn validate_key(key: &str, raw: &str) -> Result<String, TagError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(key.to_string())
    } else {
        Err(TagError::MalformedToken(raw.to_string()))
    }
}

fn parse_value(value: &str, raw: &str) -> Result<String, TagError> {
    if !value.starts_with('"') {
        return Ok(value.to_string());
    }
    if value.len() < 2 || !value.ends_with('"') {
        return Err(TagError::MalformedToken(raw.to_string()));
    }

    let mut unquoted = String::new();
    let mut chars = value[1..value.len() - 1].chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unquoted.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unquoted.push('\n'),
            Some('t') => unquoted.push('\t'),
            Some(other) => unquoted.push(other),
            None => return Err(TagError::MalformedToken(raw.to_string())),
        }
    }
    Ok(unquoted)
}

fn required_value(token: &TagToken) -> Result<String, TagError> {
    match &token.value {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(TagError::MissingValue(token.key.clone())),
    }
}

fn set_role(annotation: &mut FieldAnnotation, role: ResourceRole) -> Result<(), TagError> {
    if annotation.role != ResourceRole::None {
        return Err(TagError::ConflictingRoles);
    }
    annotation.role = role;
    Ok(())
}

/// Reads the tags and documentation of a field.
pub fn extract_annotation(field: &FieldDecl) -> Result<FieldAnnotation, TagError> {
    let mut annotation = FieldAnnotation {
        name: field.name.clone(),
        ..Default::default()
    };
    let mut embedded = field.name.is_none();
    let mut omitempty = false;

    for tag in &field.tags {
        let tokens = tokenize(&tag.value)?;
        for token in tokens.iter().filter(|t| !t.nested) {
            match (tag.key.as_str(), token.key.as_str()) {
                ("serde", "skip") | ("serde", "skip_serializing") => {
                    debug!("Field {:?} is skipped", field.name);
                    return Ok(FieldAnnotation {
                        ignored: true,
                        ..annotation
                    });
                }
                ("serde", "rename") => annotation.name = Some(required_value(token)?),
                ("serde", "flatten") => embedded = true,
                ("serde", _) => {}

                ("validate", "required") => annotation.required = true,
                ("validate", "enum") | ("validate", "oneof") => {
                    annotation.enum_values = required_value(token)?
                        .split_whitespace()
                        .map(str::to_string)
                        .collect();
                }
                ("validate", _) => {}

                ("jsonapi", "primary") => {
                    let resource_type = required_value(token)?;
                    set_role(&mut annotation, ResourceRole::Primary { resource_type })?;
                }
                ("jsonapi", "attr") => {
                    annotation.name = Some(required_value(token)?);
                    set_role(&mut annotation, ResourceRole::Attribute { omitempty: false })?;
                }
                ("jsonapi", "relation") => {
                    annotation.name = Some(required_value(token)?);
                    let collection = field.descriptor.is_sequence();
                    set_role(&mut annotation, ResourceRole::Relation { collection })?;
                }
                ("jsonapi", "omitempty") => omitempty = true,

                ("openapi", "string") => annotation.string_coercion = true,
                ("openapi", "nullable") => annotation.nullable = true,
                ("openapi", "description") => {
                    annotation.description = Some(required_value(token)?)
                }

                ("jsonapi", key) | ("openapi", key) => {
                    return Err(TagError::UnknownKey {
                        attribute: tag.key.clone(),
                        key: key.to_string(),
                    });
                }
                _ => {}
            }
        }
    }

    if let ResourceRole::Attribute { omitempty: flag } = &mut annotation.role {
        *flag = omitempty;
    }
    if embedded {
        annotation.name = None;
    }
    if let Some(raw) = find_example(&field.doc) {
        annotation.example = Some(convert_example(raw, &field.descriptor)?);
    }

    Ok(annotation)
}

/// Returns the raw text following `@openapi:example`, if any.
pub fn find_example(doc: &str) -> Option<&str> {
    EXAMPLE
        .captures(doc)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Types an example according to the primitive it documents.
pub fn convert_example(raw: &str, descriptor: &TypeDescriptor) -> Result<Value, TagError> {
    let invalid = |reason: String| TagError::InvalidExample {
        value: raw.to_string(),
        reason,
    };

    let TypeDescriptor::Primitive(name) = descriptor.innermost() else {
        return Ok(Value::String(raw.to_string()));
    };

    match name.as_str() {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| invalid(format!("could not parse int: {}", e))),
        "u8" | "u16" | "u32" | "u64" | "u128" | "usize" => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|e| invalid(format!("could not parse uint: {}", e))),
        "f32" | "f64" => {
            let parsed = raw
                .parse::<f64>()
                .map_err(|e| invalid(format!("could not parse float: {}", e)))?;
            serde_json::Number::from_f64(parsed)
                .map(Value::Number)
                .ok_or_else(|| invalid("not a finite number".to_string()))
        }
        _ => Ok(Value::String(raw.to_string())),
    }
}
