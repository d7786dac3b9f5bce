//! Front matter parsing for page sources.
//!
//! A page may open with a YAML block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Tavern Menu
//! needs_children: true
//! ---
//! <h1>{{ title }}</h1>
//! ```
//!
//! The opening fence must be the very first line. Without it, or without a
//! closing fence, the whole source is body and the front matter is empty.
//! The block must parse as a YAML mapping; a scalar or list is an error.

use serde_json::{Map, Value};
use thiserror::Error;

const FENCE: &str = "---";

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("invalid YAML: {0}")]
    Yaml(String),
    #[error("front matter must be a mapping, found {0}")]
    NotAMapping(&'static str),
}

/// A page source split into its metadata and template body.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDocument<'a> {
    pub front_matter: Map<String, Value>,
    pub body: &'a str,
}

/// Split `source` into front matter and body, parsing the front matter.
pub fn parse(source: &str) -> Result<PageDocument<'_>, FrontMatterError> {
    let Some((yaml, body)) = split(source) else {
        return Ok(PageDocument {
            front_matter: Map::new(),
            body: source,
        });
    };
    Ok(PageDocument {
        front_matter: parse_mapping(yaml)?,
        body,
    })
}

/// Byte-exact split at the fences. `None` when there is no complete block.
fn split(source: &str) -> Option<(&str, &str)> {
    let (first, mut rest) = next_line(source)?;
    if first.trim_end() != FENCE {
        return None;
    }
    let yaml_start = source.len() - rest.len();
    loop {
        let line_start = source.len() - rest.len();
        let (line, after) = next_line(rest)?;
        if line.trim_end() == FENCE {
            return Some((&source[yaml_start..line_start], after));
        }
        rest = after;
    }
}

/// Returns the next line (without its terminator) and the remainder.
fn next_line(s: &str) -> Option<(&str, &str)> {
    if s.is_empty() {
        return None;
    }
    match s.find('\n') {
        Some(i) => Some((&s[..i], &s[i + 1..])),
        None => Some((s, "")),
    }
}

fn parse_mapping(yaml: &str) -> Result<Map<String, Value>, FrontMatterError> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }
    let value: Value =
        serde_yaml_ng::from_str(yaml).map_err(|e| FrontMatterError::Yaml(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::Bool(_) => Err(FrontMatterError::NotAMapping("a boolean")),
        Value::Number(_) => Err(FrontMatterError::NotAMapping("a number")),
        Value::String(_) => Err(FrontMatterError::NotAMapping("a string")),
        Value::Array(_) => Err(FrontMatterError::NotAMapping("a list")),
    }
}
