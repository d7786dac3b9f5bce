//! Render context construction.
//!
//! Every page renders against one mapping assembled in three layers, later
//! layers winning:
//!
//! ```text
//! 1. page meta     path, title, base, cwd, relcwd, target
//! 2. global data   one key per data file (site, nav, ...)
//! 3. front matter  the page's own YAML block
//! ```
//!
//! Layers are deep-merged: mappings merge key by key, any other value
//! replaces what was there. So a page can override `site.title` without
//! losing the rest of `site`.
//!
//! After the body renders, its output is stored under the reserved
//! [`CONTENT_KEY`] for the wrapper and layout templates.
//!
//! ## Children
//!
//! Index pages often list their subsections. A page whose front matter sets
//! `needs_children` to a truthy value (`true`, `yes`, `1`) gets a `children`
//! mapping: one entry per immediate subdirectory that holds an `index.html`,
//! keyed by directory name, whose value is that page's front matter. Only the front matter is parsed; the
//! child pages are not rendered here.

use crate::data::GlobalData;
use crate::files::slash_path;
use crate::front_matter::{self, FrontMatterError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key holding the rendered body.
pub const CONTENT_KEY: &str = "content";
/// Front-matter flag that requests the `children` mapping.
pub const NEEDS_CHILDREN_KEY: &str = "needs_children";
/// Key holding the children mapping.
pub const CHILDREN_KEY: &str = "children";

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Bad front matter in child page {}: {source}", .path.display())]
    ChildFrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },
    #[error("Context is not representable: {0}")]
    Tera(String),
}

/// Path-derived defaults for a page.
///
/// `path`, `base` and `relcwd` are relative to the source root and always
/// `/`-separated. `cwd` is the same directory prefixed with the source root's
/// name, and `target` is the output root's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub path: String,
    pub title: String,
    pub base: String,
    pub cwd: String,
    pub relcwd: String,
    pub target: String,
}

impl PageMeta {
    /// Derive meta for the page at `rel_path` (relative to the source root).
    pub fn new(rel_path: &Path, source_root: &Path, output_root: &Path) -> Self {
        let path = slash_path(rel_path);
        let base = path.strip_suffix(".html").unwrap_or(&path).to_string();
        let relcwd = rel_path
            .parent()
            .map(slash_path)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| ".".to_string());
        let root_name = root_name(source_root);
        // `.` and `..` roots have no name; fall back to the bare directory
        let cwd = if root_name.is_empty() {
            relcwd.clone()
        } else if relcwd == "." {
            root_name
        } else {
            format!("{root_name}/{relcwd}")
        };

        Self {
            title: path.clone(),
            path,
            base,
            cwd,
            relcwd,
            target: root_name_or_path(output_root),
        }
    }

    fn into_map(self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("path".into(), Value::String(self.path));
        map.insert("title".into(), Value::String(self.title));
        map.insert("base".into(), Value::String(self.base));
        map.insert("cwd".into(), Value::String(self.cwd));
        map.insert("relcwd".into(), Value::String(self.relcwd));
        map.insert("target".into(), Value::String(self.target));
        map
    }
}

fn root_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn root_name_or_path(root: &Path) -> String {
    match root.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => root.to_string_lossy().into_owned(),
    }
}

/// The merged mapping a page renders against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    values: Map<String, Value>,
}

impl RenderContext {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Store rendered output under [`CONTENT_KEY`].
    pub fn set_content(&mut self, content: String) {
        self.insert(CONTENT_KEY, Value::String(content));
    }

    /// Convert for the template engine.
    pub fn to_tera(&self) -> Result<tera::Context, ContextError> {
        tera::Context::from_value(Value::Object(self.values.clone()))
            .map_err(|e| ContextError::Tera(e.to_string()))
    }
}

/// Merge meta, global data and front matter into one context.
///
/// Precedence: front matter > global data > path defaults.
pub fn build_context(
    meta: PageMeta,
    front_matter: &Map<String, Value>,
    global: &GlobalData,
) -> RenderContext {
    let mut values = meta.into_map();
    for (key, value) in global.iter() {
        merge_into(&mut values, key, value.clone());
    }
    for (key, value) in front_matter {
        merge_into(&mut values, key, value.clone());
    }
    RenderContext { values }
}

fn merge_into(map: &mut Map<String, Value>, key: &str, overlay: Value) {
    let merged = match map.remove(key) {
        Some(base) => merge_json(base, overlay),
        None => overlay,
    };
    map.insert(key.to_string(), merged);
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Objects are merged key-by-key (overlay keys override base keys).
/// - Any other overlay value replaces the base value entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_json(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                merge_into(&mut base_map, &key, overlay_val);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// True when front matter asks for the children mapping.
///
/// Any truthy value counts: `true`, a non-zero number, a non-empty string
/// (`yes`), or any list or mapping. `false`, `0`, `""` and null do not.
pub fn wants_children(front_matter: &Map<String, Value>) -> bool {
    match front_matter.get(NEEDS_CHILDREN_KEY) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Front matter of each immediate subdirectory's `index.html` under `dir`.
///
/// Keyed by subdirectory name, sorted. Subdirectories without an index page
/// are skipped.
pub fn collect_children(dir: &Path) -> Result<BTreeMap<String, Value>, ContextError> {
    let mut children = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        if !entry.file_type().map_err(io_err(&entry.path()))?.is_dir() {
            continue;
        }
        let index = entry.path().join("index.html");
        if !index.is_file() {
            continue;
        }
        let source = fs::read_to_string(&index).map_err(io_err(&index))?;
        let doc = front_matter::parse(&source).map_err(|source| {
            ContextError::ChildFrontMatter {
                path: index.clone(),
                source,
            }
        })?;
        children.insert(
            entry.file_name().to_string_lossy().into_owned(),
            Value::Object(doc.front_matter),
        );
    }
    Ok(children)
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ContextError + use<> {
    let path = path.to_path_buf();
    move |source| ContextError::Io { path, source }
}
