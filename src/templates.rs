//! Named template registry.
//!
//! Every file directly inside the templates directory is compiled once, up
//! front, and registered under its full file name (`layout.html`,
//! `nav.html`). Pages reference templates by that name: the configured
//! layout wraps each page, a `template:` front-matter key selects an
//! intermediate wrapper, and bodies embed partials.
//!
//! ## Engine
//!
//! Templates are [Tera](https://keats.github.io/tera/) templates. Autoescaping
//! is off: the layout embeds already-rendered page HTML through `content`, so
//! escaping would mangle every page.
//!
//! ## Includes
//!
//! A template or page body can embed another registered template against the
//! context of the render in progress, two ways:
//!
//! ```text
//! {% include "nav.html" %}
//! {{ include(name="nav.html") }}
//! ```
//!
//! The tag is Tera's own. The function is registered per render and bound to
//! that render's context, so it also works inside expressions and filters.
//! Nesting is capped at [`MAX_INCLUDE_DEPTH`] so a template that includes
//! itself fails instead of overflowing the stack.

use crate::files::list_flat_files;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Tera;
use thiserror::Error;

/// Deepest chain of `include()` calls allowed in a single render.
pub const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot compile template {}: {message}", .file.display())]
    Compile { file: PathBuf, message: String },
    #[error("Template '{name}' failed to render: {message}")]
    Render { name: String, message: String },
}

/// Compiled templates keyed by file name.
///
/// Immutable once loaded; shared by reference across render workers.
#[derive(Clone)]
pub struct TemplateRegistry {
    engine: Arc<Tera>,
    names: Vec<String>,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("names", &self.names)
            .finish()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl TemplateRegistry {
    /// A registry with no templates. Pages render bare.
    pub fn empty() -> Self {
        let mut engine = Tera::default();
        engine.autoescape_on(vec![]);
        Self {
            engine: Arc::new(engine),
            names: Vec::new(),
        }
    }

    /// Compile every template file in `dir`.
    ///
    /// A missing directory yields an empty registry.
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        if !dir.is_dir() {
            return Ok(Self::empty());
        }
        let files = list_flat_files(dir).map_err(|source| TemplateError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut sources = Vec::with_capacity(files.len());
        for path in files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let text = fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;
            sources.push((name, text));
        }

        Self::from_sources(sources).map_err(|err| match err {
            TemplateError::Compile { file, message } => TemplateError::Compile {
                file: dir.join(file),
                message,
            },
            other => other,
        })
    }

    /// Compile templates from `(name, source)` pairs.
    ///
    /// All templates are added in one batch so `{% extends %}` and
    /// `{% include %}` may reference each other regardless of name order.
    pub fn from_sources<I, N, S>(sources: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let sources: Vec<(String, String)> = sources
            .into_iter()
            .map(|(n, s)| (n.into(), s.into()))
            .collect();

        let mut engine = Tera::default();
        engine.autoescape_on(vec![]);
        if let Err(err) = engine.add_raw_templates(
            sources.iter().map(|(n, s)| (n.as_str(), s.as_str())),
        ) {
            let names = sources.iter().map(|(n, _)| n.as_str());
            let file = blamed_template(&err.to_string(), names);
            return Err(TemplateError::Compile {
                file: PathBuf::from(file),
                message: error_chain(&err),
            });
        }

        let mut names: Vec<String> = sources.into_iter().map(|(n, _)| n).collect();
        names.sort();
        Ok(Self {
            engine: Arc::new(engine),
            names,
        })
    }

    /// Look up a template by its exact file name.
    pub fn get<'a>(&'a self, name: &'a str) -> Option<Template<'a>> {
        self.contains(name).then_some(Template {
            registry: self,
            name,
        })
    }

    /// Look up the layout template. Same as [`get`](Self::get); named for
    /// the call site that asks "is there a layout?".
    pub fn layout<'a>(&'a self, name: &'a str) -> Option<Template<'a>> {
        self.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).is_ok()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Render an ad hoc template source (a page body) against `context`.
    ///
    /// The source can include any registered template.
    pub fn render_source(
        &self,
        source: &str,
        context: &tera::Context,
    ) -> Result<String, TemplateError> {
        let mut engine = bind_include(&self.engine, context, 0);
        engine
            .render_str(source, context)
            .map_err(|err| TemplateError::Render {
                name: "(page body)".to_string(),
                message: error_chain(&err),
            })
    }
}

/// A registered template, ready to render.
#[derive(Clone, Copy)]
pub struct Template<'a> {
    registry: &'a TemplateRegistry,
    name: &'a str,
}

impl Template<'_> {
    /// Render against `context`. Pure: same context, same output.
    pub fn render(&self, context: &tera::Context) -> Result<String, TemplateError> {
        bind_include(&self.registry.engine, context, 0)
            .render(self.name, context)
            .map_err(|err| TemplateError::Render {
                name: self.name.to_string(),
                message: error_chain(&err),
            })
    }
}

/// The template a batch compile error is about.
///
/// Tera quotes template names (`Failed to parse 'ba.html'`), and for
/// inheritance errors names the failing child before its parent. Matching
/// the quoted form keeps `a.html` from being blamed for `ba.html`.
fn blamed_template<'a>(message: &str, names: impl Iterator<Item = &'a str>) -> String {
    names
        .filter_map(|name| message.find(&format!("'{name}'")).map(|at| (at, name)))
        .min_by_key(|(at, _)| *at)
        .map(|(_, name)| name.to_string())
        .unwrap_or_default()
}

/// Clone the engine with an `include()` function bound to `context`.
fn bind_include(engine: &Arc<Tera>, context: &tera::Context, depth: usize) -> Tera {
    let mut bound = Tera::clone(engine);
    bound.register_function(
        "include",
        Include {
            engine: Arc::clone(engine),
            context: context.clone(),
            depth,
        },
    );
    bound
}

struct Include {
    engine: Arc<Tera>,
    context: tera::Context,
    depth: usize,
}

impl tera::Function for Include {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let name = args
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("include() needs a string `name` argument"))?;
        if self.depth >= MAX_INCLUDE_DEPTH {
            return Err(tera::Error::msg(format!(
                "include() nested deeper than {MAX_INCLUDE_DEPTH} levels at '{name}'"
            )));
        }
        bind_include(&self.engine, &self.context, self.depth + 1)
            .render(name, &self.context)
            .map(Value::String)
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Flatten a Tera error and its sources into one line.
///
/// Tera's top-level message only names the failing template; the actual
/// cause (unknown variable, syntax error) lives in the source chain.
pub(crate) fn error_chain(err: &tera::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
