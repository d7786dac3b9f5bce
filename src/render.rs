//! Page rendering.
//!
//! A page source goes through up to three template passes:
//!
//! ```text
//! source ─► front matter + body
//!           body      ─render─► content
//!           template: ─render─► content   (optional per-page wrapper)
//!           layout    ─render─► output    (when the layout template exists)
//! ```
//!
//! Every pass renders against the same [`RenderContext`], with `content`
//! updated between passes. A page without a layout in the registry is
//! written as its rendered content, unchanged.

use crate::context::{
    self, CHILDREN_KEY, ContextError, PageMeta, RenderContext, build_context, wants_children,
};
use crate::data::GlobalData;
use crate::front_matter::{self, FrontMatterError};
use crate::templates::{TemplateError, TemplateRegistry};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// Front-matter key naming a per-page wrapper template.
pub const TEMPLATE_KEY: &str = "template";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Bad front matter in {page}: {source}")]
    FrontMatter {
        page: String,
        #[source]
        source: FrontMatterError,
    },
    #[error("Page {page} asks for template '{template}', which is not registered")]
    UnknownTemplate { page: String, template: String },
    #[error("Cannot render {page}: {message}")]
    Template { page: String, message: String },
    #[error("Cannot build context for {page}: {source}")]
    Context {
        page: String,
        #[source]
        source: ContextError,
    },
}

/// Everything a page render reads besides its own source.
#[derive(Debug, Clone, Copy)]
pub struct RenderEnv<'a> {
    pub data: &'a GlobalData,
    pub templates: &'a TemplateRegistry,
    /// Name of the layout template.
    pub layout: &'a str,
    pub source_root: &'a Path,
    pub output_root: &'a Path,
}

/// Render the page at `rel_path` (relative to the source root) from `source`.
pub fn render_page(source: &str, rel_path: &Path, env: &RenderEnv) -> Result<String, RenderError> {
    let page = rel_path.display().to_string();
    let doc = front_matter::parse(source).map_err(|source| RenderError::FrontMatter {
        page: page.clone(),
        source,
    })?;

    let meta = PageMeta::new(rel_path, env.source_root, env.output_root);
    let mut ctx = build_context(meta, &doc.front_matter, env.data);

    if wants_children(&doc.front_matter) {
        let dir = match rel_path.parent() {
            Some(parent) => env.source_root.join(parent),
            None => env.source_root.to_path_buf(),
        };
        let children = context::collect_children(&dir).map_err(|source| {
            RenderError::Context {
                page: page.clone(),
                source,
            }
        })?;
        ctx.insert(CHILDREN_KEY, Value::Object(children.into_iter().collect()));
    }

    let content = env
        .templates
        .render_source(doc.body, &tera_context(&ctx, &page)?)
        .map_err(|err| template_failure(&page, err))?;
    ctx.set_content(content);

    if let Some(wrapper) = doc.front_matter.get(TEMPLATE_KEY) {
        let name = match wrapper {
            Value::String(name) => name.as_str(),
            other => {
                return Err(RenderError::UnknownTemplate {
                    page,
                    template: other.to_string(),
                });
            }
        };
        let template = env
            .templates
            .get(name)
            .ok_or_else(|| RenderError::UnknownTemplate {
                page: page.clone(),
                template: name.to_string(),
            })?;
        let wrapped = template
            .render(&tera_context(&ctx, &page)?)
            .map_err(|err| template_failure(&page, err))?;
        ctx.set_content(wrapped);
    }

    match env.templates.layout(env.layout) {
        Some(layout) => layout
            .render(&tera_context(&ctx, &page)?)
            .map_err(|err| template_failure(&page, err)),
        None => Ok(match ctx.get(context::CONTENT_KEY) {
            Some(Value::String(content)) => content.clone(),
            _ => String::new(),
        }),
    }
}

fn tera_context(ctx: &RenderContext, page: &str) -> Result<tera::Context, RenderError> {
    ctx.to_tera().map_err(|source| RenderError::Context {
        page: page.to_string(),
        source,
    })
}

fn template_failure(page: &str, err: TemplateError) -> RenderError {
    let message = match err {
        TemplateError::Render { name, message } => format!("in {name}: {message}"),
        other => other.to_string(),
    };
    RenderError::Template {
        page: page.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn data(value: Value) -> GlobalData {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            other => panic!("not an object: {other}"),
        }
    }

    fn env<'a>(data: &'a GlobalData, templates: &'a TemplateRegistry) -> RenderEnv<'a> {
        RenderEnv {
            data,
            templates,
            layout: "layout.html",
            source_root: Path::new("src"),
            output_root: Path::new("dist"),
        }
    }

    #[test]
    fn no_layout_outputs_rendered_content() {
        let data = data(json!({"site": {"name": "Moe's"}}));
        let templates = TemplateRegistry::empty();

        let html = render_page(
            "---\ntitle: Menu\n---\n<h1>{{ title }} at {{ site.name }}</h1>",
            Path::new("menu.html"),
            &env(&data, &templates),
        )
        .unwrap();
        assert_eq!(html, "<h1>Menu at Moe's</h1>");
    }

    #[test]
    fn layout_wraps_content() {
        let data = GlobalData::default();
        let templates = TemplateRegistry::from_sources([(
            "layout.html",
            "<title>{{ title }}</title><main>{{ content }}</main>",
        )])
        .unwrap();

        let html = render_page(
            "---\ntitle: Home\n---\n<p>{{ path }}</p>",
            Path::new("index.html"),
            &env(&data, &templates),
        )
        .unwrap();
        assert_eq!(html, "<title>Home</title><main><p>index.html</p></main>");
    }

    #[test]
    fn layout_name_is_configurable() {
        let data = GlobalData::default();
        let templates = TemplateRegistry::from_sources([
            ("layout.html", "default[{{ content }}]"),
            ("base.html", "base[{{ content }}]"),
        ])
        .unwrap();
        let mut env = env(&data, &templates);
        env.layout = "base.html";

        let html = render_page("x", Path::new("a.html"), &env).unwrap();
        assert_eq!(html, "base[x]");
    }

    #[test]
    fn title_defaults_to_path() {
        let data = GlobalData::default();
        let templates = TemplateRegistry::empty();

        let html = render_page("{{ title }}", Path::new("about/index.html"), &env(&data, &templates))
            .unwrap();
        assert_eq!(html, "about/index.html");
    }

    #[test]
    fn template_key_wraps_before_layout() {
        let data = GlobalData::default();
        let templates = TemplateRegistry::from_sources([
            ("layout.html", "<html>{{ content }}</html>"),
            ("post.html", "<article>{{ content }}</article>"),
        ])
        .unwrap();

        let html = render_page(
            "---\ntemplate: post.html\n---\nbody",
            Path::new("p.html"),
            &env(&data, &templates),
        )
        .unwrap();
        assert_eq!(html, "<html><article>body</article></html>");
    }

    #[test]
    fn unknown_template_key_is_error() {
        let data = GlobalData::default();
        let templates = TemplateRegistry::empty();

        let err = render_page(
            "---\ntemplate: ghost.html\n---\nbody",
            Path::new("p.html"),
            &env(&data, &templates),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RenderError::UnknownTemplate { ref template, .. } if template == "ghost.html"
        ));
    }

    #[test]
    fn body_can_include_partials() {
        let data = data(json!({"nav": ["home", "menu"]}));
        let templates = TemplateRegistry::from_sources([(
            "nav.html",
            "{% for item in nav %}[{{ item }}]{% endfor %}",
        )])
        .unwrap();

        let html = render_page(
            "{% include \"nav.html\" %}|{{ include(name=\"nav.html\") }}",
            Path::new("index.html"),
            &env(&data, &templates),
        )
        .unwrap();
        assert_eq!(html, "[home][menu]|[home][menu]");
    }

    #[test]
    fn template_failure_names_the_page() {
        let data = GlobalData::default();
        let templates = TemplateRegistry::empty();

        let err = render_page("{{ missing.value }}", Path::new("blog/x.html"), &env(&data, &templates))
            .unwrap_err();
        match err {
            RenderError::Template { page, .. } => assert_eq!(page, "blog/x.html"),
            other => panic!("expected Template, got {other:?}"),
        }
    }

    #[test]
    fn bad_front_matter_is_error() {
        let data = GlobalData::default();
        let templates = TemplateRegistry::empty();

        let err = render_page("---\ntitle: [unclosed\n---\n", Path::new("x.html"), &env(&data, &templates))
            .unwrap_err();
        assert!(matches!(err, RenderError::FrontMatter { .. }));
    }

    #[test]
    fn needs_children_lists_subpages() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("src");
        fs::create_dir_all(root.join("blog/first")).unwrap();
        fs::create_dir_all(root.join("blog/second")).unwrap();
        fs::write(root.join("blog/first/index.html"), "---\ntitle: First\n---\n").unwrap();
        fs::write(root.join("blog/second/index.html"), "---\ntitle: Second\n---\n").unwrap();

        let data = GlobalData::default();
        let templates = TemplateRegistry::empty();
        let env = RenderEnv {
            data: &data,
            templates: &templates,
            layout: "layout.html",
            source_root: &root,
            output_root: Path::new("dist"),
        };

        let html = render_page(
            "---\nneeds_children: true\n---\n{% for name, child in children %}{{ name }}={{ child.title }};{% endfor %}",
            Path::new("blog/index.html"),
            &env,
        )
        .unwrap();
        assert_eq!(html, "first=First;second=Second;");
    }

    #[test]
    fn children_absent_without_flag() {
        let data = GlobalData::default();
        let templates = TemplateRegistry::empty();

        let html = render_page(
            "{% if children %}yes{% else %}no{% endif %}",
            Path::new("index.html"),
            &env(&data, &templates),
        )
        .unwrap();
        assert_eq!(html, "no");
    }
}
