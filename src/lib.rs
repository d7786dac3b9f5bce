//! # Szyslak
//!
//! A directory-to-directory static site builder. The source tree mirrors the
//! site: HTML pages are rendered through Tera with their YAML front matter
//! and the global data, SCSS is compiled, CSS and JavaScript are minified,
//! and everything else is copied as is.
//!
//! # Architecture: Load, Then Walk
//!
//! ```text
//!            ┌─ data/       → GlobalData ─┐
//!  src/ ─────┤  templates/  → registry  ──┼──► walk src/ ─► pages + assets ─► dist/
//!            └─ vendor/     → dist/vendor/┘
//! ```
//!
//! Data and templates are loaded once and are read-only afterwards, so the
//! walk can render pages in parallel without locks. Vendor mirroring runs
//! alongside the loading since it shares nothing with it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Orchestration: `build`, `check`, `clean` |
//! | [`data`] | Loads `data/` into [`data::GlobalData`], one key per file stem |
//! | [`templates`] | Compiles `templates/` into a [`templates::TemplateRegistry`] with `include` support |
//! | [`vendor`] | Mirrors selected vendor files, flattened, skipping unchanged ones |
//! | [`front_matter`] | Splits a page into its YAML block and body |
//! | [`context`] | Merges page meta, global data and front matter into one render context |
//! | [`render`] | Renders a page body, its optional wrapper template and the layout |
//! | [`assets`] | SCSS compile, CSS/JS minify, verbatim copy behind the [`assets::AssetBackend`] trait |
//! | [`walk`] | Plans and executes the page/asset phase over the source tree |
//! | [`config`] | `szyslak.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Progress events shared between the stages and the CLI |
//! | [`output`] | CLI output formatting |
//! | [`files`] | Atomic writes, hashing and path helpers |
//!
//! # Design Decisions
//!
//! ## Tera, Unescaped
//!
//! Pages, wrappers and layouts are all Tera templates compiled at runtime
//! from the site's own `templates/` directory. Autoescaping is off: the
//! layout embeds the already-rendered page as `{{ content }}`, and escaping
//! it would turn the page into text. Authors escape explicitly with
//! `| escape` where input is untrusted.
//!
//! ## Explicit Precedence
//!
//! A page sees three layers, deep-merged, later winning: path-derived meta
//! (`path`, `title`, `base`, `cwd`, `relcwd`, `target`), global data, then
//! its own front matter. A page can override `site.title` without losing the
//! rest of `site`.
//!
//! ## Typed Reserved Directories
//!
//! Only the top level of the source root is checked against the configured
//! data, templates and vendor names ([`walk::classify_top_level`]). A nested
//! `blog/data/` is ordinary content.
//!
//! ## All-or-Nothing Files
//!
//! Every output file is written to a temporary file in its destination
//! directory and renamed into place. A failed SCSS compile or a cancelled
//! build never leaves a half-written file behind. The first error stops the
//! build; files already written stay.
//!
//! ## Pure-Rust Assets
//!
//! SCSS is compiled by `grass` and minification is done by `minifier`, so
//! the binary needs no Node, no libsass and no external tools.

pub mod assets;
pub mod config;
pub mod context;
pub mod data;
pub mod files;
pub mod front_matter;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod templates;
pub mod types;
pub mod vendor;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
