//! Source tree traversal and the page/asset phase.
//!
//! The walk runs in two steps so nothing is written until the whole tree is
//! known to be buildable:
//!
//! 1. **Plan** ([`plan`]): classify the top-level entries of the source root,
//!    list every generic subtree, and turn each file into a [`Job`] with its
//!    final destination. Two sources that map to one destination (`a.scss`
//!    and `a.css`) abort the build here.
//! 2. **Execute** ([`walk`]): recreate the directories, then run the jobs on
//!    the rayon pool. The first failure stops new jobs from starting.
//!
//! ## Reserved directories
//!
//! Only the *top level* of the source root is classified. An entry named
//! like the configured data, templates or vendor directory is consumed by
//! its own stage and never entered here. Deeper directories with those names
//! (`blog/data/`) are ordinary content.
//!
//! Hidden entries (leading `.`) and SCSS partials are skipped at every
//! level. When the output root lives inside the source root it is never
//! walked.

use crate::assets::{
    AssetAction, AssetBackend, AssetError, AssetKind, is_style_partial, transform_asset,
};
use crate::config::DirsConfig;
use crate::data::GlobalData;
use crate::files::{slash_path, write_atomic};
use crate::render::{RenderEnv, RenderError, render_page};
use crate::templates::TemplateRegistry;
use crate::types::{BuildEvent, emit};
use rayon::prelude::*;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "{} and {} would both be written to {}",
        .first.display(),
        .second.display(),
        .dest.display()
    )]
    DestinationCollision {
        dest: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("Build cancelled")]
    Cancelled,
}

/// Which stage owns a reserved top-level directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReservedDir {
    Data,
    Templates,
    Vendor,
}

/// Classification of one top-level entry of the source root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevel {
    Reserved(ReservedDir),
    Generic,
}

/// Classify a top-level entry by name.
pub fn classify_top_level(name: &OsStr, dirs: &DirsConfig) -> TopLevel {
    if name == OsStr::new(&dirs.data) {
        TopLevel::Reserved(ReservedDir::Data)
    } else if name == OsStr::new(&dirs.templates) {
        TopLevel::Reserved(ReservedDir::Templates)
    } else if name == OsStr::new(&dirs.vendor) {
        TopLevel::Reserved(ReservedDir::Vendor)
    } else {
        TopLevel::Generic
    }
}

/// Shared cancellation signal, set from the Ctrl+C handler.
///
/// Workers check it before starting a job. A job already running finishes
/// its write, so cancelling never leaves a partial file.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Page,
    Asset(AssetKind),
}

/// One source file and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source: PathBuf,
    /// Path relative to the source root.
    pub rel: PathBuf,
    pub dest: PathBuf,
    pub kind: JobKind,
}

/// Everything the execute step will do, computed up front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkPlan {
    /// Reserved directories present at the top of the source root.
    pub reserved: Vec<ReservedDir>,
    /// Output directories to create, parents first.
    pub dirs: Vec<PathBuf>,
    pub jobs: Vec<Job>,
}

impl WalkPlan {
    pub fn page_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.kind == JobKind::Page).count()
    }

    pub fn asset_count(&self) -> usize {
        self.jobs.len() - self.page_count()
    }
}

/// Counts from one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub pages: usize,
    pub compiled: usize,
    pub minified: usize,
    pub copied: usize,
}

/// Inputs of the page/asset phase besides the two roots.
pub struct WalkEnv<'a, B: AssetBackend> {
    pub data: &'a GlobalData,
    pub templates: &'a TemplateRegistry,
    pub layout: &'a str,
    pub dirs: &'a DirsConfig,
    pub backend: &'a B,
    pub cancel: &'a CancelFlag,
    pub events: Option<&'a Sender<BuildEvent>>,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> WalkError + use<> {
    let path = path.to_path_buf();
    move |source| WalkError::Io { path, source }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Build the job list for `source_root` without touching the output.
pub fn plan(
    source_root: &Path,
    output_root: &Path,
    dirs: &DirsConfig,
) -> Result<WalkPlan, WalkError> {
    let output_canon = output_root.canonicalize().ok();
    let is_output = |path: &Path| {
        output_canon
            .as_ref()
            .is_some_and(|out| path.canonicalize().ok().as_ref() == Some(out))
    };

    let mut top: Vec<fs::DirEntry> = fs::read_dir(source_root)
        .map_err(io_err(source_root))?
        .collect::<Result<_, _>>()
        .map_err(io_err(source_root))?;
    top.sort_by_key(|e| e.file_name());

    let mut plan = WalkPlan::default();
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

    for entry in top {
        let name = entry.file_name();
        if is_hidden(&name) {
            continue;
        }
        if let TopLevel::Reserved(kind) = classify_top_level(&name, dirs) {
            plan.reserved.push(kind);
            continue;
        }
        let top_path = entry.path();
        if is_output(&top_path) {
            continue;
        }

        let walker = WalkDir::new(&top_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !is_hidden(e.file_name()) && !(e.file_type().is_dir() && is_output(e.path()))
            });
        for item in walker {
            let item = item.map_err(|e| {
                let path = e.path().unwrap_or(&top_path).to_path_buf();
                WalkError::Io {
                    path,
                    source: e.into(),
                }
            })?;
            let Ok(rel) = item.path().strip_prefix(source_root) else {
                continue;
            };
            let rel = rel.to_path_buf();

            if item.file_type().is_dir() {
                plan.dirs.push(output_root.join(&rel));
                continue;
            }
            if !item.path().is_file() || is_style_partial(&rel) {
                continue;
            }

            let mirrored = output_root.join(&rel);
            let (kind, dest) = if rel.extension() == Some(OsStr::new("html")) {
                (JobKind::Page, mirrored)
            } else {
                let asset = AssetKind::classify(&rel);
                (JobKind::Asset(asset), asset.output_path(&mirrored))
            };

            let source = item.path().to_path_buf();
            if let Some(first) = claimed.insert(dest.clone(), source.clone()) {
                return Err(WalkError::DestinationCollision {
                    dest,
                    first,
                    second: source,
                });
            }
            plan.jobs.push(Job {
                source,
                rel,
                dest,
                kind,
            });
        }
    }

    Ok(plan)
}

/// Plan and execute the page/asset phase.
pub fn walk<B: AssetBackend>(
    source_root: &Path,
    output_root: &Path,
    env: &WalkEnv<'_, B>,
) -> Result<WalkSummary, WalkError> {
    let plan = plan(source_root, output_root, env.dirs)?;
    execute(&plan, source_root, output_root, env)
}

/// Run a plan. Directories first, then jobs in parallel.
pub fn execute<B: AssetBackend>(
    plan: &WalkPlan,
    source_root: &Path,
    output_root: &Path,
    env: &WalkEnv<'_, B>,
) -> Result<WalkSummary, WalkError> {
    fs::create_dir_all(output_root).map_err(io_err(output_root))?;
    for dir in &plan.dirs {
        fs::create_dir_all(dir).map_err(io_err(dir))?;
    }

    let render_env = RenderEnv {
        data: env.data,
        templates: env.templates,
        layout: env.layout,
        source_root,
        output_root,
    };
    let pages = AtomicUsize::new(0);
    let compiled = AtomicUsize::new(0);
    let minified = AtomicUsize::new(0);
    let copied = AtomicUsize::new(0);

    plan.jobs.par_iter().try_for_each(|job| {
        if env.cancel.is_cancelled() {
            return Err(WalkError::Cancelled);
        }
        let source = slash_path(&job.rel);
        let dest = slash_path(job.dest.strip_prefix(output_root).unwrap_or(&job.dest));

        match job.kind {
            JobKind::Page => {
                let text = fs::read_to_string(&job.source).map_err(io_err(&job.source))?;
                let html = render_page(&text, &job.rel, &render_env)?;
                write_atomic(&job.dest, html.as_bytes()).map_err(io_err(&job.dest))?;
                pages.fetch_add(1, Ordering::Relaxed);
                emit(env.events, BuildEvent::PageRendered { source, dest });
            }
            JobKind::Asset(_) => {
                let action = transform_asset(&job.source, &job.dest, env.backend)?;
                let counter = match action {
                    AssetAction::Compiled => &compiled,
                    AssetAction::Minified => &minified,
                    AssetAction::Copied => &copied,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                emit(
                    env.events,
                    BuildEvent::AssetWritten {
                        source,
                        dest,
                        action,
                    },
                );
            }
        }
        Ok(())
    })?;

    Ok(WalkSummary {
        pages: pages.into_inner(),
        compiled: compiled.into_inner(),
        minified: minified.into_inner(),
        copied: copied.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::backend::tests::MockBackend;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn rels(plan: &WalkPlan) -> Vec<String> {
        plan.jobs.iter().map(|j| slash_path(&j.rel)).collect()
    }

    fn run(
        source: &Path,
        output: &Path,
        backend: &MockBackend,
        cancel: &CancelFlag,
    ) -> Result<WalkSummary, WalkError> {
        let data = GlobalData::default();
        let templates = TemplateRegistry::empty();
        let dirs = DirsConfig::default();
        let env = WalkEnv {
            data: &data,
            templates: &templates,
            layout: "layout.html",
            dirs: &dirs,
            backend,
            cancel,
            events: None,
        };
        walk(source, output, &env)
    }

    // =========================================================================
    // classify_top_level
    // =========================================================================

    #[test]
    fn classify_uses_configured_names() {
        let dirs = DirsConfig {
            data: "_data".into(),
            ..DirsConfig::default()
        };
        assert_eq!(
            classify_top_level(OsStr::new("_data"), &dirs),
            TopLevel::Reserved(ReservedDir::Data)
        );
        assert_eq!(classify_top_level(OsStr::new("data"), &dirs), TopLevel::Generic);
        assert_eq!(
            classify_top_level(OsStr::new("templates"), &dirs),
            TopLevel::Reserved(ReservedDir::Templates)
        );
        assert_eq!(
            classify_top_level(OsStr::new("vendor"), &dirs),
            TopLevel::Reserved(ReservedDir::Vendor)
        );
    }

    // =========================================================================
    // plan
    // =========================================================================

    #[test]
    fn plan_skips_reserved_top_level_only() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write(&src, "data/site.json", "{}");
        write(&src, "templates/layout.html", "{{ content }}");
        write(&src, "vendor/lib.js", "x");
        write(&src, "index.html", "home");
        write(&src, "blog/data/notes.txt", "nested data is content");
        write(&src, "blog/vendor/thing.js", "so is nested vendor");

        let plan = plan(&src, &tmp.path().join("dist"), &DirsConfig::default()).unwrap();

        assert_eq!(
            rels(&plan),
            vec!["blog/data/notes.txt", "blog/vendor/thing.js", "index.html"]
        );
        assert_eq!(
            plan.reserved,
            vec![ReservedDir::Data, ReservedDir::Templates, ReservedDir::Vendor]
        );
    }

    #[test]
    fn plan_routes_by_extension() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("dist");
        write(&src, "index.html", "");
        write(&src, "css/site.scss", "");
        write(&src, "js/app.js", "");
        write(&src, "img/logo.png", "");

        let plan = plan(&src, &out, &DirsConfig::default()).unwrap();
        let by_rel: HashMap<String, &Job> =
            plan.jobs.iter().map(|j| (slash_path(&j.rel), j)).collect();

        assert_eq!(by_rel["index.html"].kind, JobKind::Page);
        assert_eq!(by_rel["css/site.scss"].kind, JobKind::Asset(AssetKind::Style));
        assert_eq!(by_rel["css/site.scss"].dest, out.join("css/site.css"));
        assert_eq!(by_rel["js/app.js"].kind, JobKind::Asset(AssetKind::Script));
        assert_eq!(by_rel["img/logo.png"].kind, JobKind::Asset(AssetKind::Verbatim));
        assert_eq!(plan.page_count(), 1);
        assert_eq!(plan.asset_count(), 3);
    }

    #[test]
    fn plan_skips_hidden_entries() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write(&src, ".git/config", "");
        write(&src, "css/.DS_Store", "");
        write(&src, "css/a.css", "");

        let plan = plan(&src, &tmp.path().join("dist"), &DirsConfig::default()).unwrap();
        assert_eq!(rels(&plan), vec!["css/a.css"]);
    }

    #[test]
    fn plan_skips_style_partials() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write(&src, "css/_vars.scss", "$a: 1;");
        write(&src, "css/site.scss", "@import \"vars\";");
        write(&src, "js/_private.js", "");

        let plan = plan(&src, &tmp.path().join("dist"), &DirsConfig::default()).unwrap();
        assert_eq!(rels(&plan), vec!["css/site.scss", "js/_private.js"]);
    }

    #[test]
    fn plan_rejects_destination_collision() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write(&src, "css/site.css", "");
        write(&src, "css/site.scss", "");

        let err = plan(&src, &tmp.path().join("dist"), &DirsConfig::default()).unwrap_err();
        match err {
            WalkError::DestinationCollision { dest, .. } => {
                assert!(dest.ends_with("css/site.css"));
            }
            other => panic!("expected DestinationCollision, got {other:?}"),
        }
    }

    #[test]
    fn plan_never_walks_output_inside_source() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = src.join("dist");
        write(&src, "index.html", "");
        write(&out, "index.html", "stale output");

        let plan = plan(&src, &out, &DirsConfig::default()).unwrap();
        assert_eq!(rels(&plan), vec!["index.html"]);
    }

    #[test]
    fn plan_records_directories_including_empty() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("dist");
        fs::create_dir_all(src.join("empty/deeper")).unwrap();

        let plan = plan(&src, &out, &DirsConfig::default()).unwrap();
        assert_eq!(plan.dirs, vec![out.join("empty"), out.join("empty/deeper")]);
    }

    // =========================================================================
    // walk
    // =========================================================================

    #[test]
    fn walk_writes_pages_and_assets() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("dist");
        write(&src, "index.html", "---\ntitle: Home\n---\n<h1>{{ title }}</h1>");
        write(&src, "css/site.scss", "a { b: c }");
        write(&src, "css/extra.css", "p {}");
        write(&src, "js/app.js", "go();");
        write(&src, "robots.txt", "User-agent: *");
        fs::create_dir_all(src.join("empty")).unwrap();
        let backend = MockBackend::new();

        let summary = run(&src, &out, &backend, &CancelFlag::new()).unwrap();

        assert_eq!(
            summary,
            WalkSummary {
                pages: 1,
                compiled: 1,
                minified: 2,
                copied: 1,
            }
        );
        assert_eq!(fs::read_to_string(out.join("index.html")).unwrap(), "<h1>Home</h1>");
        assert!(out.join("css/site.css").exists());
        assert!(!out.join("css/site.scss").exists());
        assert_eq!(fs::read_to_string(out.join("robots.txt")).unwrap(), "User-agent: *");
        assert!(out.join("empty").is_dir());
    }

    #[test]
    fn walk_emits_one_event_per_job() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("dist");
        write(&src, "a.html", "a");
        write(&src, "b/c.txt", "c");

        let data = GlobalData::default();
        let templates = TemplateRegistry::empty();
        let dirs = DirsConfig::default();
        let backend = MockBackend::new();
        let cancel = CancelFlag::new();
        let (tx, rx) = std::sync::mpsc::channel();
        let env = WalkEnv {
            data: &data,
            templates: &templates,
            layout: "layout.html",
            dirs: &dirs,
            backend: &backend,
            cancel: &cancel,
            events: Some(&tx),
        };
        walk(&src, &out, &env).unwrap();
        drop(tx);

        let mut events: Vec<BuildEvent> = rx.iter().collect();
        events.sort_by_key(|e| format!("{e:?}"));
        assert_eq!(
            events,
            vec![
                BuildEvent::AssetWritten {
                    source: "b/c.txt".into(),
                    dest: "b/c.txt".into(),
                    action: AssetAction::Copied,
                },
                BuildEvent::PageRendered {
                    source: "a.html".into(),
                    dest: "a.html".into(),
                },
            ]
        );
    }

    #[test]
    fn walk_stops_on_render_failure() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write(&src, "bad.html", "{{ nope.nope }}");
        let backend = MockBackend::new();

        let err = run(&src, &tmp.path().join("dist"), &backend, &CancelFlag::new()).unwrap_err();
        assert!(matches!(err, WalkError::Render(RenderError::Template { .. })));
    }

    #[test]
    fn walk_reports_style_compile_failure() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("dist");
        write(&src, "css/broken.scss", "a {");
        let backend = MockBackend::failing_compile(1, "expected \"}\"");

        let err = run(&src, &out, &backend, &CancelFlag::new()).unwrap_err();
        assert!(matches!(
            err,
            WalkError::Asset(AssetError::StyleCompile { line: Some(1), .. })
        ));
        assert!(!out.join("css/broken.css").exists());
    }

    #[test]
    fn cancelled_walk_writes_no_files() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("dist");
        write(&src, "index.html", "home");
        write(&src, "a.txt", "a");
        let cancel = CancelFlag::new();
        cancel.cancel();
        let backend = MockBackend::new();

        let err = run(&src, &out, &backend, &cancel).unwrap_err();
        assert!(matches!(err, WalkError::Cancelled));
        assert!(!out.join("index.html").exists());
        assert!(!out.join("a.txt").exists());
    }
}
