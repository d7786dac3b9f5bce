//! CLI output formatting for build, check and clean.
//!
//! # Output Format
//!
//! ## Build (streamed, one line per event)
//!
//! ```text
//! Data: nav, site
//! Templates: layout.html, nav.html
//! vendor   jquery/jquery.js → vendor/jquery.js
//! vendor   bootstrap/css/bootstrap.css → vendor/css/bootstrap.css (unchanged)
//! page     index.html
//! compile  css/site.scss → css/site.css
//! minify   js/app.js
//! copy     robots.txt
//! ```
//!
//! followed by a summary:
//!
//! ```text
//! 4 pages, 1 compiled, 2 minified, 2 copied
//! Vendor: 1 copied, 1 unchanged
//! ```
//!
//! ## Check
//!
//! ```text
//! Data
//!     nav, site
//! Templates
//!     layout.html (layout)
//!     nav.html
//! Vendor
//!     jquery/jquery.js → vendor/jquery.js
//! Pages
//!     index.html
//! Assets
//!     css/site.scss → css/site.css
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::assets::AssetAction;
use crate::files::slash_path;
use crate::pipeline::{BuildSummary, CheckReport};
use crate::types::{BuildEvent, VendorStatus};
use crate::walk::JobKind;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

/// `source → dest`, or just `source` when the path does not change.
fn arrow(source: &str, dest: &str) -> String {
    if source == dest {
        source.to_string()
    } else {
        format!("{source} → {dest}")
    }
}

fn relative(path: &Path, base: &Path) -> String {
    slash_path(path.strip_prefix(base).unwrap_or(path))
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format one progress event.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::DataLoaded { keys } => vec![format!("Data: {}", join_or_none(keys))],
        BuildEvent::TemplatesLoaded { names } => {
            vec![format!("Templates: {}", join_or_none(names))]
        }
        BuildEvent::VendorFile {
            source,
            dest,
            status,
        } => {
            let suffix = match status {
                VendorStatus::Copied => "",
                VendorStatus::Unchanged => " (unchanged)",
            };
            vec![format!("vendor   {}{suffix}", arrow(source, dest))]
        }
        BuildEvent::PageRendered { source, dest } => {
            vec![format!("page     {}", arrow(source, dest))]
        }
        BuildEvent::AssetWritten {
            source,
            dest,
            action,
        } => {
            let verb = match action {
                AssetAction::Compiled => "compile",
                AssetAction::Minified => "minify ",
                AssetAction::Copied => "copy   ",
            };
            vec![format!("{verb}  {}", arrow(source, dest))]
        }
    }
}

pub fn format_build_summary(summary: &BuildSummary) -> Vec<String> {
    let walk = &summary.walk;
    vec![
        format!(
            "{}, {} compiled, {} minified, {} copied",
            plural(walk.pages, "page", "pages"),
            walk.compiled,
            walk.minified,
            walk.copied
        ),
        format!(
            "Vendor: {} copied, {} unchanged",
            summary.vendor.copied, summary.vendor.unchanged
        ),
    ]
}

pub fn print_build_summary(summary: &BuildSummary) {
    for line in format_build_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format a check report. Paths are shown relative to the two roots.
pub fn format_check_output(
    report: &CheckReport,
    source_root: &Path,
    output_root: &Path,
    layout: &str,
) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Data".to_string());
    lines.push(format!("{}{}", indent(1), join_or_none(&report.data_keys)));

    lines.push("Templates".to_string());
    for name in &report.templates {
        if name == layout {
            lines.push(format!("{}{name} (layout)", indent(1)));
        } else {
            lines.push(format!("{}{name}", indent(1)));
        }
    }
    if !report.has_layout {
        lines.push(format!(
            "{}no {layout}: pages are written without a layout",
            indent(1)
        ));
    }

    if !report.vendor.is_empty() {
        lines.push("Vendor".to_string());
        for copy in &report.vendor {
            let vendor_dir = copy.source.ancestors().find(|a| a.parent() == Some(source_root));
            let source = relative(&copy.source, vendor_dir.unwrap_or(source_root));
            lines.push(format!(
                "{}{}",
                indent(1),
                arrow(&source, &relative(&copy.dest, output_root))
            ));
        }
    }

    let pages: Vec<_> = report
        .plan
        .jobs
        .iter()
        .filter(|j| j.kind == JobKind::Page)
        .collect();
    if !pages.is_empty() {
        lines.push("Pages".to_string());
        for job in pages {
            lines.push(format!("{}{}", indent(1), slash_path(&job.rel)));
        }
    }

    let assets: Vec<_> = report
        .plan
        .jobs
        .iter()
        .filter(|j| j.kind != JobKind::Page)
        .collect();
    if !assets.is_empty() {
        lines.push("Assets".to_string());
        for job in assets {
            lines.push(format!(
                "{}{}",
                indent(1),
                arrow(&slash_path(&job.rel), &relative(&job.dest, output_root))
            ));
        }
    }

    lines
}

pub fn print_check_output(
    report: &CheckReport,
    source_root: &Path,
    output_root: &Path,
    layout: &str,
) {
    for line in format_check_output(report, source_root, output_root, layout) {
        println!("{}", line);
    }
}
