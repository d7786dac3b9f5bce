//! Vendor mirroring.
//!
//! Third-party files (jQuery, Bootstrap, fonts) live under the vendor
//! directory in whatever layout their package ships with. The `vendor`
//! config array picks the files the site needs and flattens them into the
//! output's vendor folder:
//!
//! ```toml
//! vendor = [
//!     "jquery/dist/jquery.min.js",                                # → vendor/jquery.min.js
//!     { patterns = ["bootstrap/dist/css/*.css"], dest = "css" },  # → vendor/css/bootstrap.css
//! ]
//! ```
//!
//! Patterns are globs relative to the vendor directory. Only regular files
//! are copied and each lands under its base name, so the nesting of the
//! source package disappears.
//!
//! ## Idempotence
//!
//! A destination whose SHA-256 already matches its source is left alone and
//! reported as [`VendorStatus::Unchanged`]. Running the mirror twice writes
//! nothing the second time.
//!
//! ## Duplicates
//!
//! Matches are resolved in config order, and within a pattern in sorted path
//! order. When two sources flatten to the same destination, the later one
//! wins, so the result never depends on directory iteration order.

use crate::files::{copy_atomic, hash_file, slash_path};
use crate::types::{BuildEvent, VendorStatus, emit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use wax::Glob;

#[derive(Error, Debug)]
pub enum VendorError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid vendor pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
    #[error("Cannot walk vendor files for '{pattern}': {message}")]
    Walk { pattern: String, message: String },
}

/// One entry of the `vendor` config array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VendorEntry {
    /// A glob whose matches land directly in the vendor output folder.
    Pattern(String),
    /// Globs whose matches land in a subfolder of the vendor output.
    Mapped { patterns: Vec<String>, dest: String },
}

impl VendorEntry {
    pub fn patterns(&self) -> &[String] {
        match self {
            VendorEntry::Pattern(pattern) => std::slice::from_ref(pattern),
            VendorEntry::Mapped { patterns, .. } => patterns,
        }
    }

    /// Subfolder of the vendor output, if any.
    pub fn dest(&self) -> Option<&str> {
        match self {
            VendorEntry::Pattern(_) => None,
            VendorEntry::Mapped { dest, .. } => Some(dest),
        }
    }
}

/// A resolved source → destination pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorCopy {
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// Counts from one mirror run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VendorSummary {
    pub copied: usize,
    pub unchanged: usize,
}

/// Expand every entry against `vendor_dir` into concrete copies.
///
/// The result is sorted by destination.
pub fn resolve(
    vendor_dir: &Path,
    entries: &[VendorEntry],
    output_vendor_dir: &Path,
) -> Result<Vec<VendorCopy>, VendorError> {
    let mut by_dest: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

    for entry in entries {
        let dest_dir = match entry.dest() {
            Some(sub) => output_vendor_dir.join(sub),
            None => output_vendor_dir.to_path_buf(),
        };
        for pattern in entry.patterns() {
            for source in expand(vendor_dir, pattern)? {
                let Some(name) = source.file_name() else {
                    continue;
                };
                by_dest.insert(dest_dir.join(name), source);
            }
        }
    }

    Ok(by_dest
        .into_iter()
        .map(|(dest, source)| VendorCopy { source, dest })
        .collect())
}

/// Regular files under `vendor_dir` matching `pattern`, sorted.
fn expand(vendor_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, VendorError> {
    let glob = Glob::new(pattern).map_err(|e| VendorError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in glob.walk(vendor_dir) {
        let entry = entry.map_err(|e| VendorError::Walk {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        if entry.path().is_file() {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Mirror the configured vendor files into `output_vendor_dir`.
///
/// A missing vendor directory or an empty entry list does nothing.
pub fn mirror(
    vendor_dir: &Path,
    entries: &[VendorEntry],
    output_vendor_dir: &Path,
    events: Option<&Sender<BuildEvent>>,
) -> Result<VendorSummary, VendorError> {
    let mut summary = VendorSummary::default();
    if entries.is_empty() || !vendor_dir.is_dir() {
        return Ok(summary);
    }

    let output_root = output_vendor_dir.parent().unwrap_or(output_vendor_dir);
    for copy in resolve(vendor_dir, entries, output_vendor_dir)? {
        let status = if is_up_to_date(&copy)? {
            summary.unchanged += 1;
            VendorStatus::Unchanged
        } else {
            copy_atomic(&copy.source, &copy.dest).map_err(|source| VendorError::Io {
                path: copy.dest.clone(),
                source,
            })?;
            summary.copied += 1;
            VendorStatus::Copied
        };

        emit(
            events,
            BuildEvent::VendorFile {
                source: relative(&copy.source, vendor_dir),
                dest: relative(&copy.dest, output_root),
                status,
            },
        );
    }
    Ok(summary)
}

fn is_up_to_date(copy: &VendorCopy) -> Result<bool, VendorError> {
    if !copy.dest.is_file() {
        return Ok(false);
    }
    let hash = |path: &Path| {
        hash_file(path).map_err(|source| VendorError::Io {
            path: path.to_path_buf(),
            source,
        })
    };
    Ok(hash(&copy.source)? == hash(&copy.dest)?)
}

fn relative(path: &Path, base: &Path) -> String {
    slash_path(path.strip_prefix(base).unwrap_or(path))
}
