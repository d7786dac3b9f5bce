//! Shared test utilities for the szyslak test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let out = tmp.path().join("dist");
//! build(&site_root(&tmp), &out, &config, &backend, &cancel, None).unwrap();
//!
//! assert_output_contains(&out, "index.html", "<h1>Moe's Tavern</h1>");
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::files::slash_path;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to `<temp>/src` and return the temp directory.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures. Build into `<temp>/dist` so output sits beside
/// the source, not inside it.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, &site_root(&tmp)).unwrap();
    tmp
}

/// Source root inside a temp directory from [`setup_fixtures`].
pub fn site_root(tmp: &TempDir) -> PathBuf {
    tmp.path().join("src")
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Output inspection
// =========================================================================

/// Every file under `root`, as sorted `/`-separated relative paths.
pub fn output_files(root: &Path) -> Vec<String> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| slash_path(e.path().strip_prefix(root).unwrap()))
        .collect()
}

/// Read an output file. Panics with the available files on miss.
pub fn read_output(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap_or_else(|_| {
        let files = output_files(root);
        panic!("output '{rel}' not found. Available: {files:?}")
    })
}

/// Assert that an output file contains `needle`.
pub fn assert_output_contains(root: &Path, rel: &str, needle: &str) {
    let text = read_output(root, rel);
    assert!(
        text.contains(needle),
        "'{rel}' does not contain {needle:?}:\n{text}"
    );
}
