//! Filesystem helpers shared by every stage.
//!
//! Two rules hold for everything written to the output tree:
//!
//! - **Whole files only.** Output is written to a temporary file in the
//!   destination directory and renamed into place, so an aborted or
//!   cancelled build never leaves a truncated file behind.
//! - **Readable output.** Written files get mode `0644` and copies keep
//!   their source's permissions, so a web server running as another user
//!   can serve the site.
//! - **Deterministic listing.** Directory listings are sorted by file name,
//!   so the same source tree always produces the same sequence of events.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// List the regular files directly inside `dir`, sorted by file name.
///
/// Subdirectories and hidden entries (leading `.`) are skipped. Used by the
/// flat data and template directories, which are never recursed into.
pub fn list_flat_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if is_hidden(&entry.file_name().to_string_lossy()) {
            continue;
        }
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Write `contents` to `dest` atomically, creating parent directories.
pub fn write_atomic(dest: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp = temp_sibling(dest)?;
    tmp.write_all(contents)?;
    if let Some(permissions) = written_permissions() {
        tmp.as_file().set_permissions(permissions)?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// Copy `source` to `dest` atomically, creating parent directories.
pub fn copy_atomic(source: &Path, dest: &Path) -> io::Result<()> {
    let mut input = fs::File::open(source)?;
    let mut tmp = temp_sibling(dest)?;
    io::copy(&mut input, &mut tmp)?;
    tmp.as_file().set_permissions(input.metadata()?.permissions())?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

// Temp files are created owner-only; output must be world-readable.
#[cfg(unix)]
fn written_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn written_permissions() -> Option<fs::Permissions> {
    None
}

fn temp_sibling(dest: &Path) -> io::Result<NamedTempFile> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    NamedTempFile::new_in(parent)
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Render a relative path with `/` separators regardless of platform.
///
/// Page contexts expose paths to templates, and templates should not have to
/// care which OS the site was built on.
pub fn slash_path(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// True when `path` is relative and never climbs out of its base via `..`.
pub fn is_contained_relative(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
