//! Asset transformation: stylesheets, scripts, and everything else.
//!
//! Dispatch is by exact, case-sensitive extension. No content sniffing.
//!
//! | Source | Operation | Output |
//! |---|---|---|
//! | `*.scss` | compile → minify | same path, `.css` extension |
//! | `*.css` | minify | same path |
//! | `*.js` | minify | same path |
//! | `*.min.css`, `*.min.js` | copy | same path |
//! | anything else | copy | same path |
//!
//! SCSS partials (`_colors.scss`) only exist to be imported, so
//! [`is_style_partial`] lets the walker leave them out entirely.
//!
//! Every output is written whole or not at all: a failed compile writes
//! nothing, and successful writes go through a temporary file.
//!
//! The module is split into:
//! - **Backend**: [`AssetBackend`] trait + [`RustBackend`]
//! - **Dispatch**: [`AssetKind`] and [`transform_asset`] (this file)

pub mod backend;
pub mod rust_backend;

pub use backend::{AssetBackend, BackendError};
pub use rust_backend::RustBackend;

use crate::files::{copy_atomic, write_atomic};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}{}: {message}", .file.display(), .line.map(|l| format!(":{l}")).unwrap_or_default())]
    StyleCompile {
        file: PathBuf,
        line: Option<usize>,
        message: String,
    },
    #[error("Cannot minify {}: {message}", .file.display())]
    Minify { file: PathBuf, message: String },
}

/// How a non-page file is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// SCSS source, compiled and minified to `.css`.
    Style,
    /// Plain CSS, minified.
    Css,
    /// JavaScript, minified.
    Script,
    /// Copied byte for byte.
    Verbatim,
}

impl AssetKind {
    pub fn classify(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if name.ends_with(".min.css") || name.ends_with(".min.js") {
            return AssetKind::Verbatim;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("scss") => AssetKind::Style,
            Some("css") => AssetKind::Css,
            Some("js") => AssetKind::Script,
            _ => AssetKind::Verbatim,
        }
    }

    /// Output path for a source mirrored to `mirrored`.
    pub fn output_path(self, mirrored: &Path) -> PathBuf {
        match self {
            AssetKind::Style => mirrored.with_extension("css"),
            _ => mirrored.to_path_buf(),
        }
    }
}

/// True for an SCSS partial: a `.scss` file whose name starts with `_`.
pub fn is_style_partial(path: &Path) -> bool {
    AssetKind::classify(path) == AssetKind::Style
        && path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('_'))
}

/// What [`transform_asset`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetAction {
    Compiled,
    Minified,
    Copied,
}

/// Transform `source` and write the result to `dest`.
///
/// `dest` is the final output path, already run through
/// [`AssetKind::output_path`].
pub fn transform_asset(
    source: &Path,
    dest: &Path,
    backend: &impl AssetBackend,
) -> Result<AssetAction, AssetError> {
    match AssetKind::classify(source) {
        AssetKind::Style => {
            let css = backend
                .compile_style(source)
                .map_err(|err| backend_failure(source, err))?;
            let minified = backend
                .minify_css(&css)
                .map_err(|err| backend_failure(source, err))?;
            write(dest, minified.as_bytes())?;
            Ok(AssetAction::Compiled)
        }
        kind @ (AssetKind::Css | AssetKind::Script) => {
            let text = fs::read_to_string(source).map_err(|e| io_failure(source, e))?;
            let minified = if kind == AssetKind::Css {
                backend.minify_css(&text)
            } else {
                backend.minify_js(&text)
            }
            .map_err(|err| backend_failure(source, err))?;
            write(dest, minified.as_bytes())?;
            Ok(AssetAction::Minified)
        }
        AssetKind::Verbatim => {
            copy_atomic(source, dest).map_err(|e| io_failure(dest, e))?;
            Ok(AssetAction::Copied)
        }
    }
}

fn write(dest: &Path, bytes: &[u8]) -> Result<(), AssetError> {
    write_atomic(dest, bytes).map_err(|e| io_failure(dest, e))
}

fn io_failure(path: &Path, source: std::io::Error) -> AssetError {
    AssetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn backend_failure(source: &Path, err: BackendError) -> AssetError {
    match err {
        BackendError::Io(e) => io_failure(source, e),
        BackendError::StyleCompile { line, message } => AssetError::StyleCompile {
            file: source.to_path_buf(),
            line,
            message,
        },
        BackendError::Minify(message) => AssetError::Minify {
            file: source.to_path_buf(),
            message,
        },
    }
}
