//! Pure Rust asset backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | SCSS → CSS | `grass::from_path` (Dart Sass compatible, expanded output) |
//! | Minify CSS | `minifier::css::minify` |
//! | Minify JS | `minifier::js::minify` |

use super::backend::{AssetBackend, BackendError};
use std::path::Path;

/// Pure Rust backend using `grass` and `minifier`.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetBackend for RustBackend {
    fn compile_style(&self, path: &Path) -> Result<String, BackendError> {
        let options = grass::Options::default()
            .style(grass::OutputStyle::Expanded)
            .quiet(true);
        grass::from_path(path, &options).map_err(style_error)
    }

    fn minify_css(&self, css: &str) -> Result<String, BackendError> {
        minifier::css::minify(css)
            .map(|minified| minified.to_string())
            .map_err(|e| BackendError::Minify(e.to_string()))
    }

    fn minify_js(&self, js: &str) -> Result<String, BackendError> {
        Ok(minifier::js::minify(js).to_string())
    }
}

/// Map a grass error onto [`BackendError`], keeping the 1-based line.
fn style_error(err: Box<grass::Error>) -> BackendError {
    let rendered = err.to_string();
    match (*err).kind() {
        grass::ErrorKind::ParseError { message, loc, .. } => BackendError::StyleCompile {
            // grass lines are 0-based
            line: Some(loc.begin.line + 1),
            message,
        },
        // grass shares the error behind an Arc
        grass::ErrorKind::IoError(io) => {
            BackendError::Io(std::io::Error::new(io.kind(), io.to_string()))
        }
        _ => BackendError::StyleCompile {
            line: None,
            message: rendered,
        },
    }
}
