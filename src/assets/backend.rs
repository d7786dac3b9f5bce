//! Asset backend trait and shared types.
//!
//! The [`AssetBackend`] trait defines the three operations the asset stage
//! delegates: compile a stylesheet, minify CSS, and minify JavaScript.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on `grass` and
//! `minifier`. Both are pure Rust, so nothing needs to be installed next to
//! the binary.

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Stylesheet compilation failed. `line` is 1-based when known.
    #[error("Style compilation failed: {message}")]
    StyleCompile { line: Option<usize>, message: String },
    #[error("Minification failed: {0}")]
    Minify(String),
}

/// Trait for asset processing backends.
///
/// Implementations must be `Sync`: the tree walker shares one backend
/// across all rayon workers.
pub trait AssetBackend: Sync {
    /// Compile the SCSS file at `path` to plain CSS. Imports resolve
    /// relative to the file.
    fn compile_style(&self, path: &Path) -> Result<String, BackendError>;

    /// Minify a CSS document.
    fn minify_css(&self, css: &str) -> Result<String, BackendError>;

    /// Minify a JavaScript document.
    fn minify_js(&self, js: &str) -> Result<String, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations and returns tagged input.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub compile_failure: Option<(usize, String)>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        CompileStyle(String),
        MinifyCss(String),
        MinifyJs(String),
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// A backend whose every compile fails at `line` with `message`.
        pub fn failing_compile(line: usize, message: &str) -> Self {
            Self {
                compile_failure: Some((line, message.to_string())),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl AssetBackend for MockBackend {
        fn compile_style(&self, path: &Path) -> Result<String, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::CompileStyle(path.to_string_lossy().to_string()));

            if let Some((line, message)) = &self.compile_failure {
                return Err(BackendError::StyleCompile {
                    line: Some(*line),
                    message: message.clone(),
                });
            }
            let source = std::fs::read_to_string(path)?;
            Ok(format!("/*compiled*/{}", source.trim()))
        }

        fn minify_css(&self, css: &str) -> Result<String, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::MinifyCss(css.to_string()));
            Ok(format!("/*min-css*/{css}"))
        }

        fn minify_js(&self, js: &str) -> Result<String, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::MinifyJs(js.to_string()));
            Ok(format!("/*min-js*/{js}"))
        }
    }

    #[test]
    fn mock_records_minify() {
        let backend = MockBackend::new();

        let css = backend.minify_css("a { }").unwrap();
        let js = backend.minify_js("let a = 1;").unwrap();

        assert_eq!(css, "/*min-css*/a { }");
        assert_eq!(js, "/*min-js*/let a = 1;");
        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::MinifyCss("a { }".into()),
                RecordedOp::MinifyJs("let a = 1;".into()),
            ]
        );
    }

    #[test]
    fn mock_compile_failure_carries_line() {
        let backend = MockBackend::failing_compile(3, "expected \";\"");

        let err = backend.compile_style(Path::new("/site/css/x.scss")).unwrap_err();
        assert!(matches!(err, BackendError::StyleCompile { line: Some(3), .. }));

        let ops = backend.get_operations();
        assert!(matches!(&ops[0], RecordedOp::CompileStyle(p) if p == "/site/css/x.scss"));
    }
}
