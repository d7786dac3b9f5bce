//! Site configuration module.
//!
//! Handles loading, validating, and merging `szyslak.toml`. The file is
//! optional: stock defaults describe the conventional layout, and a user file
//! overrides just the values it names.
//!
//! ## Config File Location
//!
//! By default `szyslak.toml` is read from the directory holding the source
//! root. `--config <path>` points somewhere else.
//!
//! ```text
//! site/
//! ├── szyslak.toml             # Optional, overrides stock defaults
//! └── src/                     # Source root
//!     ├── data/                # Global data (reserved)
//!     ├── templates/           # Named templates and layout (reserved)
//!     ├── vendor/              # Third-party assets (reserved)
//!     ├── index.html
//!     └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! # Vendor mappings: a bare glob, or { patterns, dest }
//! vendor = []
//!
//! [dirs]
//! data = "data"              # Reserved top-level directory names
//! templates = "templates"
//! vendor = "vendor"
//!
//! [render]
//! layout = "layout.html"     # Template wrapping every page, when present
//!
//! [processing]
//! max_processes = 4          # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::files::is_contained_relative;
use crate::vendor::VendorEntry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default name of the config file.
pub const CONFIG_FILENAME: &str = "szyslak.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `szyslak.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Files to mirror out of the vendor directory.
    pub vendor: Vec<VendorEntry>,
    /// Names of the reserved top-level directories.
    pub dirs: DirsConfig,
    /// Page rendering settings.
    pub render: RenderConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Validate directory names, layout name and vendor mappings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("dirs.data", &self.dirs.data),
            ("dirs.templates", &self.dirs.templates),
            ("dirs.vendor", &self.dirs.vendor),
        ];
        for (key, name) in names {
            if !is_single_segment(name) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a single directory name, got {name:?}"
                )));
            }
        }
        for (i, (key_a, a)) in names.iter().enumerate() {
            for (key_b, b) in &names[i + 1..] {
                if a == b {
                    return Err(ConfigError::Validation(format!(
                        "{key_a} and {key_b} must differ (both are {a:?})"
                    )));
                }
            }
        }

        if self.render.layout.trim().is_empty() {
            return Err(ConfigError::Validation(
                "render.layout must not be empty".into(),
            ));
        }

        for entry in &self.vendor {
            match entry {
                VendorEntry::Pattern(pattern) if pattern.trim().is_empty() => {
                    return Err(ConfigError::Validation(
                        "vendor patterns must not be empty".into(),
                    ));
                }
                VendorEntry::Pattern(_) => {}
                VendorEntry::Mapped { patterns, dest } => {
                    if patterns.is_empty() || patterns.iter().any(|p| p.trim().is_empty()) {
                        return Err(ConfigError::Validation(format!(
                            "vendor mapping for {dest:?} needs at least one non-empty pattern"
                        )));
                    }
                    if !is_contained_relative(Path::new(dest)) {
                        return Err(ConfigError::Validation(format!(
                            "vendor dest {dest:?} must be a relative path inside the output"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn is_single_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

/// Reserved top-level directory names inside the source root.
///
/// Entries with these names at the top of the source root are consumed by
/// their own stage and never copied generically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirsConfig {
    /// Structured data files exposed to every page.
    pub data: String,
    /// Named templates, including the layout.
    pub templates: String,
    /// Third-party assets mirrored by the vendor mappings.
    pub vendor: String,
}

impl Default for DirsConfig {
    fn default() -> Self {
        Self {
            data: "data".to_string(),
            templates: "templates".to_string(),
            vendor: "vendor".to_string(),
        }
    }
}

/// Page rendering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Name of the template that wraps every page. Pages render bare when
    /// the templates directory has no file by this name.
    pub layout: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            layout: "layout.html".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel page/asset workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a user
///   `vendor` array replaces the stock one rather than appending to it.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `szyslak.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Szyslak Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Vendor mappings
# ---------------------------------------------------------------------------
# Files copied out of the vendor directory into <output>/<dirs.vendor>/.
# Each entry is either a bare glob (files land directly in the vendor output
# folder) or a table of globs with a destination subfolder. Globs are
# relative to the vendor directory; matched files are flattened to their
# base name.
#
# vendor = [
#     "jquery/dist/jquery.min.js",
#     { patterns = ["bootstrap/dist/css/*.css"], dest = "css" },
# ]
vendor = []

# ---------------------------------------------------------------------------
# Reserved directories
# ---------------------------------------------------------------------------
[dirs]
# Top-level directories of the source root that are consumed by their own
# stage instead of being copied. Nested directories with the same names are
# ordinary content.
data = "data"
templates = "templates"
vendor = "vendor"

# ---------------------------------------------------------------------------
# Rendering
# ---------------------------------------------------------------------------
[render]
# Template that wraps every page's rendered content. Pages are written bare
# when the templates directory has no file by this name.
layout = "layout.html"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel page/asset workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
