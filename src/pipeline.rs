//! Build orchestration.
//!
//! ```text
//!            ┌─ load data ─► compile templates ─┐
//! source ────┤                                   ├──► walk pages + assets ──► output
//!            └─ mirror vendor files ────────────┘
//! ```
//!
//! Data and templates must both be ready before the first page renders, so
//! they load in sequence on one side of a `rayon::join`. Vendor mirroring
//! touches neither and runs on the other side. The walk starts once both
//! sides have finished, and only if neither failed.
//!
//! [`check`] runs the same loading and planning without writing anything,
//! and [`clean`] removes an output directory.

use crate::assets::AssetBackend;
use crate::config::{CONFIG_FILENAME, ConfigError, SiteConfig};
use crate::data::{DataError, GlobalData, load_data};
use crate::templates::{TemplateError, TemplateRegistry};
use crate::types::{BuildEvent, emit};
use crate::vendor::{self, VendorCopy, VendorError, VendorSummary};
use crate::walk::{self, CancelFlag, WalkEnv, WalkError, WalkPlan, WalkSummary};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Source directory not found: {}", .0.display())]
    MissingSource(PathBuf),
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Vendor(#[from] VendorError),
    #[error(transparent)]
    Walk(#[from] WalkError),
}

/// Totals for a finished build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub data_keys: usize,
    pub templates: usize,
    pub vendor: VendorSummary,
    pub walk: WalkSummary,
}

/// What a build would do, computed without writing.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub data_keys: Vec<String>,
    pub templates: Vec<String>,
    /// Whether the configured layout template is registered.
    pub has_layout: bool,
    pub vendor: Vec<VendorCopy>,
    pub plan: WalkPlan,
}

/// Config file location when none is given: beside the source root.
pub fn default_config_path(source_root: &Path) -> PathBuf {
    match source_root.parent() {
        Some(parent) => parent.join(CONFIG_FILENAME),
        None => source_root.join(CONFIG_FILENAME),
    }
}

fn require_source(source_root: &Path) -> Result<(), BuildError> {
    if source_root.is_dir() {
        Ok(())
    } else {
        Err(BuildError::MissingSource(source_root.to_path_buf()))
    }
}

fn load_inputs(
    source_root: &Path,
    config: &SiteConfig,
) -> Result<(GlobalData, TemplateRegistry), BuildError> {
    let data = load_data(&source_root.join(&config.dirs.data))?;
    let templates = TemplateRegistry::load(&source_root.join(&config.dirs.templates))?;
    Ok((data, templates))
}

/// Run the full pipeline from `source_root` into `output_root`.
///
/// The first error aborts the build. Files written before it stay in place.
pub fn build<B: AssetBackend>(
    source_root: &Path,
    output_root: &Path,
    config: &SiteConfig,
    backend: &B,
    cancel: &CancelFlag,
    events: Option<&Sender<BuildEvent>>,
) -> Result<BuildSummary, BuildError> {
    require_source(source_root)?;
    fs::create_dir_all(output_root).map_err(|source| BuildError::Io {
        path: output_root.to_path_buf(),
        source,
    })?;

    let vendor_dir = source_root.join(&config.dirs.vendor);
    let output_vendor_dir = output_root.join(&config.dirs.vendor);

    let (inputs, vendored) = rayon::join(
        || {
            let (data, templates) = load_inputs(source_root, config)?;
            emit(
                events,
                BuildEvent::DataLoaded {
                    keys: data.keys().map(str::to_string).collect(),
                },
            );
            emit(
                events,
                BuildEvent::TemplatesLoaded {
                    names: templates.names().map(str::to_string).collect(),
                },
            );
            Ok::<_, BuildError>((data, templates))
        },
        || vendor::mirror(&vendor_dir, &config.vendor, &output_vendor_dir, events),
    );
    let (data, templates) = inputs?;
    let vendor = vendored?;

    if cancel.is_cancelled() {
        return Err(WalkError::Cancelled.into());
    }

    let env = WalkEnv {
        data: &data,
        templates: &templates,
        layout: &config.render.layout,
        dirs: &config.dirs,
        backend,
        cancel,
        events,
    };
    let walk = walk::walk(source_root, output_root, &env)?;

    Ok(BuildSummary {
        data_keys: data.len(),
        templates: templates.len(),
        vendor,
        walk,
    })
}

/// Load everything and plan the walk, writing nothing.
///
/// Catches the same data, template, pattern and collision errors a build
/// would, before any output exists.
pub fn check(
    source_root: &Path,
    output_root: &Path,
    config: &SiteConfig,
) -> Result<CheckReport, BuildError> {
    require_source(source_root)?;
    let (data, templates) = load_inputs(source_root, config)?;

    let vendor_dir = source_root.join(&config.dirs.vendor);
    let vendor = if config.vendor.is_empty() || !vendor_dir.is_dir() {
        Vec::new()
    } else {
        vendor::resolve(
            &vendor_dir,
            &config.vendor,
            &output_root.join(&config.dirs.vendor),
        )?
    };

    let plan = walk::plan(source_root, output_root, &config.dirs)?;

    Ok(CheckReport {
        data_keys: data.keys().map(str::to_string).collect(),
        templates: templates.names().map(str::to_string).collect(),
        has_layout: templates.contains(&config.render.layout),
        vendor,
        plan,
    })
}

/// Remove `output_root`. Returns whether there was anything to remove.
pub fn clean(output_root: &Path) -> Result<bool, BuildError> {
    if !output_root.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(output_root).map_err(|source| BuildError::Io {
        path: output_root.to_path_buf(),
        source,
    })?;
    Ok(true)
}
