//! Global data loading.
//!
//! Every file directly inside the data directory becomes one entry of the
//! build-wide [`GlobalData`], keyed by its file stem:
//!
//! ```text
//! data/
//! ├── site.json     → site
//! ├── nav.yaml      → nav
//! └── authors.toml  → authors
//! ```
//!
//! The directory is not recursed into and hidden files are ignored. The
//! parser follows the extension: `.yaml`/`.yml` are YAML, `.toml` is TOML,
//! anything else is read as JSON. All formats land in the same
//! `serde_json::Value` model so templates see one shape regardless of source.
//!
//! Data is loaded once before any page renders and is read-only afterwards.

use crate::files::list_flat_files;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot parse data file {}: {message}", .file.display())]
    Parse { file: PathBuf, message: String },
    #[error(
        "Data key '{key}' is defined twice: {} and {}",
        .first.display(),
        .second.display()
    )]
    DuplicateKey {
        key: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Build-wide data visible to every page, keyed by data file stem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalData {
    entries: BTreeMap<String, Value>,
}

impl GlobalData {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for GlobalData {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Structured formats accepted in the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
    Toml,
}

impl DataFormat {
    /// Pick a parser from the file extension. Unknown extensions are JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => DataFormat::Yaml,
            Some("toml") => DataFormat::Toml,
            _ => DataFormat::Json,
        }
    }

    fn parse(self, text: &str) -> Result<Value, String> {
        match self {
            DataFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            DataFormat::Yaml => serde_yaml_ng::from_str(text).map_err(|e| e.to_string()),
            DataFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// Load every data file in `dir` into a [`GlobalData`].
///
/// A missing directory yields empty data. Any unreadable or unparsable file
/// fails the whole load, as does a stem claimed by two files.
pub fn load_data(dir: &Path) -> Result<GlobalData, DataError> {
    let mut entries: BTreeMap<String, (PathBuf, Value)> = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(GlobalData::default());
    }

    let files = list_flat_files(dir).map_err(|source| DataError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for path in files {
        let Some(key) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let value = load_file(&path)?;
        if let Some((first, _)) = entries.get(&key) {
            return Err(DataError::DuplicateKey {
                key,
                first: first.clone(),
                second: path,
            });
        }
        entries.insert(key, (path, value));
    }

    Ok(entries
        .into_iter()
        .map(|(key, (_, value))| (key, value))
        .collect())
}

fn load_file(path: &Path) -> Result<Value, DataError> {
    let text = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    DataFormat::from_path(path)
        .parse(&text)
        .map_err(|message| DataError::Parse {
            file: path.to_path_buf(),
            message,
        })
}
