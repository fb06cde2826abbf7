//! Lookup of build output through the bundler's `manifest.json`.

use crate::diagnostics::Diagnostics;
use crate::io::{self, IoError};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const MANIFEST_MISSING_MESSAGE: &str = "Did you run Webpack for the first time?";
pub const MANIFEST_MISSING_SUBTITLE: &str = "Manifest file not found";

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Manifest file not found: {0}")]
    ManifestNotFound(PathBuf),
    #[error("Failed to read manifest {path}: {source}")]
    Read { path: PathBuf, source: IoError },
    #[error("Failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Asset key to path relative to the dist directory.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Manifest(IndexMap<String, Value>);

impl Manifest {
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The dist directory of a theme. The manifest is read once, on first successful lookup.
#[derive(Debug)]
pub struct Assets {
    dist_dir: PathBuf,
    dist_uri: String,
    manifest_path: PathBuf,
    manifest: OnceLock<Manifest>,
}

impl Assets {
    pub fn new(
        dist_dir: impl Into<PathBuf>,
        dist_uri: impl Into<String>,
        manifest_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dist_dir: dist_dir.into(),
            dist_uri: dist_uri.into(),
            manifest_path: manifest_path.into(),
            manifest: OnceLock::new(),
        }
    }

    pub fn manifest(&self) -> Result<&Manifest, AssetError> {
        if let Some(manifest) = self.manifest.get() {
            return Ok(manifest);
        }

        let path = &self.manifest_path;
        if !path.is_file() {
            return Err(AssetError::ManifestNotFound(path.clone()));
        }
        let content = io::read_path(path).map_err(|source| AssetError::Read {
            path: path.clone(),
            source,
        })?;
        let manifest = Manifest::parse(&content).map_err(|source| AssetError::Parse {
            path: path.clone(),
            source,
        })?;

        Ok(self.manifest.get_or_init(|| manifest))
    }

    /// Resolve `key` through the manifest.
    ///
    /// A missing manifest is reported to `diagnostics`; unknown keys and a missing
    /// manifest both yield an asset that does not exist.
    pub fn get(&self, key: &str, diagnostics: &mut Diagnostics) -> Asset {
        let path = match self.manifest() {
            Ok(manifest) => manifest.get(key).map(str::to_string),
            Err(AssetError::ManifestNotFound(path)) => {
                log::warn!("Manifest file not found: {}", path.display());
                diagnostics.configuration_error(MANIFEST_MISSING_MESSAGE, MANIFEST_MISSING_SUBTITLE);
                None
            }
            Err(err) => {
                log::error!("{err}");
                diagnostics.configuration_error(&err.to_string(), MANIFEST_MISSING_SUBTITLE);
                None
            }
        };

        Asset {
            key: key.to_string(),
            relative: path,
            dist_dir: self.dist_dir.clone(),
            dist_uri: self.dist_uri.clone(),
        }
    }
}

/// One manifest entry. Every accessor returns `None` for unknown keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    key: String,
    relative: Option<String>,
    dist_dir: PathBuf,
    dist_uri: String,
}

impl Asset {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn uri(&self) -> Option<String> {
        self.relative
            .as_deref()
            .map(|relative| format!("{}/{}", self.dist_uri.trim_end_matches('/'), relative))
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.relative
            .as_deref()
            .map(|relative| self.dist_dir.join(relative))
    }

    pub fn exists(&self) -> bool {
        self.path().as_deref().is_some_and(Path::is_file)
    }

    pub fn contents(&self) -> Option<String> {
        let path = self.path().filter(|p| p.is_file())?;
        io::read_path(&path).ok()
    }

    /// Contents decoded as JSON.
    pub fn json(&self) -> Option<Value> {
        let contents = self.contents().filter(|c| !c.is_empty())?;
        serde_json::from_str(&contents).ok()
    }
}
