use crate::io::{self, IoError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Version assumed for descriptors that do not declare one.
pub const DEFAULT_BLOCK_VERSION: &str = "1.0.0";

/// File name of a block descriptor inside its block directory.
pub const DESCRIPTOR_FILE: &str = "block.json";

#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("Block descriptor at {0} has no name")]
    MissingName(PathBuf),
    #[error("Block descriptor at {path} has an invalid slug: {slug:?}")]
    InvalidSlug { path: PathBuf, slug: String },
    #[error("Block descriptor not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read block descriptor at {path}: {source}")]
    Read { path: PathBuf, source: IoError },
    #[error("Failed to parse block descriptor at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Replacement notice carried by a deprecated block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deprecation {
    pub since: String,
    #[serde(rename = "use")]
    pub replacement: String,
}

/// How a block supports positioning of its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignContent {
    Unsupported,
    /// Vertical alignment only (`"alignContent": true`).
    Vertical,
    /// Full 3x3 position matrix (`"alignContent": "matrix"`).
    Matrix,
}

/// The `supports` section of a block descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supports {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align_content: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub show_disable_button: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Deprecation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserter: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Supports {
    pub fn align_content(&self) -> AlignContent {
        match &self.align_content {
            Some(Value::Bool(true)) => AlignContent::Vertical,
            Some(Value::String(mode)) if mode == "matrix" => AlignContent::Matrix,
            _ => AlignContent::Unsupported,
        }
    }
}

/// Raw `block.json` document as the host block system defines it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub supports: Supports,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variations: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Static schema of a block type, fixed once the block is registered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDefinition {
    pub name: String,
    pub slug: String,
    pub title: String,
    pub version: String,
    pub supports: Supports,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<Value>,
    /// Directory holding the descriptor and the block-local template.
    #[serde(skip)]
    pub directory: Option<PathBuf>,
}

impl BlockDefinition {
    /// Build a definition from a parsed descriptor.
    ///
    /// Fails when the descriptor has no name, since every other identifier
    /// (slug, field group, template path) is derived from it.
    pub fn from_descriptor(
        descriptor: BlockDescriptor,
        source: &Path,
    ) -> Result<Self, DefinitionError> {
        let name = descriptor.name.trim().to_string();
        if name.is_empty() {
            return Err(DefinitionError::MissingName(source.to_path_buf()));
        }

        let slug = slug_from_name(&name).to_string();
        // The slug names the template folder, so it must stay a single path segment
        if slug.is_empty() || slug.contains(['/', '\\']) || slug.contains("..") {
            return Err(DefinitionError::InvalidSlug {
                path: source.to_path_buf(),
                slug,
            });
        }
        let title = if descriptor.title.is_empty() {
            slug.clone()
        } else {
            descriptor.title
        };

        Ok(Self {
            name,
            slug,
            title,
            version: descriptor
                .version
                .unwrap_or_else(|| DEFAULT_BLOCK_VERSION.to_string()),
            supports: descriptor.supports,
            icon: descriptor.icon,
            variations: descriptor.variations.unwrap_or_default(),
            directory: source
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf),
        })
    }

    /// Load a definition from a `block.json` file.
    pub fn load(descriptor_path: &Path) -> Result<Self, DefinitionError> {
        if !descriptor_path.is_file() {
            return Err(DefinitionError::NotFound(descriptor_path.to_path_buf()));
        }

        let content =
            io::read_path(descriptor_path).map_err(|source| DefinitionError::Read {
                path: descriptor_path.to_path_buf(),
                source,
            })?;
        Self::parse(&content, descriptor_path)
    }

    pub fn parse(content: &str, source: &Path) -> Result<Self, DefinitionError> {
        let descriptor: BlockDescriptor =
            serde_json::from_str(content).map_err(|source_err| DefinitionError::Parse {
                path: source.to_path_buf(),
                source: source_err,
            })?;
        Self::from_descriptor(descriptor, source)
    }

    pub fn deprecation(&self) -> Option<&Deprecation> {
        self.supports.deprecated.as_ref()
    }

    pub fn supports_disable_button(&self) -> bool {
        self.supports.show_disable_button
    }
}

/// Strip the namespace prefix (`acf/hero` becomes `hero`).
pub fn slug_from_name(name: &str) -> &str {
    name.split_once('/').map_or(name, |(_, slug)| slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const HERO: &str = r#"{
        "name": "acf/hero",
        "title": "Hero",
        "supports": {
            "align": ["wide", "full"],
            "alignContent": "matrix",
            "showDisableButton": true,
            "deprecated": { "since": "2024-01-01", "use": "acf/banner" },
            "anchor": true
        }
    }"#;

    #[test]
    fn test_parse_descriptor() {
        let def = BlockDefinition::parse(HERO, Path::new("/theme/blocks/hero/block.json")).unwrap();

        assert_eq!(def.name, "acf/hero");
        assert_eq!(def.slug, "hero");
        assert_eq!(def.title, "Hero");
        assert_eq!(def.version, DEFAULT_BLOCK_VERSION);
        assert_eq!(def.supports.align_content(), AlignContent::Matrix);
        assert!(def.supports_disable_button());
        assert_eq!(
            def.deprecation(),
            Some(&Deprecation {
                since: "2024-01-01".to_string(),
                replacement: "acf/banner".to_string(),
            })
        );
        assert_eq!(def.supports.extra.get("anchor"), Some(&Value::Bool(true)));
        assert_eq!(def.directory, Some(PathBuf::from("/theme/blocks/hero")));
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let result = BlockDefinition::parse(r#"{"title": "Nameless"}"#, Path::new("block.json"));
        assert!(matches!(result, Err(DefinitionError::MissingName(_))));
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let result = BlockDefinition::parse("{not json", Path::new("block.json"));
        assert!(matches!(result, Err(DefinitionError::Parse { .. })));
    }

    #[test]
    fn test_load_missing_descriptor() {
        let result = BlockDefinition::load(Path::new("/nonexistent/blocks/x/block.json"));
        assert!(matches!(result, Err(DefinitionError::NotFound(_))));
    }

    #[test]
    fn test_title_falls_back_to_slug() {
        let def = BlockDefinition::parse(r#"{"name": "acf/cta", "version": "2.1.0"}"#, Path::new("block.json"))
            .unwrap();
        assert_eq!(def.title, "cta");
        assert_eq!(def.version, "2.1.0");
    }

    #[test]
    fn test_align_content_modes() {
        let mut supports = Supports::default();
        assert_eq!(supports.align_content(), AlignContent::Unsupported);
        supports.align_content = Some(Value::Bool(true));
        assert_eq!(supports.align_content(), AlignContent::Vertical);
        supports.align_content = Some(Value::String("matrix".into()));
        assert_eq!(supports.align_content(), AlignContent::Matrix);
    }

    #[rstest]
    #[case("acf/../x")]
    #[case("acf/nested/hero")]
    #[case("acf/..")]
    #[case("acf/")]
    #[case("acf/a\\b")]
    fn test_unsafe_slug_is_rejected(#[case] name: &str) {
        let descriptor = serde_json::json!({ "name": name }).to_string();
        let result = BlockDefinition::parse(&descriptor, Path::new("block.json"));
        assert!(matches!(result, Err(DefinitionError::InvalidSlug { .. })), "{name}");
    }

    #[test]
    fn test_slug_from_name() {
        assert_eq!(slug_from_name("acf/hero"), "hero");
        assert_eq!(slug_from_name("hero"), "hero");
    }
}
