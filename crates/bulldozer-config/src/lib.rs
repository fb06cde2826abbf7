use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the theme configuration inside a theme directory.
pub const CONFIG_FILE: &str = "bulldozer.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub theme_name: String,
    /// Root of the theme. Relative directories below are resolved against it.
    pub theme_dir: PathBuf,
    /// Public URL of the theme root, used for asset URIs.
    pub theme_uri: String,
    pub blocks_dir: PathBuf,
    /// Host-theme templates that take precedence over block-local ones.
    pub template_override_dir: PathBuf,
    pub dist_dir: PathBuf,
    /// Manifest file name inside `dist_dir`.
    pub manifest: String,
    pub namespace: String,
    pub reserved_class_pattern: String,
    /// Values passed to every block template.
    pub context: Map<String, Value>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            theme_name: String::new(),
            theme_dir: PathBuf::from("."),
            theme_uri: String::new(),
            blocks_dir: PathBuf::from("blocks"),
            template_override_dir: PathBuf::from("templates/blocks"),
            dist_dir: PathBuf::from("dist"),
            manifest: "manifest.json".to_string(),
            namespace: "acf".to_string(),
            reserved_class_pattern: "^wp-block-acf".to_string(),
            context: Map::new(),
        }
    }
}

impl ThemeConfig {
    /// Defaults for a theme rooted at `theme_dir`.
    pub fn for_theme<P: AsRef<Path>>(theme_dir: P) -> Self {
        Self {
            theme_dir: theme_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: ThemeConfig =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the configured directories
        for path in [
            &mut config.theme_dir,
            &mut config.blocks_dir,
            &mut config.template_override_dir,
            &mut config.dist_dir,
        ] {
            if let Some(expanded) = Self::expand_path(path.as_path()) {
                *path = expanded;
            }
        }

        // A relative theme root is relative to the config file
        if config.theme_dir.is_relative()
            && let Some(parent) = config_path.parent()
        {
            config.theme_dir = parent.join(&config.theme_dir);
        }

        Ok(Some(config))
    }

    /// Load `bulldozer.toml` from `theme_dir`.
    pub fn load<P: AsRef<Path>>(theme_dir: P) -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path(theme_dir);
        Self::load_from_path(&config_path)
    }

    /// Load `bulldozer.toml` from `theme_dir`, falling back to defaults when absent.
    pub fn load_or_default<P: AsRef<Path>>(theme_dir: P) -> Result<Self, ConfigError> {
        let theme_dir = theme_dir.as_ref();
        Ok(Self::load(theme_dir)?.unwrap_or_else(|| Self::for_theme(theme_dir)))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path(&self.theme_dir);
        self.save_to_path(&config_path)
    }

    pub fn config_path<P: AsRef<Path>>(theme_dir: P) -> PathBuf {
        let theme_dir = theme_dir.as_ref();
        Self::expand_path(theme_dir)
            .unwrap_or_else(|| theme_dir.to_path_buf())
            .join(CONFIG_FILE)
    }

    pub fn blocks_path(&self) -> PathBuf {
        self.resolve(&self.blocks_dir)
    }

    pub fn template_override_path(&self) -> PathBuf {
        self.resolve(&self.template_override_dir)
    }

    pub fn dist_path(&self) -> PathBuf {
        self.resolve(&self.dist_dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dist_path().join(&self.manifest)
    }

    /// Public URL of the dist directory.
    pub fn dist_uri(&self) -> String {
        let dist = self.dist_dir.to_string_lossy();
        if self.dist_dir.is_absolute() || self.theme_uri.is_empty() {
            return dist.trim_start_matches("./").to_string();
        }
        format!(
            "{}/{}",
            self.theme_uri.trim_end_matches('/'),
            dist.trim_start_matches("./")
        )
    }

    /// Full block name for a slug, e.g. `acf/hero`.
    pub fn block_name(&self, slug: &str) -> String {
        if slug.contains('/') {
            return slug.to_string();
        }
        format!("{}/{}", self.namespace, slug)
    }

    /// Values every block template receives.
    pub fn global_context(&self) -> Map<String, Value> {
        let mut context = self.context.clone();
        if !self.theme_name.is_empty() {
            context
                .entry("theme_name")
                .or_insert_with(|| Value::String(self.theme_name.clone()));
        }
        context
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.theme_dir.join(path)
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = ThemeConfig::config_path("~/themes/demo");
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with("themes/demo/bulldozer.toml"));
    }

    #[test]
    fn test_defaults() {
        let config = ThemeConfig::for_theme("/srv/theme");

        assert_eq!(config.blocks_path(), PathBuf::from("/srv/theme/blocks"));
        assert_eq!(
            config.template_override_path(),
            PathBuf::from("/srv/theme/templates/blocks")
        );
        assert_eq!(
            config.manifest_path(),
            PathBuf::from("/srv/theme/dist/manifest.json")
        );
        assert_eq!(config.namespace, "acf");
        assert_eq!(config.reserved_class_pattern, "^wp-block-acf");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ThemeConfig = toml::from_str(
            r#"
theme_name = "Demo"
blocks_dir = "components/blocks"

[context]
footer_text = "Made with care"
year = 2024
"#,
        )
        .unwrap();

        assert_eq!(config.theme_name, "Demo");
        assert_eq!(config.blocks_dir, PathBuf::from("components/blocks"));
        assert_eq!(config.dist_dir, PathBuf::from("dist"));
        assert_eq!(config.context["year"], Value::from(2024));
    }

    #[test]
    fn test_global_context() {
        let mut config = ThemeConfig::for_theme("/srv/theme");
        config.theme_name = "Demo".to_string();
        config
            .context
            .insert("footer_text".into(), Value::from("Made with care"));

        let context = config.global_context();

        assert_eq!(context["theme_name"], Value::from("Demo"));
        assert_eq!(context["footer_text"], Value::from("Made with care"));
    }

    #[test]
    fn test_dist_uri() {
        let mut config = ThemeConfig::for_theme("/srv/theme");
        config.theme_uri = "https://example.test/themes/demo/".to_string();

        assert_eq!(config.dist_uri(), "https://example.test/themes/demo/dist");
    }

    #[test]
    fn test_block_name() {
        let config = ThemeConfig::default();

        assert_eq!(config.block_name("hero"), "acf/hero");
        assert_eq!(config.block_name("core/group"), "core/group");
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = ThemeConfig::expand_path(&path);

        assert!(expanded.is_some());
        let expanded = expanded.unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("BULLDOZER_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$BULLDOZER_TEST_VAR/subdir");
        let expanded = ThemeConfig::expand_path(&path);

        assert!(expanded.is_some());
        let expanded = expanded.unwrap();
        assert_eq!(expanded, PathBuf::from("/test/env/path/subdir"));

        unsafe {
            env::remove_var("BULLDOZER_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_path_with_relative_path() {
        let path = PathBuf::from("relative/path");
        let expanded = ThemeConfig::expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();

        let result = ThemeConfig::load(temp_dir.path()).unwrap();

        assert!(result.is_none());
        assert_eq!(
            ThemeConfig::load_or_default(temp_dir.path()).unwrap().theme_dir,
            temp_dir.path()
        );
    }

    #[test]
    fn test_load_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(&config_file, "theme_name = [").unwrap();

        let result = ThemeConfig::load_from_path(&config_file);

        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_relative_theme_dir_resolved_against_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(&config_file, "theme_name = \"Demo\"\n").unwrap();

        let config = ThemeConfig::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(config.blocks_path(), temp_dir.path().join("./blocks"));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut test_config = ThemeConfig::for_theme(temp_dir.path());
        test_config.theme_name = "Demo".to_string();
        test_config.theme_uri = "https://example.test/themes/demo".to_string();
        test_config
            .context
            .insert("footer_text".into(), Value::from("Made with care"));

        // Test saving
        test_config.save().unwrap();

        // Test loading
        let loaded_config = ThemeConfig::load(temp_dir.path()).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }
}
