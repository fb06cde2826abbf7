//! Template lookup and dispatch to the template engine.

use crate::io::{self, IoError};
use crate::renderer::TemplateContext;
use handlebars::{Handlebars, handlebars_helper};
use relative_path::RelativePathBuf;
use std::path::{Path, PathBuf};

/// Extension of block templates.
pub const TEMPLATE_EXTENSION: &str = "hbs";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template file {path} not found.")]
    NotFound {
        path: RelativePathBuf,
        searched: Vec<PathBuf>,
    },
    #[error("Failed to read template {path}: {source}")]
    Read { path: PathBuf, source: IoError },
    #[error("Failed to render template {path}: {source}")]
    Render {
        path: PathBuf,
        source: Box<handlebars::RenderError>,
    },
    #[error("Invalid partial {name}: {source}")]
    Partial {
        name: String,
        source: Box<handlebars::TemplateError>,
    },
}

/// Finds the template of a block: host overrides first, then the block directory.
#[derive(Debug, Clone)]
pub struct TemplateLocator {
    override_dir: PathBuf,
    blocks_dir: PathBuf,
}

impl TemplateLocator {
    pub fn new(override_dir: impl Into<PathBuf>, blocks_dir: impl Into<PathBuf>) -> Self {
        Self {
            override_dir: override_dir.into(),
            blocks_dir: blocks_dir.into(),
        }
    }

    /// `<slug>/<slug>.hbs`
    pub fn template_path(slug: &str) -> RelativePathBuf {
        RelativePathBuf::from(slug).join(format!("{slug}.{TEMPLATE_EXTENSION}"))
    }

    /// Candidate locations in lookup order.
    ///
    /// `block_dir` is the directory the block descriptor was loaded from; blocks
    /// without one are looked up under `<blocks_dir>/<slug>/`.
    pub fn candidates(&self, slug: &str, block_dir: Option<&Path>) -> [PathBuf; 2] {
        let relative = Self::template_path(slug);
        let local = match block_dir {
            Some(dir) => dir.join(format!("{slug}.{TEMPLATE_EXTENSION}")),
            None => relative.to_path(&self.blocks_dir),
        };
        [relative.to_path(&self.override_dir), local]
    }

    pub fn locate(&self, slug: &str, block_dir: Option<&Path>) -> Result<PathBuf, TemplateError> {
        let candidates = self.candidates(slug, block_dir);
        if let Some(found) = candidates.iter().find(|p| p.is_file()) {
            return Ok(found.clone());
        }

        Err(TemplateError::NotFound {
            path: Self::template_path(slug),
            searched: candidates.to_vec(),
        })
    }
}

/// The engine a located template is rendered with.
pub trait TemplateEngine {
    fn render(&self, template: &Path, context: &TemplateContext) -> Result<String, TemplateError>;
}

// `{{join classes}}` renders a class list as a space separated attribute value
handlebars_helper!(join: |items: array| items
    .iter()
    .filter_map(|item| item.as_str())
    .collect::<Vec<_>>()
    .join(" "));

/// Handlebars-backed engine. `{{…}}` is HTML-escaped, `{{{…}}}` is raw.
pub struct HandlebarsEngine {
    registry: Handlebars<'static>,
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlebarsEngine {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_helper("join", Box::new(join));
        Self { registry }
    }

    /// Make a partial available to every block template, e.g. `{{> notifications}}`.
    pub fn register_partial(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.registry
            .register_partial(name, source)
            .map_err(|e| TemplateError::Partial {
                name: name.to_string(),
                source: Box::new(e),
            })
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn render(&self, template: &Path, context: &TemplateContext) -> Result<String, TemplateError> {
        let source = io::read_path(template).map_err(|source| TemplateError::Read {
            path: template.to_path_buf(),
            source,
        })?;

        self.registry
            .render_template(&source, context)
            .map_err(|e| TemplateError::Render {
                path: template.to_path_buf(),
                source: Box::new(e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_file, create_test_theme_dir};
    use serde_json::{Value, json};

    fn locator(theme: &tempfile::TempDir) -> TemplateLocator {
        TemplateLocator::new(
            theme.path().join("templates/blocks"),
            theme.path().join("blocks"),
        )
    }

    #[test]
    fn test_template_path() {
        assert_eq!(
            TemplateLocator::template_path("hero"),
            RelativePathBuf::from("hero/hero.hbs")
        );
    }

    #[test]
    fn test_block_local_template() {
        let theme = create_test_theme_dir();
        let local = create_test_file(&theme, "blocks/hero/hero.hbs", "local");

        assert_eq!(locator(&theme).locate("hero", None).unwrap(), local);
    }

    #[test]
    fn test_override_takes_precedence() {
        let theme = create_test_theme_dir();
        create_test_file(&theme, "blocks/hero/hero.hbs", "local");
        let host = create_test_file(&theme, "templates/blocks/hero/hero.hbs", "override");

        assert_eq!(locator(&theme).locate("hero", None).unwrap(), host);
    }

    #[test]
    fn test_nested_block_directory() {
        let theme = create_test_theme_dir();
        let local = create_test_file(&theme, "blocks/layout/columns/columns.hbs", "nested");
        let block_dir = theme.path().join("blocks/layout/columns");

        assert_eq!(
            locator(&theme).locate("columns", Some(&block_dir)).unwrap(),
            local
        );
    }

    #[test]
    fn test_missing_template_names_path() {
        let theme = create_test_theme_dir();
        let err = locator(&theme).locate("hero", None).unwrap_err();

        assert_eq!(err.to_string(), "Template file hero/hero.hbs not found.");
        match err {
            TemplateError::NotFound { searched, .. } => assert_eq!(searched.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_handlebars_render() {
        let theme = create_test_theme_dir();
        let path = create_test_file(
            &theme,
            "blocks/hero/hero.hbs",
            "<div class=\"{{join classes}}\">{{{inline_css}}}{{title}}</div>",
        );
        let context = match json!({
            "classes": ["hero", "acf-block", "alignwide"],
            "inline_css": "<style>#a{--b:1;}</style>",
            "title": "<b>Hi</b>"
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let html = HandlebarsEngine::new().render(&path, &context).unwrap();

        assert_eq!(
            html,
            "<div class=\"hero acf-block alignwide\"><style>#a{--b:1;}</style>&lt;b&gt;Hi&lt;/b&gt;</div>"
        );
    }

    #[test]
    fn test_partials() {
        let theme = create_test_theme_dir();
        let path = create_test_file(&theme, "blocks/card/card.hbs", "{{> badge}}");
        let mut engine = HandlebarsEngine::new();
        engine.register_partial("badge", "<span>{{slug}}</span>").unwrap();

        let mut context = TemplateContext::new();
        context.insert("slug".into(), json!("card"));

        assert_eq!(engine.render(&path, &context).unwrap(), "<span>card</span>");
    }
}
