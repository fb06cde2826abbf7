//! The render lifecycle of a registered block.

use crate::classes::ClassComposer;
use crate::context::{BlockContext, WorkingState};
use crate::css::style_tag;
use crate::diagnostics::{Diagnostics, Severity};
use crate::fields::{DISABLE_FIELD, FieldsBuilder};
use crate::instance::BlockInstance;
use crate::registry::{BlockRegistry, RegisteredBlock};
use crate::template::{TemplateEngine, TemplateError, TemplateLocator};
use crate::value::is_truthy;
use serde_json::{Map, Value};
use std::fmt;

/// Values handed to a block template.
pub type TemplateContext = Map<String, Value>;

pub const DISABLED_MESSAGE: &str = "This block is disabled and thus not visible on the frontend.";

/// Behaviour a block type plugs into the lifecycle.
///
/// Only `block_context` is required; every other capability has a default.
pub trait Block {
    /// Append the block's own fields after the base group.
    fn add_fields(&self, fields: FieldsBuilder) -> FieldsBuilder {
        fields
    }

    /// Extension hook run once per render. The returned map is merged into the
    /// template context before the lifecycle keys are written.
    fn block_context(&self, block: &mut BlockContext<'_>, context: TemplateContext)
    -> TemplateContext;

    /// Block variations offered in the inserter.
    fn variations(&self) -> Option<Vec<Value>> {
        None
    }

    /// Inline SVG replacing the descriptor icon.
    fn custom_icon(&self) -> Option<String> {
        None
    }

    fn hide_from_inserter(&self) -> bool {
        false
    }

    /// Blocks returning `false` are skipped at registration.
    fn meets_requirements(&self) -> bool {
        true
    }

    /// Always expose the instance id as `block_id`, even without anchor or inline CSS.
    fn always_add_block_id(&self) -> bool {
        false
    }
}

/// A block whose context hook is a closure.
pub struct FnBlock<F> {
    hook: F,
}

/// Wrap a closure as a [`Block`] without custom fields or capabilities.
pub fn from_fn<F>(hook: F) -> FnBlock<F>
where
    F: Fn(&mut BlockContext<'_>, TemplateContext) -> TemplateContext,
{
    FnBlock { hook }
}

impl<F> Block for FnBlock<F>
where
    F: Fn(&mut BlockContext<'_>, TemplateContext) -> TemplateContext,
{
    fn block_context(
        &self,
        block: &mut BlockContext<'_>,
        context: TemplateContext,
    ) -> TemplateContext {
        (self.hook)(block, context)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unregistered,
    Registered,
    Rendering,
    Rendered,
    Failed,
}

impl Lifecycle {
    pub fn can_transition_to(self, next: Lifecycle) -> bool {
        use Lifecycle::*;
        matches!(
            (self, next),
            (Unregistered, Registered)
                | (Registered, Rendering)
                | (Rendering, Rendered)
                | (Rendering, Failed)
                | (Rendered, Rendering)
                | (Failed, Rendering)
        )
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Unregistered => "unregistered",
            Lifecycle::Registered => "registered",
            Lifecycle::Rendering => "rendering",
            Lifecycle::Rendered => "rendered",
            Lifecycle::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub(crate) fn transition(block: &str, state: &mut Lifecycle, next: Lifecycle) {
    debug_assert!(state.can_transition_to(next), "{state} -> {next}");
    log::debug!("{block}: {state} -> {next}");
    *state = next;
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Block {0} is not registered")]
    NotRegistered(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl RenderError {
    /// State the block was left in by the failed render.
    pub fn state(&self) -> Lifecycle {
        match self {
            RenderError::NotRegistered(_) => Lifecycle::Unregistered,
            RenderError::Template(_) => Lifecycle::Failed,
        }
    }
}

/// Output of one successful render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock {
    pub html: String,
    pub context: TemplateContext,
    pub state: Lifecycle,
}

/// Runs the lifecycle of a registered block and dispatches to its template.
pub struct BlockRenderer {
    composer: ClassComposer,
    locator: TemplateLocator,
    engine: Box<dyn TemplateEngine>,
    global_context: TemplateContext,
}

impl BlockRenderer {
    pub fn new(locator: TemplateLocator, engine: Box<dyn TemplateEngine>) -> Self {
        Self {
            composer: ClassComposer::default(),
            locator,
            engine,
            global_context: TemplateContext::new(),
        }
    }

    pub fn with_composer(mut self, composer: ClassComposer) -> Self {
        self.composer = composer;
        self
    }

    /// Values every template receives, e.g. the theme name. Block values win on conflicts.
    pub fn with_global_context(mut self, context: TemplateContext) -> Self {
        self.global_context = context;
        self
    }

    /// Render the block registered under `name`.
    pub fn render_named(
        &self,
        registry: &BlockRegistry,
        name: &str,
        instance: &BlockInstance,
        diagnostics: &mut Diagnostics,
    ) -> Result<RenderedBlock, RenderError> {
        let block = registry
            .get(name)
            .ok_or_else(|| RenderError::NotRegistered(name.to_string()))?;
        self.render(block, instance, diagnostics)
    }

    pub fn render(
        &self,
        block: &RegisteredBlock,
        instance: &BlockInstance,
        diagnostics: &mut Diagnostics,
    ) -> Result<RenderedBlock, RenderError> {
        let definition = &block.definition;
        let mut state = Lifecycle::Registered;
        transition(&definition.name, &mut state, Lifecycle::Rendering);

        let context = self.compose(block, instance);

        let template = match self
            .locator
            .locate(&definition.slug, definition.directory.as_deref())
        {
            Ok(template) => template,
            Err(err) => {
                log::warn!("{}: {err}", definition.name);
                diagnostics.configuration_error(&err.to_string(), &format!("{} block", definition.title));
                transition(&definition.name, &mut state, Lifecycle::Failed);
                return Err(err.into());
            }
        };

        match self.engine.render(&template, &context) {
            Ok(html) => {
                transition(&definition.name, &mut state, Lifecycle::Rendered);
                Ok(RenderedBlock {
                    html,
                    context,
                    state,
                })
            }
            Err(err) => {
                log::error!("{}: {err}", definition.name);
                transition(&definition.name, &mut state, Lifecycle::Failed);
                Err(err.into())
            }
        }
    }

    /// Build the template context of one render without dispatching it.
    pub fn compose(&self, block: &RegisteredBlock, instance: &BlockInstance) -> TemplateContext {
        let definition = &block.definition;
        let mut state = WorkingState::new(instance);

        if let Some(deprecation) = definition.deprecation() {
            state.notify(
                &definition.title,
                format!(
                    "This block is deprecated since {}. Please replace this block in favor of {}.",
                    deprecation.since, deprecation.replacement
                ),
                Severity::Warning,
            );
        }

        let disabled_by_field =
            definition.supports_disable_button() && is_truthy(instance.fields.get(DISABLE_FIELD));
        if disabled_by_field {
            state.disabled = true;
            state.notify(&definition.title, DISABLED_MESSAGE, Severity::Warning);
        }

        let hook_context = {
            let mut facade = BlockContext::new(definition, instance, &mut state);
            block.block.block_context(&mut facade, TemplateContext::new())
        };
        if state.disabled && !disabled_by_field {
            state.notify(&definition.title, DISABLED_MESSAGE, Severity::Warning);
        }

        let classes = self
            .composer
            .compose(definition, &state.attributes, &instance.fields, &state.classes);
        let inline_css = state.css.compile(instance.element_id()).map(|css| style_tag(&css));

        let block_id = match instance.anchor() {
            Some(anchor) => Value::from(anchor),
            None if block.block.always_add_block_id() || inline_css.is_some() => {
                Value::from(instance.id.as_str())
            }
            None => Value::Null,
        };

        let mut context = self.global_context.clone();
        context.extend(hook_context);
        let parent = context
            .remove("parent")
            .unwrap_or_else(|| Value::from(definition.slug.as_str()));

        context.insert("block_id".into(), block_id);
        context.insert("is_disabled".into(), Value::Bool(state.disabled));
        context.insert("parent".into(), parent);
        context.insert("slug".into(), Value::from(definition.slug.as_str()));
        context.insert("attributes".into(), Value::Object(state.attributes));
        context.insert("is_preview".into(), Value::Bool(instance.is_preview));
        context.insert("post_id".into(), Value::from(instance.post_id));
        context.insert("fields".into(), Value::Object(instance.fields.clone()));
        context.insert(
            "classes".into(),
            serde_json::to_value(&classes).unwrap_or(Value::Array(Vec::new())),
        );
        context.insert(
            "inline_css".into(),
            inline_css.map(Value::from).unwrap_or(Value::Null),
        );
        context.insert(
            "notifications".into(),
            serde_json::to_value(&state.notifications).unwrap_or(Value::Array(Vec::new())),
        );
        context.insert(
            "parent_id".into(),
            instance
                .parent_id
                .as_deref()
                .map(Value::from)
                .unwrap_or(Value::Null),
        );
        context.insert("content".into(), Value::from(instance.content.as_str()));
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::BlockDefinition;
    use crate::fields::FieldRegistrar;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use std::path::Path;

    struct Echo;

    impl TemplateEngine for Echo {
        fn render(
            &self,
            template: &Path,
            context: &TemplateContext,
        ) -> Result<String, TemplateError> {
            Ok(format!("{}|{}", template.display(), context["classes"]))
        }
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn registered(descriptor: &str, block: impl Block + 'static) -> RegisteredBlock {
        let definition = BlockDefinition::parse(descriptor, Path::new("block.json")).unwrap();
        let fields = FieldRegistrar::field_group(&definition).build();
        RegisteredBlock {
            definition,
            fields,
            block: Box::new(block),
        }
    }

    fn renderer() -> BlockRenderer {
        BlockRenderer::new(
            TemplateLocator::new("/nonexistent/templates", "/nonexistent/blocks"),
            Box::new(Echo),
        )
    }

    fn passthrough() -> impl Block {
        from_fn(|_, context| context)
    }

    #[test]
    fn test_lifecycle_transitions() {
        assert!(Lifecycle::Unregistered.can_transition_to(Lifecycle::Registered));
        assert!(Lifecycle::Registered.can_transition_to(Lifecycle::Rendering));
        assert!(Lifecycle::Rendering.can_transition_to(Lifecycle::Failed));
        assert!(Lifecycle::Rendered.can_transition_to(Lifecycle::Rendering));
        assert!(!Lifecycle::Unregistered.can_transition_to(Lifecycle::Rendering));
        assert!(!Lifecycle::Registered.can_transition_to(Lifecycle::Rendered));
    }

    #[test]
    fn test_plain_context() {
        let block = registered(r#"{"name": "acf/card", "title": "Card"}"#, passthrough());
        let instance = BlockInstance::new(object(json!({"id": "block_7"})))
            .with_content("<p>inner</p>")
            .with_post_id(3);

        let context = renderer().compose(&block, &instance);

        assert_eq!(
            Value::Object(context),
            json!({
                "block_id": null,
                "is_disabled": false,
                "parent": "card",
                "slug": "card",
                "attributes": {"id": "block_7"},
                "is_preview": false,
                "post_id": 3,
                "fields": {},
                "classes": ["card", "acf-block"],
                "inline_css": null,
                "notifications": [],
                "parent_id": null,
                "content": "<p>inner</p>"
            })
        );
    }

    #[test]
    fn test_hook_values_and_global_context() {
        let block = registered(
            r#"{"name": "acf/card", "title": "Card"}"#,
            from_fn(|block, mut context| {
                block.add_modifier_class("featured");
                context.insert("title".into(), json!(block.field_str("title")));
                context.insert("parent".into(), json!("cards"));
                context
            }),
        );
        let instance = BlockInstance::new(object(json!({"id": "block_1"})))
            .with_fields(object(json!({"title": "Hello"})))
            .with_parent("block_0");
        let renderer = renderer().with_global_context(object(json!({"theme": "demo", "title": "global"})));

        let context = renderer.compose(&block, &instance);

        assert_eq!(context["theme"], json!("demo"));
        assert_eq!(context["title"], json!("Hello"));
        assert_eq!(context["parent"], json!("cards"));
        assert_eq!(context["parent_id"], json!("block_0"));
        assert_eq!(context["classes"], json!(["card", "acf-block", "card--featured"]));
    }

    #[test]
    fn test_deprecation_warning_in_both_modes() {
        let descriptor = r#"{
            "name": "acf/old",
            "title": "Old",
            "supports": {"deprecated": {"since": "2.0", "use": "acf/new"}}
        }"#;
        let block = registered(descriptor, passthrough());

        for preview in [true, false] {
            let instance = BlockInstance::new(Map::new()).preview(preview);
            let context = renderer().compose(&block, &instance);

            assert_eq!(
                context["notifications"],
                json!([{
                    "title": "Old block",
                    "message": "This block is deprecated since 2.0. Please replace this block in favor of acf/new.",
                    "type": "warning",
                    "type_name": "Warning"
                }])
            );
        }
    }

    #[test]
    fn test_disabled_by_field() {
        let block = registered(
            r#"{"name": "acf/promo", "title": "Promo", "supports": {"showDisableButton": true}}"#,
            passthrough(),
        );
        let instance =
            BlockInstance::new(Map::new()).with_fields(object(json!({"is_disabled": "1"})));

        let context = renderer().compose(&block, &instance);

        assert_eq!(context["is_disabled"], json!(true));
        assert_eq!(context["notifications"][0]["message"], json!(DISABLED_MESSAGE));
    }

    #[test]
    fn test_disable_field_ignored_without_support() {
        let block = registered(r#"{"name": "acf/promo", "title": "Promo"}"#, passthrough());
        let instance =
            BlockInstance::new(Map::new()).with_fields(object(json!({"is_disabled": true})));

        let context = renderer().compose(&block, &instance);

        assert_eq!(context["is_disabled"], json!(false));
        assert_eq!(context["notifications"], json!([]));
    }

    #[rstest]
    #[case(Some(json!(false)))]
    #[case(Some(json!("0")))]
    #[case(Some(json!("")))]
    #[case(None)]
    fn test_falsy_disable_field_keeps_block_enabled(#[case] flag: Option<Value>) {
        let block = registered(
            r#"{"name": "acf/promo", "title": "Promo", "supports": {"showDisableButton": true}}"#,
            passthrough(),
        );
        let mut fields = Map::new();
        if let Some(flag) = flag {
            fields.insert(DISABLE_FIELD.into(), flag);
        }
        let instance = BlockInstance::new(Map::new()).with_fields(fields);

        let context = renderer().compose(&block, &instance);

        assert_eq!(context["is_disabled"], json!(false));
        assert_eq!(context["notifications"], json!([]));
    }

    #[test]
    fn test_disabled_by_hook_notifies_once() {
        let block = registered(
            r#"{"name": "acf/promo", "title": "Promo", "supports": {"showDisableButton": true}}"#,
            from_fn(|block, context| {
                block.set_disabled();
                context
            }),
        );
        let instance =
            BlockInstance::new(Map::new()).with_fields(object(json!({"is_disabled": true})));

        let context = renderer().compose(&block, &instance);

        assert_eq!(context["is_disabled"], json!(true));
        assert_eq!(context["notifications"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_css_variables_scoped_to_anchor() {
        let block = registered(
            r#"{"name": "acf/hero", "title": "Hero"}"#,
            from_fn(|block, context| {
                block.add_css_var("bg", "bg-color", None);
                block.set_css_var("gap", "1rem", Some(".inner"));
                block.set_css_var("radius", "4px", None);
                context
            }),
        );
        let instance = BlockInstance::new(object(json!({"id": "block_1", "anchor": "top"})))
            .with_fields(object(json!({"bg": "#000"})));

        let context = renderer().compose(&block, &instance);

        assert_eq!(context["block_id"], json!("top"));
        assert_eq!(
            context["inline_css"],
            json!("<style>#top{--bg-color:#000;--radius:4px;}#top .inner{--gap:1rem;}</style>")
        );
    }

    #[test]
    fn test_block_id_falls_back_to_instance_id_with_css() {
        let block = registered(
            r#"{"name": "acf/hero", "title": "Hero"}"#,
            from_fn(|block, context| {
                block.set_css_var("gap", "1rem", None);
                context
            }),
        );
        let instance = BlockInstance::new(object(json!({"id": "block_9"})));

        let context = renderer().compose(&block, &instance);

        assert_eq!(context["block_id"], json!("block_9"));
    }

    #[test]
    fn test_always_add_block_id() {
        struct Anchored;

        impl Block for Anchored {
            fn block_context(
                &self,
                _block: &mut BlockContext<'_>,
                context: TemplateContext,
            ) -> TemplateContext {
                context
            }

            fn always_add_block_id(&self) -> bool {
                true
            }
        }

        let block = registered(r#"{"name": "acf/hero", "title": "Hero"}"#, Anchored);
        let instance = BlockInstance::new(object(json!({"id": "block_4"})));

        assert_eq!(renderer().compose(&block, &instance)["block_id"], json!("block_4"));
    }

    #[test]
    fn test_set_attribute_reaches_classes() {
        let block = registered(
            r#"{"name": "acf/hero", "title": "Hero"}"#,
            from_fn(|block, context| {
                let _ = block.set_attribute("align", json!("full"));
                context
            }),
        );
        let instance = BlockInstance::new(object(json!({"align": "wide"})));

        let context = renderer().compose(&block, &instance);

        assert_eq!(context["classes"], json!(["hero", "acf-block", "alignfull"]));
        assert_eq!(context["attributes"]["align"], json!("full"));
    }

    #[test]
    fn test_template_not_found_surfaces_to_both_audiences() {
        let block = registered(r#"{"name": "acf/hero", "title": "Hero"}"#, passthrough());
        let mut diagnostics = Diagnostics::default();

        let err = renderer()
            .render(&block, &BlockInstance::new(Map::new()), &mut diagnostics)
            .unwrap_err();

        assert_eq!(err.to_string(), "Template file hero/hero.hbs not found.");
        assert_eq!(err.state(), Lifecycle::Failed);
        assert_eq!(diagnostics.frontend_errors().len(), 1);
        assert_eq!(diagnostics.backend_notices().count(), 1);
    }

    #[test]
    fn test_render_named_unknown_block() {
        let registry = BlockRegistry::new();
        let mut diagnostics = Diagnostics::default();

        let err = renderer()
            .render_named(&registry, "acf/missing", &BlockInstance::default(), &mut diagnostics)
            .unwrap_err();

        assert_eq!(err.state(), Lifecycle::Unregistered);
        assert!(matches!(err, RenderError::NotRegistered(name) if name == "acf/missing"));
    }

    #[test]
    fn test_render_dispatches_located_template() {
        let theme = crate::tests::create_test_theme_dir();
        let template = crate::tests::create_test_file(&theme, "blocks/hero/hero.hbs", "");
        let renderer = BlockRenderer::new(
            TemplateLocator::new(theme.path().join("templates/blocks"), theme.path().join("blocks")),
            Box::new(Echo),
        );
        let block = registered(r#"{"name": "acf/hero", "title": "Hero"}"#, passthrough());
        let mut diagnostics = Diagnostics::default();

        let rendered = renderer
            .render(&block, &BlockInstance::new(Map::new()), &mut diagnostics)
            .unwrap();

        assert_eq!(
            rendered.html,
            format!("{}|[\"hero\",\"acf-block\"]", template.display())
        );
        assert_eq!(rendered.state, Lifecycle::Rendered);
        assert!(!diagnostics.has_errors());
    }
}
