//! The facade block code works against while its context hook runs.

use crate::classes::ClassList;
use crate::css::{CssVariableCompiler, CssVariableEntry};
use crate::definition::BlockDefinition;
use crate::diagnostics::{Notification, Severity};
use crate::instance::BlockInstance;
use crate::value::{FieldCast, is_empty, is_truthy, to_i64, to_plain_string};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Attribute {0} does not exist in the block attributes.")]
    UnknownAttribute(String),
}

/// Mutable state of one render, reset at the start of every render.
///
/// Everything block code changes lands here and is only turned into output
/// when the renderer finalizes.
#[derive(Debug, Default)]
pub struct WorkingState {
    pub(crate) attributes: Map<String, Value>,
    pub(crate) classes: ClassList,
    pub(crate) css: CssVariableCompiler,
    pub(crate) notifications: Vec<Notification>,
    pub(crate) disabled: bool,
}

impl WorkingState {
    pub fn new(instance: &BlockInstance) -> Self {
        Self {
            attributes: instance.attributes.clone(),
            ..Self::default()
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn classes(&self) -> &ClassList {
        &self.classes
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub(crate) fn notify(&mut self, title: &str, message: impl Into<String>, severity: Severity) {
        self.notifications
            .push(Notification::new(title, message, severity));
    }
}

/// Read/write access to one block render.
pub struct BlockContext<'a> {
    definition: &'a BlockDefinition,
    instance: &'a BlockInstance,
    state: &'a mut WorkingState,
}

impl<'a> BlockContext<'a> {
    pub fn new(
        definition: &'a BlockDefinition,
        instance: &'a BlockInstance,
        state: &'a mut WorkingState,
    ) -> Self {
        Self {
            definition,
            instance,
            state,
        }
    }

    // Fields

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.instance.fields.get(name)
    }

    pub fn field_or(&self, name: &str, default: Value) -> Value {
        self.field(name).cloned().unwrap_or(default)
    }

    /// Read a field cast to `T`, falling back to `default` when missing or null.
    pub fn field_as<T: FieldCast>(&self, name: &str, default: T) -> T {
        self.field(name)
            .filter(|v| !v.is_null())
            .map(T::cast)
            .unwrap_or(default)
    }

    /// Field rendered as plain text; `None` when missing or empty.
    pub fn field_str(&self, name: &str) -> Option<String> {
        self.field(name)
            .filter(|v| !is_empty(v))
            .map(to_plain_string)
    }

    pub fn field_i64(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(to_i64)
    }

    pub fn field_bool(&self, name: &str) -> bool {
        is_truthy(self.field(name))
    }

    /// Whether a field exists and holds a non-empty value.
    pub fn has_field(&self, name: &str) -> bool {
        is_truthy(self.field(name))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.instance.fields
    }

    // Attributes

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.state.attributes.get(name)
    }

    pub fn attribute_or(&self, name: &str, default: Value) -> Value {
        self.attribute(name).cloned().unwrap_or(default)
    }

    /// Overwrite an existing attribute. Unknown attributes are rejected.
    pub fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), ContextError> {
        match self.state.attributes.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ContextError::UnknownAttribute(name.to_string())),
        }
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.state.attributes
    }

    pub fn alignment(&self) -> &str {
        self.attribute("align")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn has_alignment(&self, alignment: &str) -> bool {
        self.alignment() == alignment
    }

    pub fn is_full_width(&self) -> bool {
        self.has_alignment("full")
    }

    pub fn is_wide(&self) -> bool {
        self.has_alignment("wide")
    }

    pub fn has_custom_classes(&self) -> bool {
        is_truthy(self.attribute("className"))
    }

    /// Classes the editor typed into the "Additional CSS classes" box.
    pub fn custom_classes(&self) -> Vec<String> {
        self.attribute("className")
            .and_then(Value::as_str)
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    // Instance

    pub fn is_preview(&self) -> bool {
        self.instance.is_preview
    }

    pub fn post_id(&self) -> u64 {
        self.instance.post_id
    }

    pub fn block_id(&self) -> &str {
        self.instance.element_id()
    }

    pub fn block_name(&self) -> &str {
        &self.definition.name
    }

    pub fn slug(&self) -> &str {
        &self.definition.slug
    }

    pub fn content(&self) -> &str {
        &self.instance.content
    }

    // Mutations

    pub fn add_class(&mut self, class: &str) {
        self.state.classes.push(class);
    }

    pub fn add_classes<I, S>(&mut self, classes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.classes.extend(classes);
    }

    /// Add a BEM modifier, `<slug>--<modifier>`.
    pub fn add_modifier_class(&mut self, modifier: &str) {
        let class = format!("{}--{}", self.definition.slug, modifier);
        self.state.classes.push(class);
    }

    /// Classes added so far by block code (the composed list is built later).
    pub fn classes(&self) -> &ClassList {
        &self.state.classes
    }

    /// Expose a field value as a CSS variable. Empty fields are skipped.
    pub fn add_css_var(&mut self, field_name: &str, variable: &str, selector: Option<&str>) {
        if let Some(value) = self.field_str(field_name) {
            self.set_css_var(variable, value, selector);
        }
    }

    /// Register a CSS variable with a literal value.
    pub fn set_css_var(&mut self, variable: &str, value: impl Into<String>, selector: Option<&str>) {
        self.state
            .css
            .push(CssVariableEntry::new(variable, value, selector));
    }

    pub fn css_variables(&self) -> &[CssVariableEntry] {
        self.state.css.entries()
    }

    /// Append raw CSS to the block's inline styles.
    pub fn add_css(&mut self, css: &str) {
        self.state.css.push_raw(css);
    }

    pub fn add_notification(&mut self, message: impl Into<String>, severity: Severity) {
        let title = self.definition.title.clone();
        self.state.notify(&title, message, severity);
    }

    pub fn is_disabled(&self) -> bool {
        self.state.disabled
    }

    pub fn set_disabled(&mut self) {
        self.state.disabled = true;
    }
}
