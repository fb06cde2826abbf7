//! Field group schemas for blocks and their registration with a field backend.

use crate::definition::BlockDefinition;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Name of the toggle injected into blocks that support disabling.
pub const DISABLE_FIELD: &str = "is_disabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    TrueFalse,
    Select,
    Image,
    ColorPicker,
    Group,
    Repeater,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub key: String,
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationRule {
    pub param: String,
    pub operator: String,
    pub value: String,
}

/// A built field group, ready to hand to a field backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldGroup {
    pub key: String,
    pub title: String,
    pub fields: Vec<FieldSpec>,
    /// Outer list is OR, inner list is AND.
    pub location: Vec<Vec<LocationRule>>,
}

impl FieldGroup {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Fluent builder for a field group.
#[derive(Debug, Clone)]
pub struct FieldsBuilder {
    name: String,
    title: String,
    fields: Vec<FieldSpec>,
    location: Vec<LocationRule>,
}

impl FieldsBuilder {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            fields: Vec::new(),
            location: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_location(mut self, param: &str, operator: &str, value: &str) -> Self {
        self.location = vec![LocationRule {
            param: param.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
        }];
        self
    }

    pub fn add_field(
        mut self,
        name: &str,
        kind: FieldKind,
        mut settings: Map<String, Value>,
    ) -> Self {
        let label = settings
            .remove("label")
            .and_then(|l| l.as_str().map(str::to_string))
            .unwrap_or_else(|| label_from_name(name));

        self.fields.push(FieldSpec {
            key: format!("field_{}_{}", self.name, name),
            name: name.to_string(),
            label,
            kind,
            settings,
            sub_fields: Vec::new(),
        });
        self
    }

    pub fn add_text(self, name: &str) -> Self {
        self.add_field(name, FieldKind::Text, Map::new())
    }

    pub fn add_textarea(self, name: &str) -> Self {
        self.add_field(name, FieldKind::Textarea, Map::new())
    }

    pub fn add_number(self, name: &str, min: Option<f64>, max: Option<f64>) -> Self {
        let mut settings = Map::new();
        if let Some(min) = min {
            settings.insert("min".into(), json!(min));
        }
        if let Some(max) = max {
            settings.insert("max".into(), json!(max));
        }
        self.add_field(name, FieldKind::Number, settings)
    }

    pub fn add_true_false(self, name: &str, settings: Map<String, Value>) -> Self {
        self.add_field(name, FieldKind::TrueFalse, settings)
    }

    pub fn add_select(self, name: &str, choices: &[(&str, &str)]) -> Self {
        let choices: Map<String, Value> = choices
            .iter()
            .map(|(value, label)| (value.to_string(), Value::String(label.to_string())))
            .collect();
        let mut settings = Map::new();
        settings.insert("choices".into(), Value::Object(choices));
        self.add_field(name, FieldKind::Select, settings)
    }

    pub fn add_image(self, name: &str) -> Self {
        self.add_field(name, FieldKind::Image, Map::new())
    }

    pub fn add_color_picker(self, name: &str) -> Self {
        self.add_field(name, FieldKind::ColorPicker, Map::new())
    }

    /// Add a group field whose sub fields come from `sub`.
    pub fn add_group(self, name: &str, sub: FieldsBuilder) -> Self {
        self.add_nested(name, FieldKind::Group, sub)
    }

    pub fn add_repeater(self, name: &str, sub: FieldsBuilder) -> Self {
        self.add_nested(name, FieldKind::Repeater, sub)
    }

    fn add_nested(self, name: &str, kind: FieldKind, sub: FieldsBuilder) -> Self {
        let mut this = self.add_field(name, kind, Map::new());
        if let Some(parent) = this.fields.last_mut() {
            let prefix = parent.key.clone();
            parent.sub_fields = sub
                .fields
                .into_iter()
                .map(|mut f| {
                    f.key = format!("{prefix}_{}", f.name);
                    f
                })
                .collect();
        }
        this
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn build(self) -> FieldGroup {
        FieldGroup {
            key: format!("group_{}", self.name),
            title: self.title,
            fields: self.fields,
            location: if self.location.is_empty() {
                Vec::new()
            } else {
                vec![self.location]
            },
        }
    }
}

fn label_from_name(name: &str) -> String {
    let spaced = name.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The field-registration system blocks register their schemas with.
pub trait FieldBackend {
    /// Whether the backend is installed and accepting registrations.
    fn is_available(&self) -> bool {
        true
    }

    fn add_local_field_group(&mut self, group: FieldGroup) -> anyhow::Result<()>;
}

/// In-process field backend keeping registered groups by key.
#[derive(Debug)]
pub struct LocalFieldRegistry {
    available: bool,
    groups: IndexMap<String, FieldGroup>,
}

impl Default for LocalFieldRegistry {
    fn default() -> Self {
        Self {
            available: true,
            groups: IndexMap::new(),
        }
    }
}

impl LocalFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend standing in for a missing field plugin.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            groups: IndexMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldGroup> {
        self.groups.get(key)
    }

    pub fn groups(&self) -> impl Iterator<Item = &FieldGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FieldBackend for LocalFieldRegistry {
    fn is_available(&self) -> bool {
        self.available
    }

    fn add_local_field_group(&mut self, group: FieldGroup) -> anyhow::Result<()> {
        if !self.available {
            anyhow::bail!("field backend is not available");
        }
        if self.groups.contains_key(&group.key) {
            anyhow::bail!("field group {} is already registered", group.key);
        }
        self.groups.insert(group.key.clone(), group);
        Ok(())
    }
}

/// Builds the base field group of a block definition.
pub struct FieldRegistrar;

impl FieldRegistrar {
    /// Group scoped to exactly this block type, with the disable toggle when supported.
    pub fn field_group(definition: &BlockDefinition) -> FieldsBuilder {
        let fields = FieldsBuilder::new(&definition.slug, format!("Block - {}", definition.title))
            .set_location("block", "==", &definition.name);

        if !definition.supports_disable_button() {
            return fields;
        }

        let settings = json!({
            "label": "Disable block",
            "instructions": "You can disable the block if you need to temporarily hide its content. For example, an announcement block can be still kept inside the editor but will not be show until it's enabled again.",
            "ui": 1,
            "ui_on_text": "True",
            "ui_off_text": "False"
        });
        let settings = match settings {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        fields.add_true_false(DISABLE_FIELD, settings)
    }
}
