use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One render of one block, as supplied by the host.
///
/// A fresh instance is created for every render call and dropped afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockInstance {
    /// Host-generated element id (`attributes.id`), generated when absent.
    pub id: String,
    /// Editor-level configuration such as `align`, `className` or `backgroundColor`.
    pub attributes: Map<String, Value>,
    /// Author-entered field values.
    pub fields: Map<String, Value>,
    pub content: String,
    pub is_preview: bool,
    pub post_id: u64,
    pub parent_id: Option<String>,
}

impl BlockInstance {
    pub fn new(attributes: Map<String, Value>) -> Self {
        let id = attributes
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("block_{}", uuid::Uuid::new_v4().simple()));

        Self {
            id,
            attributes,
            ..Self::default()
        }
    }

    pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn preview(mut self, is_preview: bool) -> Self {
        self.is_preview = is_preview;
        self
    }

    pub fn with_post_id(mut self, post_id: u64) -> Self {
        self.post_id = post_id;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// The editor-assigned HTML anchor, if any.
    pub fn anchor(&self) -> Option<&str> {
        self.attributes
            .get("anchor")
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
    }

    /// The id the block element is addressed by: the anchor, else the host id.
    pub fn element_id(&self) -> &str {
        self.anchor().unwrap_or(&self.id)
    }
}
