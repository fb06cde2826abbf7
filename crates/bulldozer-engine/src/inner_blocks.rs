//! Markup for the editor's nested-block appender.

use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateLock {
    /// No moving, inserting or removing.
    All,
    /// Moving allowed, inserting and removing not.
    Insert,
    /// Only the content of existing blocks is editable.
    ContentOnly,
}

impl TemplateLock {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateLock::All => "all",
            TemplateLock::Insert => "insert",
            TemplateLock::ContentOnly => "contentOnly",
        }
    }
}

/// Builder for an `<InnerBlocks />` tag. Unset options are left out of the tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InnerBlocks {
    allowed_blocks: Vec<String>,
    template: Option<Value>,
    class: Option<String>,
    orientation: Option<Orientation>,
    template_lock: Option<TemplateLock>,
}

impl InnerBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allowed_blocks<I, S>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_blocks = blocks.into_iter().map(Into::into).collect();
        self
    }

    /// Initial blocks, e.g. `[["core/heading", {"level": 2}]]`.
    pub fn template(mut self, template: Value) -> Self {
        self.template = Some(template);
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn template_lock(mut self, lock: TemplateLock) -> Self {
        self.template_lock = Some(lock);
        self
    }

    pub fn lock_all(self) -> Self {
        self.template_lock(TemplateLock::All)
    }
}

impl fmt::Display for InnerBlocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<InnerBlocks")?;

        if !self.allowed_blocks.is_empty() {
            let json = serde_json::to_string(&self.allowed_blocks).map_err(|_| fmt::Error)?;
            write_attribute(f, "allowedBlocks", &json)?;
        }
        if let Some(template) = self.template.as_ref().filter(|t| !t.is_null()) {
            let json = serde_json::to_string(template).map_err(|_| fmt::Error)?;
            write_attribute(f, "template", &json)?;
        }
        if let Some(class) = self.class.as_deref().filter(|c| !c.is_empty()) {
            write_attribute(f, "class", class)?;
        }
        if let Some(orientation) = self.orientation {
            write_attribute(f, "orientation", orientation.as_str())?;
        }
        if let Some(lock) = self.template_lock {
            write_attribute(f, "templateLock", lock.as_str())?;
        }

        f.write_str(" />")
    }
}

fn write_attribute(f: &mut fmt::Formatter<'_>, name: &str, value: &str) -> fmt::Result {
    write!(
        f,
        " {name}=\"{}\"",
        html_escape::encode_quoted_attribute(value)
    )
}
