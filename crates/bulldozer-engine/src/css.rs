//! Scoped CSS custom properties for a block.

use indexmap::IndexMap;
use serde::Serialize;

/// A single `--name: value` declaration, optionally scoped below the block root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CssVariableEntry {
    pub variable: String,
    pub value: String,
    pub selector: Option<String>,
}

impl CssVariableEntry {
    pub fn new(variable: &str, value: impl Into<String>, selector: Option<&str>) -> Self {
        let variable = if variable.starts_with("--") {
            variable.to_string()
        } else {
            format!("--{variable}")
        };

        Self {
            variable,
            value: value.into(),
            selector: selector
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

/// Accumulates CSS variable entries during a render and compiles them once.
#[derive(Debug, Default)]
pub struct CssVariableCompiler {
    entries: Vec<CssVariableEntry>,
    raw: String,
}

impl CssVariableCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: CssVariableEntry) {
        self.entries.push(entry);
    }

    /// Append literal CSS after the compiled variable rules.
    pub fn push_raw(&mut self, css: &str) {
        self.raw.push_str(css);
    }

    pub fn entries(&self) -> &[CssVariableEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.raw.is_empty()
    }

    /// Compile the accumulated entries into CSS rules scoped to `#root_id`.
    ///
    /// Entries without a selector share the root rule, which is emitted first.
    /// Entries with the same selector merge into one rule in first-seen order.
    /// The compiler is empty afterwards. Returns `None` when nothing was added.
    pub fn compile(&mut self, root_id: &str) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut groups: IndexMap<Option<String>, Vec<CssVariableEntry>> = IndexMap::new();
        groups.insert(None, Vec::new());
        for entry in self.entries.drain(..) {
            groups.entry(entry.selector.clone()).or_default().push(entry);
        }

        let root = format!("#{root_id}");
        let mut css = String::new();
        for (selector, entries) in groups {
            if entries.is_empty() {
                continue;
            }

            match selector {
                Some(selector) => {
                    css.push_str(&root);
                    css.push(' ');
                    css.push_str(&selector);
                }
                None => css.push_str(&root),
            }
            css.push('{');
            for entry in entries {
                css.push_str(&entry.variable);
                css.push(':');
                css.push_str(&entry.value);
                css.push(';');
            }
            css.push('}');
        }

        css.push_str(&std::mem::take(&mut self.raw));
        Some(css)
    }
}

/// Wrap compiled CSS for inline embedding.
pub fn style_tag(css: &str) -> String {
    format!("<style>{css}</style>")
}
