//! CSS class composition for a single block render.

use crate::definition::{AlignContent, BlockDefinition};
use crate::value::{is_empty, to_plain_string};
use indexmap::IndexSet;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// Classes the host adds for its own bookkeeping; noise at this layer.
pub const RESERVED_CLASS_PATTERN: &str = r"^wp-block-acf";

/// Marker class shared by every block, second after the slug.
pub const BASE_CLASS: &str = "acf-block";

/// Ordered set of class names. Insertion order is kept, duplicates are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassList(IndexSet<String>);

impl ClassList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one or more classes. Whitespace separated input is split.
    pub fn push(&mut self, classes: impl AsRef<str>) {
        for class in classes.as_ref().split_whitespace() {
            self.0.insert(class.to_string());
        }
    }

    pub fn extend<I, S>(&mut self, classes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for class in classes {
            self.push(class);
        }
    }

    pub fn contains(&self, class: &str) -> bool {
        self.0.contains(class)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|class| keep(class));
    }

    /// Move (or insert) a class to the first position.
    pub fn move_to_front(&mut self, class: &str) {
        let mut reordered = IndexSet::with_capacity(self.0.len() + 1);
        reordered.insert(class.to_string());
        reordered.extend(self.0.drain(..));
        self.0 = reordered;
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl fmt::Display for ClassList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, class) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(class)?;
        }
        Ok(())
    }
}

impl<S: AsRef<str>> FromIterator<S> for ClassList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = ClassList::new();
        list.extend(iter);
        list
    }
}

/// Derives the final class list of a block from its attributes and fields.
///
/// Composition is a pure function of its inputs so it can be re-run freely.
#[derive(Debug, Clone)]
pub struct ClassComposer {
    reserved: Regex,
}

impl Default for ClassComposer {
    fn default() -> Self {
        static RESERVED: OnceLock<Regex> = OnceLock::new();
        let reserved = RESERVED
            .get_or_init(|| Regex::new(RESERVED_CLASS_PATTERN).expect("Invalid reserved class regex"));
        Self {
            reserved: reserved.clone(),
        }
    }
}

impl ClassComposer {
    /// Create a composer filtering classes that match `reserved_pattern`.
    pub fn new(reserved_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            reserved: Regex::new(reserved_pattern)?,
        })
    }

    pub fn compose(
        &self,
        definition: &BlockDefinition,
        attributes: &Map<String, Value>,
        fields: &Map<String, Value>,
        extra: &ClassList,
    ) -> ClassList {
        let slug = definition.slug.as_str();
        let mut classes = ClassList::new();
        classes.push(slug);
        classes.push(BASE_CLASS);
        classes.extend(extra.iter());

        if let Some(class_name) = text(attributes, "className") {
            classes.push(escape(&class_name));
        }

        if let Some(align) = text(attributes, "align") {
            classes.push(format!("align{}", escape(&align)));
        }

        if let Some(background) = text(attributes, "backgroundColor") {
            classes.push("has-background");
            classes.push(format!("has-{}-background-color", escape(&background)));
        }

        if let Some(color) = text(attributes, "textColor") {
            classes.push("has-text-color");
            classes.push(format!("has-{}-color", escape(&color)));
        }

        if let Some(gradient) = text(attributes, "gradient") {
            classes.push("has-background-gradient");
            classes.push(format!("has-{}-gradient-background", escape(&gradient)));
        }

        if let Some(position) = text(attributes, "alignContent") {
            let dashed = escape(&position).replace(' ', "-");
            match definition.supports.align_content() {
                AlignContent::Matrix if position != "top left" => {
                    classes.push("has-custom-content-position");
                    classes.push(format!("is-position-{dashed}"));
                }
                AlignContent::Vertical => {
                    classes.push(format!("is-vertically-aligned-{dashed}"));
                }
                _ => {}
            }
        }

        if let Some(align_text) = text(attributes, "align_text")
            && align_text != "left"
        {
            classes.push(format!("has-text-align-{}", escape(&align_text)));
        }

        if let Some(dim) = text(fields, "image_dim") {
            classes.push("has-background-dim");
            classes.push(format!("has-background-dim-{}", escape(&dim)));
        }

        classes.retain(|class| !self.reserved.is_match(class));
        classes.move_to_front(slug);
        classes
    }
}

fn text(values: &Map<String, Value>, key: &str) -> Option<String> {
    values
        .get(key)
        .filter(|v| !is_empty(v))
        .map(to_plain_string)
}

fn escape(value: &str) -> String {
    html_escape::encode_quoted_attribute(value).into_owned()
}
