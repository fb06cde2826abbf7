//! Explicit registry of the block types known to a theme.

use crate::definition::{BlockDefinition, DefinitionError};
use crate::diagnostics::Diagnostics;
use crate::fields::{FieldBackend, FieldGroup, FieldRegistrar, FieldsBuilder};
use crate::renderer::{Block, Lifecycle, transition};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const BACKEND_MISSING_MESSAGE: &str = "Field plugin not activated.";
pub const BACKEND_MISSING_SUBTITLE: &str =
    "Blocks register their fields with the field plugin. Please install and activate it.";

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error("Field backend unavailable, block {0} was not registered")]
    FieldBackendUnavailable(String),
    #[error("Failed to register fields of block {block}: {source}")]
    FieldRegistration {
        block: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Block {0} does not meet its requirements")]
    RequirementsNotMet(String),
    #[error("Block {0} is already registered")]
    AlreadyRegistered(String),
}

/// A block type that passed registration.
pub struct RegisteredBlock {
    pub definition: BlockDefinition,
    /// The field group handed to the backend.
    pub fields: FieldGroup,
    pub block: Box<dyn Block>,
}

type FieldFilter = Box<dyn Fn(FieldsBuilder) -> FieldsBuilder>;

/// Registered block types, keyed by full name in registration order.
#[derive(Default)]
pub struct BlockRegistry {
    blocks: IndexMap<String, RegisteredBlock>,
    field_filters: HashMap<String, Vec<FieldFilter>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjust the field group of the block with `slug` before it reaches the backend.
    ///
    /// Filters run after the block's own fields, in the order they were added.
    pub fn filter_fields<F>(&mut self, slug: &str, filter: F)
    where
        F: Fn(FieldsBuilder) -> FieldsBuilder + 'static,
    {
        self.field_filters
            .entry(slug.to_string())
            .or_default()
            .push(Box::new(filter));
    }

    /// Load a `block.json` descriptor and register it with `block` as behaviour.
    pub fn register(
        &mut self,
        descriptor: &Path,
        block: Box<dyn Block>,
        backend: &mut dyn FieldBackend,
        diagnostics: &mut Diagnostics,
    ) -> Result<&RegisteredBlock, RegistrationError> {
        let definition = match BlockDefinition::load(descriptor) {
            Ok(definition) => definition,
            Err(err) => {
                log::error!("{err}");
                diagnostics.configuration_error(&err.to_string(), "Invalid block descriptor");
                return Err(err.into());
            }
        };
        self.register_definition(definition, block, backend, diagnostics)
    }

    pub fn register_definition(
        &mut self,
        mut definition: BlockDefinition,
        block: Box<dyn Block>,
        backend: &mut dyn FieldBackend,
        diagnostics: &mut Diagnostics,
    ) -> Result<&RegisteredBlock, RegistrationError> {
        let name = definition.name.clone();
        if self.blocks.contains_key(&name) {
            return Err(RegistrationError::AlreadyRegistered(name));
        }

        if !block.meets_requirements() {
            log::info!("{name}: requirements not met, skipping registration");
            return Err(RegistrationError::RequirementsNotMet(name));
        }

        if !backend.is_available() {
            log::warn!("{name}: {BACKEND_MISSING_MESSAGE}");
            diagnostics.configuration_error(BACKEND_MISSING_MESSAGE, BACKEND_MISSING_SUBTITLE);
            return Err(RegistrationError::FieldBackendUnavailable(name));
        }

        if let Some(variations) = block.variations() {
            definition.variations = variations;
        }
        if let Some(icon) = block.custom_icon() {
            definition.icon = Some(Value::String(icon));
        }
        if block.hide_from_inserter() {
            definition.supports.inserter = Some(false);
        }

        let mut fields = block.add_fields(FieldRegistrar::field_group(&definition));
        if let Some(filters) = self.field_filters.get(&definition.slug) {
            for filter in filters {
                fields = filter(fields);
            }
        }
        let fields = fields.build();

        if let Err(source) = backend.add_local_field_group(fields.clone()) {
            log::error!("{name}: {source}");
            diagnostics.backend_error(&source.to_string(), &format!("{} block", definition.title));
            return Err(RegistrationError::FieldRegistration {
                block: name,
                source,
            });
        }

        let mut state = Lifecycle::Unregistered;
        transition(&name, &mut state, Lifecycle::Registered);

        let entry = self.blocks.entry(name).or_insert(RegisteredBlock {
            definition,
            fields,
            block,
        });
        Ok(entry)
    }

    /// Register every `(descriptor, block)` pair. A failing block never stops the others.
    pub fn register_all<I>(
        &mut self,
        blocks: I,
        backend: &mut dyn FieldBackend,
        diagnostics: &mut Diagnostics,
    ) -> Vec<(PathBuf, RegistrationError)>
    where
        I: IntoIterator<Item = (PathBuf, Box<dyn Block>)>,
    {
        let mut failures = Vec::new();
        for (descriptor, block) in blocks {
            if let Err(err) = self.register(&descriptor, block, backend, diagnostics) {
                log::warn!("{}: {err}", descriptor.display());
                failures.push((descriptor, err));
            }
        }
        failures
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredBlock> {
        self.blocks.get(name)
    }

    pub fn get_by_slug(&self, slug: &str) -> Option<&RegisteredBlock> {
        self.blocks.values().find(|b| b.definition.slug == slug)
    }

    /// Look up by full name, falling back to the slug.
    pub fn find(&self, name_or_slug: &str) -> Option<&RegisteredBlock> {
        self.get(name_or_slug)
            .or_else(|| self.get_by_slug(name_or_slug))
    }

    pub fn state(&self, name: &str) -> Lifecycle {
        if self.blocks.contains_key(name) {
            Lifecycle::Registered
        } else {
            Lifecycle::Unregistered
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = &RegisteredBlock> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
