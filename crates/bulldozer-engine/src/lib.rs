pub mod asset;
pub mod classes;
pub mod context;
pub mod css;
pub mod definition;
pub mod diagnostics;
pub mod fields;
pub mod inner_blocks;
pub mod instance;
pub mod io;
pub mod registry;
pub mod renderer;
pub mod template;
pub mod value;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use asset::{Asset, AssetError, Assets, Manifest};
pub use classes::{ClassComposer, ClassList};
pub use context::{BlockContext, ContextError};
pub use css::{CssVariableCompiler, CssVariableEntry};
pub use definition::{BlockDefinition, DefinitionError, Deprecation, Supports};
pub use diagnostics::{Diagnostics, Notification, RequestKind, Severity};
pub use fields::{FieldBackend, FieldGroup, FieldKind, FieldRegistrar, FieldsBuilder, LocalFieldRegistry};
pub use inner_blocks::{InnerBlocks, Orientation, TemplateLock};
pub use instance::BlockInstance;
pub use io::{IoError, discover_blocks};
pub use registry::{BlockRegistry, RegisteredBlock, RegistrationError};
pub use renderer::{
    Block, BlockRenderer, FnBlock, Lifecycle, RenderError, RenderedBlock, TemplateContext, from_fn,
};
pub use template::{HandlebarsEngine, TemplateEngine, TemplateError, TemplateLocator};
