//! Extension capability schema: typed model, binding types, and the parser that builds the
//! model from an untrusted registration payload.

mod binding;
mod model;
pub mod parser;
pub mod registry;

pub use binding::{BindingType, truthy};
pub use model::*;
pub use parser::{ParsedSchema, SchemaError, SchemaReader, SchemaWarning};
pub use registry::PropertyKeyRegistry;

#[cfg(test)]
mod tests;
