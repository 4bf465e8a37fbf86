//! Resource tree boundary
//!
//! The engine only ever reads the tree through [`ResourceTree`]; the
//! in-memory provider backs tests, fixtures and the CLI.

mod memory;
mod resource;
mod value;

pub use memory::{MemoryTree, ValueMap, VALUE_MAP};
pub use resource::{Resource, ResourcePath, ResourceTree, TreeError, TreeResult, SEPARATOR};
pub use value::{Binary, PropertyValue, StoredKind};
