//! treeproxy: typed declarative adapters over hierarchical resource trees
//!
//! Declare an interface as a table of methods with property, reference and
//! child-collection metadata; the engine hands back a live [`Adapter`] that
//! answers each call by looking up the backing resource's tree.
//!
//! # Core Concepts
//!
//! - **Resources**: handles to nodes of a [`ResourceTree`], identified by path
//! - **Interfaces**: declared method tables, registered in an [`InterfaceRegistry`]
//! - **Adapters**: one interface over one resource, with a private result cache
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use treeproxy::{AdapterFactory, InterfaceRegistry, MemoryTree};
//!
//! let tree = Arc::new(MemoryTree::from_json_str(r#"{"page": {"title": "Home"}}"#).unwrap());
//! let registry = InterfaceRegistry::from_yaml_str(r#"
//! interfaces:
//!   - name: Page
//!     methods:
//!       - name: getTitle
//!         returns: String
//! "#).unwrap();
//!
//! let factory = AdapterFactory::new(Arc::new(registry));
//! let page = factory.get_adapter(&tree.open("/page").unwrap(), "Page").unwrap();
//! assert_eq!(page.get::<String>("getTitle").unwrap(), "Home");
//! ```

pub mod adapter;
pub mod config;
pub mod tree;

pub use adapter::{
    Adapter, AdapterError, AdapterFactory, AdapterInterface, AdapterResult, AuxiliaryService,
    ChildFilter, ChildFilters, Children, CoercionError, FromValue, InterfaceDecl, InterfaceRegistry, MethodCategory,
    MethodSpec, ServiceBinding, ServiceRegistry, TypedAdapter, Value, ValueType, WeakAdapter,
};
pub use config::{ConfigError, ConfigResult, EngineConfig};
pub use tree::{
    Binary, MemoryTree, PropertyValue, Resource, ResourcePath, ResourceTree, TreeError, TreeResult,
};
