//! Resource handles and the provider contract they are resolved through

use super::value::PropertyValue;
use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

/// Separator between path segments; a path starting with it is absolute.
pub const SEPARATOR: char = '/';

/// Errors raised by tree providers and tree loading.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Malformed tree: {0}")]
    Malformed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// An absolute, normalized resource path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath(String);

impl ResourcePath {
    /// The tree root.
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    /// Parse an absolute path, normalizing `.`/`..` segments and duplicate
    /// separators.
    pub fn parse(path: &str) -> TreeResult<Self> {
        if !path.starts_with(SEPARATOR) {
            return Err(TreeError::InvalidPath(format!("not absolute: {}", path)));
        }
        Self::root()
            .join(path)
            .ok_or_else(|| TreeError::InvalidPath(format!("escapes the root: {}", path)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or("")
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Resolve `path` against this one. Absolute paths ignore `self`.
    /// Returns `None` when `..` would climb above the root.
    pub fn join(&self, path: &str) -> Option<Self> {
        let mut segments: Vec<&str> = if path.starts_with(SEPARATOR) {
            Vec::new()
        } else {
            self.segments().collect()
        };
        for segment in path.split(SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop()?;
                }
                other => segments.push(other),
            }
        }
        let mut joined = String::with_capacity(path.len() + self.0.len());
        for segment in &segments {
            joined.push(SEPARATOR);
            joined.push_str(segment);
        }
        if joined.is_empty() {
            joined.push(SEPARATOR);
        }
        Some(Self(joined))
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }
}

impl std::fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The resource tree provider contract.
///
/// Providers answer by path only; [`Resource`] handles carry the provider
/// reference. Implementations must keep a resource's path stable for as
/// long as the resource exists, and must be shareable across threads.
pub trait ResourceTree: Send + Sync {
    /// Whether a resource exists at `path`.
    fn exists(&self, path: &ResourcePath) -> bool;

    /// Child paths of `path`, in provider order.
    fn child_paths(&self, path: &ResourcePath) -> Vec<ResourcePath>;

    /// A single property of the resource at `path`.
    fn property(&self, path: &ResourcePath, name: &str) -> Option<PropertyValue>;

    /// All property names of the resource at `path`.
    fn property_names(&self, _path: &ResourcePath) -> Vec<String> {
        Vec::new()
    }

    /// Adapt the resource at `path` to a provider-known type.
    fn adapt(&self, _path: &ResourcePath, _target: &str) -> Option<Rc<dyn Any>> {
        None
    }
}

/// Handle to a node in a resource tree.
///
/// Handles compare equal when they name the same path in the same tree.
#[derive(Clone)]
pub struct Resource {
    path: ResourcePath,
    tree: Arc<dyn ResourceTree>,
}

impl Resource {
    /// Open the resource at an absolute path, if it exists.
    pub fn open(tree: Arc<dyn ResourceTree>, path: &str) -> Option<Self> {
        let path = ResourcePath::parse(path).ok()?;
        tree.exists(&path).then_some(Self { path, tree })
    }

    /// Like [`Resource::open`], failing with `NotFound` when absent.
    pub fn require(tree: Arc<dyn ResourceTree>, path: &str) -> TreeResult<Self> {
        Self::open(tree, path).ok_or_else(|| TreeError::NotFound(path.to_string()))
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn tree(&self) -> &Arc<dyn ResourceTree> {
        &self.tree
    }

    /// Resolve a path the way accessors address the tree: empty means this
    /// resource, absolute paths start at the root, anything else descends
    /// from here.
    pub fn resolve(&self, path: &str) -> Option<Self> {
        if path.is_empty() {
            return Some(self.clone());
        }
        let target = self.path.join(path)?;
        self.tree.exists(&target).then(|| Self {
            path: target,
            tree: self.tree.clone(),
        })
    }

    pub fn parent(&self) -> Option<Self> {
        self.resolve("..")
    }

    pub fn children(&self) -> Vec<Self> {
        self.tree
            .child_paths(&self.path)
            .into_iter()
            .map(|path| Self {
                path,
                tree: self.tree.clone(),
            })
            .collect()
    }

    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.tree.property(&self.path, name)
    }

    pub fn property_names(&self) -> Vec<String> {
        self.tree.property_names(&self.path)
    }

    pub fn adapt_to(&self, target: &str) -> Option<Rc<dyn Any>> {
        self.tree.adapt(&self.path, target)
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && std::ptr::addr_eq(Arc::as_ptr(&self.tree), Arc::as_ptr(&other.tree))
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource").field("path", &self.path.as_str()).finish()
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Resource({})", self.path)
    }
}
