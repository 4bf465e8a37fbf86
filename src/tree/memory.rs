//! In-memory resource tree
//!
//! Nodes live in a `DashMap` keyed by path so one tree can back adapters on
//! several threads. Children keep insertion order.

use super::resource::{Resource, ResourcePath, ResourceTree, TreeError, TreeResult};
use super::value::{Binary, PropertyValue};
use chrono::DateTime;
use dashmap::DashMap;
use serde_json::Value as Json;
use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

/// Type name `adapt` understands.
pub const VALUE_MAP: &str = "ValueMap";

/// Marker key for typed scalar objects in JSON trees.
const TYPE_KEY: &str = "@type";

/// Read-only snapshot of a resource's properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap(BTreeMap<String, PropertyValue>);

impl ValueMap {
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryNode {
    properties: BTreeMap<String, PropertyValue>,
    children: Vec<String>,
}

/// A resource tree held entirely in memory.
#[derive(Debug)]
pub struct MemoryTree {
    nodes: DashMap<ResourcePath, MemoryNode>,
}

impl MemoryTree {
    /// Create a tree containing only the root node.
    pub fn new() -> Self {
        let nodes = DashMap::new();
        nodes.insert(ResourcePath::root(), MemoryNode::default());
        Self { nodes }
    }

    /// Build a tree from a nested JSON object rooted at `/`.
    ///
    /// Object members become child nodes, except typed scalars written as
    /// `{"@type": "date" | "binary" | "name" | "path" | "reference", "value": ...}`.
    /// Arrays become multi-valued properties.
    pub fn from_json(json: &Json) -> TreeResult<Self> {
        let tree = Self::new();
        let root = ResourcePath::root();
        match json {
            Json::Object(_) => tree.load_node(&root, json)?,
            other => {
                return Err(TreeError::Malformed(format!(
                    "tree root must be an object, found {}",
                    other
                )))
            }
        }
        Ok(tree)
    }

    pub fn from_json_str(json: &str) -> TreeResult<Self> {
        Self::from_json(&serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> TreeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Open a handle to the resource at `path`.
    pub fn open(self: &Arc<Self>, path: &str) -> Option<Resource> {
        Resource::open(self.clone(), path)
    }

    /// Create a node, along with any missing ancestors. Existing nodes are
    /// left untouched.
    pub fn insert_node(&self, path: &str) -> TreeResult<()> {
        let path = ResourcePath::parse(path)?;
        self.ensure_node(&path);
        Ok(())
    }

    /// Set a property on an existing node, replacing any previous value.
    pub fn set_property(
        &self,
        path: &str,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> TreeResult<()> {
        let path = ResourcePath::parse(path)?;
        let mut node = self
            .nodes
            .get_mut(&path)
            .ok_or_else(|| TreeError::NotFound(path.to_string()))?;
        node.properties.insert(name.into(), value.into());
        Ok(())
    }

    pub fn remove_property(&self, path: &str, name: &str) -> TreeResult<Option<PropertyValue>> {
        let path = ResourcePath::parse(path)?;
        let mut node = self
            .nodes
            .get_mut(&path)
            .ok_or_else(|| TreeError::NotFound(path.to_string()))?;
        Ok(node.properties.remove(name))
    }

    /// Remove a node and its whole subtree. Returns false if it did not exist.
    pub fn remove_node(&self, path: &str) -> TreeResult<bool> {
        let path = ResourcePath::parse(path)?;
        let Some(parent) = path.parent() else {
            return Err(TreeError::InvalidPath("cannot remove the root".to_string()));
        };
        let Some((_, node)) = self.nodes.remove(&path) else {
            return Ok(false);
        };
        for child in &node.children {
            if let Some(child_path) = path.join(child) {
                self.remove_node(child_path.as_str())?;
            }
        }
        if let Some(mut parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.retain(|c| c != path.name());
        }
        Ok(true)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn ensure_node(&self, path: &ResourcePath) {
        if self.nodes.contains_key(path) {
            return;
        }
        if let Some(parent) = path.parent() {
            self.ensure_node(&parent);
            if let Some(mut parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.push(path.name().to_string());
            }
        }
        self.nodes.insert(path.clone(), MemoryNode::default());
    }

    fn load_node(&self, path: &ResourcePath, json: &Json) -> TreeResult<()> {
        self.ensure_node(path);
        let Json::Object(members) = json else {
            return Ok(());
        };
        for (key, value) in members {
            if is_child_node(value) {
                let child = path
                    .join(key)
                    .ok_or_else(|| TreeError::InvalidPath(format!("{}/{}", path, key)))?;
                self.load_node(&child, value)?;
            } else if let Some(property) = json_to_property(value)? {
                if let Some(mut node) = self.nodes.get_mut(path) {
                    node.properties.insert(key.clone(), property);
                }
            }
        }
        Ok(())
    }
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceTree for MemoryTree {
    fn exists(&self, path: &ResourcePath) -> bool {
        self.nodes.contains_key(path)
    }

    fn child_paths(&self, path: &ResourcePath) -> Vec<ResourcePath> {
        let names = match self.nodes.get(path) {
            Some(node) => node.children.clone(),
            None => return Vec::new(),
        };
        names.iter().filter_map(|name| path.join(name)).collect()
    }

    fn property(&self, path: &ResourcePath, name: &str) -> Option<PropertyValue> {
        self.nodes.get(path)?.properties.get(name).cloned()
    }

    fn property_names(&self, path: &ResourcePath) -> Vec<String> {
        self.nodes
            .get(path)
            .map(|node| node.properties.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn adapt(&self, path: &ResourcePath, target: &str) -> Option<Rc<dyn Any>> {
        if target != VALUE_MAP {
            return None;
        }
        let node = self.nodes.get(path)?;
        Some(Rc::new(ValueMap(node.properties.clone())))
    }
}

fn is_child_node(value: &Json) -> bool {
    matches!(value, Json::Object(map) if !map.contains_key(TYPE_KEY))
}

/// Convert a JSON member to a stored property. `null` members are skipped.
fn json_to_property(value: &Json) -> TreeResult<Option<PropertyValue>> {
    let property = match value {
        Json::Null => return Ok(None),
        Json::Bool(b) => PropertyValue::Boolean(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => PropertyValue::Long(i),
            None => PropertyValue::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => PropertyValue::String(s.clone()),
        Json::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match json_to_property(item)? {
                    Some(PropertyValue::Multi(_)) => {
                        return Err(TreeError::Malformed("nested arrays are not properties".into()))
                    }
                    Some(v) => values.push(v),
                    None => {}
                }
            }
            PropertyValue::Multi(values)
        }
        Json::Object(map) => typed_scalar(map)?,
    };
    Ok(Some(property))
}

fn typed_scalar(map: &serde_json::Map<String, Json>) -> TreeResult<PropertyValue> {
    let kind = map.get(TYPE_KEY).and_then(Json::as_str).unwrap_or_default();
    let text = map
        .get("value")
        .and_then(Json::as_str)
        .ok_or_else(|| TreeError::Malformed(format!("typed value '{}' needs a string value", kind)))?;
    match kind {
        "date" => DateTime::parse_from_rfc3339(text)
            .map(PropertyValue::Date)
            .map_err(|e| TreeError::Malformed(format!("bad date '{}': {}", text, e))),
        "binary" => Ok(PropertyValue::Binary(Binary::from(text))),
        "name" => Ok(PropertyValue::Name(text.to_string())),
        "path" => Ok(PropertyValue::Path(text.to_string())),
        "reference" => Ok(PropertyValue::Reference(text.to_string())),
        other => Err(TreeError::Malformed(format!("unknown typed value '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::StoredKind;
    use serde_json::json;

    fn sample() -> Arc<MemoryTree> {
        Arc::new(
            MemoryTree::from_json(&json!({
                "content": {
                    "page": {
                        "sling:resourceType": "app/page",
                        "jcr:content": {
                            "jcr:title": "Hello",
                            "created": {"@type": "date", "value": "2024-05-01T10:00:00+02:00"},
                            "tags": ["a", "b"]
                        },
                        "first": {},
                        "second": {},
                        "third": {}
                    }
                }
            }))
            .unwrap(),
        )
    }

    #[test]
    fn loads_nested_nodes_and_properties() {
        let tree = sample();
        let page = tree.open("/content/page").unwrap();
        assert_eq!(
            page.property("sling:resourceType"),
            Some(PropertyValue::String("app/page".to_string()))
        );
        let content = page.resolve("jcr:content").unwrap();
        assert_eq!(content.property("created").unwrap().kind(), StoredKind::Date);
        assert!(content.property("tags").unwrap().is_multiple());
    }

    #[test]
    fn children_keep_insertion_order() {
        let tree = sample();
        let page = tree.open("/content/page").unwrap();
        let names: Vec<_> = page.children().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["jcr:content", "first", "second", "third"]);
    }

    #[test]
    fn insert_creates_missing_ancestors() {
        let tree = Arc::new(MemoryTree::new());
        tree.insert_node("/a/b/c").unwrap();
        assert!(tree.open("/a").is_some());
        assert!(tree.open("/a/b").is_some());
        assert_eq!(tree.open("/a/b").unwrap().children().len(), 1);
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn set_property_requires_existing_node() {
        let tree = MemoryTree::new();
        assert!(matches!(
            tree.set_property("/missing", "x", 1i64),
            Err(TreeError::NotFound(_))
        ));
    }

    #[test]
    fn remove_node_drops_subtree() {
        let tree = sample();
        assert!(tree.remove_node("/content/page").unwrap());
        assert!(tree.open("/content/page/first").is_none());
        assert!(tree.open("/content").unwrap().children().is_empty());
        assert!(!tree.remove_node("/content/page").unwrap());
    }

    #[test]
    fn adapts_to_value_map() {
        let tree = sample();
        let content = tree.open("/content/page/jcr:content").unwrap();
        let adapted = content.adapt_to(VALUE_MAP).unwrap();
        let map = adapted.downcast_ref::<ValueMap>().unwrap();
        assert_eq!(map.len(), 3);
        assert!(content.adapt_to("Unknown").is_none());
    }

    #[test]
    fn rejects_non_object_root() {
        assert!(MemoryTree::from_json(&json!([1, 2])).is_err());
        assert!(MemoryTree::from_json(&json!({"x": {"@type": "date", "value": "nope"}})).is_err());
    }
}
