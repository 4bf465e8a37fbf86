//! Deferred child collections
//!
//! Child handles are listed up front; each is materialized only when the
//! iterator reaches it. Iteration is forward-only and cannot be restarted.

use super::factory::AdapterFactory;
use super::interface::{ChildFilter, ValueType};
use super::value::Value;
use crate::config::EngineConfig;
use crate::tree::Resource;
use std::cell::RefCell;
use std::collections::HashMap;
use std::iter::Peekable;
use std::rc::Rc;
use std::sync::Arc;

type Backing = Box<dyn Iterator<Item = Option<Resource>>>;

/// Lazily adapts a sequence of child handles to an element type.
pub struct DeferredIterator {
    backing: Peekable<Backing>,
    element: ValueType,
    factory: AdapterFactory,
}

impl DeferredIterator {
    /// `None` entries in `backing` yield `Value::Null` untouched.
    pub fn new(
        backing: impl Iterator<Item = Option<Resource>> + 'static,
        element: ValueType,
        factory: AdapterFactory,
    ) -> Self {
        let backing: Backing = Box::new(backing);
        Self {
            backing: backing.peekable(),
            element,
            factory,
        }
    }

    pub fn empty(element: ValueType, factory: AdapterFactory) -> Self {
        Self::new(std::iter::empty(), element, factory)
    }

    pub fn has_next(&mut self) -> bool {
        self.backing.peek().is_some()
    }

    pub fn element(&self) -> &ValueType {
        &self.element
    }
}

impl Iterator for DeferredIterator {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let next = self.backing.next()?;
        Some(match next {
            Some(resource) => self.factory.materialize(&resource, &self.element),
            None => Value::Null,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.backing.size_hint()
    }
}

/// Shared handle to a deferred child collection.
///
/// Clones share one cursor: advancing any clone advances them all.
#[derive(Clone)]
pub struct Children(Rc<RefCell<DeferredIterator>>);

impl Children {
    pub fn new(iter: DeferredIterator) -> Self {
        Self(Rc::new(RefCell::new(iter)))
    }

    pub fn has_next(&self) -> bool {
        self.0.borrow_mut().has_next()
    }

    pub fn ptr_eq(&self, other: &Children) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Iterator for Children {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        // Materializing builds nested adapters without invoking any getter,
        // so nothing re-enters this collection while it is borrowed.
        self.0.borrow_mut().next()
    }
}

impl std::fmt::Debug for Children {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Children")
            .field("element", &self.0.borrow().element)
            .finish_non_exhaustive()
    }
}

/// Predicate deciding whether a child is listed.
pub type ChildPredicate = Arc<dyn Fn(&Resource) -> bool + Send + Sync>;

/// Child predicates registered by name, for [`ChildFilter::Named`].
#[derive(Clone, Default)]
pub struct ChildFilters {
    predicates: HashMap<String, ChildPredicate>,
}

impl ChildFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `predicate` under `name`, replacing any earlier one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        predicate: impl Fn(&Resource) -> bool + Send + Sync + 'static,
    ) {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    pub fn get(&self, name: &str) -> Option<&ChildPredicate> {
        self.predicates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl std::fmt::Debug for ChildFilters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ChildFilters").field("names", &names).finish()
    }
}

impl ChildFilter {
    /// Whether `child` is listed. An unregistered name lists nothing.
    pub fn accepts(&self, child: &Resource, config: &EngineConfig, filters: &ChildFilters) -> bool {
        match self {
            Self::All => true,
            Self::ExcludeContentNode => child.name() != config.content_node,
            Self::Named(name) => filters.get(name).is_some_and(|predicate| predicate(child)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::InterfaceRegistry;
    use crate::tree::MemoryTree;
    use serde_json::json;
    use std::sync::Arc;

    fn fixture() -> (Arc<MemoryTree>, AdapterFactory) {
        let tree = Arc::new(
            MemoryTree::from_json(&json!({
                "p": {"jcr:content": {}, "a": {}, "b": {}}
            }))
            .unwrap(),
        );
        (tree, AdapterFactory::new(Arc::new(InterfaceRegistry::new())))
    }

    #[test]
    fn yields_handles_in_order_then_exhausts() {
        let (tree, factory) = fixture();
        let parent = tree.open("/p").unwrap();
        let iter = DeferredIterator::new(
            parent.children().into_iter().map(Some),
            ValueType::Resource,
            factory,
        );
        let mut children = Children::new(iter);
        assert!(children.has_next());
        let names: Vec<String> = children
            .by_ref()
            .map(|v| match v {
                Value::Resource(r) => r.name().to_string(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["jcr:content", "a", "b"]);
        assert!(!children.has_next());
        assert!(children.next().is_none());
    }

    #[test]
    fn null_entries_yield_null() {
        let (tree, factory) = fixture();
        let a = tree.open("/p/a");
        let mut iter = DeferredIterator::new(vec![None, a].into_iter(), ValueType::Resource, factory);
        assert_eq!(iter.next(), Some(Value::Null));
        assert!(matches!(iter.next(), Some(Value::Resource(_))));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn clones_share_a_cursor() {
        let (tree, factory) = fixture();
        let parent = tree.open("/p").unwrap();
        let iter = DeferredIterator::new(parent.children().into_iter().map(Some), ValueType::Resource, factory);
        let mut first = Children::new(iter);
        let mut second = first.clone();
        assert!(first.next().is_some());
        assert_eq!(second.by_ref().count(), 2);
        assert!(first.next().is_none());
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn content_node_filter() {
        let (tree, _) = fixture();
        let config = EngineConfig::default();
        let filters = ChildFilters::new();
        let parent = tree.open("/p").unwrap();
        let kept: Vec<_> = parent
            .children()
            .into_iter()
            .filter(|c| ChildFilter::ExcludeContentNode.accepts(c, &config, &filters))
            .collect();
        assert_eq!(kept.len(), 2);
        assert!(parent
            .children()
            .iter()
            .all(|c| ChildFilter::All.accepts(c, &config, &filters)));
    }

    #[test]
    fn named_filter_uses_registered_predicate() {
        let (tree, _) = fixture();
        let config = EngineConfig::default();
        let mut filters = ChildFilters::new();
        filters.register("only_a", |c: &Resource| c.name() == "a");
        let parent = tree.open("/p").unwrap();

        let kept: Vec<String> = parent
            .children()
            .into_iter()
            .filter(|c| ChildFilter::named("only_a").accepts(c, &config, &filters))
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(kept, vec!["a"]);
        assert!(!parent
            .children()
            .iter()
            .any(|c| ChildFilter::named("unknown").accepts(c, &config, &filters)));
        assert_eq!(format!("{:?}", filters), r#"ChildFilters { names: ["only_a"] }"#);
    }
}
