//! Adapter invocation dispatcher
//!
//! An [`Adapter`] pairs one registered interface with one backing resource
//! and routes every call through [`Adapter::invoke`]. Accessor results are
//! memoized per adapter for its whole lifetime; external tree changes are
//! not observed once a key is cached.
//!
//! Adapters are single-threaded (`Rc` + `RefCell`). The tree behind them is
//! shared and thread-safe, so each thread builds its own adapters.

use super::cast::cast;
use super::classify::{IdentityMethod, MethodCategory};
use super::children::{Children, DeferredIterator};
use super::error::{AdapterError, AdapterResult};
use super::factory::AdapterFactory;
use super::identity;
use super::interface::{Accessor, AdapterInterface, MethodSpec, ValueType};
use super::resolve::{Invocation, Target};
use super::service::AuxiliaryService;
use super::value::{FromValue, Value};
use crate::config::EngineConfig;
use crate::tree::{PropertyValue, Resource};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::{Rc, Weak};
use std::sync::Arc;

struct AdapterInner {
    interface: Arc<AdapterInterface>,
    resource: Resource,
    factory: AdapterFactory,
    cache: RefCell<HashMap<String, Value>>,
    services: RefCell<HashMap<String, Rc<dyn AuxiliaryService>>>,
}

/// A live object implementing a declared interface over a resource.
///
/// Clones are the same adapter: they share the cache.
#[derive(Clone)]
pub struct Adapter {
    inner: Rc<AdapterInner>,
}

/// Non-owning handle to an [`Adapter`], handed to auxiliary services.
#[derive(Clone)]
pub struct WeakAdapter {
    inner: Weak<AdapterInner>,
}

impl WeakAdapter {
    pub fn upgrade(&self) -> Option<Adapter> {
        self.inner.upgrade().map(|inner| Adapter { inner })
    }

    #[cfg(test)]
    pub(crate) fn dangling() -> Self {
        Self { inner: Weak::new() }
    }
}

impl Adapter {
    pub(crate) fn new(interface: Arc<AdapterInterface>, resource: Resource, factory: AdapterFactory) -> Self {
        Self {
            inner: Rc::new(AdapterInner {
                interface,
                resource,
                factory,
                cache: RefCell::new(HashMap::new()),
                services: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn interface(&self) -> &Arc<AdapterInterface> {
        &self.inner.interface
    }

    /// The exposed interface set: the interface and all it extends.
    pub fn interfaces(&self) -> &BTreeSet<String> {
        self.inner.interface.exposed()
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces().contains(interface)
    }

    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    pub fn path(&self) -> &str {
        self.inner.resource.path().as_str()
    }

    pub fn factory(&self) -> &AdapterFactory {
        &self.inner.factory
    }

    pub fn identity_hash(&self) -> i64 {
        identity::identity_hash(self)
    }

    /// Whether both handles are the same adapter instance.
    pub fn ptr_eq(&self, other: &Adapter) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakAdapter {
        WeakAdapter {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Invoke `method` and convert the result.
    pub fn call<T: FromValue>(&self, method: &str, args: &[Value]) -> AdapterResult<T> {
        T::from_value(self.invoke(method, args)?)
    }

    /// Invoke a zero-argument method and convert the result.
    pub fn get<T: FromValue>(&self, method: &str) -> AdapterResult<T> {
        self.call(method, &[])
    }

    /// Dispatch one call by method name and arguments.
    pub fn invoke(&self, method: &str, args: &[Value]) -> AdapterResult<Value> {
        tracing::trace!(interface = %self.inner.interface.name(), method, arity = args.len(), "invoke");
        let spec = self.lookup(method, args.len())?;
        let invocation = Invocation::new(&spec, args, self.config())?;

        match invocation.category {
            MethodCategory::PropertyGetter => self.get_property(&invocation),
            MethodCategory::ReferenceGetter => self.get_reference(&invocation),
            MethodCategory::ChildCollectionGetter => self.get_children(&invocation),
            MethodCategory::PropertySetter => Err(AdapterError::NotImplemented(format!(
                "setter '{}': properties are read-only",
                method
            ))),
            MethodCategory::BackingResource => Ok(Value::Resource(self.inner.resource.clone())),
            MethodCategory::Identity(IdentityMethod::ToString) => Ok(Value::String(identity::describe(self))),
            MethodCategory::Identity(IdentityMethod::HashCode) => Ok(Value::Long(self.identity_hash())),
            MethodCategory::Identity(IdentityMethod::Equals) => match args {
                [other] => Ok(Value::Bool(identity::equals(self, other))),
                _ => Err(AdapterError::InvalidArguments(format!(
                    "'equals' requires exactly 1 argument, got {}",
                    args.len()
                ))),
            },
            MethodCategory::Unrecognized => self.forward(&spec, args),
        }
    }

    fn config(&self) -> &EngineConfig {
        self.inner.factory.config()
    }

    /// Find the declared method, synthesizing identity and backing-resource
    /// methods the interface does not declare.
    fn lookup(&self, name: &str, arity: usize) -> AdapterResult<Cow<'_, MethodSpec>> {
        if let Some(spec) = self.inner.interface.method(name, arity) {
            return Ok(Cow::Borrowed(spec));
        }
        let implicit = IdentityMethod::from_name(name).is_some()
            || name == self.config().backing_resource_method;
        if implicit {
            let mut spec = MethodSpec::new(name);
            spec.params = vec![ValueType::Object("Any".to_string()); arity];
            spec.declared_in = self.inner.interface.name().to_string();
            return Ok(Cow::Owned(spec));
        }
        Err(AdapterError::NoSuchAccessor(format!(
            "{} has no method '{}' taking {} argument(s)",
            self.inner.interface.name(),
            name,
            arity
        )))
    }

    fn cached(&self, key: &str) -> Option<Value> {
        self.inner.cache.borrow().get(key).cloned()
    }

    fn store(&self, key: &str, value: &Value) {
        self.inner.cache.borrow_mut().insert(key.to_string(), value.clone());
    }

    /// Resource an accessor path points at: empty is the backing resource.
    fn locate(&self, target: &Target) -> Option<Resource> {
        let found = self.inner.resource.resolve(&target.path);
        if found.is_none() {
            tracing::debug!(base = %self.path(), path = %target.path, "target resource not found");
        }
        found
    }

    fn get_property(&self, invocation: &Invocation<'_>) -> AdapterResult<Value> {
        let target = invocation.target()?;
        if let Some(hit) = self.cached(&target.cache_key) {
            tracing::debug!(key = %target.cache_key, "cache hit");
            return Ok(hit);
        }
        tracing::debug!(key = %target.cache_key, absolute = target.is_absolute, relative = target.is_relative, "cache miss");

        let declared = invocation.method.returns.clone().unwrap_or(ValueType::String);
        let raw = self
            .locate(target)
            .and_then(|resource| self.read_property(&resource, target));

        let value = match (&raw, &invocation.method.accessor) {
            (None, Some(Accessor::Property(access))) if access.use_default => match &access.default {
                Some(default) => cast(Some(&default.to_property_value()), &declared)?,
                None => Value::Null,
            },
            _ => cast(raw.as_ref(), &declared)?,
        };
        self.store(&target.cache_key, &value);
        Ok(value)
    }

    fn read_property(&self, resource: &Resource, target: &Target) -> Option<PropertyValue> {
        if let Some(value) = resource.property(&target.key) {
            return Some(value);
        }
        if !(target.derived && self.config().lenient_keys) {
            return None;
        }
        let separator = self.config().namespace_separator;
        let wanted = normalize_key(&target.key, separator);
        let matched = resource
            .property_names()
            .into_iter()
            .find(|name| normalize_key(name, separator) == wanted)?;
        tracing::debug!(key = %target.key, %matched, "lenient key match");
        resource.property(&matched)
    }

    fn get_reference(&self, invocation: &Invocation<'_>) -> AdapterResult<Value> {
        let target = invocation.target()?;
        if let Some(hit) = self.cached(&target.cache_key) {
            tracing::debug!(key = %target.cache_key, "cache hit");
            return Ok(hit);
        }

        let declared = invocation.method.returns.clone().unwrap_or(ValueType::Resource);
        let value = match self.locate(target) {
            Some(reference) => self.inner.factory.materialize(&reference, &declared),
            None => Value::Null,
        };
        self.store(&target.cache_key, &value);
        Ok(value)
    }

    fn get_children(&self, invocation: &Invocation<'_>) -> AdapterResult<Value> {
        let target = invocation.target()?;
        if let Some(hit) = self.cached(&target.cache_key) {
            tracing::debug!(key = %target.cache_key, "cache hit");
            return Ok(hit);
        }

        let Some(Accessor::Children(access)) = &invocation.method.accessor else {
            return Err(AdapterError::InvalidAdapterSpec(format!(
                "'{}' has no child-collection metadata",
                invocation.method.name
            )));
        };
        let factory = self.inner.factory.clone();
        let iter = match self.locate(target) {
            Some(parent) => {
                let config = self.config();
                let filters = self.inner.factory.child_filters();
                let children: Vec<Option<Resource>> = parent
                    .children()
                    .into_iter()
                    .filter(|child| access.filter.accepts(child, config, filters))
                    .map(Some)
                    .collect();
                tracing::debug!(parent = %parent.path(), count = children.len(), "listing children");
                DeferredIterator::new(children.into_iter(), access.element.clone(), factory)
            }
            None => DeferredIterator::empty(access.element.clone(), factory),
        };
        let value = Value::Children(Children::new(iter));
        self.store(&target.cache_key, &value);
        Ok(value)
    }

    /// Forward an unrecognized method to the service bound for the
    /// interface that declared it. The service is built on first use.
    fn forward(&self, spec: &MethodSpec, args: &[Value]) -> AdapterResult<Value> {
        let binding = self.inner.interface.binding_for(&spec.declared_in).ok_or_else(|| {
            AdapterError::NoSuchAccessor(format!(
                "'{}' is not an accessor and {} has no service binding",
                spec.name, spec.declared_in
            ))
        })?;

        let existing = self.inner.services.borrow().get(&binding.service).cloned();
        let service = match existing {
            Some(service) => service,
            None => {
                let constructor = self.inner.factory.services().resolve(binding)?;
                let service = constructor(self.downgrade());
                self.inner
                    .services
                    .borrow_mut()
                    .insert(binding.service.clone(), service.clone());
                service
            }
        };
        service.invoke(&spec.name, args)
    }
}

fn normalize_key(key: &str, separator: char) -> String {
    key.chars()
        .filter(|c| *c != separator)
        .flat_map(char::to_lowercase)
        .collect()
}

impl PartialEq for Adapter {
    fn eq(&self, other: &Self) -> bool {
        identity::same_identity(self, other)
    }
}

impl Eq for Adapter {}

impl std::hash::Hash for Adapter {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_i64(self.identity_hash());
    }
}

impl std::fmt::Display for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&identity::describe(self))
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("interface", &self.inner.interface.name())
            .field("path", &self.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_keys_ignore_case_and_separator() {
        assert_eq!(normalize_key("jcr:Title", ':'), "jcrtitle");
        assert_eq!(normalize_key("JCRTITLE", ':'), "jcrtitle");
    }
}
