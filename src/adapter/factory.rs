//! Adapter factory: the entry point for building adapters

use super::children::ChildFilters;
use super::classify::classify;
use super::dispatch::Adapter;
use super::error::{AdapterError, AdapterResult};
use super::interface::{Accessor, ChildFilter, InterfaceRegistry, ValueType};
use super::service::ServiceRegistry;
use super::value::Value;
use crate::config::EngineConfig;
use crate::tree::{Resource, ResourceTree};
use std::sync::Arc;

/// A hand-written typed front end over an [`Adapter`].
///
/// ```ignore
/// struct Page(Adapter);
///
/// impl TypedAdapter for Page {
///     const INTERFACE: &'static str = "Page";
///     fn from_adapter(adapter: Adapter) -> Self { Page(adapter) }
/// }
///
/// impl Page {
///     fn title(&self) -> AdapterResult<Option<String>> { self.0.get("getTitle") }
/// }
/// ```
pub trait TypedAdapter: Sized {
    /// Registered interface this type fronts
    const INTERFACE: &'static str;

    fn from_adapter(adapter: Adapter) -> Self;
}

/// Builds adapters from registered interfaces.
///
/// Cheap to clone; clones share the registries and configuration.
#[derive(Debug, Clone)]
pub struct AdapterFactory {
    interfaces: Arc<InterfaceRegistry>,
    services: Arc<ServiceRegistry>,
    config: Arc<EngineConfig>,
    child_filters: Arc<ChildFilters>,
}

impl AdapterFactory {
    pub fn new(interfaces: Arc<InterfaceRegistry>) -> Self {
        Self {
            interfaces,
            services: Arc::new(ServiceRegistry::new()),
            config: Arc::new(EngineConfig::default()),
            child_filters: Arc::new(ChildFilters::new()),
        }
    }

    pub fn with_services(mut self, services: ServiceRegistry) -> Self {
        self.services = Arc::new(services);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Register a child predicate that declarations select by name.
    pub fn with_child_filter(
        mut self,
        name: impl Into<String>,
        predicate: impl Fn(&Resource) -> bool + Send + Sync + 'static,
    ) -> Self {
        Arc::make_mut(&mut self.child_filters).register(name, predicate);
        self
    }

    pub fn interfaces(&self) -> &InterfaceRegistry {
        &self.interfaces
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn child_filters(&self) -> &ChildFilters {
        &self.child_filters
    }

    /// Build an adapter exposing `interface` over `resource`.
    ///
    /// Fails with `InvalidAdapterSpec` when the resource no longer exists,
    /// the interface is not registered, it declares no property, reference
    /// or child-collection accessor, or a child collection names a filter
    /// that was never registered.
    pub fn get_adapter(&self, resource: &Resource, interface: &str) -> AdapterResult<Adapter> {
        if !resource.tree().exists(resource.path()) {
            return Err(AdapterError::InvalidAdapterSpec(format!(
                "backing resource {} does not exist",
                resource.path()
            )));
        }
        let iface = self.interfaces.get(interface).ok_or_else(|| {
            AdapterError::InvalidAdapterSpec(format!("'{}' is not a registered interface", interface))
        })?;
        let adaptable = iface
            .methods()
            .iter()
            .any(|m| classify(m, &self.config).is_accessor());
        if !adaptable {
            return Err(AdapterError::InvalidAdapterSpec(format!(
                "interface '{}' declares no property, reference or child-collection accessor",
                interface
            )));
        }
        for method in iface.methods() {
            if let Some(Accessor::Children(access)) = &method.accessor {
                if let ChildFilter::Named(name) = &access.filter {
                    if !self.child_filters.contains(name) {
                        return Err(AdapterError::InvalidAdapterSpec(format!(
                            "'{}.{}' uses unregistered child filter '{}'",
                            interface, method.name, name
                        )));
                    }
                }
            }
        }
        tracing::debug!(interface, path = %resource.path(), "adapter created");
        Ok(Adapter::new(iface.clone(), resource.clone(), self.clone()))
    }

    /// Like [`AdapterFactory::get_adapter`], opening the resource by path.
    /// A missing resource is `ResourceNotFound`.
    pub fn get_adapter_at(
        &self,
        tree: Arc<dyn ResourceTree>,
        path: &str,
        interface: &str,
    ) -> AdapterResult<Adapter> {
        let resource = Resource::require(tree, path)?;
        self.get_adapter(&resource, interface)
    }

    /// Build a typed front end.
    pub fn adapt<T: TypedAdapter>(&self, resource: &Resource) -> AdapterResult<T> {
        self.get_adapter(resource, T::INTERFACE).map(T::from_adapter)
    }

    /// Turn a resource into the declared type: the handle itself, then a
    /// provider adaptation, then a nested adapter. Failures give `Null`.
    pub(crate) fn materialize(&self, resource: &Resource, declared: &ValueType) -> Value {
        if *declared == ValueType::Resource {
            tracing::debug!(path = %resource.path(), "returning resource handle");
            return Value::Resource(resource.clone());
        }

        let target = declared.target_name();
        if let Some(adapted) = resource.adapt_to(&target) {
            tracing::debug!(path = %resource.path(), %target, "returning provider adaptation");
            return Value::Object(adapted);
        }

        match self.get_adapter(resource, &target) {
            Ok(adapter) => {
                tracing::debug!(path = %resource.path(), %target, "returning nested adapter");
                Value::Adapter(adapter)
            }
            Err(e) => {
                tracing::warn!(path = %resource.path(), %target, error = %e, "cannot build nested adapter, returning null");
                Value::Null
            }
        }
    }
}
