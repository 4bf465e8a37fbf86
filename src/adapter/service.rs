//! Auxiliary services
//!
//! Methods that are not resource-backed are forwarded to a service object
//! bound per interface. Services are built by constructors that receive
//! the adapter they serve, resolved through a [`ServiceLocator`] (`pid`,
//! `filter`) or a registered implementation name.

use super::dispatch::WeakAdapter;
use super::error::{AdapterError, AdapterResult};
use super::interface::ServiceBinding;
use super::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

/// Implementation object behind a service binding.
pub trait AuxiliaryService {
    /// Handle a forwarded call. `method` is the declared method name.
    fn invoke(&self, method: &str, args: &[Value]) -> AdapterResult<Value>;
}

/// Builds a service for one adapter.
///
/// The adapter is passed weakly: the adapter caches the service, and a
/// strong handle would keep both alive forever.
pub type ServiceConstructor = Arc<dyn Fn(WeakAdapter) -> Rc<dyn AuxiliaryService> + Send + Sync>;

/// Wrap a closure returning a concrete service as a [`ServiceConstructor`].
pub fn constructor<S, F>(build: F) -> ServiceConstructor
where
    S: AuxiliaryService + 'static,
    F: Fn(WeakAdapter) -> S + Send + Sync + 'static,
{
    Arc::new(move |adapter| Rc::new(build(adapter)) as Rc<dyn AuxiliaryService>)
}

/// External lookup of service constructors.
pub trait ServiceLocator: Send + Sync {
    fn by_pid(&self, service: &str, pid: &str) -> Option<ServiceConstructor>;

    fn by_filter(&self, service: &str, filter: &str) -> AdapterResult<Option<ServiceConstructor>>;
}

struct LocatorEntry {
    service: String,
    pid: Option<String>,
    properties: BTreeMap<String, String>,
    constructor: ServiceConstructor,
}

/// A fixed set of services, registered up front.
///
/// Filters use the LDAP-style subset `(key=value)`, `(key=*)` and
/// `(&(a=1)(b=2))`.
#[derive(Default)]
pub struct StaticLocator {
    entries: Vec<LocatorEntry>,
}

impl StaticLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pid(
        mut self,
        service: impl Into<String>,
        pid: impl Into<String>,
        constructor: ServiceConstructor,
    ) -> Self {
        self.entries.push(LocatorEntry {
            service: service.into(),
            pid: Some(pid.into()),
            properties: BTreeMap::new(),
            constructor,
        });
        self
    }

    pub fn with_properties<K, V>(
        mut self,
        service: impl Into<String>,
        properties: impl IntoIterator<Item = (K, V)>,
        constructor: ServiceConstructor,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.entries.push(LocatorEntry {
            service: service.into(),
            pid: None,
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            constructor,
        });
        self
    }
}

impl ServiceLocator for StaticLocator {
    fn by_pid(&self, service: &str, pid: &str) -> Option<ServiceConstructor> {
        self.entries
            .iter()
            .find(|e| e.service == service && e.pid.as_deref() == Some(pid))
            .map(|e| e.constructor.clone())
    }

    fn by_filter(&self, service: &str, filter: &str) -> AdapterResult<Option<ServiceConstructor>> {
        let clauses = parse_filter(filter)?;
        Ok(self
            .entries
            .iter()
            .filter(|e| e.service == service)
            .find(|e| {
                clauses.iter().all(|(key, value)| match e.properties.get(*key) {
                    Some(actual) => *value == "*" || actual.as_str() == *value,
                    None => false,
                })
            })
            .map(|e| e.constructor.clone()))
    }
}

/// Parse a filter into `(key, value)` clauses that must all match.
fn parse_filter(filter: &str) -> AdapterResult<Vec<(&str, &str)>> {
    let invalid = || AdapterError::InvalidAdapterSpec(format!("unsupported service filter '{}'", filter));
    let body = filter
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(invalid)?;

    let clauses: Vec<&str> = match body.strip_prefix('&') {
        Some(rest) => {
            let mut clauses = Vec::new();
            let mut remaining = rest.trim();
            while !remaining.is_empty() {
                let inner = remaining.strip_prefix('(').ok_or_else(invalid)?;
                let end = inner.find(')').ok_or_else(invalid)?;
                clauses.push(&inner[..end]);
                remaining = inner[end + 1..].trim_start();
            }
            clauses
        }
        None => vec![body],
    };
    if clauses.is_empty() {
        return Err(invalid());
    }

    clauses
        .into_iter()
        .map(|clause| {
            let (key, value) = clause.split_once('=').ok_or_else(invalid)?;
            let key = key.trim();
            if key.is_empty() || key.contains(&['(', ')', '&', '|', '!'][..]) {
                return Err(invalid());
            }
            Ok((key, value.trim()))
        })
        .collect()
}

/// Resolves service bindings to constructors. Read-only once built.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    implementations: HashMap<String, ServiceConstructor>,
    locator: Option<Arc<dyn ServiceLocator>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named implementation for `implementation:` bindings.
    pub fn with_implementation(mut self, name: impl Into<String>, constructor: ServiceConstructor) -> Self {
        self.implementations.insert(name.into(), constructor);
        self
    }

    pub fn with_locator(mut self, locator: Arc<dyn ServiceLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Resolve a binding: `pid` first, then `filter`, then the registered
    /// `implementation`. The first lookup that succeeds wins.
    pub fn resolve(&self, binding: &ServiceBinding) -> AdapterResult<ServiceConstructor> {
        if binding.pid.is_none() && binding.filter.is_none() && binding.implementation.is_none() {
            return Err(AdapterError::InvalidAdapterSpec(format!(
                "service binding for '{}' names no pid, filter or implementation",
                binding.service
            )));
        }

        if let Some(locator) = &self.locator {
            if let Some(pid) = &binding.pid {
                if let Some(found) = locator.by_pid(&binding.service, pid) {
                    tracing::debug!(service = %binding.service, %pid, "service resolved by pid");
                    return Ok(found);
                }
            }
            if let Some(filter) = &binding.filter {
                if let Some(found) = locator.by_filter(&binding.service, filter)? {
                    tracing::debug!(service = %binding.service, %filter, "service resolved by filter");
                    return Ok(found);
                }
            }
        }

        if let Some(name) = &binding.implementation {
            if let Some(found) = self.implementations.get(name) {
                tracing::debug!(service = %binding.service, implementation = %name, "service resolved by implementation");
                return Ok(found.clone());
            }
        }

        Err(AdapterError::InvalidAdapterSpec(format!(
            "no service found for '{}'",
            binding.service
        )))
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.implementations.keys().collect();
        names.sort();
        f.debug_struct("ServiceRegistry")
            .field("implementations", &names)
            .field("locator", &self.locator.is_some())
            .finish()
    }
}
