//! Declarative adapter interfaces
//!
//! An interface is a table of method declarations, each optionally carrying
//! accessor metadata (`property`, `reference` or `children`). Declarations
//! are plain serde types so they can be written in YAML:
//!
//! ```yaml
//! interfaces:
//!   - name: Page
//!     extends: [Titled]
//!     methods:
//!       - name: getTitle
//!         returns: String
//!         property: { path: "jcr:content", name: "jcr:title" }
//!       - name: getPages
//!         returns: Iterator
//!         children: { element: Page, filter: exclude_content_node }
//! ```
//!
//! Registration resolves `extends` into a flat method table and the exposed
//! interface set used for adapter identity.

use super::error::{AdapterError, AdapterResult};
use crate::config::{ConfigError, ConfigResult};
use crate::tree::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Declared types
// ---------------------------------------------------------------------------

/// A declared parameter or return type.
///
/// Written as a string: `Long`, `Long[]`, `Calendar`, `Stream`, `Resource`,
/// `Iterator`, `Object<ValueMap>` for provider objects, and any other name
/// (or `Adapter<Name>`) for a nested adapter interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    Boolean,
    Long,
    Double,
    String,
    Name,
    Path,
    Reference,
    Calendar,
    Date,
    Stream,
    Bytes,
    Resource,
    Children,
    Array(Box<ValueType>),
    Adapter(String),
    Object(String),
}

impl ValueType {
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// The name passed to provider adaptation and nested adapter lookup.
    pub fn target_name(&self) -> String {
        match self {
            Self::Adapter(name) | Self::Object(name) => name.clone(),
            other => other.to_string(),
        }
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(element) = s.strip_suffix("[]") {
            return Ok(Self::Array(Box::new(element.parse()?)));
        }
        if let Some(inner) = generic_arg(s, "Adapter") {
            return Ok(Self::Adapter(identifier(inner)?));
        }
        if let Some(inner) = generic_arg(s, "Object") {
            return Ok(Self::Object(identifier(inner)?));
        }
        let parsed = match s {
            "Boolean" | "boolean" | "bool" => Self::Boolean,
            "Long" | "long" | "i64" | "Integer" | "int" => Self::Long,
            "Double" | "double" | "f64" => Self::Double,
            "String" | "string" => Self::String,
            "Name" => Self::Name,
            "Path" => Self::Path,
            "Reference" => Self::Reference,
            "Calendar" => Self::Calendar,
            "Date" => Self::Date,
            "Stream" | "InputStream" => Self::Stream,
            "Bytes" | "bytes" => Self::Bytes,
            "Resource" => Self::Resource,
            "Iterator" | "Children" => Self::Children,
            other => Self::Adapter(identifier(other)?),
        };
        Ok(parsed)
    }
}

fn generic_arg<'a>(s: &'a str, outer: &str) -> Option<&'a str> {
    s.strip_prefix(outer)?.strip_prefix('<')?.strip_suffix('>')
}

fn identifier(s: &str) -> Result<String, String> {
    let s = s.trim();
    let valid = !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(s.to_string())
    } else {
        Err(format!("invalid type name '{}'", s))
    }
}

impl TryFrom<String> for ValueType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ValueType> for String {
    fn from(t: ValueType) -> Self {
        t.to_string()
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean => f.write_str("Boolean"),
            Self::Long => f.write_str("Long"),
            Self::Double => f.write_str("Double"),
            Self::String => f.write_str("String"),
            Self::Name => f.write_str("Name"),
            Self::Path => f.write_str("Path"),
            Self::Reference => f.write_str("Reference"),
            Self::Calendar => f.write_str("Calendar"),
            Self::Date => f.write_str("Date"),
            Self::Stream => f.write_str("Stream"),
            Self::Bytes => f.write_str("Bytes"),
            Self::Resource => f.write_str("Resource"),
            Self::Children => f.write_str("Iterator"),
            Self::Array(element) => write!(f, "{}[]", element),
            Self::Adapter(name) => f.write_str(name),
            Self::Object(name) => write!(f, "Object<{}>", name),
        }
    }
}

// ---------------------------------------------------------------------------
// Accessor metadata
// ---------------------------------------------------------------------------

/// Default for an absent property, cast to the declared type when used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyDefault {
    Boolean(bool),
    Long(i64),
    Double(f64),
    String(String),
    Strings(Vec<String>),
}

impl PropertyDefault {
    pub fn to_property_value(&self) -> PropertyValue {
        match self {
            Self::Boolean(b) => PropertyValue::Boolean(*b),
            Self::Long(v) => PropertyValue::Long(*v),
            Self::Double(v) => PropertyValue::Double(*v),
            Self::String(s) => PropertyValue::String(s.clone()),
            Self::Strings(items) => {
                PropertyValue::Multi(items.iter().cloned().map(PropertyValue::String).collect())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyAccess {
    /// Resource holding the property: empty for the backing resource
    pub path: String,
    /// Property key; empty derives it from the method name
    pub name: String,
    pub default: Option<PropertyDefault>,
    pub use_default: bool,
}

impl PropertyAccess {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_default(mut self, default: PropertyDefault) -> Self {
        self.default = Some(default);
        self.use_default = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceAccess {
    pub path: String,
}

/// Which children a child-collection accessor yields.
///
/// Written as a bare string: `all`, `exclude_content_node`, or the name of
/// a predicate registered with [`AdapterFactory::with_child_filter`].
///
/// [`AdapterFactory::with_child_filter`]: super::AdapterFactory::with_child_filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChildFilter {
    #[default]
    All,
    /// Skip the content node child
    ExcludeContentNode,
    /// Registered predicate, looked up by name
    Named(String),
}

impl ChildFilter {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl From<String> for ChildFilter {
    fn from(name: String) -> Self {
        match name.trim() {
            "" | "all" => Self::All,
            "exclude_content_node" => Self::ExcludeContentNode,
            other => Self::Named(other.to_string()),
        }
    }
}

impl From<ChildFilter> for String {
    fn from(filter: ChildFilter) -> Self {
        match filter {
            ChildFilter::All => "all".to_string(),
            ChildFilter::ExcludeContentNode => "exclude_content_node".to_string(),
            ChildFilter::Named(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildrenAccess {
    /// Parent of the children: empty for the backing resource
    pub path: String,
    pub element: ValueType,
    pub filter: ChildFilter,
}

impl Default for ChildrenAccess {
    fn default() -> Self {
        Self {
            path: String::new(),
            element: ValueType::Resource,
            filter: ChildFilter::All,
        }
    }
}

/// Accessor metadata attached to a method declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    Property(PropertyAccess),
    Reference(ReferenceAccess),
    Children(ChildrenAccess),
}

impl Accessor {
    pub fn property(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Property(PropertyAccess::new(path, name))
    }

    pub fn reference(path: impl Into<String>) -> Self {
        Self::Reference(ReferenceAccess { path: path.into() })
    }

    pub fn children(path: impl Into<String>, element: ValueType) -> Self {
        Self::Children(ChildrenAccess {
            path: path.into(),
            element,
            filter: ChildFilter::All,
        })
    }
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// One declared method.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "MethodDecl")]
pub struct MethodSpec {
    pub name: String,
    pub params: Vec<ValueType>,
    pub returns: Option<ValueType>,
    pub accessor: Option<Accessor>,
    /// Interface the method was declared in; filled at registration
    pub declared_in: String,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
            accessor: None,
            declared_in: String::new(),
        }
    }

    pub fn returns(mut self, returns: ValueType) -> Self {
        self.returns = Some(returns);
        self
    }

    pub fn with_param(mut self, param: ValueType) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_accessor(mut self, accessor: Accessor) -> Self {
        self.accessor = Some(accessor);
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Wire form of a method: at most one of the accessor keys may be set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MethodDecl {
    name: String,
    #[serde(default)]
    params: Vec<ValueType>,
    #[serde(default)]
    returns: Option<ValueType>,
    #[serde(default)]
    property: Option<PropertyAccess>,
    #[serde(default)]
    reference: Option<ReferenceAccess>,
    #[serde(default)]
    children: Option<ChildrenAccess>,
}

impl TryFrom<MethodDecl> for MethodSpec {
    type Error = String;

    fn try_from(decl: MethodDecl) -> Result<Self, Self::Error> {
        let mut accessors = decl
            .property
            .map(Accessor::Property)
            .into_iter()
            .chain(decl.reference.map(Accessor::Reference))
            .chain(decl.children.map(Accessor::Children));
        let accessor = accessors.next();
        if accessors.next().is_some() {
            return Err(format!(
                "method '{}' declares more than one of property, reference, children",
                decl.name
            ));
        }
        Ok(Self {
            name: decl.name,
            params: decl.params,
            returns: decl.returns,
            accessor,
            declared_in: String::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------

/// Binds the non-resource methods of one interface to a service.
///
/// Lookup order is `pid`, then `filter`, then `implementation`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBinding {
    /// Interface whose methods are forwarded
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
}

impl ServiceBinding {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    pub fn with_pid(mut self, pid: impl Into<String>) -> Self {
        self.pid = Some(pid.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_implementation(mut self, implementation: impl Into<String>) -> Self {
        self.implementation = Some(implementation.into());
        self
    }
}

/// An interface as declared, before `extends` is resolved.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceDecl {
    pub name: String,
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
    #[serde(default)]
    pub services: Vec<ServiceBinding>,
}

impl InterfaceDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: Vec::new(),
            methods: Vec::new(),
            services: Vec::new(),
        }
    }

    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.extends.push(parent.into());
        self
    }

    pub fn with_method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_service(mut self, binding: ServiceBinding) -> Self {
        self.services.push(binding);
        self
    }
}

/// Top level of a declaration file.
#[derive(Debug, Clone, Deserialize)]
pub struct DeclarationFile {
    pub interfaces: Vec<InterfaceDecl>,
}

/// A registered interface with inheritance flattened.
#[derive(Debug, Clone)]
pub struct AdapterInterface {
    name: String,
    exposed: BTreeSet<String>,
    methods: Vec<MethodSpec>,
    services: Vec<ServiceBinding>,
}

impl AdapterInterface {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This interface plus everything it transitively extends.
    pub fn exposed(&self) -> &BTreeSet<String> {
        &self.exposed
    }

    /// Own methods first, then inherited ones in `extends` order.
    pub fn methods(&self) -> &[MethodSpec] {
        &self.methods
    }

    pub fn method(&self, name: &str, arity: usize) -> Option<&MethodSpec> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.arity() == arity)
    }

    pub fn services(&self) -> &[ServiceBinding] {
        &self.services
    }

    /// The service binding covering methods declared in `interface`.
    pub fn binding_for(&self, interface: &str) -> Option<&ServiceBinding> {
        self.services.iter().find(|b| b.service == interface)
    }
}

/// Registered interfaces by name. Read-only once built, shared via `Arc`.
#[derive(Debug, Clone, Default)]
pub struct InterfaceRegistry {
    interfaces: BTreeMap<String, Arc<AdapterInterface>>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one declaration. Every interface it extends must already be
    /// registered.
    pub fn register(&mut self, decl: InterfaceDecl) -> AdapterResult<Arc<AdapterInterface>> {
        let InterfaceDecl {
            name,
            extends,
            methods,
            services,
        } = decl;

        if identifier(&name).is_err() {
            return Err(AdapterError::InvalidAdapterSpec(format!(
                "invalid interface name '{}'",
                name
            )));
        }
        if self.interfaces.contains_key(&name) {
            return Err(AdapterError::InvalidAdapterSpec(format!(
                "interface '{}' is already registered",
                name
            )));
        }

        let mut exposed = BTreeSet::from([name.clone()]);
        let mut parents = Vec::with_capacity(extends.len());
        for parent in &extends {
            let resolved = self.interfaces.get(parent).ok_or_else(|| {
                AdapterError::InvalidAdapterSpec(format!(
                    "interface '{}' extends unknown interface '{}'",
                    name, parent
                ))
            })?;
            exposed.extend(resolved.exposed.iter().cloned());
            parents.push(resolved.clone());
        }

        let mut table: Vec<MethodSpec> = Vec::with_capacity(methods.len());
        for mut method in methods {
            validate_method(&name, &method)?;
            if table
                .iter()
                .any(|m| m.name == method.name && m.arity() == method.arity())
            {
                return Err(AdapterError::InvalidAdapterSpec(format!(
                    "interface '{}' declares '{}' with {} parameter(s) twice",
                    name,
                    method.name,
                    method.arity()
                )));
            }
            method.declared_in = name.clone();
            table.push(method);
        }

        let mut bindings = Vec::with_capacity(services.len());
        for binding in services {
            if !exposed.contains(&binding.service) {
                return Err(AdapterError::InvalidAdapterSpec(format!(
                    "interface '{}' binds service '{}' it does not extend",
                    name, binding.service
                )));
            }
            bindings.push(binding);
        }

        for parent in &parents {
            for inherited in &parent.methods {
                let shadowed = table
                    .iter()
                    .any(|m| m.name == inherited.name && m.arity() == inherited.arity());
                if !shadowed {
                    table.push(inherited.clone());
                }
            }
            for binding in &parent.services {
                if !bindings.iter().any(|b| b.service == binding.service) {
                    bindings.push(binding.clone());
                }
            }
        }

        let interface = Arc::new(AdapterInterface {
            name: name.clone(),
            exposed,
            methods: table,
            services: bindings,
        });
        self.interfaces.insert(name, interface.clone());
        Ok(interface)
    }

    /// Register declarations in any order; parents are registered before
    /// the interfaces that extend them.
    pub fn from_decls(decls: Vec<InterfaceDecl>) -> AdapterResult<Self> {
        let mut registry = Self::new();
        let mut pending = decls;
        while !pending.is_empty() {
            let (ready, waiting): (Vec<_>, Vec<_>) = pending.into_iter().partition(|decl| {
                decl.extends
                    .iter()
                    .all(|parent| registry.interfaces.contains_key(parent))
            });
            if ready.is_empty() {
                let names: Vec<_> = waiting.iter().map(|d| d.name.as_str()).collect();
                return Err(AdapterError::InvalidAdapterSpec(format!(
                    "unresolvable extends (unknown parent or cycle): {}",
                    names.join(", ")
                )));
            }
            for decl in ready {
                registry.register(decl)?;
            }
            pending = waiting;
        }
        Ok(registry)
    }

    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let file: DeclarationFile = serde_yaml::from_str(yaml)?;
        Ok(Self::from_decls(file.interfaces)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_yaml_str(&text)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<AdapterInterface>> {
        self.interfaces.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.interfaces.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

fn validate_method(interface: &str, method: &MethodSpec) -> AdapterResult<()> {
    if method.name.trim().is_empty() {
        return Err(AdapterError::InvalidAdapterSpec(format!(
            "interface '{}' declares a method without a name",
            interface
        )));
    }
    if let Some(Accessor::Reference(access)) = &method.accessor {
        if access.path.trim().is_empty() {
            return Err(AdapterError::InvalidAdapterSpec(format!(
                "reference '{}.{}' needs a path",
                interface, method.name
            )));
        }
    }
    Ok(())
}
