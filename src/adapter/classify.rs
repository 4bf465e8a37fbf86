//! Method classification
//!
//! Accessor metadata wins over naming convention. Without metadata a
//! method is classified by its exact name (identity and backing-resource
//! methods) or by the bean-style `get`/`is`/`set` prefixes.

use super::interface::{Accessor, MethodSpec};
use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityMethod {
    ToString,
    HashCode,
    Equals,
}

impl IdentityMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "toString" => Some(Self::ToString),
            "hashCode" => Some(Self::HashCode),
            "equals" => Some(Self::Equals),
            _ => None,
        }
    }
}

/// Semantic category of an invoked method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodCategory {
    Identity(IdentityMethod),
    BackingResource,
    PropertyGetter,
    PropertySetter,
    ReferenceGetter,
    ChildCollectionGetter,
    Unrecognized,
}

impl MethodCategory {
    /// Property, reference and child-collection getters: the categories
    /// that make an interface adaptable.
    pub fn is_accessor(&self) -> bool {
        matches!(
            self,
            Self::PropertyGetter | Self::ReferenceGetter | Self::ChildCollectionGetter
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity(IdentityMethod::ToString) => "Identity.ToString",
            Self::Identity(IdentityMethod::HashCode) => "Identity.HashCode",
            Self::Identity(IdentityMethod::Equals) => "Identity.Equals",
            Self::BackingResource => "BackingResourceAccessor",
            Self::PropertyGetter => "PropertyGetter",
            Self::PropertySetter => "PropertySetter",
            Self::ReferenceGetter => "ReferenceGetter",
            Self::ChildCollectionGetter => "ChildCollectionGetter",
            Self::Unrecognized => "Unrecognized",
        }
    }
}

impl std::fmt::Display for MethodCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

pub fn classify(method: &MethodSpec, config: &EngineConfig) -> MethodCategory {
    match &method.accessor {
        Some(Accessor::Reference(_)) => return MethodCategory::ReferenceGetter,
        Some(Accessor::Children(_)) => return MethodCategory::ChildCollectionGetter,
        Some(Accessor::Property(_)) => {
            return if is_setter(method) {
                MethodCategory::PropertySetter
            } else {
                MethodCategory::PropertyGetter
            };
        }
        None => {}
    }

    if let Some(identity) = IdentityMethod::from_name(&method.name) {
        return MethodCategory::Identity(identity);
    }
    if method.name == config.backing_resource_method {
        return MethodCategory::BackingResource;
    }
    if is_getter(method) {
        return MethodCategory::PropertyGetter;
    }
    if is_setter(method) {
        return MethodCategory::PropertySetter;
    }
    MethodCategory::Unrecognized
}

/// Property name derived from a bean-style method name: the prefix is
/// dropped and the next character lowercased (`getJcr_title` gives
/// `jcr_title`). `None` when the name has no bean prefix.
pub fn bean_name(method_name: &str) -> Option<String> {
    let rest = ["get", "is", "set"]
        .iter()
        .find_map(|prefix| bean_suffix(method_name, prefix))?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    let mut name = String::with_capacity(rest.len());
    name.extend(first.to_lowercase());
    name.push_str(chars.as_str());
    Some(name)
}

fn bean_suffix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(prefix)?;
    let first = rest.chars().next()?;
    let valid = first.is_uppercase() && rest.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then_some(rest)
}

fn is_getter(method: &MethodSpec) -> bool {
    method.params.is_empty()
        && method.returns.is_some()
        && (bean_suffix(&method.name, "get").is_some() || bean_suffix(&method.name, "is").is_some())
}

/// Setters are recognized by name alone, whatever their arity.
fn is_setter(method: &MethodSpec) -> bool {
    bean_suffix(&method.name, "set").is_some()
}
