//! Path and key resolution
//!
//! Pure address computation: no tree access happens here.

use super::classify::{bean_name, classify, MethodCategory};
use super::error::{AdapterError, AdapterResult};
use super::interface::{Accessor, MethodSpec, ValueType};
use super::value::Value;
use crate::config::EngineConfig;
use crate::tree::SEPARATOR;

/// Where an accessor looks, and the cache slot its result lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Resource path: empty for the backing resource
    pub path: String,
    /// Property key; empty for references and child collections
    pub key: String,
    pub is_absolute: bool,
    pub is_relative: bool,
    /// Key came from the method name rather than explicit metadata
    pub derived: bool,
    pub cache_key: String,
}

impl Target {
    fn new(path: String, key: String, derived: bool, cache_key: String) -> Self {
        let is_absolute = path.starts_with(SEPARATOR);
        let is_relative = !path.is_empty() && !is_absolute;
        Self {
            path,
            key,
            is_absolute,
            is_relative,
            derived,
            cache_key,
        }
    }
}

/// One method call, classified and resolved. Lives for a single dispatch.
#[derive(Debug)]
pub struct Invocation<'a> {
    pub method: &'a MethodSpec,
    pub args: &'a [Value],
    pub category: MethodCategory,
    pub target: Option<Target>,
}

impl<'a> Invocation<'a> {
    pub fn new(method: &'a MethodSpec, args: &'a [Value], config: &EngineConfig) -> AdapterResult<Self> {
        let category = classify(method, config);
        let target = resolve(method, category, config)?;
        Ok(Self {
            method,
            args,
            category,
            target,
        })
    }

    /// The resolved target of an accessor category.
    pub fn target(&self) -> AdapterResult<&Target> {
        self.target.as_ref().ok_or_else(|| {
            AdapterError::InvalidAdapterSpec(format!(
                "method '{}' ({}) has no resolvable target",
                self.method.name, self.category
            ))
        })
    }
}

/// Compute the target of a property, reference or child-collection method.
/// Other categories have no target.
pub fn resolve(
    method: &MethodSpec,
    category: MethodCategory,
    config: &EngineConfig,
) -> AdapterResult<Option<Target>> {
    match (category, &method.accessor) {
        (MethodCategory::PropertyGetter | MethodCategory::PropertySetter, accessor) => {
            let (path, name) = match accessor {
                Some(Accessor::Property(access)) => (access.path.trim(), access.name.trim()),
                _ => ("", ""),
            };
            resolve_property(method, path, name, config).map(Some)
        }
        (MethodCategory::ReferenceGetter, Some(Accessor::Reference(access))) => {
            let path = access.path.trim().to_string();
            let cache_key = format!("@reference:{}:{}", method.name, path);
            Ok(Some(Target::new(path, String::new(), false, cache_key)))
        }
        (MethodCategory::ChildCollectionGetter, Some(Accessor::Children(access))) => {
            let path = access.path.trim().to_string();
            let cache_key = format!("@children:{}:{}", method.name, path);
            Ok(Some(Target::new(path, String::new(), false, cache_key)))
        }
        _ => Ok(None),
    }
}

fn resolve_property(
    method: &MethodSpec,
    path: &str,
    name: &str,
    config: &EngineConfig,
) -> AdapterResult<Target> {
    let (key, derived) = if name.is_empty() {
        let derived = bean_name(&method.name)
            .map(|n| n.replace(config.namespace_placeholder, &config.namespace_separator.to_string()))
            .unwrap_or_default();
        (derived, true)
    } else {
        (name.to_string(), false)
    };
    if key.is_empty() {
        return Err(AdapterError::InvalidAdapterSpec(format!(
            "method '{}' has no property name and none can be derived from it",
            method.name
        )));
    }

    // A key with separators addresses a property on a descendant.
    let (path, key) = match key.rfind(SEPARATOR) {
        Some(idx) => {
            let (prefix, leaf) = (&key[..idx], &key[idx + 1..]);
            let joined = if prefix.is_empty() {
                SEPARATOR.to_string()
            } else if path.is_empty() || prefix.starts_with(SEPARATOR) {
                prefix.to_string()
            } else {
                format!("{}{}{}", path.trim_end_matches(SEPARATOR), SEPARATOR, prefix)
            };
            (joined, leaf.to_string())
        }
        None => (path.to_string(), key),
    };
    if key.is_empty() {
        return Err(AdapterError::InvalidAdapterSpec(format!(
            "method '{}' resolves to an empty property name",
            method.name
        )));
    }

    // Getters reading one property as different types, or with different
    // defaults, must not share a cache slot.
    let location = if path.is_empty() {
        key.clone()
    } else {
        format!("{}{}{}", path.trim_end_matches(SEPARATOR), SEPARATOR, key)
    };
    let declared = method.returns.as_ref().unwrap_or(&ValueType::String);
    let cache_key = match &method.accessor {
        Some(Accessor::Property(access)) if access.use_default => {
            format!("{}#{}?{:?}", location, declared, access.default)
        }
        _ => format!("{}#{}", location, declared),
    };
    Ok(Target::new(path, key, derived, cache_key))
}
