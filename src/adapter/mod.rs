//! Dynamic adapter dispatch
//!
//! A registered interface plus a backing resource yields an [`Adapter`]:
//! each call is classified, resolved to a tree location, fetched, cast to
//! the declared return type and memoized for the adapter's lifetime.

mod cast;
mod children;
mod classify;
mod dispatch;
mod error;
mod factory;
mod identity;
#[cfg(test)]
mod integration_tests;
mod interface;
mod primes;
mod resolve;
mod service;
mod value;

pub use cast::{cast, cast_multiple, is_assignable, CoercionError, StorageKind};
pub use children::{ChildFilters, ChildPredicate, Children, DeferredIterator};
pub use classify::{bean_name, classify, IdentityMethod, MethodCategory};
pub use dispatch::{Adapter, WeakAdapter};
pub use error::{AdapterError, AdapterResult};
pub use factory::{AdapterFactory, TypedAdapter};
pub use identity::string_hash;
pub use interface::{
    Accessor, AdapterInterface, ChildFilter, ChildrenAccess, DeclarationFile, InterfaceDecl,
    InterfaceRegistry, MethodSpec, PropertyAccess, PropertyDefault, ReferenceAccess,
    ServiceBinding, ValueType,
};
pub use primes::PRIMES;
pub use resolve::{resolve, Invocation, Target};
pub use service::{
    constructor, AuxiliaryService, ServiceConstructor, ServiceLocator, ServiceRegistry,
    StaticLocator,
};
pub use value::{FromValue, Value};
