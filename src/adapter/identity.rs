//! Adapter identity: string form, hash and equality
//!
//! Identity is the exposed interface set plus the backing resource path.
//! Two adapters built separately over the same path through the same
//! interface are equal and hash alike.

use super::classify::{classify, MethodCategory};
use super::dispatch::Adapter;
use super::primes::PRIMES;
use super::value::Value;
use std::fmt::Write;

/// Stands in for the dispatcher's class identity in the hash.
const DISPATCHER_NAME: &str = "treeproxy::adapter::Adapter";

/// Polynomial string hash with multiplier 31, wrapping.
pub fn string_hash(s: &str) -> i64 {
    let multiplier = i64::from(PRIMES[11]);
    s.chars()
        .fold(0i64, |h, c| h.wrapping_mul(multiplier).wrapping_add(c as i64))
}

/// `dispatcher * p2 + interfaces * p3 + path`, with the interface hash
/// folded over the sorted exposed names.
pub fn identity_hash(adapter: &Adapter) -> i64 {
    let first = i64::from(PRIMES[2]);
    let second = i64::from(PRIMES[3]);
    let interfaces = adapter
        .interfaces()
        .iter()
        .fold(0i64, |h, name| h.wrapping_mul(first).wrapping_add(string_hash(name)));
    string_hash(DISPATCHER_NAME)
        .wrapping_mul(first)
        .wrapping_add(interfaces.wrapping_mul(second))
        .wrapping_add(string_hash(adapter.path()))
}

/// Same exposed interfaces and the same backing path.
pub fn same_identity(a: &Adapter, b: &Adapter) -> bool {
    a.ptr_eq(b) || (a.interfaces() == b.interfaces() && a.path() == b.path())
}

/// The `equals` method: `false` for anything that is not an adapter.
pub fn equals(adapter: &Adapter, other: &Value) -> bool {
    match other {
        Value::Adapter(other) => same_identity(adapter, other),
        _ => false,
    }
}

/// Interface names followed by the value of every zero-argument getter.
/// A getter that fails is listed as `<error-kind>: <message>`.
pub fn describe(adapter: &Adapter) -> String {
    let mut out = String::new();
    let names: Vec<&str> = adapter.interfaces().iter().map(String::as_str).collect();
    let _ = writeln!(out, "Implements: [{}]", names.join(" , "));
    out.push_str("Get Method Values:");

    let config = adapter.factory().config();
    for method in adapter.interface().methods() {
        let category = classify(method, config);
        let listed = method.params.is_empty()
            && (category.is_accessor() || category == MethodCategory::BackingResource);
        if !listed {
            continue;
        }
        let _ = match adapter.invoke(&method.name, &[]) {
            Ok(value) => write!(out, "\n\t{} = {{{}}}", method.name, value),
            Err(e) => write!(out, "\n\t{} = {}: {}", method.name, e.kind(), e),
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_hash_matches_polynomial() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("ab"), 97 * 31 + 98);
        assert_ne!(string_hash("/a/b"), string_hash("/b/a"));
    }
}
