//! End-to-end dispatch over an in-memory tree

use super::*;
use crate::config::EngineConfig;
use crate::tree::{MemoryTree, Resource, ValueMap};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const DECLARATIONS: &str = r#"
interfaces:
  - name: Titled
    methods:
      - name: getTitle
        returns: String
        property: { path: "jcr:content", name: title }

  - name: Page
    extends: [Titled]
    methods:
      - name: getCreated
        returns: Date
      - name: getJcr_description
        returns: String
      - name: getRank
        returns: Long
        property: { default: 7, use_default: true }
      - name: getTags
        returns: "String[]"
      - name: getPages
        returns: Iterator
        children: { element: Page, filter: exclude_content_node }
      - name: getParentPage
        returns: Page
        reference: { path: ".." }
      - name: getParentResource
        returns: Resource
        reference: { path: ".." }
      - name: getProperties
        returns: Object<ValueMap>
        reference: { path: "." }
      - name: getMissing
        returns: Page
        reference: { path: "nope" }
      - name: setTitle
        params: [String]
      - name: frobnicate
        params: [Long]
      - name: setFlag

  - name: Foo
    methods:
      - name: getName
        returns: String
  - name: Bar
    methods:
      - name: getName
        returns: String
"#;

fn tree() -> Arc<MemoryTree> {
    Arc::new(
        MemoryTree::from_json(&json!({
            "a": {},
            "x": {"name": "x"},
            "p": {
                "jcr:content": {"title": "Parent"},
                "created": {"@type": "date", "value": "1970-01-01T00:00:01Z"},
                "jcr:description": "described",
                "tags": ["one", "two"],
                "c1": {"jcr:content": {"title": "First"}},
                "c2": {"jcr:content": {"title": "Second"}},
                "c3": {"jcr:content": {"title": "Third"}}
            }
        }))
        .unwrap(),
    )
}

fn factory() -> AdapterFactory {
    let registry = InterfaceRegistry::from_yaml_str(DECLARATIONS).unwrap();
    AdapterFactory::new(Arc::new(registry))
}

fn open(tree: &Arc<MemoryTree>, path: &str) -> Resource {
    tree.open(path).unwrap()
}

#[test]
fn missing_relative_resource_gives_null() {
    let tree = tree();
    let adapter = factory().get_adapter(&open(&tree, "/a"), "Titled").unwrap();
    assert_eq!(adapter.invoke("getTitle", &[]).unwrap(), Value::Null);
    assert_eq!(adapter.get::<Option<String>>("getTitle").unwrap(), None);
}

#[test]
fn calendar_property_read_as_date() {
    let tree = tree();
    let page = factory().get_adapter(&open(&tree, "/p"), "Page").unwrap();
    let created: DateTime<Utc> = page.get("getCreated").unwrap();
    assert_eq!(created, Utc.timestamp_millis_opt(1000).unwrap());
}

#[test]
fn equality_follows_interfaces_and_path() {
    let tree = tree();
    let factory = factory();
    let x = open(&tree, "/x");
    let foo = factory.get_adapter(&x, "Foo").unwrap();
    let foo2 = factory.get_adapter(&x, "Foo").unwrap();
    let bar = factory.get_adapter(&x, "Bar").unwrap();

    assert_eq!(foo.invoke("equals", &[Value::from(bar.clone())]).unwrap(), Value::Bool(false));
    assert_eq!(foo.invoke("equals", &[Value::from(foo2.clone())]).unwrap(), Value::Bool(true));
    assert_eq!(foo.invoke("equals", &[Value::from(foo.clone())]).unwrap(), Value::Bool(true));
    assert_eq!(foo.invoke("equals", &[Value::from("x")]).unwrap(), Value::Bool(false));
    assert_ne!(foo, bar);
    assert!(!foo.ptr_eq(&foo2));
}

#[test]
fn equal_adapters_hash_alike_across_factories() {
    let tree = tree();
    let x = open(&tree, "/x");
    let first = factory().get_adapter(&x, "Foo").unwrap();
    let second = factory()
        .with_config(EngineConfig::default())
        .get_adapter(&x, "Foo")
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.invoke("hashCode", &[]).unwrap(), second.invoke("hashCode", &[]).unwrap());
    assert_eq!(first.identity_hash(), second.identity_hash());

    let other_path = factory().get_adapter(&open(&tree, "/a"), "Foo").unwrap();
    assert_ne!(first, other_path);
}

#[test]
fn children_yield_adapted_elements_once() {
    let tree = tree();
    let page = factory().get_adapter(&open(&tree, "/p"), "Page").unwrap();
    let children: Children = page.get("getPages").unwrap();

    let titles: Vec<Option<String>> = children
        .clone()
        .map(|v| {
            let child = Adapter::from_value(v).unwrap();
            child.get::<Option<String>>("getTitle").unwrap()
        })
        .collect();
    assert_eq!(
        titles,
        vec![Some("First".into()), Some("Second".into()), Some("Third".into())]
    );

    assert!(!children.has_next());
    let again: Children = page.get("getPages").unwrap();
    assert_eq!(again.count(), 0);
}

const FOLDERS: &str = r#"
interfaces:
  - name: Folder
    methods:
      - name: getTitled
        returns: Iterator
        children: { element: Resource, filter: titled }
"#;

#[test]
fn named_child_filter_selects_children() {
    let tree = tree();
    tree.insert_node("/p/c4").unwrap();
    let registry = Arc::new(InterfaceRegistry::from_yaml_str(FOLDERS).unwrap());
    let factory = AdapterFactory::new(registry).with_child_filter("titled", |child: &Resource| {
        child
            .resolve("jcr:content")
            .is_some_and(|content| content.property("title").is_some())
    });

    let folder = factory.get_adapter(&open(&tree, "/p"), "Folder").unwrap();
    let children: Children = folder.get("getTitled").unwrap();
    let names: Vec<String> = children
        .map(|v| Resource::from_value(v).unwrap().name().to_string())
        .collect();
    assert_eq!(names, vec!["c1", "c2", "c3"]);
}

#[test]
fn unregistered_child_filter_is_rejected() {
    let tree = tree();
    let registry = Arc::new(InterfaceRegistry::from_yaml_str(FOLDERS).unwrap());
    let factory = AdapterFactory::new(registry);
    assert!(matches!(
        factory.get_adapter(&open(&tree, "/p"), "Folder"),
        Err(AdapterError::InvalidAdapterSpec(_))
    ));
}

#[test]
fn unrecognized_method_without_binding() {
    let tree = tree();
    let page = factory().get_adapter(&open(&tree, "/p"), "Page").unwrap();
    assert!(matches!(
        page.invoke("frobnicate", &[Value::Long(1)]),
        Err(AdapterError::NoSuchAccessor(_))
    ));
    assert!(matches!(
        page.invoke("neverDeclared", &[]),
        Err(AdapterError::NoSuchAccessor(_))
    ));
}

#[test]
fn cached_values_survive_tree_changes() {
    let tree = tree();
    let page = factory().get_adapter(&open(&tree, "/p"), "Page").unwrap();
    assert_eq!(page.get::<String>("getTitle").unwrap(), "Parent");

    tree.set_property("/p/jcr:content", "title", "Changed").unwrap();
    assert_eq!(page.get::<String>("getTitle").unwrap(), "Parent");

    let fresh = factory().get_adapter(&open(&tree, "/p"), "Page").unwrap();
    assert_eq!(fresh.get::<String>("getTitle").unwrap(), "Changed");
}

#[test]
fn cached_objects_are_identical() {
    let tree = tree();
    let page = factory().get_adapter(&open(&tree, "/p/c1"), "Page").unwrap();
    let first = page.invoke("getParentPage", &[]).unwrap();
    let second = page.invoke("getParentPage", &[]).unwrap();
    assert!(first.is_identical(&second));

    let pages = page.invoke("getPages", &[]).unwrap();
    assert!(pages.is_identical(&page.invoke("getPages", &[]).unwrap()));
}

#[test]
fn coercion_errors_are_not_null_and_not_cached() {
    let tree = tree();
    tree.set_property("/p", "rank", "high").unwrap();
    let page = factory().get_adapter(&open(&tree, "/p"), "Page").unwrap();
    assert!(matches!(page.invoke("getRank", &[]), Err(AdapterError::Coercion(_))));

    tree.set_property("/p", "rank", 3i64).unwrap();
    assert_eq!(page.get::<i64>("getRank").unwrap(), 3);
}

const STAMPED: &str = r#"
interfaces:
  - name: Stamped
    methods:
      - name: getStamp
        returns: Calendar
      - name: getStampMillis
        returns: Long
        property: { name: stamp }
      - name: getScore
        returns: Long
        property: { default: 1, use_default: true }
      - name: getScoreOrTwo
        returns: Long
        property: { name: score, default: 2, use_default: true }
"#;

fn stamped(tree: &Arc<MemoryTree>) -> Adapter {
    let registry = InterfaceRegistry::from_yaml_str(STAMPED).unwrap();
    AdapterFactory::new(Arc::new(registry))
        .get_adapter(&open(tree, "/a"), "Stamped")
        .unwrap()
}

#[test]
fn one_property_read_as_two_types_in_either_order() {
    let tree = tree();
    let stamp = Utc.timestamp_millis_opt(1000).unwrap().fixed_offset();
    tree.set_property("/a", "stamp", stamp).unwrap();

    let calendar_first = stamped(&tree);
    assert_eq!(calendar_first.invoke("getStamp", &[]).unwrap(), Value::Calendar(stamp));
    assert_eq!(calendar_first.get::<i64>("getStampMillis").unwrap(), 1000);

    let millis_first = stamped(&tree);
    assert_eq!(millis_first.get::<i64>("getStampMillis").unwrap(), 1000);
    assert_eq!(millis_first.invoke("getStamp", &[]).unwrap(), Value::Calendar(stamp));
}

#[test]
fn getters_with_different_defaults_keep_their_own() {
    let tree = tree();
    let adapter = stamped(&tree);
    assert_eq!(adapter.get::<i64>("getScore").unwrap(), 1);
    assert_eq!(adapter.get::<i64>("getScoreOrTwo").unwrap(), 2);
}

#[test]
fn defaults_apply_only_when_absent() {
    let tree = tree();
    let page = factory().get_adapter(&open(&tree, "/p"), "Page").unwrap();
    assert_eq!(page.get::<i64>("getRank").unwrap(), 7);
}

#[test]
fn convention_names_restore_namespaces() {
    let tree = tree();
    let page = factory().get_adapter(&open(&tree, "/p"), "Page").unwrap();
    assert_eq!(page.get::<String>("getJcr_description").unwrap(), "described");
}

#[test]
fn lenient_keys_match_loosely() {
    let tree = tree();
    tree.set_property("/x", "jcr:Title", "loose").unwrap();
    let registry = InterfaceRegistry::from_decls(vec![InterfaceDecl::new("Loose")
        .with_method(MethodSpec::new("getJcrtitle").returns(ValueType::String))])
    .unwrap();
    let strict = AdapterFactory::new(Arc::new(registry));
    let lenient = strict.clone().with_config(EngineConfig {
        lenient_keys: true,
        ..EngineConfig::default()
    });

    let x = open(&tree, "/x");
    assert_eq!(strict.get_adapter(&x, "Loose").unwrap().invoke("getJcrtitle", &[]).unwrap(), Value::Null);
    assert_eq!(
        lenient.get_adapter(&x, "Loose").unwrap().get::<String>("getJcrtitle").unwrap(),
        "loose"
    );
}

#[test]
fn multi_valued_properties_become_arrays() {
    let tree = tree();
    let page = factory().get_adapter(&open(&tree, "/p"), "Page").unwrap();
    let tags: Vec<String> = page.get("getTags").unwrap();
    assert_eq!(tags, vec!["one", "two"]);
}

#[test]
fn references_follow_the_adaptation_chain() {
    let tree = tree();
    let child = factory().get_adapter(&open(&tree, "/p/c1"), "Page").unwrap();

    let parent: Resource = child.get("getParentResource").unwrap();
    assert_eq!(parent.path().as_str(), "/p");

    let parent_page: Adapter = child.get("getParentPage").unwrap();
    assert!(parent_page.implements("Titled"));
    assert_eq!(parent_page.get::<String>("getTitle").unwrap(), "Parent");

    let props = child.invoke("getProperties", &[]).unwrap();
    assert!(props.downcast_ref::<ValueMap>().is_some());

    assert_eq!(child.invoke("getMissing", &[]).unwrap(), Value::Null);
}

#[test]
fn setters_and_bad_equals_fail() {
    let tree = tree();
    let page = factory().get_adapter(&open(&tree, "/p"), "Page").unwrap();
    assert!(matches!(
        page.invoke("setTitle", &[Value::from("t")]),
        Err(AdapterError::NotImplemented(_))
    ));
    assert!(matches!(page.invoke("equals", &[]), Err(AdapterError::InvalidArguments(_))));
}

#[test]
fn zero_argument_setter_is_not_implemented() {
    let tree = tree();
    let page = factory().get_adapter(&open(&tree, "/p"), "Page").unwrap();
    assert!(matches!(page.invoke("setFlag", &[]), Err(AdapterError::NotImplemented(_))));
}

#[test]
fn backing_resource_is_returned_directly() {
    let tree = tree();
    let p = open(&tree, "/p");
    let page = factory().get_adapter(&p, "Page").unwrap();
    assert_eq!(page.invoke("getBackingResource", &[]).unwrap(), Value::Resource(p));
}

#[test]
fn description_lists_getters_and_errors() {
    let tree = tree();
    tree.set_property("/p", "rank", "high").unwrap();
    let page = factory().get_adapter(&open(&tree, "/p"), "Page").unwrap();
    let text = page.get::<String>("toString").unwrap();

    assert!(text.starts_with("Implements: [Page , Titled]\nGet Method Values:"));
    assert!(text.contains("\n\tgetCreated = {1970-01-01T00:00:01.000Z}"));
    assert!(text.contains("\n\tgetTags = {[ one , two ]}"));
    assert!(text.contains("\n\tgetRank = CoercionError: cannot coerce String to Long"));
    assert!(text.contains("\n\tgetTitle = {Parent}"));
    assert!(text.contains("\n\tgetMissing = {null}"));
    assert!(!text.contains("setTitle"));
    assert!(!text.contains("frobnicate"));
    assert_eq!(text, page.to_string());
}

// ---------------------------------------------------------------------------
// Auxiliary services
// ---------------------------------------------------------------------------

const SERVICE_DECLARATIONS: &str = r#"
interfaces:
  - name: Greeter
    methods:
      - name: greet
        returns: String
        params: [String]
  - name: Person
    extends: [Greeter]
    methods:
      - name: getName
        returns: String
    services:
      - service: Greeter
        implementation: greeter.default
  - name: Orphan
    extends: [Greeter]
    methods:
      - name: getName
        returns: String
    services:
      - service: Greeter
"#;

struct Greeting {
    adapter: WeakAdapter,
}

impl AuxiliaryService for Greeting {
    fn invoke(&self, method: &str, args: &[Value]) -> AdapterResult<Value> {
        let adapter = self
            .adapter
            .upgrade()
            .ok_or_else(|| AdapterError::InvalidArguments("adapter dropped".into()))?;
        match (method, args) {
            ("greet", [Value::String(greeting)]) => {
                let name: String = adapter.get("getName")?;
                Ok(Value::String(format!("{}, {}", greeting, name)))
            }
            _ => Err(AdapterError::NoSuchAccessor(method.to_string())),
        }
    }
}

fn service_factory(built: Arc<AtomicUsize>) -> AdapterFactory {
    let registry = InterfaceRegistry::from_yaml_str(SERVICE_DECLARATIONS).unwrap();
    let services = ServiceRegistry::new().with_implementation(
        "greeter.default",
        constructor(move |adapter| {
            built.fetch_add(1, Ordering::SeqCst);
            Greeting { adapter }
        }),
    );
    AdapterFactory::new(Arc::new(registry)).with_services(services)
}

#[test]
fn unrecognized_methods_forward_to_bound_service() {
    let tree = tree();
    let built = Arc::new(AtomicUsize::new(0));
    let factory = service_factory(built.clone());
    let person = factory.get_adapter(&open(&tree, "/x"), "Person").unwrap();

    assert_eq!(
        person.call::<String>("greet", &[Value::from("Hello")]).unwrap(),
        "Hello, x"
    );
    assert_eq!(
        person.call::<String>("greet", &[Value::from("Hi")]).unwrap(),
        "Hi, x"
    );
    assert_eq!(built.load(Ordering::SeqCst), 1);

    let other = factory.get_adapter(&open(&tree, "/x"), "Person").unwrap();
    other.call::<String>("greet", &[Value::from("Hey")]).unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn underspecified_binding_fails_at_first_access() {
    let tree = tree();
    let factory = service_factory(Arc::new(AtomicUsize::new(0)));
    let orphan = factory.get_adapter(&open(&tree, "/x"), "Orphan").unwrap();
    assert_eq!(orphan.get::<String>("getName").unwrap(), "x");
    assert!(matches!(
        orphan.invoke("greet", &[Value::from("Hello")]),
        Err(AdapterError::InvalidAdapterSpec(_))
    ));
}

#[test]
fn services_do_not_keep_adapters_alive() {
    let tree = tree();
    let factory = service_factory(Arc::new(AtomicUsize::new(0)));
    let person = factory.get_adapter(&open(&tree, "/x"), "Person").unwrap();
    person.call::<String>("greet", &[Value::from("Hello")]).unwrap();

    let weak = person.downgrade();
    drop(person);
    assert!(weak.upgrade().is_none());
}

#[test]
fn typed_struct_forwards_to_dispatcher() {
    struct Page(Adapter);

    impl TypedAdapter for Page {
        const INTERFACE: &'static str = "Page";

        fn from_adapter(adapter: Adapter) -> Self {
            Self(adapter)
        }
    }

    impl Page {
        fn title(&self) -> AdapterResult<Option<String>> {
            self.0.get("getTitle")
        }

        fn tags(&self) -> AdapterResult<Vec<String>> {
            self.0.get("getTags")
        }
    }

    let tree = tree();
    let page: Page = factory().adapt(&open(&tree, "/p")).unwrap();
    assert_eq!(page.title().unwrap().as_deref(), Some("Parent"));
    assert_eq!(page.tags().unwrap().len(), 2);
}
