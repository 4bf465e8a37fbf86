//! Shared fixtures for adapter integration tests
//!
//! A small site tree and the interface declarations that read it.

#![allow(dead_code)]

use serde_json::json;
use std::sync::Arc;
use treeproxy::{AdapterFactory, InterfaceRegistry, MemoryTree};

pub const SITE_DECLARATIONS: &str = r#"
interfaces:
  - name: Titled
    methods:
      - name: getTitle
        returns: String
        property: { path: "jcr:content", name: "jcr:title" }

  - name: Page
    extends: [Titled]
    methods:
      - name: getSling_resourceType
        returns: String
      - name: getLastModified
        returns: Calendar
        property: { path: "jcr:content", name: "cq:lastModified" }
      - name: getLastModifiedMillis
        returns: Long
        property: { path: "jcr:content", name: "cq:lastModified" }
      - name: isHidden
        returns: Boolean
        property: { path: "jcr:content", default: false, use_default: true }
      - name: getKeywords
        returns: "String[]"
        property: { path: "jcr:content" }
      - name: getParent
        returns: Page
        reference: { path: ".." }
      - name: getHome
        returns: Page
        reference: { path: "/content/site" }
      - name: getChildPages
        returns: Iterator
        children: { element: Page, filter: exclude_content_node }

  - name: Navigation
    methods:
      - name: getVisiblePages
        returns: Iterator
        children: { element: Page, filter: visible }

  - name: Asset
    methods:
      - name: getData
        returns: Bytes
        property: { path: "jcr:content", name: "jcr:data" }
      - name: getMimeType
        returns: String
        property: { path: "jcr:content", name: "jcr:mimeType" }
"#;

/// Build the site tree: a home page with two child pages and one asset.
pub fn site_tree() -> Arc<MemoryTree> {
    let tree = MemoryTree::from_json(&json!({
        "content": {
            "site": {
                "sling:resourceType": "site/home",
                "jcr:content": {
                    "jcr:title": "Home",
                    "cq:lastModified": {"@type": "date", "value": "2024-03-01T12:00:00+01:00"},
                    "keywords": ["welcome", "start"]
                },
                "about": {
                    "sling:resourceType": "site/page",
                    "jcr:content": {"jcr:title": "About", "hidden": true}
                },
                "news": {
                    "sling:resourceType": "site/page",
                    "jcr:content": {"jcr:title": "News"}
                }
            }
        },
        "assets": {
            "logo": {
                "jcr:content": {
                    "jcr:data": {"@type": "binary", "value": "PNG"},
                    "jcr:mimeType": "image/png"
                }
            }
        }
    }))
    .expect("site fixture is valid");
    Arc::new(tree)
}

pub fn site_registry() -> Arc<InterfaceRegistry> {
    Arc::new(InterfaceRegistry::from_yaml_str(SITE_DECLARATIONS).expect("declarations parse"))
}

pub fn site_factory() -> AdapterFactory {
    AdapterFactory::new(site_registry())
}
