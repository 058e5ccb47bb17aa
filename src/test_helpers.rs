//! Shared test utilities for the trellis test suite.
//!
//! Builds throwaway content directories and looks routes up by href.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = content_tree(&[
//!     ("index.md", "---\ntitle: Home\n---\n# Home"),
//!     ("blog/[slug].md", "---\nslug: [a, b]\n---\n"),
//! ]);
//! let mut tree = load_routes(site.path()).unwrap();
//! resolve(&mut tree, 16).unwrap();
//!
//! assert_eq!(sorted_hrefs(&tree), vec!["/", "/blog/a", "/blog/b"]);
//! assert_eq!(find_route(&tree, "/blog/a").metadata()["slug"], "a");
//! ```

use std::fs;
use tempfile::TempDir;

use crate::route::{Route, RouteId, RouteTree};

// =========================================================================
// Fixture setup
// =========================================================================

/// Write `(relative path, contents)` pairs into a fresh temp directory.
pub fn content_tree(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (rel, contents) in files {
        let path = tmp.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
    }
    tmp
}

// =========================================================================
// Route lookups (panic with the available hrefs on miss)
// =========================================================================

/// Id of the first attached route with `href`. Panics if not found.
pub fn find_route_id(tree: &RouteTree, href: &str) -> RouteId {
    tree.walk()
        .into_iter()
        .find(|&id| tree.get(id).href == href)
        .unwrap_or_else(|| {
            let hrefs = sorted_hrefs(tree);
            panic!("route '{href}' not found. Available: {hrefs:?}")
        })
}

/// First attached route with `href`. Panics if not found.
pub fn find_route<'a>(tree: &'a RouteTree, href: &str) -> &'a Route {
    tree.get(find_route_id(tree, href))
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// Every non-empty href in the tree, sorted and deduplicated.
pub fn sorted_hrefs(tree: &RouteTree) -> Vec<String> {
    tree.hrefs().into_iter().filter(|h| !h.is_empty()).collect()
}

/// Hrefs of `id`'s direct children, in child order.
pub fn child_hrefs(tree: &RouteTree, id: RouteId) -> Vec<String> {
    tree.get(id)
        .children
        .iter()
        .map(|&c| tree.get(c).href.clone())
        .collect()
}
