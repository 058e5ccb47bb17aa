//! Dynamic route expansion.
//!
//! A source path segment like `[slug]` makes its route a template for many
//! routes. The placeholder's values come from the route's own metadata: a
//! list gives one route per entry, a scalar gives exactly one. Several
//! placeholders expand to their Cartesian product:
//!
//! ```text
//! content/shirts/[color]-[size]/index.md     color: [red, blue]
//!                                            size: [s, m]
//!
//!   → /shirts/red-s   /shirts/red-m   /shirts/blue-s   /shirts/blue-m
//! ```
//!
//! Every clone is a deep copy of the original subtree. The clone records each
//! placeholder's value in its `bindings` (and so do all of its descendants),
//! which is how a page rendered from `[slug].md` reads its own `slug`.
//!
//! ## Splicing
//!
//! Clones replace the original in its parent's child list. The search for the
//! original goes by source path, top down: at the first level of a subtree
//! where a direct child has that source path, every such sibling is replaced
//! by one set of clones and the search stops for that subtree. An occurrence
//! of the same source further down that subtree is left alone.

use crate::permute::cartesian_product;
use crate::route::{Metadata, RouteId, RouteTree, display_value};
use regex::{NoExpand, Regex};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("static regex"));

#[derive(Error, Debug)]
pub enum ExpandError {
    #[error("Placeholder `[{name}]` in {} has no value in the page's metadata", path.display())]
    MissingValue { name: String, path: PathBuf },
}

/// Distinct placeholder names in `path`, trimmed, in order of appearance.
pub fn placeholders(path: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for captures in PLACEHOLDER.captures_iter(path) {
        let name = captures[1].trim().to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Replace every `[name]` in `href` (whitespace inside the brackets allowed)
/// with the string form of `value`.
pub fn substitute(href: &str, name: &str, value: &Value) -> String {
    let pattern = format!(r"\[\s*{}\s*\]", regex::escape(name));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(href, NoExpand(&display_value(value))).into_owned(),
        Err(_) => href.to_string(),
    }
}

/// The value list bound to `name` for route `id`.
fn values_for(tree: &RouteTree, id: RouteId, name: &str) -> Result<Vec<Value>, ExpandError> {
    let route = tree.get(id);
    let value = route
        .resolved
        .get(name)
        .or_else(|| route.bindings.get(name))
        .ok_or_else(|| ExpandError::MissingValue {
            name: name.to_string(),
            path: route.source_path.clone().unwrap_or_default(),
        })?;
    Ok(match value {
        Value::Array(items) => items.clone(),
        single => vec![single.clone()],
    })
}

/// Build the detached clones of route `id`, one per combination of its
/// placeholder values. A route without placeholders yields itself.
pub fn instantiate(tree: &mut RouteTree, id: RouteId) -> Result<Vec<RouteId>, ExpandError> {
    let names = tree
        .relative_source(id)
        .map(|rel| placeholders(&rel))
        .unwrap_or_default();
    if names.is_empty() {
        return Ok(vec![id]);
    }

    let lists = names
        .iter()
        .map(|name| values_for(tree, id, name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut clones = Vec::new();
    for combination in cartesian_product(&lists) {
        let clone = tree.clone_subtree(id);

        let mut bindings = Metadata::new();
        let mut href = tree.get(clone).raw_href.clone();
        for (name, value) in names.iter().zip(combination) {
            href = substitute(&href, name, &value);
            bindings.insert(name.clone(), value);
        }
        tree.get_mut(clone).href = href;

        for node in tree.walk_from(clone) {
            let route = tree.get_mut(node);
            for (name, value) in &bindings {
                route.bindings.insert(name.clone(), value.clone());
            }
        }
        clones.push(clone);
    }
    Ok(clones)
}

/// Replace the routes backed by `source` under `parent` with their clones.
/// Returns whether any occurrence was found.
pub fn replace_routes_for_source(
    tree: &mut RouteTree,
    parent: RouteId,
    source: &Path,
) -> Result<bool, ExpandError> {
    let children = tree.get(parent).children.clone();
    let first = children
        .iter()
        .copied()
        .find(|&c| tree.get(c).source_path.as_deref() == Some(source));
    if let Some(first) = first {
        let clones = instantiate(tree, first)?;
        tree.splice_children(
            parent,
            |route| route.source_path.as_deref() == Some(source),
            clones,
        );
        return Ok(true);
    }

    let mut found = false;
    for child in children {
        found |= replace_routes_for_source(tree, child, source)?;
    }
    Ok(found)
}

/// One expansion pass over the whole tree. Each source path with
/// placeholders is expanded at most once.
pub fn expand_dynamic_routes(tree: &mut RouteTree) -> Result<(), ExpandError> {
    let root = tree.root();
    let mut done: HashSet<PathBuf> = HashSet::new();

    for id in tree.walk() {
        if id == root {
            continue;
        }
        let Some(rel) = tree.relative_source(id) else {
            continue;
        };
        if placeholders(&rel).is_empty() {
            continue;
        }
        let Some(source) = tree.get(id).source_path.clone() else {
            continue;
        };
        if !done.insert(source.clone()) {
            continue;
        }
        replace_routes_for_source(tree, root, &source)?;
    }
    Ok(())
}
