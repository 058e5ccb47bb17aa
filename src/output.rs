//! CLI output formatting for the pipeline stages.
//!
//! # Information-First Display
//!
//! Output is **route-centric, not file-centric**. Each route leads with its
//! positional index and public href; the backing file and any placeholder
//! bindings follow as indented context lines. Structural directories (no
//! index file) show up as `(directory)` so the tree shape stays visible.
//!
//! # Output Format
//!
//! ## Routes
//!
//! ```text
//! Routes
//! 001 / (markdown)
//!     Source: index.md
//!     001 /tags/rust (html)
//!         Source: tags/[tag].html
//!         Bindings: tag=rust
//!     002 (directory)
//!         001 /static/logo.png (copy)
//!             Source: static/logo.png
//!
//! 3 routes: 2 pages, 1 asset
//! ```
//!
//! ## Generate
//!
//! ```text
//! / → index.html
//! /tags/rust → tags/rust/index.html
//! /static/logo.png → static/logo.png (copied)
//!
//! Generated 2 pages, 1 asset
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::generate::Generated;
use crate::route::{PageKind, RouteId, RouteTree, display_value};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn kind_label(kind: Option<PageKind>) -> &'static str {
    match kind {
        Some(PageKind::Markdown) => "markdown",
        Some(PageKind::Html) => "html",
        Some(PageKind::Copy) => "copy",
        None => "directory",
    }
}

/// `1 page`, `3 pages`.
fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

// ============================================================================
// Route tree
// ============================================================================

/// Format the resolved route tree, one entry per node.
pub fn format_route_tree(tree: &RouteTree) -> Vec<String> {
    let mut lines = vec!["Routes".to_string()];

    let root = tree.root();
    let mut depth = 0;
    if tree.get(root).is_renderable() {
        format_route(tree, root, 1, 0, &mut lines);
        depth = 1;
    }
    for (i, &child) in tree.get(root).children.iter().enumerate() {
        format_subtree(tree, child, i + 1, depth, &mut lines);
    }

    let (mut pages, mut assets) = (0, 0);
    for id in tree.walk() {
        let route = tree.get(id);
        if !route.is_renderable() {
            continue;
        }
        if route.kind.is_some_and(PageKind::is_page) {
            pages += 1;
        } else {
            assets += 1;
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "{}: {}, {}",
        count(pages + assets, "route"),
        count(pages, "page"),
        count(assets, "asset")
    ));
    lines
}

fn format_subtree(
    tree: &RouteTree,
    id: RouteId,
    position: usize,
    depth: usize,
    lines: &mut Vec<String>,
) {
    format_route(tree, id, position, depth, lines);
    for (i, &child) in tree.get(id).children.iter().enumerate() {
        format_subtree(tree, child, i + 1, depth + 1, lines);
    }
}

fn format_route(
    tree: &RouteTree,
    id: RouteId,
    position: usize,
    depth: usize,
    lines: &mut Vec<String>,
) {
    let route = tree.get(id);
    let base = indent(depth);
    if !route.is_renderable() {
        lines.push(format!("{}{} (directory)", base, format_index(position)));
        return;
    }
    lines.push(format!(
        "{}{} {} ({})",
        base,
        format_index(position),
        route.href,
        kind_label(route.kind)
    ));
    if let Some(source) = tree.relative_source(id) {
        lines.push(format!("{}    Source: {}", base, source));
    }
    if !route.bindings.is_empty() {
        let bindings: Vec<String> = route
            .bindings
            .iter()
            .map(|(name, value)| format!("{}={}", name, display_value(value)))
            .collect();
        lines.push(format!("{}    Bindings: {}", base, bindings.join(", ")));
    }
}

/// Print the route tree to stdout.
pub fn print_route_tree(tree: &RouteTree) {
    for line in format_route_tree(tree) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate output
// ============================================================================

/// Format generate stage output: each href followed by `→` and the file it
/// produced, relative to the output directory.
pub fn format_generate_output(generated: &[Generated], output_dir: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pages = 0;

    for item in generated {
        let rel = item
            .output
            .strip_prefix(output_dir)
            .unwrap_or(&item.output)
            .display();
        if item.kind.is_page() {
            pages += 1;
            lines.push(format!("{} \u{2192} {}", item.href, rel));
        } else {
            lines.push(format!("{} \u{2192} {} (copied)", item.href, rel));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Generated {}, {}",
        count(pages, "page"),
        count(generated.len() - pages, "asset")
    ));
    lines
}

/// Print generate output to stdout.
pub fn print_generate_output(generated: &[Generated], output_dir: &Path) {
    for line in format_generate_output(generated, output_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
