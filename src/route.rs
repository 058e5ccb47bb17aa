//! The route tree: one node per output path.
//!
//! Routes live in an arena ([`RouteTree`]) and refer to their children by
//! [`RouteId`]. The dynamic-route expander replaces a node with N clones by
//! rewriting its parent's child list, so nothing ever holds a reference into
//! the tree across a rewrite. Nodes that get spliced out stay in the arena,
//! detached; only nodes reachable from the root are part of the site.
//!
//! ## Href rules
//!
//! | Source | Href |
//! |--------|------|
//! | `content/index.md` | `/` |
//! | `content/blog/index.html` | `/blog` |
//! | `content/blog/hello.md` | `/blog/hello` |
//! | `content/static/logo.png` | `/static/logo.png` |
//! | `content/drafts/` (no index file) | empty: structural only, never rendered |
//!
//! ## Metadata layers
//!
//! Each route carries three maps:
//!
//! - `front_matter`: decoded verbatim from the source file, never mutated.
//! - `resolved`: `front_matter` with every `{{ ... }}` expression evaluated.
//!   Rebuilt from scratch on every fixed-point iteration.
//! - `bindings`: placeholder values assigned when this route was produced by
//!   expanding a `[name]` segment (or inherited from an expanded ancestor).
//!
//! [`Route::metadata`] merges the last two, bindings winning, and is what
//! templates see.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Arbitrary JSON-shaped page metadata.
pub type Metadata = serde_json::Map<String, Value>;

/// File extensions rendered through the markdown converter.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];
/// File extensions rendered as page templates.
pub const HTML_EXTENSIONS: &[&str] = &["html", "htm"];

/// Stable handle to a node in a [`RouteTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(usize);

/// How the render stage treats a route's source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    /// Markdown converted to HTML, then rendered as a page template.
    Markdown,
    /// Rendered directly as a page template.
    Html,
    /// Copied byte-for-byte.
    Copy,
}

impl PageKind {
    /// Classify a source path by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
            PageKind::Markdown
        } else if HTML_EXTENSIONS.contains(&ext.as_str()) {
            PageKind::Html
        } else {
            PageKind::Copy
        }
    }

    /// Whether routes of this kind produce `<href>/index.html`.
    pub fn is_page(self) -> bool {
        !matches!(self, PageKind::Copy)
    }
}

/// A node in the output-path tree.
#[derive(Debug, Clone)]
pub struct Route {
    /// Backing file; `None` for a directory without an index file.
    pub source_path: Option<PathBuf>,
    /// Public path before placeholder substitution.
    pub raw_href: String,
    /// Public path after placeholder substitution. Empty = not rendered.
    pub href: String,
    /// `None` for a directory without an index file.
    pub kind: Option<PageKind>,
    pub front_matter: Metadata,
    pub resolved: Metadata,
    pub bindings: Metadata,
    pub children: Vec<RouteId>,
}

impl Route {
    /// A structural directory node with no content of its own.
    pub fn directory() -> Self {
        Self {
            source_path: None,
            raw_href: String::new(),
            href: String::new(),
            kind: None,
            front_matter: Metadata::new(),
            resolved: Metadata::new(),
            bindings: Metadata::new(),
            children: Vec::new(),
        }
    }

    /// A route backed by `source_path`, published at `href`.
    pub fn file(source_path: PathBuf, href: String, front_matter: Metadata) -> Self {
        Self {
            kind: Some(PageKind::from_path(&source_path)),
            source_path: Some(source_path),
            raw_href: href.clone(),
            href,
            resolved: front_matter.clone(),
            front_matter,
            bindings: Metadata::new(),
            children: Vec::new(),
        }
    }

    /// Routes with an empty href are pure directories and are skipped by
    /// generation.
    pub fn is_renderable(&self) -> bool {
        !self.href.is_empty()
    }

    /// Evaluated metadata with this route's placeholder bindings on top.
    pub fn metadata(&self) -> Metadata {
        let mut meta = self.resolved.clone();
        for (name, value) in &self.bindings {
            meta.insert(name.clone(), value.clone());
        }
        meta
    }

    /// Name of the shared template this page asks to be wrapped in, if any.
    pub fn template_name(&self) -> Option<String> {
        match self.metadata().get("template") {
            None | Some(Value::Null) => None,
            Some(value) => Some(display_value(value)),
        }
    }
}

/// Arena holding every route node of one build.
#[derive(Debug, Clone)]
pub struct RouteTree {
    content_dir: PathBuf,
    nodes: Vec<Route>,
    root: RouteId,
}

impl RouteTree {
    /// A tree whose root is an empty directory node.
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            nodes: vec![Route::directory()],
            root: RouteId(0),
        }
    }

    pub fn root(&self) -> RouteId {
        self.root
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    pub fn get(&self, id: RouteId) -> &Route {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: RouteId) -> &mut Route {
        &mut self.nodes[id.0]
    }

    /// Add a detached node to the arena.
    pub fn insert(&mut self, route: Route) -> RouteId {
        self.nodes.push(route);
        RouteId(self.nodes.len() - 1)
    }

    /// Add `route` as the last child of `parent`.
    pub fn push_child(&mut self, parent: RouteId, route: Route) -> RouteId {
        let id = self.insert(route);
        self.get_mut(parent).children.push(id);
        id
    }

    /// All attached routes in pre-order, root first.
    pub fn walk(&self) -> Vec<RouteId> {
        self.walk_from(self.root)
    }

    /// `id` and all of its descendants in pre-order.
    pub fn walk_from(&self, id: RouteId) -> Vec<RouteId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            order.push(next);
            stack.extend(self.get(next).children.iter().rev());
        }
        order
    }

    /// Distinct hrefs of all attached routes.
    pub fn hrefs(&self) -> BTreeSet<String> {
        self.walk()
            .into_iter()
            .map(|id| self.get(id).href.clone())
            .collect()
    }

    /// Deep-copy the subtree rooted at `id`. The copy is detached and shares
    /// no node (and no metadata map) with the original.
    pub fn clone_subtree(&mut self, id: RouteId) -> RouteId {
        let mut copy = self.get(id).clone();
        copy.children = copy
            .children
            .iter()
            .map(|&child| self.clone_subtree(child))
            .collect();
        self.insert(copy)
    }

    /// Replace `parent`'s children matching `is_target` with `replacement`,
    /// inserted where the first match sat.
    pub fn splice_children(
        &mut self,
        parent: RouteId,
        is_target: impl Fn(&Route) -> bool,
        replacement: Vec<RouteId>,
    ) {
        let old = std::mem::take(&mut self.get_mut(parent).children);
        let mut children = Vec::with_capacity(old.len() + replacement.len());
        let mut replacement = Some(replacement);
        for child in old {
            if is_target(self.get(child)) {
                if let Some(clones) = replacement.take() {
                    children.extend(clones);
                }
            } else {
                children.push(child);
            }
        }
        self.get_mut(parent).children = children;
    }

    /// Source path relative to the content directory, `/`-separated.
    pub fn relative_source(&self, id: RouteId) -> Option<String> {
        let source = self.get(id).source_path.as_ref()?;
        let rel = source.strip_prefix(&self.content_dir).unwrap_or(source);
        Some(
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/"),
        )
    }

    /// Template-facing projection of one route and its direct children.
    /// The children are listed without their own children, so a view costs
    /// one level of the tree, never a whole subtree.
    pub fn view(&self, id: RouteId) -> RouteView {
        let mut view = self.leaf_view(id);
        view.children = self
            .get(id)
            .children
            .iter()
            .map(|&c| self.leaf_view(c))
            .collect();
        view
    }

    fn leaf_view(&self, id: RouteId) -> RouteView {
        let route = self.get(id);
        RouteView {
            href: route.href.clone(),
            source_path: route
                .source_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            kind: route.kind,
            meta: route.metadata(),
            children: Vec::new(),
        }
    }

    /// Every attached route as a flat list, in pre-order.
    pub fn views(&self) -> Vec<RouteView> {
        self.walk().into_iter().map(|id| self.view(id)).collect()
    }
}

/// What templates and expressions see of a route: `Route.href`,
/// `Route.meta.title`, `Route.children`, ...
///
/// `children` is one level deep; grandchildren are reachable through the
/// flat `Routes` list.
#[derive(Debug, Clone, Serialize)]
pub struct RouteView {
    pub href: String,
    pub source_path: String,
    pub kind: Option<PageKind>,
    pub meta: Metadata,
    pub children: Vec<RouteView>,
}

/// String form of a metadata value as it appears in an href or a sort key:
/// strings verbatim, null as empty, everything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Join an href and a path segment with exactly one `/`.
pub fn join_href(parent: &str, segment: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{segment}")
    } else {
        format!("{parent}/{segment}")
    }
}

/// Href of a non-index file: the relative path with a rendering extension
/// stripped (`/blog/post.md` → `/blog/post`); other files keep their full
/// path so they resolve to a verbatim copy.
pub fn file_href(rel_path: &str) -> String {
    let Some((stem, ext)) = rel_path.rsplit_once('.') else {
        return rel_path.to_string();
    };
    if stem.ends_with('/') || ext.contains('/') {
        return rel_path.to_string();
    }
    let ext = ext.to_lowercase();
    if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) || HTML_EXTENSIONS.contains(&ext.as_str()) {
        stem.to_string()
    } else {
        rel_path.to_string()
    }
}
