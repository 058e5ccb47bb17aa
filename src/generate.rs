//! Site generation.
//!
//! Stage 3 of the build pipeline. Walks the resolved route tree and writes
//! one output per route with a non-empty href.
//!
//! ## Dispatch
//!
//! | Kind | Output |
//! |------|--------|
//! | Markdown | body converted to HTML, then rendered like an HTML page |
//! | HTML | front matter stripped, body rendered as a page template |
//! | Copy | source bytes copied verbatim |
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                 # href /
//! ├── about/index.html           # href /about
//! ├── blog/hello/index.html      # href /blog/hello
//! └── static/logo.png            # href /static/logo.png (copied)
//! ```
//!
//! ## Templates
//!
//! Every `*.html` file in the partials directory is registered under its file
//! name and can be included from any page:
//!
//! ```text
//! {% include "nav.html" %}
//! ```
//!
//! A page whose metadata sets `template: base.html` is rendered as a child of
//! `templates/base.html`. Markdown output lands in the layout's `body` block;
//! an HTML page body supplies its own `{% block %}` overrides.
//!
//! Every page template sees its flattened metadata (`{{ title }}`), itself as
//! `Route` and the whole site as `Routes`, plus the query helpers. Variable
//! output is HTML-escaped.

use crate::frontmatter;
use crate::helpers;
use crate::markdown;
use crate::route::{PageKind, Route, RouteId, RouteTree};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use thiserror::Error;

/// Template name of the page being rendered. The `.html` suffix turns on
/// escaping.
const PAGE_TEMPLATE: &str = "@page.html";
/// Context name of the page being rendered.
const ROUTE: &str = "Route";
/// Context name of the flattened route list.
const ROUTES: &str = "Routes";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Template error rendering {href}: {message}")]
    Template { href: String, message: String },
    #[error("Invalid partials pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> GenerateError {
    move |source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Where the render stage reads templates from and writes to.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub output_dir: PathBuf,
    pub partials_dir: PathBuf,
    pub templates_dir: PathBuf,
}

/// One written output file.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub href: String,
    pub output: PathBuf,
    pub kind: PageKind,
}

/// Render every route in `tree` into `config.output_dir`.
pub fn generate(tree: &RouteTree, config: &RenderConfig) -> Result<Vec<Generated>, GenerateError> {
    fs::create_dir_all(&config.output_dir).map_err(io_err(&config.output_dir))?;

    let mut renderer = PageRenderer::new(tree, config)?;
    let mut generated = Vec::new();

    for id in tree.walk() {
        let route = tree.get(id);
        if !route.is_renderable() {
            continue;
        }
        let (Some(source), Some(kind)) = (route.source_path.as_deref(), route.kind) else {
            continue;
        };

        let output = if kind.is_page() {
            let html = renderer.render(id, kind, source)?;
            let output = page_output_path(&config.output_dir, &route.href);
            write_file(&output, html.as_bytes())?;
            output
        } else {
            let output = asset_output_path(&config.output_dir, &route.href);
            copy_file(source, &output)?;
            output
        };

        tracing::debug!(href = %route.href, output = %output.display(), "generated");
        generated.push(Generated {
            href: route.href.clone(),
            output,
            kind,
        });
    }
    Ok(generated)
}

/// `<out>/<href>/index.html`.
pub fn page_output_path(output_dir: &Path, href: &str) -> PathBuf {
    output_dir
        .join(href.trim_start_matches('/'))
        .join("index.html")
}

/// `<out>/<href>`.
pub fn asset_output_path(output_dir: &Path, href: &str) -> PathBuf {
    output_dir.join(href.trim_start_matches('/'))
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), GenerateError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    fs::write(path, contents).map_err(io_err(path))
}

fn copy_file(source: &Path, dest: &Path) -> Result<(), GenerateError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    fs::copy(source, dest).map_err(io_err(source))?;
    Ok(())
}

// ============================================================================
// Page rendering
// ============================================================================

/// Shared state for rendering the pages of one tree: the template engine
/// with partials and helpers loaded, a context holding the `Routes` list
/// (serialized once, page fields come and go per render), and the layouts
/// read so far.
struct PageRenderer<'a> {
    tree: &'a RouteTree,
    templates_dir: &'a Path,
    base: Tera,
    scope: Context,
    layouts: HashMap<String, String>,
}

impl<'a> PageRenderer<'a> {
    fn new(tree: &'a RouteTree, config: &'a RenderConfig) -> Result<Self, GenerateError> {
        let mut base = Tera::default();
        helpers::register(&mut base);
        let partials = load_partials(&config.partials_dir)?;
        base.add_raw_templates(partials)
            .map_err(|e| GenerateError::Template {
                href: config.partials_dir.display().to_string(),
                message: helpers::describe(&e),
            })?;

        let mut scope = Context::new();
        scope.insert(ROUTES, &tree.views());

        Ok(Self {
            tree,
            templates_dir: &config.templates_dir,
            base,
            scope,
            layouts: HashMap::new(),
        })
    }

    fn layout(&mut self, name: &str) -> Result<String, GenerateError> {
        if let Some(source) = self.layouts.get(name) {
            return Ok(source.clone());
        }
        let path = self.templates_dir.join(name);
        let source = fs::read_to_string(&path).map_err(io_err(&path))?;
        self.layouts.insert(name.to_string(), source.clone());
        Ok(source)
    }

    fn render(
        &mut self,
        id: RouteId,
        kind: PageKind,
        source: &Path,
    ) -> Result<String, GenerateError> {
        let tree = self.tree;
        let route = tree.get(id);
        let raw = fs::read_to_string(source).map_err(io_err(source))?;
        let body = frontmatter::strip(&raw);
        let layout = route.template_name();

        let page = match (kind, &layout) {
            (PageKind::Markdown, Some(name)) => format!(
                "{{% extends \"{name}\" %}}{{% block body %}}{}{{% endblock body %}}",
                markdown::to_html(body)
            ),
            (PageKind::Markdown, None) => markdown::to_html(body),
            (_, Some(name)) => format!("{{% extends \"{name}\" %}}{body}"),
            (_, None) => body.to_string(),
        };

        let mut templates = vec![(PAGE_TEMPLATE.to_string(), page)];
        if let Some(name) = layout {
            let source = self.layout(&name)?;
            templates.push((name, source));
        }

        let template_err = |e: tera::Error| GenerateError::Template {
            href: route.href.clone(),
            message: helpers::describe(&e),
        };
        let mut tera = self.base.clone();
        tera.add_raw_templates(templates).map_err(template_err)?;

        let added = self.enter_page(route, id);
        let rendered = tera.render(PAGE_TEMPLATE, &self.scope);
        for key in added.iter().map(String::as_str).chain([ROUTE]) {
            self.scope.remove(key);
        }
        rendered.map_err(template_err)
    }

    /// Add the page's flattened metadata and `Route` to the shared context.
    /// Returns the metadata keys added.
    fn enter_page(&mut self, route: &Route, id: RouteId) -> Vec<String> {
        let mut added = Vec::new();
        for (key, value) in route.metadata() {
            if key != ROUTE && key != ROUTES {
                self.scope.insert(key.as_str(), &value);
                added.push(key);
            }
        }
        self.scope.insert(ROUTE, &self.tree.view(id));
        added
    }
}

/// `(file name, source)` for every `*.html` file directly in `dir`.
fn load_partials(dir: &Path) -> Result<Vec<(String, String)>, GenerateError> {
    let pattern = format!(
        "{}{}*.html",
        glob::Pattern::escape(&dir.to_string_lossy()),
        std::path::MAIN_SEPARATOR
    );
    let mut partials = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            GenerateError::Io {
                path,
                source: e.into(),
            }
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = fs::read_to_string(&path).map_err(io_err(&path))?;
        partials.push((name, source));
    }
    Ok(partials)
}
