//! Metadata expressions.
//!
//! A front-matter string whose trimmed value starts with `{{` is a template
//! expression, evaluated against the route's own metadata plus two extra
//! bindings:
//!
//! - `self`: the route itself (`self.href`, `self.meta`, `self.children`)
//! - `allRoutes`: every route currently in the tree, flattened
//!
//! ```yaml
//! ---
//! tag: "{{ allRoutes | filter_href(pattern='/posts/*') | meta_values(key='tag') }}"
//! count: "{{ allRoutes | length }}"
//! ---
//! ```
//!
//! Every `}}` is rewritten to pipe through `json_encode` first, and the
//! rendered text is decoded back as JSON, so an expression can yield a
//! list, a number or a boolean rather than just text. Escaping is off.
//!
//! Errors are split by blame. A template that fails to parse is fatal
//! ([`ExprError`]). A template that parses but fails to render (usually a
//! variable that does not exist yet, such as a placeholder value an expanded
//! parent has not handed down) keeps the field's raw string and is retried on
//! the next pass, as is output that is not valid JSON (for example
//! `"{{ title }} and more"`).

use crate::expand::placeholders;
use crate::helpers;
use crate::route::{Metadata, Route, RouteTree, RouteView};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;
use tera::{Context, Tera};
use thiserror::Error;

/// Marker that makes a metadata string an expression.
pub const EXPRESSION_OPEN: &str = "{{";

/// Context name of the route being evaluated.
const SELF: &str = "self";
/// Context name of the flattened route list.
const ALL_ROUTES: &str = "allRoutes";

static EXPRESSION_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(-?)\}\}").expect("static regex"));

#[derive(Error, Debug)]
#[error("Invalid expression in `{field}` of {}: {message}", path.display())]
pub struct ExprError {
    pub path: PathBuf,
    pub field: String,
    pub message: String,
}

/// Outcome of rendering one expression that parsed.
#[derive(Debug)]
pub enum Evaluated {
    /// Rendered output, decoded as JSON.
    Value(Value),
    /// Rendered, but the output is not JSON.
    NotJson(String),
    /// Rendering failed, for example on an undefined variable.
    Failed(tera::Error),
}

/// The expression source of `value`, if it is one.
pub fn as_expression(value: &Value) -> Option<&str> {
    value
        .as_str()
        .filter(|s| s.trim_start().starts_with(EXPRESSION_OPEN))
}

/// Whether any front-matter field of `route` is an expression.
pub fn has_expressions(route: &Route) -> bool {
    route.front_matter.values().any(|v| as_expression(v).is_some())
}

/// Evaluates metadata expressions. Holds one template engine with the query
/// helpers registered and escaping disabled, plus every expression compiled
/// so far keyed by its source.
pub struct Evaluator {
    tera: Tera,
    compiled: HashMap<String, String>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        helpers::register(&mut tera);
        Self {
            tera,
            compiled: HashMap::new(),
        }
    }

    /// Parse `expression` once and return the template name it lives under.
    fn compile(&mut self, expression: &str) -> tera::Result<String> {
        if let Some(name) = self.compiled.get(expression) {
            return Ok(name.clone());
        }
        let name = format!("@expr{}", self.compiled.len());
        let source = EXPRESSION_CLOSE.replace_all(expression, " | json_encode ${1}}}");
        self.tera.add_raw_template(&name, &source)?;
        self.compiled.insert(expression.to_string(), name.clone());
        Ok(name)
    }

    /// Render one expression. `Err` only when it does not parse.
    pub fn evaluate(&mut self, expression: &str, context: &Context) -> tera::Result<Evaluated> {
        let name = self.compile(expression)?;
        let rendered = match self.tera.render(&name, context) {
            Ok(rendered) => rendered,
            Err(e) => return Ok(Evaluated::Failed(e)),
        };
        Ok(match serde_json::from_str(rendered.trim()) {
            Ok(value) => Evaluated::Value(value),
            Err(_) => Evaluated::NotJson(rendered),
        })
    }

    /// Evaluate every expression in `route`'s front matter, in key order.
    ///
    /// `scope` holds `allRoutes` for the whole pass; the route's own fields
    /// and `self` are added for the call and taken out again afterwards.
    /// Later fields see earlier results. Placeholder bindings stay visible
    /// under their own names even when the front matter defines the same key,
    /// so a clone's derived fields use its own value rather than the list.
    pub fn evaluate_route(
        &mut self,
        route: &Route,
        this: &RouteView,
        scope: &mut Context,
    ) -> Result<Metadata, ExprError> {
        let mut added = Vec::new();
        for (name, value) in route.front_matter.iter().chain(&route.bindings) {
            if name != SELF && name != ALL_ROUTES {
                scope.insert(name.as_str(), value);
                added.push(name.as_str());
            }
        }
        scope.insert(SELF, this);

        let result = self.evaluate_fields(route, scope);

        for name in added {
            scope.remove(name);
        }
        scope.remove(SELF);
        result
    }

    fn evaluate_fields(
        &mut self,
        route: &Route,
        scope: &mut Context,
    ) -> Result<Metadata, ExprError> {
        let mut resolved = route.front_matter.clone();
        // Failures on a route that still has unexpanded placeholders are
        // expected until its clones exist.
        let pending = !placeholders(&route.href).is_empty();

        for (name, raw) in &route.front_matter {
            let Some(expression) = as_expression(raw) else {
                continue;
            };
            let outcome = self.evaluate(expression, scope).map_err(|e| ExprError {
                path: route.source_path.clone().unwrap_or_default(),
                field: name.clone(),
                message: helpers::describe(&e),
            })?;
            let value = match outcome {
                Evaluated::Value(value) => value,
                Evaluated::NotJson(output) => {
                    tracing::warn!(
                        path = ?route.source_path,
                        field = %name,
                        %output,
                        "expression output is not JSON; keeping the raw string"
                    );
                    continue;
                }
                Evaluated::Failed(e) if pending => {
                    tracing::debug!(
                        path = ?route.source_path,
                        field = %name,
                        error = %helpers::describe(&e),
                        "expression on unexpanded route did not render"
                    );
                    continue;
                }
                Evaluated::Failed(e) => {
                    tracing::warn!(
                        path = ?route.source_path,
                        field = %name,
                        error = %helpers::describe(&e),
                        "expression did not render; keeping the raw string"
                    );
                    continue;
                }
            };
            if !route.bindings.contains_key(name) && name != SELF && name != ALL_ROUTES {
                scope.insert(name.as_str(), &value);
            }
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }

    /// One evaluation pass over every attached route. All routes see the
    /// same `allRoutes` snapshot, taken before the pass and serialized once.
    /// Routes without expressions keep their front matter as is.
    pub fn evaluate_tree(&mut self, tree: &mut RouteTree) -> Result<(), ExprError> {
        let ids = tree.walk();
        if !ids.iter().any(|&id| has_expressions(tree.get(id))) {
            return Ok(());
        }
        let all = tree.views();
        let mut scope = Context::new();
        scope.insert(ALL_ROUTES, &all);

        for (id, this) in ids.into_iter().zip(&all) {
            if !has_expressions(tree.get(id)) {
                continue;
            }
            let resolved = self.evaluate_route(tree.get(id), this, &mut scope)?;
            tree.get_mut(id).resolved = resolved;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn route_with(front_matter: Value) -> Route {
        Route::file(
            PathBuf::from("/c/page.md"),
            "/page".into(),
            front_matter.as_object().cloned().unwrap(),
        )
    }

    fn tree_with(routes: Vec<Route>) -> RouteTree {
        let mut tree = RouteTree::new("/c");
        let root = tree.root();
        for route in routes {
            tree.push_child(root, route);
        }
        tree
    }

    fn first_child(tree: &RouteTree) -> &Route {
        tree.get(tree.get(tree.root()).children[0])
    }

    // =========================================================================
    // Detection
    // =========================================================================

    #[test]
    fn detects_expressions_after_whitespace() {
        assert!(as_expression(&json!("{{ x }}")).is_some());
        assert!(as_expression(&json!("   {{ x }}")).is_some());
        assert!(as_expression(&json!("x {{ y }}")).is_none());
        assert!(as_expression(&json!(["{{ x }}"])).is_none());
        assert!(as_expression(&json!(5)).is_none());
    }

    // =========================================================================
    // Typed results
    // =========================================================================

    #[test]
    fn expression_yields_typed_values() {
        let mut tree = tree_with(vec![route_with(json!({
            "n": 2,
            "double": "{{ n * 2 }}",
            "flag": "{{ true }}",
            "shout": "{{ 'hi' | upper }}",
        }))]);
        Evaluator::new().evaluate_tree(&mut tree).unwrap();

        let resolved = &first_child(&tree).resolved;
        assert_eq!(resolved["double"], json!(4));
        assert_eq!(resolved["flag"], json!(true));
        assert_eq!(resolved["shout"], json!("HI"));
    }

    #[test]
    fn json_output_is_not_escaped() {
        let mut tree = tree_with(vec![route_with(json!({
            "raw": "<b> & \"q\"",
            "copy": "{{ raw }}",
        }))]);
        Evaluator::new().evaluate_tree(&mut tree).unwrap();
        assert_eq!(first_child(&tree).resolved["copy"], json!("<b> & \"q\""));
    }

    #[test]
    fn self_and_all_routes_are_bound() {
        let mut tree = tree_with(vec![
            route_with(json!({
                "me": "{{ self.href }}",
                "total": "{{ allRoutes | length }}",
                "hrefs": "{{ allRoutes | filter_href(pattern='/*') | map(attribute='href') }}",
            })),
            Route::file(PathBuf::from("/c/other.md"), "/other".into(), Metadata::new()),
        ]);
        Evaluator::new().evaluate_tree(&mut tree).unwrap();

        let resolved = &first_child(&tree).resolved;
        assert_eq!(resolved["me"], json!("/page"));
        assert_eq!(resolved["total"], json!(3));
        assert_eq!(resolved["hrefs"], json!(["/page", "/other"]));
    }

    #[test]
    fn bindings_shadow_front_matter_lists() {
        let mut route = route_with(json!({
            "slug": ["a", "b"],
            "title": "{{ slug | upper }}",
        }));
        route.bindings.insert("slug".into(), json!("b"));
        let mut tree = tree_with(vec![route]);
        Evaluator::new().evaluate_tree(&mut tree).unwrap();

        let child = first_child(&tree);
        assert_eq!(child.resolved["title"], json!("B"));
        assert_eq!(child.resolved["slug"], json!(["a", "b"]));
    }

    // =========================================================================
    // Failure modes
    // =========================================================================

    #[test]
    fn non_json_output_keeps_raw_string() {
        let mut tree = tree_with(vec![route_with(json!({
            "name": "x",
            "mixed": "{{ name }} and more",
            "ok": "{{ name }}",
        }))]);
        Evaluator::new().evaluate_tree(&mut tree).unwrap();

        let resolved = &first_child(&tree).resolved;
        assert_eq!(resolved["mixed"], json!("{{ name }} and more"));
        assert_eq!(resolved["ok"], json!("x"));
    }

    #[test]
    fn syntax_error_is_fatal() {
        let mut tree = tree_with(vec![route_with(json!({"bad": "{{ 1 + }}"}))]);
        let err = Evaluator::new().evaluate_tree(&mut tree).unwrap_err();
        assert_eq!(err.field, "bad");
        assert!(err.path.ends_with("page.md"));
    }

    #[test]
    fn plain_metadata_is_idempotent() {
        let mut tree = tree_with(vec![route_with(json!({
            "title": "Hello",
            "tags": ["a", "b"],
            "weight": 3,
        }))]);
        let mut evaluator = Evaluator::new();
        evaluator.evaluate_tree(&mut tree).unwrap();
        let once = first_child(&tree).resolved.clone();
        evaluator.evaluate_tree(&mut tree).unwrap();
        assert_eq!(first_child(&tree).resolved, once);
        assert_eq!(once, first_child(&tree).front_matter);
    }

    #[test]
    fn undefined_variable_keeps_raw_string() {
        let mut tree = tree_with(vec![route_with(json!({
            "subtitle": "{{ missing }}",
            "title": "{{ 'ok' }}",
        }))]);
        Evaluator::new().evaluate_tree(&mut tree).unwrap();

        let resolved = &first_child(&tree).resolved;
        assert_eq!(resolved["subtitle"], json!("{{ missing }}"));
        assert_eq!(resolved["title"], json!("ok"));
    }

    #[test]
    fn filter_error_on_list_value_is_not_fatal() {
        let mut tree = tree_with(vec![route_with(json!({
            "slug": ["a", "b"],
            "title": "{{ slug | upper }}",
        }))]);
        Evaluator::new().evaluate_tree(&mut tree).unwrap();
        assert_eq!(first_child(&tree).resolved["title"], json!("{{ slug | upper }}"));
    }

    #[test]
    fn reserved_names_are_not_shadowed_by_metadata() {
        let mut tree = tree_with(vec![route_with(json!({
            "allRoutes": "mine",
            "count": "{{ allRoutes | length }}",
        }))]);
        Evaluator::new().evaluate_tree(&mut tree).unwrap();
        assert_eq!(first_child(&tree).resolved["count"], json!(2));
    }

    #[test]
    fn fields_do_not_leak_between_routes() {
        let mut tree = tree_with(vec![
            route_with(json!({"secret": "a"})),
            Route::file(
                PathBuf::from("/c/other.md"),
                "/other".into(),
                json!({"peek": "{{ secret }}"}).as_object().cloned().unwrap(),
            ),
        ]);
        Evaluator::new().evaluate_tree(&mut tree).unwrap();

        let other = tree.get(tree.get(tree.root()).children[1]);
        assert_eq!(other.resolved["peek"], json!("{{ secret }}"));
    }

    #[test]
    fn expressions_are_compiled_once() {
        let mut evaluator = Evaluator::new();
        let mut context = Context::new();
        context.insert("n", &1);
        evaluator.evaluate("{{ n }}", &context).unwrap();
        evaluator.evaluate("{{ n }}", &context).unwrap();
        evaluator.evaluate("{{ n + 1 }}", &context).unwrap();
        assert_eq!(evaluator.compiled.len(), 2);
    }

    #[test]
    fn whitespace_control_is_preserved() {
        let mut evaluator = Evaluator::new();
        let mut context = Context::new();
        context.insert("n", &7);
        let value = evaluator.evaluate("{{- n -}}", &context).unwrap();
        assert!(matches!(value, Evaluated::Value(v) if v == json!(7)));
    }
}
