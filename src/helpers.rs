//! Query helpers for listing pages.
//!
//! Registered as template filters on every template engine instance, so they
//! work both in page templates and in `{{ ... }}` metadata expressions. Each
//! takes a list of routes (`Routes`, `allRoutes`, `Route.children`, or the
//! output of another helper) and returns a list:
//!
//! ```text
//! {% for post in Routes | filter_href(pattern="/blog/*") | sort_desc(key="date") | limit(n=5) %}
//! tags: "{{ allRoutes | filter_href(pattern='/posts/*') | meta_values(key='tag') }}"
//! ```
//!
//! Patterns are shell globs where `*` does not cross `/`. A malformed pattern
//! is logged and matches nothing; it never fails the build.

use crate::route::display_value;
use glob::{MatchOptions, Pattern};
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::Path;
use tera::Tera;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Register every helper filter on `tera`.
pub fn register(tera: &mut Tera) {
    tera.register_filter("sort_asc", sort_asc);
    tera.register_filter("sort_desc", sort_desc);
    tera.register_filter("limit", limit);
    tera.register_filter("offset", offset);
    tera.register_filter("filter_meta", filter_meta);
    tera.register_filter("filter_href", filter_href);
    tera.register_filter("filter_file_name", filter_file_name);
    tera.register_filter("filter_file_path", filter_file_path);
    tera.register_filter("meta_values", meta_values);
}

/// Render a template engine error with its full cause chain.
pub fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    message
}

// ============================================================================
// Argument handling
// ============================================================================

fn routes<'a>(value: &'a Value, filter: &str) -> tera::Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| tera::Error::msg(format!("`{filter}` expects a list of routes")))
}

fn string_arg<'a>(
    args: &'a HashMap<String, Value>,
    name: &str,
    filter: &str,
) -> tera::Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg(format!("`{filter}` requires a string `{name}` argument")))
}

fn count_arg(args: &HashMap<String, Value>, filter: &str) -> tera::Result<usize> {
    args.get("n")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .ok_or_else(|| tera::Error::msg(format!("`{filter}` requires a non-negative `n` argument")))
}

/// `route.meta[key]` in string form; missing fields sort as empty.
fn meta_string(route: &Value, key: &str) -> String {
    route
        .get("meta")
        .and_then(|meta| meta.get(key))
        .map(display_value)
        .unwrap_or_default()
}

fn route_str<'a>(route: &'a Value, field: &str) -> &'a str {
    route.get(field).and_then(Value::as_str).unwrap_or_default()
}

// ============================================================================
// Ordering and paging
// ============================================================================

fn sorted(
    value: &Value,
    args: &HashMap<String, Value>,
    filter: &str,
    descending: bool,
) -> tera::Result<Value> {
    let key = string_arg(args, "key", filter)?;
    let mut list = routes(value, filter)?.clone();
    if descending {
        list.sort_by_cached_key(|route| Reverse(meta_string(route, key)));
    } else {
        list.sort_by_cached_key(|route| meta_string(route, key));
    }
    Ok(Value::Array(list))
}

fn sort_asc(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    sorted(value, args, "sort_asc", false)
}

fn sort_desc(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    sorted(value, args, "sort_desc", true)
}

fn limit(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let n = count_arg(args, "limit")?;
    let list = routes(value, "limit")?;
    Ok(Value::Array(list.iter().take(n).cloned().collect()))
}

fn offset(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let n = count_arg(args, "offset")?;
    let list = routes(value, "offset")?;
    Ok(Value::Array(list.iter().skip(n).cloned().collect()))
}

// ============================================================================
// Glob filters
// ============================================================================

/// Keep the routes whose `field_of(route)` matches `pattern`.
fn glob_filter(
    value: &Value,
    pattern: &str,
    filter: &str,
    field_of: impl Fn(&Value) -> String,
) -> tera::Result<Value> {
    let list = routes(value, filter)?;
    let pattern = match Pattern::new(pattern) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(filter, pattern, error = %e, "invalid pattern; treating as no match");
            return Ok(Value::Array(Vec::new()));
        }
    };
    Ok(Value::Array(
        list.iter()
            .filter(|route| pattern.matches_with(&field_of(*route), MATCH_OPTIONS))
            .cloned()
            .collect(),
    ))
}

fn filter_meta(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let key = string_arg(args, "key", "filter_meta")?;
    let pattern = string_arg(args, "pattern", "filter_meta")?;
    glob_filter(value, pattern, "filter_meta", |r| meta_string(r, key))
}

fn filter_href(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let pattern = string_arg(args, "pattern", "filter_href")?;
    glob_filter(value, pattern, "filter_href", |r| route_str(r, "href").to_string())
}

fn filter_file_path(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let pattern = string_arg(args, "pattern", "filter_file_path")?;
    glob_filter(value, pattern, "filter_file_path", |r| {
        route_str(r, "source_path").to_string()
    })
}

fn filter_file_name(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let pattern = string_arg(args, "pattern", "filter_file_name")?;
    glob_filter(value, pattern, "filter_file_name", |r| {
        Path::new(route_str(r, "source_path"))
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}

// ============================================================================
// Collection
// ============================================================================

fn meta_values(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let key = string_arg(args, "key", "meta_values")?;
    let mut values: Vec<Value> = Vec::new();
    for route in routes(value, "meta_values")? {
        let found = match route.get("meta").and_then(|meta| meta.get(key)) {
            None | Some(Value::Null) => continue,
            Some(Value::Array(items)) => items.clone(),
            Some(single) => vec![single.clone()],
        };
        for item in found {
            if !values.contains(&item) {
                values.push(item);
            }
        }
    }
    Ok(Value::Array(values))
}
