//! # Trellis
//!
//! A static site generator whose routes are driven by page metadata. The
//! content directory is the site map: files become pages or copied assets,
//! and a path segment like `[slug]` turns one file into a page per value of
//! `slug` in its front matter.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! ```text
//! 1. Scan      content/   →  RouteTree   (filesystem → routes + front matter)
//! 2. Resolve   RouteTree  →  RouteTree   (expressions + [placeholder] expansion, to a fixed point)
//! 3. Generate  RouteTree  →  dist/       (rendered pages + copied assets)
//! ```
//!
//! Each stage is a plain function over the [`route::RouteTree`] arena, so
//! tests can stop after any stage and inspect the tree.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: mirrors the content directory into a route tree |
//! | [`resolve`] | Stage 2: alternates [`expr`] and [`expand`] until the href set is stable |
//! | [`generate`] | Stage 3: renders pages through Tera, copies assets |
//! | [`route`] | `Route`, `RouteTree` arena, href derivation, template-facing `RouteView` |
//! | [`frontmatter`] | `---` block detection, stripping, YAML decoding |
//! | [`expr`] | `{{ ... }}` metadata expressions, decoded back into typed JSON values |
//! | [`expand`] | `[name]` placeholder expansion and tree splicing |
//! | [`permute`] | Cartesian product of placeholder value lists |
//! | [`helpers`] | Listing filters shared by expressions and page templates |
//! | [`markdown`] | Markdown to HTML |
//! | [`config`] | `config.toml` loading, validation, and stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Arena, Not Pointers
//!
//! Expansion replaces one node with many while the tree is being walked.
//! Routes live in a `Vec` and refer to children by index, and a rewrite only
//! swaps a parent's child list, so a walk over a snapshot of ids stays valid.
//!
//! ## Metadata Is JSON
//!
//! Front matter decodes into `serde_json` values, expressions render through
//! `json_encode` and decode back, and templates receive the same values. One
//! value model end to end means an expression can produce a list that a
//! placeholder then expands over.
//!
//! ## Fixed Point, With a Cap
//!
//! Expressions can depend on routes that only exist after expansion, so
//! resolution repeats until nothing changes. Metadata that never settles is
//! reported as an error after `resolve.max_iterations` passes instead of
//! looping forever.

pub mod config;
pub mod expand;
pub mod expr;
pub mod frontmatter;
pub mod generate;
pub mod helpers;
pub mod markdown;
pub mod output;
pub mod permute;
pub mod resolve;
pub mod route;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
