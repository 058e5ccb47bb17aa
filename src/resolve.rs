//! Fixed-point resolution of the route tree.
//!
//! Stage 2 of the build pipeline. Expression evaluation and dynamic
//! expansion feed each other: an expression may count routes that only exist
//! after expansion, and an expansion may take its values from an expression.
//! Both run over the whole tree, repeatedly, until the set of hrefs stops
//! changing:
//!
//! ```text
//! loop {
//!     before = hrefs(tree)
//!     evaluate expressions on every route
//!     expand every route with placeholders
//!     if hrefs(tree) == before { break }
//! }
//! evaluate once more (settle)
//! ```
//!
//! The final settle pass lets fields derived from a placeholder (a title
//! built from `slug`, say) pick up each clone's own value. It never changes
//! hrefs.
//!
//! Metadata that never stabilizes (an expression producing a fresh value
//! every pass) would loop forever, so the loop is capped by
//! `max_iterations` and exceeding it is an error.

use crate::expand::{ExpandError, expand_dynamic_routes};
use crate::expr::{Evaluator, ExprError};
use crate::route::RouteTree;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error(transparent)]
    Expand(#[from] ExpandError),
    #[error("Routes did not reach a fixed point within {0} iterations")]
    NoFixedPoint(usize),
}

/// Evaluate and expand `tree` until its href set is stable.
///
/// Returns the number of iterations it took (a tree without placeholders
/// converges in one).
pub fn resolve(tree: &mut RouteTree, max_iterations: usize) -> Result<usize, ResolveError> {
    let mut evaluator = Evaluator::new();

    for iteration in 1..=max_iterations {
        let before = tree.hrefs();
        evaluator.evaluate_tree(tree)?;
        expand_dynamic_routes(tree)?;
        let after = tree.hrefs();

        tracing::debug!(iteration, routes = after.len(), "resolve pass");

        if after == before {
            evaluator.evaluate_tree(tree)?;
            return Ok(iteration);
        }
    }
    Err(ResolveError::NoFixedPoint(max_iterations))
}
