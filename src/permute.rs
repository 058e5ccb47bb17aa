//! Cartesian product of value lists.
//!
//! Combinations are enumerated in mixed-radix order with the first list
//! varying slowest, exactly like nested `for` loops:
//!
//! ```text
//! [[a, b], [1, 2, 3]]  →  [a,1] [a,2] [a,3] [b,1] [b,2] [b,3]
//! ```
//!
//! The order is part of the contract: when two combinations produce the same
//! href, the later one overwrites the earlier one's output file.

/// Every combination picking one value from each list.
///
/// Any empty list makes the product empty. No lists at all yields a single
/// empty combination.
pub fn cartesian_product<T: Clone>(lists: &[Vec<T>]) -> Vec<Vec<T>> {
    if lists.iter().any(Vec::is_empty) {
        return Vec::new();
    }
    let total: usize = lists.iter().map(Vec::len).product();

    (0..total)
        .map(|index| {
            let mut rest = index;
            let mut combination: Vec<T> = lists
                .iter()
                .rev()
                .map(|list| {
                    let value = list[rest % list.len()].clone();
                    rest /= list.len();
                    value
                })
                .collect();
            combination.reverse();
            combination
        })
        .collect()
}
