//! Does one algorithm say "shadow"?

use crate::rules::shadow::{ColumnShadowAlgorithm, HintShadowAlgorithm};
use crate::rules::ShadowHint;
use crate::segment::Value;

/// Every value of the column matches. A statement that gives
/// the column no value never matches.
pub fn column_matches(algorithm: &dyn ColumnShadowAlgorithm, values: &[Value]) -> bool {
    !values.is_empty() && values.iter().all(|value| algorithm.matches(value))
}

pub fn hint_matches(algorithm: &dyn HintShadowAlgorithm, hint: Option<&ShadowHint>) -> bool {
    hint.is_some_and(|hint| algorithm.matches(hint))
}
