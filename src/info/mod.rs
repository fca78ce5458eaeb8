//! Rule classifiers. Each one scans the library once and indexes the rules that express one
//! algebraic property of an operator.

mod associative;
mod closure;
mod commutative;
mod equivalence;
mod implication;
mod replace;

pub use associative::*;
pub use closure::*;
pub use commutative::*;
pub use equivalence::*;
pub use implication::*;
pub use replace::*;

use crate::{
    expression::Expression,
    library::Library,
    rule_map::{ComplexRuleMap, RuleKey},
    types::*,
};
use tracing::{debug, warn};

pub(crate) fn rule_label(library: &Library, id: RuleId) -> &str {
    library.rule(id).map_or("?", |r| r.label())
}

/// Adds `id` under `key` unless an earlier rule is stored there. Returns whether it was added.
pub(crate) fn add_first(
    library: &Library,
    rules: &mut ComplexRuleMap<RuleId>,
    key: RuleKey,
    id: RuleId,
    kind: &str,
) -> bool {
    let label = rule_label(library, id);
    match rules.add(key, id) {
        Some(kept) => {
            warn!(
                kept = rule_label(library, *kept),
                ignored = label,
                kind,
                "more than one rule of the same kind"
            );
            false
        }
        None => {
            debug!(rule = label, kind, "found rule");
            true
        }
    }
}

/// Returns the variable ids of `children` if all of them are leaf variables and pairwise
/// distinct.
pub(crate) fn distinct_variables(children: &[Expression]) -> Option<Vec<Identifier>> {
    let mut vars: Vec<Identifier> = Vec::with_capacity(children.len());
    for child in children {
        if !child.is_variable() || child.arity() != 0 || vars.contains(&child.head()) {
            return None;
        }
        vars.push(child.head());
    }
    Some(vars)
}
