use super::{distinct_variables, rule_label, EquivalenceInfo, ImplicationInfo};
use crate::{
    error::TransformError,
    expression::Expression,
    library::{Library, Rule},
    types::*,
    worksheet::{ProofStep, WorksheetInfo},
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A congruence rule `a = b => f(.., a, ..) = f(.., b, ..)` for one argument position.
///
/// `reversed` is set for rules of the form `a = b => f(.., b, ..) = f(.., a, ..)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceRule {
    pub rule: RuleId,
    pub reversed: bool,
}

/// Congruence rules of every operator, one slot per argument position.
///
/// The deduction forms `ph -> a = b => ph -> f(.., a, ..) = f(.., b, ..)` are kept apart,
/// indexed by implication and operator.
#[derive(Debug, Clone, Default)]
pub struct ReplaceInfo {
    replaces: HashMap<Identifier, Vec<Option<ReplaceRule>>>,
    deduction: HashMap<(Identifier, Identifier), Vec<Option<ReplaceRule>>>,
}

impl ReplaceInfo {
    pub fn new(library: &Library, eq_info: &EquivalenceInfo, impl_info: &ImplicationInfo) -> Self {
        let mut info = ReplaceInfo::default();
        for (id, rule) in library.rules() {
            if let Some(shape) = replace_shape(rule, eq_info) {
                insert_slot(library, &mut info.replaces, shape.0, shape, id);
            } else if let Some((prefix_op, core)) = impl_info.deduction_form(rule) {
                if let Some(shape) = replace_shape(&core, eq_info) {
                    insert_slot(library, &mut info.deduction, (prefix_op, shape.0), shape, id);
                }
            }
        }
        info
    }

    /// The congruence rules of `op`. `None` if there is no rule for any position.
    pub fn possible_replaces(&self, op: Identifier) -> Option<&[Option<ReplaceRule>]> {
        self.replaces.get(&op).map(|slots| slots.as_slice())
    }

    pub fn replace_rule(&self, op: Identifier, position: usize) -> Option<ReplaceRule> {
        self.replaces
            .get(&op)
            .and_then(|slots| slots.get(position))
            .copied()
            .flatten()
    }

    fn deduction_rule(
        &self,
        info: &WorksheetInfo,
        op: Identifier,
        position: usize,
    ) -> Option<ReplaceRule> {
        let prefix_op = info.prefix()?.implication;
        self.deduction
            .get(&(prefix_op, op))
            .and_then(|slots| slots.get(position))
            .copied()
            .flatten()
    }

    /// Tests whether every argument position of `op` has a congruence rule.
    pub fn is_full_replace(&self, op: Identifier) -> bool {
        self.possible_replaces(op)
            .map_or(false, |slots| slots.iter().all(|s| s.is_some()))
    }

    /// From `child_step: prev[i] = new_child` gets or creates `prev = prev[i := new_child]`.
    /// A prefixed child step needs the deduction form of the congruence rule and gives a
    /// prefixed step.
    pub fn create_replace_step(
        &self,
        info: &mut WorksheetInfo,
        eq_info: &EquivalenceInfo,
        prev: &Expression,
        position: usize,
        new_child: &Expression,
        child_step: &ProofStep,
    ) -> Result<ProofStep, TransformError> {
        let replace = self.replace_rule(prev.head(), position).ok_or_else(|| {
            TransformError::NoMatch(format!(
                "position {} of {} can not be replaced",
                position,
                info.library().expression_to_string(prev)
            ))
        })?;
        let eq_op = info
            .library()
            .rule(replace.rule)
            .map(|r| r.conclusion().head())
            .ok_or(TransformError::UnknownRule(replace.rule))?;
        let node = Expression::new(
            eq_op,
            vec![prev.clone(), prev.with_child(position, new_child.clone())],
        );
        if let Some(step) = info.get_gen_step(&node) {
            return Ok(step);
        }
        let (reversed, deduction) = if child_step.prefixed {
            let deduction = self
                .deduction_rule(info, prev.head(), position)
                .ok_or_else(|| {
                    TransformError::NoMatch(format!(
                        "position {} of {} can not be replaced under the prefix",
                        position,
                        info.library().expression_to_string(prev)
                    ))
                })?;
            (deduction.reversed, Some(deduction.rule))
        } else {
            (replace.reversed, None)
        };
        let hyp = if reversed {
            eq_info.create_reverse_step(info, child_step)?
        } else {
            child_step.clone()
        };
        info.get_or_create_gen_step(node, vec![hyp], replace.rule, deduction)
    }
}

type ReplaceShape = (Identifier, usize, usize, bool);

fn insert_slot<K: std::hash::Hash + Eq>(
    library: &Library,
    replaces: &mut HashMap<K, Vec<Option<ReplaceRule>>>,
    key: K,
    (_, arity, position, reversed): ReplaceShape,
    id: RuleId,
) {
    let slots = replaces.entry(key).or_insert_with(|| vec![None; arity]);
    if slots.len() != arity {
        return;
    }
    let label = rule_label(library, id);
    match slots[position] {
        Some(kept) => warn!(
            kept = rule_label(library, kept.rule),
            ignored = label,
            position,
            "more than one replace rule for the same position"
        ),
        None => {
            debug!(rule = label, position, reversed, "found replace rule");
            slots[position] = Some(ReplaceRule { rule: id, reversed });
        }
    }
}

/// Returns operator, arity, replaced position and orientation of a congruence rule.
fn replace_shape(rule: &Rule, eq_info: &EquivalenceInfo) -> Option<ReplaceShape> {
    if rule.hypotheses().len() != 1 {
        return None;
    }
    let hyp = &rule.hypotheses()[0];
    if !eq_info.is_equivalence(hyp.head()) || hyp.depth() != 2 {
        return None;
    }
    let (a, b) = match distinct_variables(hyp.children())?.as_slice() {
        [a, b] => (*a, *b),
        _ => return None,
    };

    let concl = rule.conclusion();
    if !eq_info.is_equivalence(concl.head()) || concl.depth() != 3 {
        return None;
    }
    let (left, right) = match concl.children() {
        [left, right] => (left, right),
        _ => return None,
    };
    if left.is_variable() || left.head() != right.head() || left.arity() != right.arity() {
        return None;
    }
    let left_vars = distinct_variables(left.children())?;
    let right_vars = distinct_variables(right.children())?;

    let mut found = None;
    for (i, (l, r)) in left_vars.iter().zip(right_vars.iter()).enumerate() {
        if l == r {
            if *l == a || *l == b {
                return None;
            }
        } else if found.is_some() {
            return None;
        } else if (*l, *r) == (a, b) {
            found = Some((i, false));
        } else if (*l, *r) == (b, a) {
            found = Some((i, true));
        } else {
            return None;
        }
    }
    let (position, reversed) = found?;
    Some((left.head(), left.arity(), position, reversed))
}
