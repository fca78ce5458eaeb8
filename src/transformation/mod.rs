//! Canonical forms and equality proofs for single expressions.
//!
//! Every node gets one [`Transformation`], chosen by what the library knows about its
//! operator. The transformation computes the node's canonical form and proves the node equal
//! to any other expression with the same canonical form.

mod assoc_tree;
mod associative;
mod canonical;

pub use canonical::{collect_operands, compare_nodes, left_comb};

use crate::{
    error::TransformError,
    expression::Expression,
    manager::TransformationManager,
    pattern::GeneralizedStmt,
    worksheet::{ProofStep, WorksheetInfo},
};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformationKind {
    /// No argument can be replaced. The node is its own canonical form.
    Identity,
    /// Some arguments can be replaced by equal ones.
    Replace,
    /// The two operands of `gen` can be swapped.
    Commutative(GeneralizedStmt),
    /// Chains of `gen` can be regrouped.
    Associative(GeneralizedStmt),
    /// Chains of `gen` can be regrouped and reordered.
    AssociativeCommutative(GeneralizedStmt),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformation {
    pub node: Expression,
    pub kind: TransformationKind,
}

impl Transformation {
    pub fn new(node: Expression, kind: TransformationKind) -> Self {
        Transformation { node, kind }
    }

    pub fn canonical(
        &self,
        mgr: &TransformationManager,
        info: &mut WorksheetInfo,
    ) -> Result<Expression, TransformError> {
        match &self.kind {
            TransformationKind::Identity => Ok(self.node.clone()),
            TransformationKind::Replace => replace_canonical(mgr, info, &self.node),
            TransformationKind::Commutative(gen) => {
                let node = replace_canonical(mgr, info, &self.node)?;
                let [i, j] = gen.var_indexes;
                let order = compare_nodes(mgr.library(), &node.children()[i], &node.children()[j]);
                Ok(if order == Ordering::Greater {
                    node.with_swapped(i, j)
                } else {
                    node
                })
            }
            TransformationKind::Associative(gen) => {
                chain_canonical(mgr, info, gen, &self.node, false)
            }
            TransformationKind::AssociativeCommutative(gen) => {
                chain_canonical(mgr, info, gen, &self.node, true)
            }
        }
    }

    /// Proves `node = target`. `Ok(None)` means that the two are equal already.
    pub fn rewrite(
        &self,
        mgr: &TransformationManager,
        info: &mut WorksheetInfo,
        target: &Expression,
    ) -> Result<Option<ProofStep>, TransformError> {
        if &self.node == target {
            return Ok(None);
        }
        match &self.kind {
            TransformationKind::Identity => Err(TransformError::Invariant(format!(
                "{} and {} differ but can not be transformed",
                mgr.library().expression_to_string(&self.node),
                mgr.library().expression_to_string(target)
            ))),
            TransformationKind::Replace => replace_rewrite(mgr, info, &self.node, target),
            TransformationKind::Commutative(gen) => {
                commutative_rewrite(mgr, info, gen, &self.node, target)
            }
            TransformationKind::Associative(gen) => {
                associative::rewrite_chain(mgr, info, gen, &self.node, target, false)
            }
            TransformationKind::AssociativeCommutative(gen) => {
                associative::rewrite_chain(mgr, info, gen, &self.node, target, true)
            }
        }
    }
}

fn replace_canonical(
    mgr: &TransformationManager,
    info: &mut WorksheetInfo,
    node: &Expression,
) -> Result<Expression, TransformError> {
    let slots = match mgr.repl_info().possible_replaces(node.head()) {
        Some(slots) => slots,
        None => return Ok(node.clone()),
    };
    let children = node
        .children()
        .iter()
        .zip(slots)
        .map(|(child, slot)| match slot {
            Some(_) => mgr.canonical_form(info, child),
            None => Ok(child.clone()),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Expression::new(node.head(), children))
}

fn chain_canonical(
    mgr: &TransformationManager,
    info: &mut WorksheetInfo,
    gen: &GeneralizedStmt,
    node: &Expression,
    sort: bool,
) -> Result<Expression, TransformError> {
    let mut operands = collect_operands(gen, node)
        .iter()
        .map(|operand| mgr.canonical_form(info, operand))
        .collect::<Result<Vec<_>, _>>()?;
    if sort {
        operands.sort_by(|a, b| compare_nodes(mgr.library(), a, b));
    }
    left_comb(gen, operands)
        .ok_or_else(|| TransformError::Invariant("operator chain without operands".to_owned()))
}

/// Rewrites the replaceable children one by one. Children which can not be replaced have to
/// be equal already.
fn replace_rewrite(
    mgr: &TransformationManager,
    info: &mut WorksheetInfo,
    source: &Expression,
    target: &Expression,
) -> Result<Option<ProofStep>, TransformError> {
    let no_match = || {
        TransformError::NoMatch(format!(
            "{} can not be rewritten to {}",
            mgr.library().expression_to_string(source),
            mgr.library().expression_to_string(target)
        ))
    };
    if source.head() != target.head() || source.arity() != target.arity() {
        return Err(no_match());
    }
    let slots = mgr.repl_info().possible_replaces(source.head()).ok_or_else(no_match)?;
    let blocked = source
        .children()
        .iter()
        .zip(target.children())
        .zip(slots)
        .any(|((s, t), slot)| s != t && slot.is_none());
    if blocked {
        return Err(no_match());
    }

    let mut current = source.clone();
    let mut chain = None;
    for (i, new_child) in target.children().iter().enumerate() {
        let child_step = match mgr.transform(info, &current.children()[i], new_child)? {
            Some(step) => step,
            None => continue,
        };
        let step = mgr.repl_info().create_replace_step(
            info,
            mgr.eq_info(),
            &current,
            i,
            new_child,
            &child_step,
        )?;
        current = current.with_child(i, new_child.clone());
        chain = Some(mgr.eq_info().get_transitive_step(info, chain, step)?);
    }
    Ok(chain)
}

/// Swaps the operands first if the first operand of the target is not equal to the first
/// operand of the source.
fn commutative_rewrite(
    mgr: &TransformationManager,
    info: &mut WorksheetInfo,
    gen: &GeneralizedStmt,
    source: &Expression,
    target: &Expression,
) -> Result<Option<ProofStep>, TransformError> {
    if !gen.matches(target) {
        return replace_rewrite(mgr, info, source, target);
    }
    let [i, j] = gen.var_indexes;
    let source_first = mgr.canonical_form(info, &source.children()[i])?;
    let target_first = mgr.canonical_form(info, &target.children()[i])?;
    let (current, swap) = if source_first != target_first {
        let step = mgr
            .com_info()
            .create_commutative_step(info, mgr.closure_info(), source, gen)?;
        (source.with_swapped(i, j), Some(step))
    } else {
        (source.clone(), None)
    };
    let rest = replace_rewrite(mgr, info, &current, target)?;
    mgr.eq_info().chain(info, swap, rest)
}
