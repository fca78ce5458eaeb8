//! Regrouping and reordering of operand chains of associative (and commutative) operators.
//!
//! The source and the target chain are loaded into one [`AssocTree`]. The source is then
//! reshaped one rule application at a time until its grouping matches the target. Every
//! reshaping produces an equality step for the whole chain, the steps are joined by
//! transitivity.

use super::{
    assoc_tree::{difference, intersection, AssocTree, NodeIndex},
    canonical::{collect_operands, CanonicalOperandHelper},
};
use crate::{
    error::TransformError,
    expression::Expression,
    manager::TransformationManager,
    pattern::GeneralizedStmt,
    worksheet::{ProofStep, WorksheetInfo},
};
use tracing::trace;

type Moved = (NodeIndex, Option<ProofStep>);

/// Proves `source = target` for two chains of the operator `gen`. With `commutative` the
/// operands may be reordered, otherwise only regrouped.
pub(crate) fn rewrite_chain(
    mgr: &TransformationManager,
    info: &mut WorksheetInfo,
    gen: &GeneralizedStmt,
    source: &Expression,
    target: &Expression,
    commutative: bool,
) -> Result<Option<ProofStep>, TransformError> {
    if !gen.matches(target) {
        return Err(TransformError::NoMatch(format!(
            "{} is not an application of the same operator",
            mgr.library().expression_to_string(target)
        )));
    }
    let source_operands = canonical_operands(mgr, info, gen, source)?;
    let target_operands = canonical_operands(mgr, info, gen, target)?;
    let helper = CanonicalOperandHelper::new(
        mgr.library(),
        source_operands.iter().chain(target_operands.iter()).cloned(),
    );
    let missing = || TransformError::Invariant("operand without canonical index".to_owned());
    let source_labels = helper.indexes(&source_operands).ok_or_else(missing)?;
    let target_labels = helper.indexes(&target_operands).ok_or_else(missing)?;

    let same_operands = if commutative {
        let mut a = source_labels.clone();
        let mut b = target_labels.clone();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    } else {
        source_labels == target_labels
    };
    if !same_operands {
        return Err(TransformError::NoMatch(format!(
            "{} and {} have different operands",
            mgr.library().expression_to_string(source),
            mgr.library().expression_to_string(target)
        )));
    }

    let mut mover = Mover {
        mgr,
        tree: AssocTree::new(gen.clone()),
    };
    let src = mover.tree.build(source, &mut source_labels.into_iter())?;
    let tgt = mover.tree.build(target, &mut target_labels.into_iter())?;
    let (result, step) = if commutative {
        mover.transform_ac(info, src, tgt)?
    } else {
        mover.transform_assoc(info, src, tgt)?
    };
    if mover.tree.expr(result) != target {
        return Err(TransformError::Invariant(format!(
            "regrouping produced {} instead of {}",
            mgr.library().expression_to_string(mover.tree.expr(result)),
            mgr.library().expression_to_string(target)
        )));
    }
    Ok(step)
}

fn canonical_operands(
    mgr: &TransformationManager,
    info: &mut WorksheetInfo,
    gen: &GeneralizedStmt,
    node: &Expression,
) -> Result<Vec<Expression>, TransformError> {
    collect_operands(gen, node)
        .iter()
        .map(|operand| mgr.canonical_form(info, operand))
        .collect()
}

struct Mover<'m> {
    mgr: &'m TransformationManager,
    tree: AssocTree,
}

impl<'m> Mover<'m> {
    fn chain(
        &self,
        info: &mut WorksheetInfo,
        first: Option<ProofStep>,
        second: Option<ProofStep>,
    ) -> Result<Option<ProofStep>, TransformError> {
        self.mgr.eq_info().chain(info, first, second)
    }

    /// `(a . d) . f` to `a . (d . f)`, where `x . y` puts `x` at the variable position `side`.
    fn rotate(
        &mut self,
        info: &mut WorksheetInfo,
        g: NodeIndex,
        side: usize,
    ) -> Result<Moved, TransformError> {
        let x = self.tree.child(g, side)?;
        let f = self.tree.child(g, 1 - side)?;
        let a = self.tree.child(x, side)?;
        let d = self.tree.child(x, 1 - side)?;
        let step = self.mgr.assoc_info().create_associative_step(
            info,
            self.mgr.closure_info(),
            self.mgr.eq_info(),
            self.tree.gen(),
            side,
            self.tree.expr(a),
            self.tree.expr(d),
            self.tree.expr(f),
        )?;
        let inner = self.tree.join(side, d, f);
        let result = self.tree.join(side, a, inner);
        self.tree.retire(g);
        self.tree.retire(x);
        trace!(side, "rotated");
        Ok((result, Some(step)))
    }

    fn commute(&mut self, info: &mut WorksheetInfo, g: NodeIndex) -> Result<Moved, TransformError> {
        let [first, second] = self.tree.children(g)?;
        let step = self.mgr.com_info().create_commutative_step(
            info,
            self.mgr.closure_info(),
            self.tree.expr(g),
            self.tree.gen(),
        )?;
        let result = self.tree.join(0, second, first);
        self.tree.retire(g);
        Ok((result, Some(step)))
    }

    /// Replaces the child of `g` at `side` by `child`, given a step for the child.
    fn lift(
        &mut self,
        info: &mut WorksheetInfo,
        g: NodeIndex,
        side: usize,
        child: NodeIndex,
        step: Option<ProofStep>,
    ) -> Result<Moved, TransformError> {
        let step = match step {
            Some(step) => step,
            None => return Ok((g, None)),
        };
        let other = self.tree.child(g, 1 - side)?;
        let position = self.tree.gen().var_indexes[side];
        let lifted = self.mgr.repl_info().create_replace_step(
            info,
            self.mgr.eq_info(),
            self.tree.expr(g),
            position,
            self.tree.expr(child),
            &step,
        )?;
        let result = self.tree.join(side, child, other);
        self.tree.retire(g);
        Ok((result, Some(lifted)))
    }

    /// Reshapes `t` so that its child at `side` holds exactly the operands `want`, which must
    /// be a proper sub-multiset of the operands of `t`.
    fn extract(
        &mut self,
        info: &mut WorksheetInfo,
        t: NodeIndex,
        want: &[usize],
        side: usize,
    ) -> Result<Moved, TransformError> {
        let x = self.tree.child(t, side)?;
        let y = self.tree.child(t, 1 - side)?;
        if self.tree.leaves(x) == want {
            return Ok((t, None));
        }
        if self.tree.leaves(y) == want {
            return self.commute(info, t);
        }
        let in_x = intersection(want, self.tree.leaves(x));
        let in_y = difference(want, &in_x);
        let whole_y = in_y == self.tree.leaves(y);

        info.nested(|info| {
            if in_x.is_empty() || whole_y {
                let (t1, s1) = self.commute(info, t)?;
                let (t2, s2) = self.extract(info, t1, want, side)?;
                let step = self.chain(info, s1, s2)?;
                Ok((t2, step))
            } else if in_y.is_empty() {
                // x = (want | rest) and then (want | rest) | y = want | (rest | y)
                let (x1, s1) = self.extract(info, x, want, side)?;
                let (t1, s1) = self.lift(info, t, side, x1, s1)?;
                let (t2, s2) = self.rotate(info, t1, side)?;
                Ok((t2, self.chain(info, s1, s2)?))
            } else if in_x.as_slice() == self.tree.leaves(x) {
                // y = (rest | wanted part) and then x | (rest | part) = (x | part) | rest
                let (y1, s1) = self.extract(info, y, &in_y, side)?;
                let (t1, s1) = self.lift(info, t, 1 - side, y1, s1)?;
                let (t2, s2) = self.rotate(info, t1, 1 - side)?;
                Ok((t2, self.chain(info, s1, s2)?))
            } else {
                let (y1, s1) = self.extract(info, y, &in_y, side)?;
                let (t1, s1) = self.lift(info, t, 1 - side, y1, s1)?;
                let (t2, s2) = self.rotate(info, t1, 1 - side)?;
                let step = self.chain(info, s1, s2)?;
                let n = self.tree.child(t2, side)?;
                let (n1, s3) = self.extract(info, n, want, side)?;
                let (t3, s3) = self.lift(info, t2, side, n1, s3)?;
                let (t4, s4) = self.rotate(info, t3, side)?;
                let step = self.chain(info, step, s3)?;
                Ok((t4, self.chain(info, step, s4)?))
            }
        })
    }

    /// Reorders and regroups `src` into the shape of `tgt`.
    fn transform_ac(
        &mut self,
        info: &mut WorksheetInfo,
        src: NodeIndex,
        tgt: NodeIndex,
    ) -> Result<Moved, TransformError> {
        if self.tree.expr(src) == self.tree.expr(tgt) {
            return Ok((src, None));
        }
        if self.tree.leaves(src) != self.tree.leaves(tgt) {
            return Err(TransformError::Invariant(
                "regrouped operands do not match".to_owned(),
            ));
        }
        if self.tree.is_leaf(tgt) {
            return self.transform_operand(info, src, tgt);
        }
        let [t0, t1] = self.tree.children(tgt)?;
        let side = if self.tree.size(t0) <= self.tree.size(t1) { 0 } else { 1 };
        let want = self.tree.leaves([t0, t1][side]).to_vec();

        info.nested(|info| {
            let (s1, step) = self.extract(info, src, &want, side)?;
            let c0 = self.tree.child(s1, 0)?;
            let (c0, st) = self.transform_ac(info, c0, t0)?;
            let (s2, st) = self.lift(info, s1, 0, c0, st)?;
            let step = self.chain(info, step, st)?;
            let c1 = self.tree.child(s2, 1)?;
            let (c1, st) = self.transform_ac(info, c1, t1)?;
            let (s3, st) = self.lift(info, s2, 1, c1, st)?;
            Ok((s3, self.chain(info, step, st)?))
        })
    }

    /// Regroups `src` into the shape of `tgt` without reordering.
    fn transform_assoc(
        &mut self,
        info: &mut WorksheetInfo,
        src: NodeIndex,
        tgt: NodeIndex,
    ) -> Result<Moved, TransformError> {
        if self.tree.expr(src) == self.tree.expr(tgt) {
            return Ok((src, None));
        }
        if self.tree.size(src) != self.tree.size(tgt) {
            return Err(TransformError::Invariant(
                "regrouped operands do not match".to_owned(),
            ));
        }
        if self.tree.is_leaf(tgt) {
            return self.transform_operand(info, src, tgt);
        }
        let [t0, t1] = self.tree.children(tgt)?;
        let wanted = self.tree.size(t0);

        info.nested(|info| {
            let (node, step) = self.split(info, src, wanted)?;
            let c0 = self.tree.child(node, 0)?;
            let (c0, st) = self.transform_assoc(info, c0, t0)?;
            let (node, st) = self.lift(info, node, 0, c0, st)?;
            let step = self.chain(info, step, st)?;
            let c1 = self.tree.child(node, 1)?;
            let (c1, st) = self.transform_assoc(info, c1, t1)?;
            let (node, st) = self.lift(info, node, 1, c1, st)?;
            Ok((node, self.chain(info, step, st)?))
        })
    }

    /// Regroups `node` so that its first child holds exactly the first `k` operands.
    fn split(
        &mut self,
        info: &mut WorksheetInfo,
        node: NodeIndex,
        k: usize,
    ) -> Result<Moved, TransformError> {
        let c0 = self.tree.child(node, 0)?;
        let size = self.tree.size(c0);
        if size == k {
            return Ok((node, None));
        }
        info.nested(|info| {
            let (n1, s1) = if size > k {
                let (c, s) = self.split(info, c0, k)?;
                self.lift(info, node, 0, c, s)?
            } else {
                let c1 = self.tree.child(node, 1)?;
                let (c, s) = self.split(info, c1, k - size)?;
                self.lift(info, node, 1, c, s)?
            };
            let (n2, s2) = self.rotate(info, n1, if size > k { 0 } else { 1 })?;
            Ok((n2, self.chain(info, s1, s2)?))
        })
    }

    /// Two operands with the same canonical form are rewritten through their own
    /// transformations.
    fn transform_operand(
        &mut self,
        info: &mut WorksheetInfo,
        src: NodeIndex,
        tgt: NodeIndex,
    ) -> Result<Moved, TransformError> {
        let label = match (self.tree.label(src), self.tree.label(tgt)) {
            (Some(a), Some(b)) if a == b => a,
            _ => {
                return Err(TransformError::Invariant(
                    "operand does not match its target".to_owned(),
                ))
            }
        };
        let target = self.tree.expr(tgt).clone();
        let step = self.mgr.transform(info, self.tree.expr(src), &target)?;
        let result = self.tree.leaf(target, label);
        Ok((result, step))
    }
}
