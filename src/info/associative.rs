use super::{rule_label, ClosureInfo, EquivalenceInfo, ImplicationInfo, ReplaceInfo};
use crate::{
    error::TransformError,
    expression::Expression,
    library::{Library, Rule},
    pattern::{ConstSubst, GeneralizedStmt, PropertyTemplate},
    rule_map::{ComplexRuleMap, RuleKey},
    types::*,
    worksheet::{ProofStep, WorksheetInfo},
};
use std::collections::HashMap;
use tracing::{debug, warn};

type Forms = [Option<RuleId>; 2];

/// Associativity rules of an operator, indexed by the side they regroup from.
///
/// With `x . y` standing for the operator applied to `x` at the first and `y` at the second
/// variable position, form `0` is `(a . b) . c = a . (b . c)` and form `1` is
/// `a . (b . c) = (a . b) . c`.
#[derive(Debug, Clone, Default)]
pub struct AssociativeInfo {
    rules: ComplexRuleMap<Forms>,
    deduction: HashMap<Identifier, ComplexRuleMap<Forms>>,
}

impl AssociativeInfo {
    pub fn new(
        library: &Library,
        eq_info: &EquivalenceInfo,
        impl_info: &ImplicationInfo,
        closure: &ClosureInfo,
        repl_info: &ReplaceInfo,
    ) -> Self {
        let mut info = AssociativeInfo::default();
        for (id, rule) in library.rules() {
            let (prefix_op, shape) = match associative_shape(rule, eq_info) {
                Some(shape) => (None, shape),
                None => match impl_info.deduction_form(rule) {
                    Some((prefix_op, core)) => match associative_shape(&core, eq_info) {
                        Some(shape) => (Some(prefix_op), shape),
                        None => continue,
                    },
                    None => continue,
                },
            };
            let (key, form) = shape;
            if !key.template.is_empty() && !closure.contains(&key) {
                debug!(rule = rule.label(), "associative rule without closure rule");
                continue;
            }
            if !repl_info.is_full_replace(key.op) {
                debug!(rule = rule.label(), "has problems with replace");
                continue;
            }
            let rules = match prefix_op {
                Some(prefix_op) => info.deduction.entry(prefix_op).or_default(),
                None => &mut info.rules,
            };
            let forms = rules.get_or_insert_with(key, || [None; 2]);
            match forms[form] {
                Some(kept) => warn!(
                    kept = rule_label(library, kept),
                    ignored = rule.label(),
                    form,
                    "more than one associative rule of the same form"
                ),
                None => {
                    debug!(rule = rule.label(), form, "found associative rule");
                    forms[form] = Some(id);
                }
            }
        }
        info
    }

    pub fn get(&self, key: &RuleKey) -> Option<Forms> {
        self.rules.get(key).copied()
    }

    fn deduction_forms(&self, info: &WorksheetInfo, key: &RuleKey) -> Option<Forms> {
        let prefix_op = info.prefix()?.implication;
        self.deduction.get(&prefix_op)?.get(key).copied()
    }

    /// Tests whether every operand of `node` has the property of `gen`, looking through
    /// nested applications of the same operator.
    pub fn is_associative_with_prop(
        &self,
        info: &WorksheetInfo,
        closure: &ClosureInfo,
        node: &Expression,
        gen: &GeneralizedStmt,
    ) -> bool {
        gen.var_indexes.iter().all(|i| {
            let child = &node.children()[*i];
            if gen.matches(child) {
                self.is_associative_with_prop(info, closure, child, gen)
            } else {
                closure.get_closure_possibility(info, &gen.template, child)
            }
        })
    }

    pub fn detect(
        &self,
        info: &WorksheetInfo,
        closure: &ClosureInfo,
        node: &Expression,
    ) -> Option<GeneralizedStmt> {
        self.rules.visit(node, |key, places, _| {
            let places: [usize; 2] = match places {
                [a, b] => [*a, *b],
                _ => return None,
            };
            let gen = GeneralizedStmt::new(
                key.op,
                key.const_subst.clone(),
                key.template.clone(),
                places,
            );
            if key.template.is_empty()
                || (self.is_associative_with_prop(info, closure, node, &gen)
                    && (info.prefix().is_none() || self.deduction_forms(info, key).is_some()))
            {
                Some(gen)
            } else {
                None
            }
        })
    }

    /// Gets or creates `(a . b) . c = a . (b . c)`, where `.` puts its first operand at the
    /// variable position `from` of `gen`.
    #[allow(clippy::too_many_arguments)]
    pub fn create_associative_step(
        &self,
        info: &mut WorksheetInfo,
        closure: &ClosureInfo,
        eq_info: &EquivalenceInfo,
        gen: &GeneralizedStmt,
        from: usize,
        a: &Expression,
        b: &Expression,
        c: &Expression,
    ) -> Result<ProofStep, TransformError> {
        let key = gen.key();
        let forms = self.get(&key).ok_or_else(|| {
            TransformError::Invariant("no associative rule for the operator".to_owned())
        })?;
        let source = gen.create_assoc_binary(
            from,
            gen.create_assoc_binary(from, a.clone(), b.clone()),
            c.clone(),
        );
        let target = gen.create_assoc_binary(
            from,
            a.clone(),
            gen.create_assoc_binary(from, b.clone(), c.clone()),
        );
        let eq = eq_info.create_eq_node(info.library(), &source, &target)?;
        if let Some(step) = info.get_gen_step(&eq) {
            return Ok(step);
        }
        let deduction = self.deduction_forms(info, &key).unwrap_or([None; 2]);
        match (forms[from], forms[1 - from]) {
            (Some(rule), _) => closure.apply_rule(info, rule, deduction[from], &eq, &gen.template),
            (None, Some(rule)) => {
                let reversed = Expression::new(eq.head(), vec![target, source]);
                let step = closure.apply_rule(
                    info,
                    rule,
                    deduction[1 - from],
                    &reversed,
                    &gen.template,
                )?;
                eq_info.create_reverse_step(info, &step)
            }
            (None, None) => Err(TransformError::Invariant(
                "no associative rule for the operator".to_owned(),
            )),
        }
    }
}

/// Returns the key and the form of an associativity rule.
fn associative_shape(rule: &Rule, eq_info: &EquivalenceInfo) -> Option<(RuleKey, usize)> {
    let (template, _) = PropertyTemplate::from_hypotheses(rule)?;
    if rule.mandatory_vars().len() != 3 {
        return None;
    }
    let concl = rule.conclusion();
    if !eq_info.is_equivalence(concl.head()) {
        return None;
    }
    let (left, right) = match concl.children() {
        [left, right] => (left, right),
        _ => return None,
    };
    let op = left.head();
    if left.is_variable() || right.head() != op {
        return None;
    }
    let const_subst = ConstSubst::from_node(left);
    if const_subst != ConstSubst::from_node(right) {
        return None;
    }
    let places = const_subst.var_places();
    if places.len() != 2 {
        return None;
    }
    let applies = |node: &Expression| {
        node.head() == op && const_subst.check_and_get_var_positions(node).as_ref() == Some(&places)
    };
    let is_var = |node: &Expression| node.is_variable();

    for form in 0..2 {
        let (k, n) = (places[form], places[1 - form]);
        let (lk, ln, rk, rn) = (
            &left.children()[k],
            &left.children()[n],
            &right.children()[k],
            &right.children()[n],
        );
        if !applies(lk) || !applies(rn) || !is_var(ln) || !is_var(rk) {
            continue;
        }
        let (a, b, c) = (&lk.children()[k], &lk.children()[n], ln);
        if !is_var(a) || !is_var(b) || a == b || b == c || a == c {
            continue;
        }
        if ln == &rn.children()[n] && a == rk && b == &rn.children()[k] {
            return Some((RuleKey::new(op, const_subst.clone(), template), form));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    type Classifiers = (EquivalenceInfo, ImplicationInfo, ClosureInfo, AssociativeInfo);

    fn classifiers(f: &Fixture) -> Classifiers {
        let eq_info = deduction_equivalences(f);
        let impl_info = ImplicationInfo::new(&f.library, &eq_info);
        let closure = ClosureInfo::new(&f.library, &impl_info);
        let repl_info = ReplaceInfo::new(&f.library, &eq_info, &impl_info);
        let info = AssociativeInfo::new(&f.library, &eq_info, &impl_info, &closure, &repl_info);
        (eq_info, impl_info, closure, info)
    }

    #[test]
    fn finds_both_forms() {
        let f = Fixture::arith();
        let (_, _, _, info) = classifiers(&f);
        let plus = RuleKey::new(
            f.op("+"),
            ConstSubst::from_node(&f.parse("(A + B)")),
            PropertyTemplate::Empty,
        );
        assert_eq!(info.get(&plus), Some([Some(f.rule("addass")), None]));
        let ring = RuleKey::new(
            f.op("o"),
            ConstSubst::from_node(&f.parse("(A o B)")),
            PropertyTemplate::Empty,
        );
        assert_eq!(info.get(&ring), Some([None, Some(f.rule("oass"))]));
    }

    #[test]
    fn detection_looks_through_nested_applications() {
        let f = Fixture::arith();
        let (_, _, closure, info) = classifiers(&f);
        let mut ws = f.worksheet();
        ws.add_hypothesis(&f.library, f.parse("(A e. CC)"));
        ws.add_hypothesis(&f.library, f.parse("(B e. CC)"));
        let goal = ws.add_step(&f.library, f.parse("(A = D)"));
        let session = f.session(&mut ws, goal);

        assert!(info
            .detect(&session, &closure, &f.parse("((A * B) * (1 * A))"))
            .is_some());
        assert!(info
            .detect(&session, &closure, &f.parse("((A * C) * B)"))
            .is_none());
        assert!(info.detect(&session, &closure, &f.parse("(A + C)")).is_some());
    }

    #[test]
    fn missing_form_is_derived_by_symmetry() {
        let f = Fixture::arith();
        let (eq_info, _, closure, info) = classifiers(&f);
        let mut ws = f.worksheet();
        let goal = ws.add_step(&f.library, f.parse("(A = D)"));
        let mut session = f.session(&mut ws, goal);
        let gen = info.detect(&session, &closure, &f.parse("(A + B)")).unwrap();

        let (a, b, c) = (f.parse("A"), f.parse("B"), f.parse("C"));
        let step = info
            .create_associative_step(&mut session, &closure, &eq_info, &gen, 1, &a, &b, &c)
            .unwrap();
        assert_eq!(step.formula, f.parse("((C + (B + A)) = ((C + B) + A))"));
        // the rule step and its reversal
        assert_eq!(session.new_steps().len(), 2);
        drop(session);
        check_worksheet(&f.library, &ws);
    }

    #[test]
    fn first_rule_per_form_wins() {
        let f = Fixture::from_text(
            "typ wff\n\
             typ class\n\
             var wff ph ps ch\n\
             var class A B C D\n\
             opr wff <-> 2\n\
             opr wff = 2\n\
             opr class + 2\n\
             axm { (ph <-> ps) => (ps <-> ph) }: bicomi\n\
             axm { (ph <-> ps), (ps <-> ch) => (ph <-> ch) }: bitri\n\
             axm { (A = B) => (B = A) }: eqcomi\n\
             axm { (A = B), (B = C) => (A = C) }: eqtri\n\
             axm { (A = B) => ((A + C) = (B + C)) }: addeq1i\n\
             axm { (A = B) => ((C + A) = (C + B)) }: addeq2i\n\
             axm { (((A + B) + C) = (A + (B + C))) }: addass\n\
             axm { (((B + C) + D) = (B + (C + D))) }: addass2\n",
        );
        let (_, _, _, info) = classifiers(&f);
        let plus = RuleKey::new(
            f.op("+"),
            ConstSubst::from_node(&f.parse("(A + B)")),
            PropertyTemplate::Empty,
        );
        assert_eq!(info.get(&plus), Some([Some(f.rule("addass")), None]));
    }

    #[test]
    fn regrouping_under_the_prefix() {
        let f = Fixture::deduction();
        let (eq_info, impl_info, closure, info) = classifiers(&f);
        let mut ws = f.worksheet();
        ws.add_hypothesis(&f.library, f.parse("(ph -> (A e. CC))"));
        ws.add_hypothesis(&f.library, f.parse("(B e. CC)"));
        ws.add_hypothesis(&f.library, f.parse("(C e. CC)"));
        let goal = ws.add_step(&f.library, f.parse("(ph -> (((A * B) * C) = D))"));
        let mut session = f.session(&mut ws, goal);
        let node = f.parse("((A * B) * C)");
        assert!(info.detect(&session, &closure, &node).is_none());

        let prefix = impl_info
            .extract_prefix(&f.library, &session.derivation().formula)
            .unwrap();
        session.set_prefix(prefix).unwrap();
        let gen = info.detect(&session, &closure, &node).unwrap();
        let (a, b, c) = (f.parse("A"), f.parse("B"), f.parse("C"));
        let step = info
            .create_associative_step(&mut session, &closure, &eq_info, &gen, 0, &a, &b, &c)
            .unwrap();
        assert!(step.prefixed);
        assert_eq!(step.formula, f.parse("(ph -> (((A * B) * C) = (A * (B * C))))"));
        drop(session);
        check_worksheet(&f.library, &ws);
    }
}
