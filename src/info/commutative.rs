use super::{add_first, ClosureInfo, EquivalenceInfo, ImplicationInfo};
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

/// Commutativity rules `f(.., a, .., b, ..) = f(.., b, .., a, ..)`, optionally with closure
/// hypotheses for `a` and `b`.
///
/// Under an implication prefix a rule with closure hypotheses needs its deduction form
/// `ph -> A e. CC, ph -> B e. CC => ph -> (A * B) = (B * A)`.
#[derive(Debug, Clone, Default)]
pub struct CommutativeInfo {
    rules: ComplexRuleMap<RuleId>,
    deduction: HashMap<Identifier, ComplexRuleMap<RuleId>>,
}

impl CommutativeInfo {
    pub fn new(library: &Library, eq_info: &EquivalenceInfo, impl_info: &ImplicationInfo) -> Self {
        let mut info = CommutativeInfo::default();
        for (id, rule) in library.rules() {
            if let Some(key) = commutative_shape(rule, eq_info) {
                add_first(library, &mut info.rules, key, id, "commutative");
            } else if let Some((prefix_op, core)) = impl_info.deduction_form(rule) {
                if let Some(key) = commutative_shape(&core, eq_info) {
                    let rules = info.deduction.entry(prefix_op).or_default();
                    add_first(library, rules, key, id, "deduction commutative");
                }
            }
        }
        info
    }

    pub fn get(&self, key: &RuleKey) -> Option<RuleId> {
        self.rules.get(key).copied()
    }

    fn deduction_rule(&self, info: &WorksheetInfo, key: &RuleKey) -> Option<RuleId> {
        let prefix_op = info.prefix()?.implication;
        self.deduction.get(&prefix_op)?.get(key).copied()
    }

    /// Finds a commutativity rule which applies to `node`, i.e. its side conditions hold or
    /// can be proven for both operands. With a prefix the rule also needs a deduction form.
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
            let applicable = key.template.is_empty()
                || (places.iter().all(|p| {
                    closure.get_closure_possibility(info, &key.template, &node.children()[*p])
                }) && (info.prefix().is_none() || self.deduction_rule(info, key).is_some()));
            if applicable {
                Some(GeneralizedStmt::new(
                    key.op,
                    key.const_subst.clone(),
                    key.template.clone(),
                    places,
                ))
            } else {
                None
            }
        })
    }

    /// Tests whether `gen` can be swapped in this session.
    pub fn is_com_op(&self, info: &WorksheetInfo, gen: &GeneralizedStmt) -> bool {
        let key = gen.key();
        self.rules.contains(&key)
            && (info.prefix().is_none()
                || key.template.is_empty()
                || self.deduction_rule(info, &key).is_some())
    }

    /// Gets or creates `source = source'`, where `source'` has the two operands swapped.
    pub fn create_commutative_step(
        &self,
        info: &mut WorksheetInfo,
        closure: &ClosureInfo,
        source: &Expression,
        gen: &GeneralizedStmt,
    ) -> Result<ProofStep, TransformError> {
        let key = gen.key();
        let rule = self.get(&key).ok_or_else(|| {
            TransformError::Invariant(format!(
                "no commutative rule for {}",
                info.library().expression_to_string(source)
            ))
        })?;
        let eq_op = info
            .library()
            .rule(rule)
            .map(|r| r.conclusion().head())
            .ok_or(TransformError::UnknownRule(rule))?;
        let [i, j] = gen.var_indexes;
        let node = Expression::new(eq_op, vec![source.clone(), source.with_swapped(i, j)]);
        let deduction = self.deduction_rule(info, &key);
        closure.apply_rule(info, rule, deduction, &node, &gen.template)
    }
}

fn commutative_shape(rule: &Rule, eq_info: &EquivalenceInfo) -> Option<RuleKey> {
    let template = PropertyTemplate::for_operation(rule)?;
    if rule.mandatory_vars().len() != 2 {
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
    if left.is_variable() || left.head() != right.head() {
        return None;
    }
    let const_subst = ConstSubst::from_node(left);
    if const_subst != ConstSubst::from_node(right) {
        return None;
    }
    let (k0, k1) = match const_subst.var_places().as_slice() {
        [k0, k1] => (*k0, *k1),
        _ => return None,
    };
    let (a, b) = (&left.children()[k0], &left.children()[k1]);
    if !a.is_variable() || !b.is_variable() || a == b {
        return None;
    }
    if &right.children()[k0] == b && &right.children()[k1] == a {
        Some(RuleKey::new(left.head(), const_subst, template))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[test]
    fn finds_commutative_rules() {
        let f = Fixture::arith();
        let eq_info = EquivalenceInfo::new(&f.library);
        let impl_info = ImplicationInfo::new(&f.library, &eq_info);
        let info = CommutativeInfo::new(&f.library, &eq_info, &impl_info);
        let plus = RuleKey::new(
            f.op("+"),
            ConstSubst::from_node(&f.parse("(A + B)")),
            PropertyTemplate::Empty,
        );
        assert_eq!(info.get(&plus), Some(f.rule("addcom")));
        let times = RuleKey::new(
            f.op("*"),
            ConstSubst::from_node(&f.parse("(A * B)")),
            PropertyTemplate::Empty,
        );
        assert_eq!(info.get(&times), None);
        // addcom, mulcom and hashcom
        assert_eq!(info.rules.len(), 3);
    }

    #[test]
    fn detection_needs_closure() {
        let f = Fixture::arith();
        let eq_info = EquivalenceInfo::new(&f.library);
        let impl_info = ImplicationInfo::new(&f.library, &eq_info);
        let closure = ClosureInfo::new(&f.library, &impl_info);
        let info = CommutativeInfo::new(&f.library, &eq_info, &impl_info);
        let mut ws = f.worksheet();
        ws.add_hypothesis(&f.library, f.parse("(A e. CC)"));
        let goal = ws.add_step(&f.library, f.parse("(A = D)"));
        let mut session = f.session(&mut ws, goal);

        assert!(info.detect(&session, &closure, &f.parse("(B + C)")).is_some());
        assert!(info.detect(&session, &closure, &f.parse("(A * B)")).is_none());
        let gen = info.detect(&session, &closure, &f.parse("(A * 1)")).unwrap();
        assert!(info.is_com_op(&session, &gen));
        assert!(!gen.template.is_empty());

        let step = info
            .create_commutative_step(&mut session, &closure, &f.parse("(A * 1)"), &gen)
            .unwrap();
        assert_eq!(step.formula, f.parse("((A * 1) = (1 * A))"));
        drop(session);
        check_worksheet(&f.library, &ws);
    }

    #[test]
    fn first_commutative_rule_wins() {
        let f = Fixture::from_text(
            "typ wff\n\
             typ class\n\
             var wff ph ps ch\n\
             var class A B C\n\
             opr wff <-> 2\n\
             opr wff = 2\n\
             opr class + 2\n\
             axm { (ph <-> ps) => (ps <-> ph) }: bicomi\n\
             axm { (ph <-> ps), (ps <-> ch) => (ph <-> ch) }: bitri\n\
             axm { (A = B) => (B = A) }: eqcomi\n\
             axm { (A = B), (B = C) => (A = C) }: eqtri\n\
             axm { ((A + B) = (B + A)) }: addcom\n\
             axm { ((B + A) = (A + B)) }: addcom2\n",
        );
        let eq_info = EquivalenceInfo::new(&f.library);
        let impl_info = ImplicationInfo::new(&f.library, &eq_info);
        let info = CommutativeInfo::new(&f.library, &eq_info, &impl_info);
        let plus = RuleKey::new(
            f.op("+"),
            ConstSubst::from_node(&f.parse("(A + B)")),
            PropertyTemplate::Empty,
        );
        assert_eq!(info.get(&plus), Some(f.rule("addcom")));
        assert_eq!(info.rules.len(), 1);
    }

    #[test]
    fn swapping_under_the_prefix() {
        let f = Fixture::deduction();
        let eq_info = deduction_equivalences(&f);
        let impl_info = ImplicationInfo::new(&f.library, &eq_info);
        let closure = ClosureInfo::new(&f.library, &impl_info);
        let info = CommutativeInfo::new(&f.library, &eq_info, &impl_info);
        let mut ws = f.worksheet();
        ws.add_hypothesis(&f.library, f.parse("(ph -> (A e. CC))"));
        ws.add_hypothesis(&f.library, f.parse("(B e. CC)"));
        let goal = ws.add_step(&f.library, f.parse("(ph -> ((A * B) = C))"));
        let mut session = f.session(&mut ws, goal);
        assert!(info.detect(&session, &closure, &f.parse("(A * B)")).is_none());

        let prefix = impl_info
            .extract_prefix(&f.library, &session.derivation().formula)
            .unwrap();
        session.set_prefix(prefix).unwrap();
        let gen = info.detect(&session, &closure, &f.parse("(A * B)")).unwrap();
        assert!(info.is_com_op(&session, &gen));
        let step = info
            .create_commutative_step(&mut session, &closure, &f.parse("(A * B)"), &gen)
            .unwrap();
        assert!(step.prefixed);
        assert_eq!(step.formula, f.parse("(ph -> ((A * B) = (B * A)))"));

        let plus = info.detect(&session, &closure, &f.parse("(A + B)")).unwrap();
        let step = info
            .create_commutative_step(&mut session, &closure, &f.parse("(A + B)"), &plus)
            .unwrap();
        assert!(!step.prefixed);
        drop(session);
        check_worksheet(&f.library, &ws);
    }
}
