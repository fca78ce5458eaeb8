use super::{rule_label, EquivalenceInfo};
use crate::{
    expression::Expression,
    library::{Library, Rule},
    types::*,
    worksheet::Prefix,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Rules of the modus ponens shape `a, op(a, b) => b`.
///
/// If `op` is the equality of its arguments' type the rule is also the
/// _equivalence implication_ of that type: it turns a step `a` and a step `a <-> b` into `b`.
///
/// An implication which is not an equality and has a stub rule `b => op(a, b)` can prefix
/// statements. Rules whose hypotheses and conclusion all read `op(ph, _)` for one variable
/// `ph` are then the _deduction forms_ of the rules without the prefix, e.g.
/// `ph -> A = B => ph -> B = A` is the deduction form of `A = B => B = A`.
#[derive(Debug, Clone, Default)]
pub struct ImplicationInfo {
    implications: HashMap<Identifier, RuleId>,
    eq_implications: HashMap<TypeCode, RuleId>,
    stubs: HashMap<Identifier, RuleId>,
    deduction_eq_implications: HashMap<(Identifier, TypeCode), RuleId>,
}

impl ImplicationInfo {
    pub fn new(library: &Library, eq_info: &EquivalenceInfo) -> Self {
        let mut info = ImplicationInfo::default();
        for (id, rule) in library.rules() {
            let (op, var) = match implication_shape(rule) {
                Some(shape) => shape,
                None => continue,
            };
            if let Some(kept) = info.implications.get(&op) {
                warn!(
                    kept = rule_label(library, *kept),
                    ignored = rule.label(),
                    "more than one implication rule"
                );
                continue;
            }
            debug!(rule = rule.label(), "found implication rule");
            info.implications.insert(op, id);

            if let Some(ty) = library.typecode(var) {
                if eq_info.eq_operator(ty) == Some(op) && !info.eq_implications.contains_key(&ty) {
                    debug!(rule = rule.label(), "found equivalence implication rule");
                    info.eq_implications.insert(ty, id);
                }
            }
        }

        for (id, rule) in library.rules() {
            let op = match stub_shape(rule) {
                Some(op) if info.implications.contains_key(&op) => op,
                _ => continue,
            };
            if eq_info.is_equivalence(op) {
                continue;
            }
            if let Some(kept) = info.stubs.get(&op) {
                warn!(
                    kept = rule_label(library, *kept),
                    ignored = rule.label(),
                    "more than one stub rule"
                );
                continue;
            }
            debug!(rule = rule.label(), "found stub rule");
            info.stubs.insert(op, id);
        }

        for (id, rule) in library.rules() {
            let (prefix_op, core) = match info.deduction_form(rule) {
                Some(form) => form,
                None => continue,
            };
            let ty = match implication_shape(&core) {
                Some((op, var)) => match library.typecode(var) {
                    Some(ty) if eq_info.eq_operator(ty) == Some(op) => ty,
                    _ => continue,
                },
                None => continue,
            };
            if let Some(kept) = info.deduction_eq_implications.get(&(prefix_op, ty)) {
                warn!(
                    kept = rule_label(library, *kept),
                    ignored = rule.label(),
                    "more than one equivalence implication in deduction form"
                );
                continue;
            }
            debug!(rule = rule.label(), "found equivalence implication in deduction form");
            info.deduction_eq_implications.insert((prefix_op, ty), id);
        }
        info
    }

    /// The rule `a, a <-> b => b` for statements of type `ty`
    pub fn eq_implication(&self, ty: TypeCode) -> Option<RuleId> {
        self.eq_implications.get(&ty).copied()
    }

    /// The rule `ph -> a, ph -> (a <-> b) => ph -> b` for statements of type `ty`
    pub fn deduction_eq_implication(&self, prefix_op: Identifier, ty: TypeCode) -> Option<RuleId> {
        self.deduction_eq_implications.get(&(prefix_op, ty)).copied()
    }

    pub fn implication_rule(&self, op: Identifier) -> Option<RuleId> {
        self.implications.get(&op).copied()
    }

    pub fn is_implication_operator(&self, op: Identifier) -> bool {
        self.implications.contains_key(&op)
    }

    /// The rule `b => op(a, b)`
    pub fn stub_rule(&self, op: Identifier) -> Option<RuleId> {
        self.stubs.get(&op).copied()
    }

    /// Strips the prefix of a rule in deduction form. Returns the implication and the rule
    /// without the prefix.
    pub fn deduction_form(&self, rule: &Rule) -> Option<(Identifier, Rule)> {
        if rule.hypotheses().is_empty() {
            return None;
        }
        let concl = rule.conclusion();
        let op = concl.head();
        if !self.stubs.contains_key(&op) {
            return None;
        }
        let (prefix, core) = match concl.children() {
            [prefix, core] if prefix.is_variable() => (prefix, core),
            _ => return None,
        };
        let ph = prefix.head();
        if core.contains(ph) {
            return None;
        }
        let mut hypotheses = Vec::with_capacity(rule.hypotheses().len());
        for hyp in rule.hypotheses() {
            match hyp.children() {
                [p, h] if hyp.head() == op && p == prefix && !h.contains(ph) => {
                    hypotheses.push(h.clone())
                }
                _ => return None,
            }
        }
        Some((op, rule.with_statements(hypotheses, core.clone())))
    }

    /// Returns the prefix of a derivation step `ph -> core` if `ph` is a variable and
    /// equalities of `core`'s type can be applied under it.
    pub fn extract_prefix(&self, library: &Library, formula: &Expression) -> Option<Prefix> {
        let op = formula.head();
        let stub = self.stub_rule(op)?;
        let (hypothesis, core) = match formula.children() {
            [hypothesis, core] if hypothesis.is_variable() => (hypothesis, core),
            _ => return None,
        };
        self.deduction_eq_implication(op, library.type_of(core)?)?;
        Some(Prefix {
            implication: op,
            hypothesis: hypothesis.clone(),
            stub,
        })
    }
}

/// Returns the operator and the first variable of a rule `a, op(a, b) => b`.
fn implication_shape(rule: &Rule) -> Option<(Identifier, Identifier)> {
    let hyps = rule.hypotheses();
    if hyps.len() != 2 || rule.mandatory_vars().len() != 2 {
        return None;
    }
    let concl = rule.conclusion();
    if !concl.is_variable() {
        return None;
    }
    let b = concl.head();
    let (first, second) = (&hyps[0], &hyps[1]);
    if !first.is_variable() {
        if second.is_variable() && is_implication(first, second.head(), b) {
            debug!(rule = rule.label(), "implication rule with reversed hypotheses");
        }
        return None;
    }
    let a = first.head();
    if a != b && is_implication(second, a, b) {
        Some((second.head(), a))
    } else {
        None
    }
}

/// `b => op(a, b)`
fn stub_shape(rule: &Rule) -> Option<Identifier> {
    let hyp = match rule.hypotheses() {
        [hyp] if hyp.is_variable() => hyp,
        _ => return None,
    };
    let concl = rule.conclusion();
    match concl.children() {
        [a, b] if a.is_variable() && a != hyp && b == hyp => Some(concl.head()),
        _ => None,
    }
}

fn is_implication(node: &Expression, a: Identifier, b: Identifier) -> bool {
    match node.children() {
        [x, y] => x.arity() == 0 && x.head() == a && y.arity() == 0 && y.head() == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[test]
    fn finds_modus_ponens_rules() {
        let f = Fixture::from_text(
            "typ wff\n\
             var wff ph ps ch\n\
             opr wff -> 2\n\
             opr wff <-> 2\n\
             axm { ph, (ph -> ps) => ps }: ax-mp\n\
             axm { (ph <-> ps) => (ps <-> ph) }: bicomi\n\
             axm { (ph <-> ps), (ps <-> ch) => (ph <-> ch) }: bitri\n\
             axm { (ph <-> ps), ph => ps }: mpbir-like\n\
             axm { ph, (ph <-> ps) => ps }: mpbi\n",
        );
        let eq_info = EquivalenceInfo::new(&f.library);
        let info = ImplicationInfo::new(&f.library, &eq_info);
        assert!(info.is_implication_operator(f.op("->")));
        assert!(info.is_implication_operator(f.op("<->")));
        assert_eq!(info.implication_rule(f.op("->")), Some(f.rule("ax-mp")));
        assert_eq!(info.eq_implication(0), Some(f.rule("mpbi")));
    }

    #[test]
    fn no_equivalence_implication_without_equality() {
        let f = Fixture::from_text(
            "typ wff\n\
             var wff ph ps\n\
             opr wff -> 2\n\
             axm { ph, (ph -> ps) => ps }: ax-mp\n",
        );
        let eq_info = EquivalenceInfo::new(&f.library);
        let info = ImplicationInfo::new(&f.library, &eq_info);
        assert_eq!(info.eq_implication(0), None);
        assert!(info.is_implication_operator(f.op("->")));
    }

    #[test]
    fn first_implication_rule_wins() {
        let f = Fixture::from_text(
            "typ wff\n\
             var wff ph ps\n\
             opr wff -> 2\n\
             axm { ph, (ph -> ps) => ps }: ax-mp\n\
             axm { ps, (ps -> ph) => ph }: mp-again\n",
        );
        let info = ImplicationInfo::new(&f.library, &EquivalenceInfo::new(&f.library));
        assert_eq!(info.implication_rule(f.op("->")), Some(f.rule("ax-mp")));
    }

    #[test]
    fn deduction_forms() {
        let f = Fixture::deduction();
        let eq_info = EquivalenceInfo::new(&f.library);
        let info = ImplicationInfo::new(&f.library, &eq_info);
        let imp = f.op("->");
        assert_eq!(info.stub_rule(imp), Some(f.rule("a1i")));
        assert_eq!(info.stub_rule(f.op("<->")), None);
        assert_eq!(info.deduction_eq_implication(imp, 0), Some(f.rule("mpbid")));

        let (op, core) = info.deduction_form(f.library.rule(f.rule("eqcomd")).unwrap()).unwrap();
        assert_eq!(op, imp);
        assert_eq!(core.hypotheses(), &[f.parse("(A = B)")]);
        assert_eq!(core.conclusion(), &f.parse("(B = A)"));
        assert_eq!(core.mandatory_vars(), &[f.var("A"), f.var("B")]);
        assert_eq!(core.label(), "eqcomd");

        let rule = |label| f.library.rule(f.rule(label)).unwrap();
        assert!(info.deduction_form(rule("a1i")).is_none());
        assert!(info.deduction_form(rule("ax-mp")).is_none());
        assert!(info.deduction_form(rule("syl")).is_none());
    }

    #[test]
    fn prefix_of_a_derivation_step() {
        let f = Fixture::deduction();
        let eq_info = EquivalenceInfo::new(&f.library);
        let info = ImplicationInfo::new(&f.library, &eq_info);
        let prefix = info
            .extract_prefix(&f.library, &f.parse("(ph -> ((A + B) = C))"))
            .unwrap();
        assert_eq!(prefix.implication, f.op("->"));
        assert_eq!(prefix.hypothesis, f.parse("ph"));
        assert_eq!(prefix.stub, f.rule("a1i"));
        assert_eq!(
            prefix.strip(&f.parse("(ph -> (A e. CC))")),
            Some(&f.parse("(A e. CC)"))
        );
        assert_eq!(prefix.strip(&f.parse("(ps -> (A e. CC))")), None);

        assert!(info
            .extract_prefix(&f.library, &f.parse("((ph <-> ps) -> (A = C))"))
            .is_none());
        assert!(info
            .extract_prefix(&f.library, &f.parse("((A + B) = C)"))
            .is_none());
    }
}
