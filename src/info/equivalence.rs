use super::{distinct_variables, rule_label, ImplicationInfo};
use crate::{
    error::TransformError,
    expression::Expression,
    library::{Library, Rule},
    types::*,
    worksheet::{ProofStep, WorksheetInfo},
};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EqRules {
    symmetry: RuleId,
    transitivity: RuleId,
}

/// The equality operators of a library together with their symmetry and transitivity rules.
///
/// An operator only counts as an equality if the library proves both
/// `a = b => b = a` and `a = b, b = c => a = c` for it. The deduction forms of both rules,
/// indexed by implication and equality, are needed to chain steps under a prefix.
#[derive(Debug, Clone, Default)]
pub struct EquivalenceInfo {
    operators: HashMap<Identifier, EqRules>,
    by_type: HashMap<TypeCode, Identifier>,
    deduction: HashMap<(Identifier, Identifier), EqRules>,
}

impl EquivalenceInfo {
    pub fn new(library: &Library) -> Self {
        let mut symmetry: HashMap<Identifier, RuleId> = HashMap::new();
        let mut transitivity: HashMap<Identifier, RuleId> = HashMap::new();
        for (id, rule) in library.rules() {
            if let Some(op) = symmetry_operator(rule) {
                insert_first(library, &mut symmetry, op, id, "symmetry");
            } else if let Some(op) = transitivity_operator(rule) {
                insert_first(library, &mut transitivity, op, id, "transitivity");
            }
        }

        let mut candidates: Vec<(Identifier, EqRules, TypeCode)> = Vec::new();
        for (op, sym) in symmetry {
            let trans = match transitivity.get(&op) {
                Some(trans) => *trans,
                None => continue,
            };
            let ty = library
                .rule(sym)
                .and_then(|r| r.hypotheses().first())
                .and_then(|h| h.child(0))
                .and_then(|a| library.type_of(a));
            if let Some(ty) = ty {
                candidates.push((
                    op,
                    EqRules {
                        symmetry: sym,
                        transitivity: trans,
                    },
                    ty,
                ));
            }
        }
        candidates.sort_by_key(|(op, _, _)| library.seq(*op));

        let mut info = EquivalenceInfo::default();
        for (op, rules, ty) in candidates {
            if let Some(other) = info.by_type.get(&ty) {
                warn!(
                    kept = library.label(*other).unwrap_or("?"),
                    ignored = library.label(op).unwrap_or("?"),
                    typecode = library.type_name(ty).unwrap_or("?"),
                    "more than one equality operator for the same type"
                );
                continue;
            }
            debug!(operator = library.label(op).unwrap_or("?"), "equality operator");
            info.by_type.insert(ty, op);
            info.operators.insert(op, rules);
        }
        info
    }

    /// Collects the deduction forms of the symmetry and transitivity rules. Needs the
    /// implications, which in turn are classified with the equalities.
    pub fn fill_deduction_rules(&mut self, library: &Library, impl_info: &ImplicationInfo) {
        let mut symmetry: HashMap<(Identifier, Identifier), RuleId> = HashMap::new();
        let mut transitivity: HashMap<(Identifier, Identifier), RuleId> = HashMap::new();
        for (id, rule) in library.rules() {
            let (prefix_op, core) = match impl_info.deduction_form(rule) {
                Some(form) => form,
                None => continue,
            };
            if let Some(op) = symmetry_operator(&core).filter(|op| self.is_equivalence(*op)) {
                insert_first(library, &mut symmetry, (prefix_op, op), id, "deduction symmetry");
            } else if let Some(op) =
                transitivity_operator(&core).filter(|op| self.is_equivalence(*op))
            {
                insert_first(
                    library,
                    &mut transitivity,
                    (prefix_op, op),
                    id,
                    "deduction transitivity",
                );
            }
        }
        for (key, sym) in symmetry {
            if let Some(trans) = transitivity.get(&key) {
                self.deduction.insert(
                    key,
                    EqRules {
                        symmetry: sym,
                        transitivity: *trans,
                    },
                );
            }
        }
    }

    fn deduction_rules(&self, info: &WorksheetInfo, op: Identifier) -> Option<EqRules> {
        let prefix_op = info.prefix()?.implication;
        self.deduction.get(&(prefix_op, op)).copied()
    }

    pub fn is_equivalence(&self, op: Identifier) -> bool {
        self.operators.contains_key(&op)
    }

    /// The equality operator for objects of type `ty`
    pub fn eq_operator(&self, ty: TypeCode) -> Option<Identifier> {
        self.by_type.get(&ty).copied()
    }

    pub fn symmetry_rule(&self, op: Identifier) -> Option<RuleId> {
        self.operators.get(&op).map(|r| r.symmetry)
    }

    pub fn transitivity_rule(&self, op: Identifier) -> Option<RuleId> {
        self.operators.get(&op).map(|r| r.transitivity)
    }

    /// Builds `a = b` with the equality operator of `a`'s type.
    pub fn create_eq_node(
        &self,
        library: &Library,
        a: &Expression,
        b: &Expression,
    ) -> Result<Expression, TransformError> {
        let op = library
            .type_of(a)
            .and_then(|ty| self.eq_operator(ty))
            .ok_or_else(|| {
                TransformError::NoMatch(format!(
                    "no equality for {}",
                    library.expression_to_string(a)
                ))
            })?;
        Ok(Expression::new(op, vec![a.clone(), b.clone()]))
    }

    /// From `a = b` gets or creates `b = a`. Both steps may carry the prefix.
    pub fn create_reverse_step(
        &self,
        info: &mut WorksheetInfo,
        step: &ProofStep,
    ) -> Result<ProofStep, TransformError> {
        let op = step.core().head();
        let rule = self.symmetry_rule(op).ok_or_else(|| {
            TransformError::Invariant(format!("operator {} is not an equality", op))
        })?;
        let (a, b) = step.sides()?;
        let node = Expression::new(op, vec![b.clone(), a.clone()]);
        let deduction = self.deduction_rules(info, op).map(|r| r.symmetry);
        info.get_or_create_gen_step(node, vec![step.clone()], rule, deduction)
    }

    /// From `a = b` and `b = c` gets or creates `a = c`. Without a first step the second one
    /// is returned as is. If one of the steps carries the prefix, so does the result.
    pub fn get_transitive_step(
        &self,
        info: &mut WorksheetInfo,
        first: Option<ProofStep>,
        second: ProofStep,
    ) -> Result<ProofStep, TransformError> {
        let first = match first {
            Some(first) => first,
            None => return Ok(second),
        };
        let op = first.core().head();
        if second.core().head() != op {
            return Err(TransformError::Invariant(format!(
                "steps {} and {} use different equalities",
                first.id, second.id
            )));
        }
        let rule = self.transitivity_rule(op).ok_or_else(|| {
            TransformError::Invariant(format!("operator {} is not an equality", op))
        })?;
        let (a, b) = first.sides()?;
        let (b1, c) = second.sides()?;
        if b != b1 {
            return Err(TransformError::Invariant(format!(
                "steps {} and {} can not be chained",
                first.id, second.id
            )));
        }
        let node = Expression::new(op, vec![a.clone(), c.clone()]);
        let deduction = self.deduction_rules(info, op).map(|r| r.transitivity);
        info.get_or_create_gen_step(node, vec![first, second], rule, deduction)
    }

    /// Chains two optional equality steps.
    pub fn chain(
        &self,
        info: &mut WorksheetInfo,
        first: Option<ProofStep>,
        second: Option<ProofStep>,
    ) -> Result<Option<ProofStep>, TransformError> {
        match second {
            Some(second) => self.get_transitive_step(info, first, second).map(Some),
            None => Ok(first),
        }
    }
}

fn insert_first<K: std::hash::Hash + Eq>(
    library: &Library,
    rules: &mut HashMap<K, RuleId>,
    key: K,
    id: RuleId,
    kind: &str,
) {
    let label = rule_label(library, id);
    match rules.get(&key) {
        Some(kept) => warn!(
            kept = rule_label(library, *kept),
            ignored = label,
            kind,
            "more than one rule of the same kind"
        ),
        None => {
            debug!(rule = label, kind, "found rule");
            rules.insert(key, id);
        }
    }
}

/// `a = b => b = a`
fn symmetry_operator(rule: &Rule) -> Option<Identifier> {
    if rule.hypotheses().len() != 1 || rule.mandatory_vars().len() != 2 {
        return None;
    }
    let hyp = &rule.hypotheses()[0];
    let concl = rule.conclusion();
    if hyp.depth() != 2 || concl.depth() != 2 || hyp.head() != concl.head() {
        return None;
    }
    let vars = distinct_variables(hyp.children())?;
    match (vars.as_slice(), concl.children()) {
        ([a, b], [c0, c1]) if c0.head() == *b && c1.head() == *a => Some(hyp.head()),
        _ => None,
    }
}

/// `a = b, b = c => a = c`
fn transitivity_operator(rule: &Rule) -> Option<Identifier> {
    if rule.hypotheses().len() != 2 || rule.mandatory_vars().len() != 3 {
        return None;
    }
    let (h0, h1, concl) = (&rule.hypotheses()[0], &rule.hypotheses()[1], rule.conclusion());
    let op = concl.head();
    if [h0, h1, concl]
        .iter()
        .any(|e| e.head() != op || e.depth() != 2 || e.arity() != 2)
    {
        return None;
    }
    let first = distinct_variables(h0.children())?;
    let second = distinct_variables(h1.children())?;
    let result = distinct_variables(concl.children())?;
    if first[1] == second[0]
        && first[0] == result[0]
        && second[1] == result[1]
        && result[0] != first[1]
        && result[1] != first[1]
    {
        Some(op)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[test]
    fn finds_equalities_per_type() {
        let f = Fixture::arith();
        let info = EquivalenceInfo::new(&f.library);
        let wff = f.library.type_code("wff").unwrap();
        let class = f.library.type_code("class").unwrap();
        assert_eq!(info.eq_operator(wff), Some(f.op("<->")));
        assert_eq!(info.eq_operator(class), Some(f.op("=")));
        assert!(!info.is_equivalence(f.op("e.")));
        assert_eq!(info.symmetry_rule(f.op("=")), Some(f.rule("eqcomi")));
        assert_eq!(info.transitivity_rule(f.op("<->")), Some(f.rule("bitri")));
    }

    #[test]
    fn operators_without_transitivity_are_dropped() {
        let f = Fixture::from_text(
            "typ wff\n\
             var wff ph ps ch\n\
             opr wff <-> 2\n\
             opr wff == 2\n\
             axm { (ph <-> ps) => (ps <-> ph) }: bicomi\n\
             axm { (ph <-> ps), (ps <-> ch) => (ph <-> ch) }: bitri\n\
             axm { (ph == ps) => (ps == ph) }: eqsym\n",
        );
        let info = EquivalenceInfo::new(&f.library);
        assert!(info.is_equivalence(f.op("<->")));
        assert!(!info.is_equivalence(f.op("==")));
    }

    #[test]
    fn first_equality_per_type_wins() {
        let f = Fixture::from_text(
            "typ wff\n\
             var wff ph ps ch\n\
             opr wff <-> 2\n\
             opr wff == 2\n\
             axm { (ph == ps) => (ps == ph) }: eqsym\n\
             axm { (ph == ps), (ps == ch) => (ph == ch) }: eqtr\n\
             axm { (ph <-> ps) => (ps <-> ph) }: bicomi\n\
             axm { (ph <-> ps), (ps <-> ch) => (ph <-> ch) }: bitri\n",
        );
        let info = EquivalenceInfo::new(&f.library);
        assert_eq!(info.eq_operator(0), Some(f.op("<->")));
        assert!(!info.is_equivalence(f.op("==")));
    }

    #[test]
    fn reverse_and_transitive_steps() {
        let f = Fixture::arith();
        let info = EquivalenceInfo::new(&f.library);
        let mut ws = f.worksheet();
        let h1 = ws.add_hypothesis(&f.library, f.parse("(A = B)"));
        let h2 = ws.add_hypothesis(&f.library, f.parse("(B = C)"));
        let goal = ws.add_step(&f.library, f.parse("(A = D)"));
        let mut session = f.session(&mut ws, goal);

        let first = ProofStep::new(h1, f.parse("(A = B)"));
        let second = ProofStep::new(h2, f.parse("(B = C)"));
        let ac = info
            .get_transitive_step(&mut session, Some(first.clone()), second.clone())
            .unwrap();
        assert_eq!(ac.formula, f.parse("(A = C)"));
        let ca = info.create_reverse_step(&mut session, &ac).unwrap();
        assert_eq!(ca.formula, f.parse("(C = A)"));
        assert_eq!(
            info.get_transitive_step(&mut session, None, second.clone()),
            Ok(second.clone())
        );
        assert!(matches!(
            info.get_transitive_step(&mut session, Some(second), first),
            Err(TransformError::Invariant(_))
        ));
        drop(session);
        check_worksheet(&f.library, &ws);
    }

    #[test]
    fn first_symmetry_rule_wins() {
        let f = Fixture::from_text(
            "typ wff\n\
             var wff ph ps ch\n\
             opr wff <-> 2\n\
             axm { (ph <-> ps) => (ps <-> ph) }: bicomi\n\
             axm { (ps <-> ch) => (ch <-> ps) }: bicomi2\n\
             axm { (ph <-> ps), (ps <-> ch) => (ph <-> ch) }: bitri\n",
        );
        let info = EquivalenceInfo::new(&f.library);
        assert_eq!(info.symmetry_rule(f.op("<->")), Some(f.rule("bicomi")));
    }

    #[test]
    fn deduction_rules() {
        let f = Fixture::deduction();
        let info = deduction_equivalences(&f);
        let imp = f.op("->");
        assert!(!info.is_equivalence(imp));
        assert_eq!(
            info.deduction.get(&(imp, f.op("="))),
            Some(&EqRules {
                symmetry: f.rule("eqcomd"),
                transitivity: f.rule("eqtrd"),
            })
        );
        assert_eq!(
            info.deduction.get(&(imp, f.op("<->"))).map(|r| r.transitivity),
            Some(f.rule("bitrd"))
        );
        assert!(EquivalenceInfo::new(&f.library).deduction.is_empty());
    }

    #[test]
    fn steps_under_the_prefix() {
        let f = Fixture::deduction();
        let info = deduction_equivalences(&f);
        let impl_info = ImplicationInfo::new(&f.library, &info);
        let mut ws = f.worksheet();
        let h1 = ws.add_hypothesis(&f.library, f.parse("(ph -> (A = B))"));
        let h2 = ws.add_hypothesis(&f.library, f.parse("(B = C)"));
        let goal = ws.add_step(&f.library, f.parse("(ph -> (A = D))"));
        let mut session = f.session(&mut ws, goal);
        let prefix = impl_info
            .extract_prefix(&f.library, &session.derivation().formula)
            .unwrap();
        session.set_prefix(prefix).unwrap();

        let first = ProofStep::with_prefix(h1, f.parse("(ph -> (A = B))"));
        let second = ProofStep::new(h2, f.parse("(B = C)"));
        let ac = info
            .get_transitive_step(&mut session, Some(first), second)
            .unwrap();
        assert!(ac.prefixed);
        assert_eq!(ac.formula, f.parse("(ph -> (A = C))"));
        let ca = info.create_reverse_step(&mut session, &ac).unwrap();
        assert_eq!(ca.formula, f.parse("(ph -> (C = A))"));
        // the lifted second step, the transitive step and its reversal
        assert_eq!(session.new_steps().len(), 3);
        drop(session);
        check_worksheet(&f.library, &ws);
    }
}
