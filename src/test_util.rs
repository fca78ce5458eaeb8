use crate::{
    config::TransformConfig,
    expression::{is_operator, Expression},
    info::{EquivalenceInfo, ImplicationInfo},
    library::Library,
    serialization::{parse_expression, parse_library},
    types::*,
    worksheet::{Justification, ProofWorksheet, Worksheet, WorksheetInfo},
};
use std::collections::HashSet;

/// A small excerpt of set.mm: propositional equivalence, class equality, addition,
/// multiplication with closure side conditions, a subtraction that can only be replaced on
/// the right and a ring operator `o` that is associative but not commutative. `#` is
/// commutative but can only be replaced on the right.
const ARITH: &str = "
typ wff
typ class
var wff ph ps ch th
var class A B C D E F
opr wff <-> 2
opr wff = 2
opr wff e. 2
opr class + 2
opr class * 2
opr class - 2
opr class o 2
opr class CC 0
opr class 1 0
opr class # 2

axm { (ph <-> ps) => (ps <-> ph) }: bicomi
axm { (ph <-> ps), (ps <-> ch) => (ph <-> ch) }: bitri
axm { ph, (ph <-> ps) => ps }: mpbi
axm { (A = B) => (B = A) }: eqcomi
axm { (A = B), (B = C) => (A = C) }: eqtri
axm { (A = B) => ((A = C) <-> (B = C)) }: eqeq1i
axm { (A = B) => ((C = A) <-> (C = B)) }: eqeq2i

axm { (A = B) => ((A + C) = (B + C)) }: addeq1i
axm { (A = B) => ((C + A) = (C + B)) }: addeq2i
axm { ((A + B) = (B + A)) }: addcom
axm { (((A + B) + C) = (A + (B + C))) }: addass

axm { (A e. CC), (B e. CC) => ((A * B) e. CC) }: mulcl
axm { (A e. CC), (B e. CC) => ((A * B) = (B * A)) }: mulcom
axm { (A e. CC), (B e. CC), (C e. CC) => (((A * B) * C) = (A * (B * C))) }: mulass
axm { (A = B) => ((A * C) = (B * C)) }: muleq1i
axm { (A = B) => ((C * A) = (C * B)) }: muleq2i
axm { (1 e. CC) }: ax1cn

axm { (A = B) => ((C - B) = (C - A)) }: subeq2i

axm { (A = B) => ((C # A) = (C # B)) }: hasheq2i
axm { ((A # B) = (B # A)) }: hashcom

axm { (A = B) => ((A o C) = (B o C)) }: oeq1i
axm { (A = B) => ((C o A) = (C o B)) }: oeq2i
axm { ((A o (B o C)) = ((A o B) o C)) }: oass
";

/// Deduction forms `ph -> ...` of the rules in [`ARITH`] together with modus ponens and the
/// stub rule `a1i` for `->`.
const DEDUCTION: &str = "
opr wff -> 2

axm { ph, (ph -> ps) => ps }: ax-mp
axm { ps => (ph -> ps) }: a1i
axm { (ph -> ps), (ps -> ch) => (ph -> ch) }: syl
axm { (ph -> ps), (ph -> (ps <-> ch)) => (ph -> ch) }: mpbid
axm { (ph -> (ps <-> ch)) => (ph -> (ch <-> ps)) }: bicomd
axm { (ph -> (ps <-> ch)), (ph -> (ch <-> th)) => (ph -> (ps <-> th)) }: bitrd
axm { (ph -> (A = B)) => (ph -> (B = A)) }: eqcomd
axm { (ph -> (A = B)), (ph -> (B = C)) => (ph -> (A = C)) }: eqtrd
axm { (ph -> (A = B)) => (ph -> ((A = C) <-> (B = C))) }: eqeq1d
axm { (ph -> (A = B)) => (ph -> ((C = A) <-> (C = B))) }: eqeq2d

axm { (ph -> (A = B)) => (ph -> ((A + C) = (B + C))) }: addeq1d
axm { (ph -> (A = B)) => (ph -> ((C + A) = (C + B))) }: addeq2d
axm { (ph -> (A = B)) => (ph -> ((A * C) = (B * C))) }: muleq1d
axm { (ph -> (A = B)) => (ph -> ((C * A) = (C * B))) }: muleq2d
axm { (ph -> (A e. CC)), (ph -> (B e. CC)) => (ph -> ((A * B) e. CC)) }: mulcld
axm { (ph -> (A e. CC)), (ph -> (B e. CC)) => (ph -> ((A * B) = (B * A))) }: mulcomd
axm { (ph -> (A e. CC)), (ph -> (B e. CC)), (ph -> (C e. CC)) => \
    (ph -> (((A * B) * C) = (A * (B * C)))) }: mulassd
";

pub(crate) struct Fixture {
    pub library: Library,
}

impl Fixture {
    pub fn arith() -> Self {
        Self::from_text(ARITH)
    }

    pub fn deduction() -> Self {
        Self::from_text(&format!("{}{}", ARITH, DEDUCTION))
    }

    pub fn from_text(text: &str) -> Self {
        Fixture {
            library: parse_library(text).unwrap(),
        }
    }

    pub fn parse(&self, text: &str) -> Expression {
        parse_expression(&self.library, text).unwrap()
    }

    pub fn op(&self, label: &str) -> Identifier {
        let id = self.library.lookup(label).unwrap();
        assert!(is_operator(id), "{} is not an operator", label);
        id
    }

    pub fn var(&self, label: &str) -> Identifier {
        let id = self.library.lookup(label).unwrap();
        assert!(!is_operator(id), "{} is not a variable", label);
        id
    }

    pub fn rule(&self, label: &str) -> RuleId {
        self.library.rule_by_label(label).unwrap().0
    }

    pub fn worksheet(&self) -> ProofWorksheet {
        ProofWorksheet::new(self.library.next_seq())
    }

    pub fn session<'a>(
        &'a self,
        worksheet: &'a mut ProofWorksheet,
        goal: StepId,
    ) -> WorksheetInfo<'a> {
        WorksheetInfo::new(&self.library, worksheet, goal, TransformConfig::default()).unwrap()
    }
}

/// The equalities of `f` including their deduction forms.
pub(crate) fn deduction_equivalences(f: &Fixture) -> EquivalenceInfo {
    let mut eq_info = EquivalenceInfo::new(&f.library);
    let impl_info = ImplicationInfo::new(&f.library, &eq_info);
    eq_info.fill_deduction_rules(&f.library, &impl_info);
    eq_info
}

/// Replays every derived step of `worksheet` against the rule it cites.
pub(crate) fn check_worksheet(library: &Library, worksheet: &ProofWorksheet) {
    let mut seen = HashSet::new();
    for (id, step) in worksheet.steps() {
        if let Justification::Derived { rule, hyps } = &step.justification {
            let (_, r) = library
                .rule_by_label(rule)
                .unwrap_or_else(|| panic!("step {} cites unknown rule {}", step.label, rule));
            assert!(r.seq() < worksheet.max_seq(), "rule {} is not in scope", rule);
            let formulas: Vec<&Expression> = hyps
                .iter()
                .map(|h| {
                    assert!(seen.contains(h), "step {} uses the later step {}", id, h);
                    &worksheet.step(*h).unwrap().formula
                })
                .collect();
            if let Err(e) = library.check_instance(r, &step.formula, &formulas) {
                panic!("step {} ({}) is no instance of {}: {:?}", step.label, step.text, rule, e);
            }
        }
        seen.insert(id);
    }
}
