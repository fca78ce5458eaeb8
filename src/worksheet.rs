//! The bridge between the transformation engine and a proof worksheet.
//!
//! The engine never touches a worksheet directly. [`WorksheetInfo`] looks up existing steps,
//! checks every new step against the rule it cites and appends it through the [`Worksheet`]
//! trait. [`ProofWorksheet`] is a small in-memory implementation of that trait.

use crate::{
    config::TransformConfig,
    error::TransformError,
    expression::Expression,
    library::Library,
    substitution::WholeSubstitution,
    types::*,
};
use std::collections::HashMap;
use tracing::{debug, trace};

/// A step of a worksheet together with its formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofStep {
    pub id: StepId,
    pub formula: Expression,
    /// Set if the formula is `prefix -> core` for the [`Prefix`] of the session
    pub prefixed: bool,
}

impl ProofStep {
    pub fn new(id: StepId, formula: Expression) -> Self {
        ProofStep {
            id,
            formula,
            prefixed: false,
        }
    }

    /// A step whose formula carries the implication prefix of the session
    pub fn with_prefix(id: StepId, formula: Expression) -> Self {
        ProofStep {
            id,
            formula,
            prefixed: true,
        }
    }

    fn into_prefixed(self) -> Self {
        ProofStep {
            prefixed: true,
            ..self
        }
    }

    /// The formula without the implication prefix
    pub fn core(&self) -> &Expression {
        match (self.prefixed, self.formula.child(1)) {
            (true, Some(core)) => core,
            _ => &self.formula,
        }
    }

    /// The two sides of an equality step
    pub fn sides(&self) -> Result<(&Expression, &Expression), TransformError> {
        match self.core().children() {
            [left, right] => Ok((left, right)),
            _ => Err(TransformError::Invariant(format!(
                "step {} is not a binary equality",
                self.id
            ))),
        }
    }
}

/// The hypothesis `ph` of a derivation step `ph -> core`.
///
/// While a session has a prefix, equality and closure steps may be derived in deduction form
/// `ph -> (a = b)`. This makes worksheet steps like `ph -> (A e. CC)` usable as side
/// conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    pub implication: Identifier,
    pub hypothesis: Expression,
    /// The rule `b => (a -> b)`
    pub stub: RuleId,
}

impl Prefix {
    /// Builds `hypothesis -> core`.
    pub fn apply(&self, core: &Expression) -> Expression {
        Expression::new(self.implication, vec![self.hypothesis.clone(), core.clone()])
    }

    /// Returns `core` if `formula` is `hypothesis -> core`.
    pub fn strip<'e>(&self, formula: &'e Expression) -> Option<&'e Expression> {
        match formula.children() {
            [hypothesis, core]
                if formula.head() == self.implication && hypothesis == &self.hypothesis =>
            {
                Some(core)
            }
            _ => None,
        }
    }
}

/// Everything a worksheet needs to store a new derivation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationStep<'a> {
    pub hyps: &'a [StepId],
    pub hyp_labels: Vec<String>,
    pub rule_label: &'a str,
    pub formula: String,
    pub tree: Expression,
}

/// The operations the engine needs from a proof worksheet.
pub trait Worksheet {
    /// Finds a step located before `before` whose formula is structurally equal to `formula`.
    fn find_matching_step(&self, formula: &Expression, before: StepId) -> Option<StepId>;

    /// Inserts a new derivation step directly before the step `before`.
    fn add_derivation_step(&mut self, before: StepId, step: DerivationStep<'_>) -> StepId;

    /// Justifies the existing step `step` with `rule_label` and `hyps`.
    fn finish_derivation_step(&mut self, step: StepId, hyps: &[StepId], rule_label: &str);

    fn formula(&self, step: StepId) -> Option<&Expression>;

    fn step_label(&self, step: StepId) -> Option<String>;

    /// All steps located before `step`, in worksheet order.
    fn steps_before(&self, step: StepId) -> Vec<StepId>;

    /// Only rules with a smaller sequence number may be cited.
    fn max_seq(&self) -> SeqNum;
}

/// One search session on a worksheet: the derivation step being proven, the steps created so
/// far, a recursion guard and the canonical-form memo.
pub struct WorksheetInfo<'a> {
    library: &'a Library,
    worksheet: &'a mut dyn Worksheet,
    derivation: ProofStep,
    config: TransformConfig,
    prefix: Option<Prefix>,
    new_steps: Vec<StepId>,
    depth: usize,
    canonical_cache: HashMap<Expression, Expression>,
}

impl<'a> WorksheetInfo<'a> {
    pub fn new(
        library: &'a Library,
        worksheet: &'a mut dyn Worksheet,
        derivation: StepId,
        config: TransformConfig,
    ) -> Result<Self, TransformError> {
        let formula = worksheet
            .formula(derivation)
            .cloned()
            .ok_or(TransformError::UnknownStep(derivation))?;
        Ok(WorksheetInfo {
            library,
            worksheet,
            derivation: ProofStep::new(derivation, formula),
            config,
            prefix: None,
            new_steps: Vec::new(),
            depth: 0,
            canonical_cache: HashMap::new(),
        })
    }

    pub fn library(&self) -> &'a Library {
        self.library
    }

    pub fn derivation(&self) -> &ProofStep {
        &self.derivation
    }

    pub fn prefix(&self) -> Option<&Prefix> {
        self.prefix.as_ref()
    }

    /// Lets the session derive steps under `prefix`. The derivation step has to be
    /// `prefix -> core`.
    pub fn set_prefix(&mut self, prefix: Prefix) -> Result<(), TransformError> {
        if prefix.strip(&self.derivation.formula).is_none() {
            return Err(TransformError::Invariant(format!(
                "step {} does not start with the prefix {}",
                self.derivation.id,
                self.library.expression_to_string(&prefix.hypothesis)
            )));
        }
        self.canonical_cache.clear();
        self.prefix = Some(prefix);
        Ok(())
    }

    pub fn new_steps(&self) -> &[StepId] {
        &self.new_steps
    }

    pub fn into_new_steps(self) -> Vec<StepId> {
        self.new_steps
    }

    /// The steps located before the derivation step together with their formulas
    pub fn previous_steps(&self) -> Vec<ProofStep> {
        self.worksheet
            .steps_before(self.derivation.id)
            .into_iter()
            .filter_map(|id| {
                self.worksheet
                    .formula(id)
                    .map(|formula| ProofStep::new(id, formula.clone()))
            })
            .collect()
    }

    /// Looks for an existing step with the formula `node`.
    pub fn get_step(&self, node: &Expression) -> Option<ProofStep> {
        self.worksheet
            .find_matching_step(node, self.derivation.id)
            .map(|id| ProofStep::new(id, node.clone()))
    }

    /// Looks for a step `node` or, if the session has a prefix, `prefix -> node`.
    pub fn get_gen_step(&self, node: &Expression) -> Option<ProofStep> {
        if let Some(step) = self.get_step(node) {
            return Some(step);
        }
        let formula = self.prefix.as_ref()?.apply(node);
        self.worksheet
            .find_matching_step(&formula, self.derivation.id)
            .map(|id| ProofStep::with_prefix(id, formula))
    }

    /// Gets or creates `prefix -> step` with the stub rule. Prefixed steps are returned as is.
    pub fn add_prefix(&mut self, step: ProofStep) -> Result<ProofStep, TransformError> {
        if step.prefixed {
            return Ok(step);
        }
        let prefix = self.prefix.clone().ok_or_else(|| {
            TransformError::Invariant("the session has no implication prefix".to_owned())
        })?;
        let node = prefix.apply(&step.formula);
        self.get_or_create_step(node, &[step], prefix.stub)
            .map(ProofStep::into_prefixed)
    }

    /// Gets or creates the step `node` from `hyps` with `rule`. If one of the hypotheses
    /// carries the prefix, `prefix -> node` is derived with `deduction` instead, the deduction
    /// form of `rule`, after the other hypotheses got the prefix as well.
    pub fn get_or_create_gen_step(
        &mut self,
        node: Expression,
        hyps: Vec<ProofStep>,
        rule: RuleId,
        deduction: Option<RuleId>,
    ) -> Result<ProofStep, TransformError> {
        if let Some(step) = self.get_gen_step(&node) {
            return Ok(step);
        }
        if !hyps.iter().any(|h| h.prefixed) {
            return self.get_or_create_step(node, &hyps, rule);
        }
        let (formula, hyps, rule) = self.deduction_instance(&node, hyps, deduction)?;
        self.get_or_create_step(formula, &hyps, rule)
            .map(ProofStep::into_prefixed)
    }

    /// Justifies the derivation step `prefix -> core` the way
    /// [`get_or_create_gen_step`](Self::get_or_create_gen_step) would derive it. Without
    /// prefixed hypotheses `core` is derived first and the prefix is added with the stub rule.
    pub fn finish_gen_derivation_step(
        &mut self,
        hyps: Vec<ProofStep>,
        rule: RuleId,
        deduction: Option<RuleId>,
    ) -> Result<ProofStep, TransformError> {
        let prefix = self.prefix.clone().ok_or_else(|| {
            TransformError::Invariant("the session has no implication prefix".to_owned())
        })?;
        let core = prefix
            .strip(&self.derivation.formula)
            .cloned()
            .ok_or_else(|| {
                TransformError::Invariant("derivation step without the prefix".to_owned())
            })?;
        if hyps.iter().any(|h| h.prefixed) {
            let (_, hyps, rule) = self.deduction_instance(&core, hyps, deduction)?;
            self.finish_derivation_step(&hyps, rule)
        } else {
            let step = self.get_or_create_step(core, &hyps, rule)?;
            self.finish_derivation_step(&[step], prefix.stub)
        }
    }

    /// Returns `prefix -> node` and the hypotheses of `deduction` in rule order, all of them
    /// carrying the prefix.
    fn deduction_instance(
        &mut self,
        node: &Expression,
        hyps: Vec<ProofStep>,
        deduction: Option<RuleId>,
    ) -> Result<(Expression, Vec<ProofStep>, RuleId), TransformError> {
        let library = self.library;
        let deduction = deduction.ok_or_else(|| {
            TransformError::NoMatch(format!(
                "no deduction form to derive {} under the prefix",
                library.expression_to_string(node)
            ))
        })?;
        let prefix = self.prefix.clone().ok_or_else(|| {
            TransformError::Invariant("the session has no implication prefix".to_owned())
        })?;
        let formula = prefix.apply(node);
        let rule = library
            .rule(deduction)
            .ok_or(TransformError::UnknownRule(deduction))?;
        let mut lifted = Vec::with_capacity(hyps.len());
        for hyp in hyps {
            lifted.push(self.add_prefix(hyp)?);
        }

        let mut substitution = WholeSubstitution::with_capacity(library.variable_count());
        formula.unify(rule.conclusion(), &mut substitution)?;
        let mut ordered = Vec::with_capacity(lifted.len());
        for pattern in rule.hypotheses() {
            let position = lifted.iter().position(|hyp| {
                let mut attempt = substitution.clone();
                hyp.formula.unify(pattern, &mut attempt).is_ok()
            });
            let hyp = match position {
                Some(position) => lifted.remove(position),
                None => {
                    return Err(TransformError::NoMatch(format!(
                        "the hypotheses do not fit `{}`",
                        rule.label()
                    )))
                }
            };
            hyp.formula.unify(pattern, &mut substitution)?;
            ordered.push(hyp);
        }
        Ok((formula, ordered, deduction))
    }

    /// Returns the step with the formula `node`, creating it with `rule` and `hyps` if it does
    /// not exist yet. At most one step per formula is ever created.
    pub fn get_or_create_step(
        &mut self,
        node: Expression,
        hyps: &[ProofStep],
        rule: RuleId,
    ) -> Result<ProofStep, TransformError> {
        if let Some(step) = self.get_step(&node) {
            return Ok(step);
        }
        if self.new_steps.len() >= self.config.max_new_steps {
            return Err(TransformError::LimitExceeded {
                limit: "new step",
                value: self.config.max_new_steps,
            });
        }
        let label = self.check_soundness(&node, hyps, rule)?;
        let hyp_ids: Vec<StepId> = hyps.iter().map(|h| h.id).collect();
        let hyp_labels = hyp_ids
            .iter()
            .map(|id| self.worksheet.step_label(*id).unwrap_or_default())
            .collect();
        let formula = self.library.expression_to_string(&node);
        debug!(rule = label, formula = formula.as_str(), "creating step");
        let id = self.worksheet.add_derivation_step(
            self.derivation.id,
            DerivationStep {
                hyps: &hyp_ids,
                hyp_labels,
                rule_label: label,
                formula,
                tree: node.clone(),
            },
        );
        self.new_steps.push(id);
        self.canonical_cache.clear();
        Ok(ProofStep::new(id, node))
    }

    /// Justifies the derivation step itself with `rule` and `hyps`.
    pub fn finish_derivation_step(
        &mut self,
        hyps: &[ProofStep],
        rule: RuleId,
    ) -> Result<ProofStep, TransformError> {
        let node = self.derivation.formula.clone();
        let label = self.check_soundness(&node, hyps, rule)?;
        let hyp_ids: Vec<StepId> = hyps.iter().map(|h| h.id).collect();
        debug!(rule = label, step = self.derivation.id, "finishing derivation step");
        self.worksheet
            .finish_derivation_step(self.derivation.id, &hyp_ids, label);
        Ok(self.derivation.clone())
    }

    /// A step may only be created if the cited rule is in scope and the step and its
    /// hypotheses are an instance of the rule.
    fn check_soundness(
        &self,
        node: &Expression,
        hyps: &[ProofStep],
        rule: RuleId,
    ) -> Result<&'a str, TransformError> {
        let library = self.library;
        let rule = library.rule(rule).ok_or(TransformError::UnknownRule(rule))?;
        if rule.seq() >= self.worksheet.max_seq() {
            return Err(TransformError::Unsound {
                rule: rule.label().to_owned(),
                reason: "the rule is not in scope".to_owned(),
            });
        }
        let hyp_formulas: Vec<&Expression> = hyps.iter().map(|h| &h.formula).collect();
        library
            .check_instance(rule, node, &hyp_formulas)
            .map_err(|e| TransformError::Unsound {
                rule: rule.label().to_owned(),
                reason: format!("{:?} ({})", e, library.expression_to_string(node)),
            })?;
        Ok(rule.label())
    }

    /// Runs `f` one recursion level deeper, failing once the configured depth is reached.
    pub(crate) fn nested<T, F>(&mut self, f: F) -> Result<T, TransformError>
    where
        F: FnOnce(&mut Self) -> Result<T, TransformError>,
    {
        if self.depth >= self.config.max_depth {
            return Err(TransformError::LimitExceeded {
                limit: "recursion depth",
                value: self.config.max_depth,
            });
        }
        self.depth += 1;
        trace!(depth = self.depth, "entering");
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(crate) fn cached_canonical(&self, node: &Expression) -> Option<Expression> {
        self.canonical_cache.get(node).cloned()
    }

    pub(crate) fn cache_canonical(&mut self, node: Expression, canonical: Expression) {
        self.canonical_cache.insert(node, canonical);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Justification {
    Hypothesis,
    Unproved,
    Derived { rule: String, hyps: Vec<StepId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetStep {
    pub label: String,
    pub formula: Expression,
    pub text: String,
    pub justification: Justification,
}

/// A worksheet kept in memory. Steps are numbered in creation order, their position in the
/// proof is tracked separately since derivation steps are inserted before the step they help
/// to prove.
#[derive(Debug, Clone)]
pub struct ProofWorksheet {
    steps: Vec<WorksheetStep>,
    order: Vec<StepId>,
    max_seq: SeqNum,
}

impl ProofWorksheet {
    /// Creates a worksheet that may cite every rule with a sequence number below `max_seq`.
    pub fn new(max_seq: SeqNum) -> Self {
        ProofWorksheet {
            steps: Vec::new(),
            order: Vec::new(),
            max_seq,
        }
    }

    pub fn add_hypothesis(&mut self, library: &Library, formula: Expression) -> StepId {
        self.push(library, formula, Justification::Hypothesis)
    }

    /// Appends a step that still has to be proven.
    pub fn add_step(&mut self, library: &Library, formula: Expression) -> StepId {
        self.push(library, formula, Justification::Unproved)
    }

    pub fn step(&self, id: StepId) -> Option<&WorksheetStep> {
        self.steps.get(id)
    }

    /// The steps in proof order
    pub fn steps(&self) -> impl Iterator<Item = (StepId, &WorksheetStep)> {
        self.order.iter().map(move |id| (*id, &self.steps[*id]))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn push(
        &mut self,
        library: &Library,
        formula: Expression,
        justification: Justification,
    ) -> StepId {
        let id = self.steps.len();
        self.steps.push(WorksheetStep {
            label: (id + 1).to_string(),
            text: library.expression_to_string(&formula),
            formula,
            justification,
        });
        self.order.push(id);
        id
    }

    fn position(&self, id: StepId) -> Option<usize> {
        self.order.iter().position(|s| *s == id)
    }
}

impl Worksheet for ProofWorksheet {
    fn find_matching_step(&self, formula: &Expression, before: StepId) -> Option<StepId> {
        let end = self.position(before)?;
        self.order[..end]
            .iter()
            .copied()
            .find(|id| &self.steps[*id].formula == formula)
    }

    fn add_derivation_step(&mut self, before: StepId, step: DerivationStep<'_>) -> StepId {
        let id = self.steps.len();
        self.steps.push(WorksheetStep {
            label: (id + 1).to_string(),
            formula: step.tree,
            text: step.formula,
            justification: Justification::Derived {
                rule: step.rule_label.to_owned(),
                hyps: step.hyps.to_vec(),
            },
        });
        let position = self.position(before).unwrap_or(self.order.len());
        self.order.insert(position, id);
        id
    }

    fn finish_derivation_step(&mut self, step: StepId, hyps: &[StepId], rule_label: &str) {
        if let Some(s) = self.steps.get_mut(step) {
            s.justification = Justification::Derived {
                rule: rule_label.to_owned(),
                hyps: hyps.to_vec(),
            };
        }
    }

    fn formula(&self, step: StepId) -> Option<&Expression> {
        self.steps.get(step).map(|s| &s.formula)
    }

    fn step_label(&self, step: StepId) -> Option<String> {
        self.steps.get(step).map(|s| s.label.clone())
    }

    fn steps_before(&self, step: StepId) -> Vec<StepId> {
        match self.position(step) {
            Some(end) => self.order[..end].to_vec(),
            None => Vec::new(),
        }
    }

    fn max_seq(&self) -> SeqNum {
        self.max_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[test]
    fn get_or_create_step_deduplicates() {
        let f = Fixture::arith();
        let mut ws = ProofWorksheet::new(f.library.next_seq());
        let goal = ws.add_step(&f.library, f.parse("(A = C)"));
        let mut info =
            WorksheetInfo::new(&f.library, &mut ws, goal, TransformConfig::default()).unwrap();

        let (addcom, _) = f.library.rule_by_label("addcom").unwrap();
        let node = f.parse("((A + B) = (B + A))");
        let first = info.get_or_create_step(node.clone(), &[], addcom).unwrap();
        let second = info.get_or_create_step(node.clone(), &[], addcom).unwrap();
        assert_eq!(first, second);
        assert_eq!(info.new_steps().len(), 1);
        assert_eq!(info.get_step(&node), Some(first.clone()));
        drop(info);

        assert_eq!(ws.len(), 2);
        let order: Vec<StepId> = ws.steps().map(|(id, _)| id).collect();
        assert_eq!(order, vec![first.id, goal]);
        check_worksheet(&f.library, &ws);
    }

    #[test]
    fn unsound_steps_are_rejected() {
        let f = Fixture::arith();
        let mut ws = ProofWorksheet::new(f.library.next_seq());
        let goal = ws.add_step(&f.library, f.parse("(A = C)"));
        let mut info =
            WorksheetInfo::new(&f.library, &mut ws, goal, TransformConfig::default()).unwrap();

        let (addcom, _) = f.library.rule_by_label("addcom").unwrap();
        let result = info.get_or_create_step(f.parse("((A + B) = (A + B))"), &[], addcom);
        assert!(matches!(result, Err(TransformError::Unsound { .. })));

        let (eqcomi, _) = f.library.rule_by_label("eqcomi").unwrap();
        let result = info.get_or_create_step(f.parse("(B = A)"), &[], eqcomi);
        assert!(matches!(result, Err(TransformError::Unsound { .. })));
        assert!(info.new_steps().is_empty());
    }

    #[test]
    fn rules_out_of_scope_are_rejected() {
        let f = Fixture::arith();
        let (addcom, rule) = f.library.rule_by_label("addcom").unwrap();
        let mut ws = ProofWorksheet::new(rule.seq());
        let goal = ws.add_step(&f.library, f.parse("(A = C)"));
        let mut info =
            WorksheetInfo::new(&f.library, &mut ws, goal, TransformConfig::default()).unwrap();
        let result = info.get_or_create_step(f.parse("((A + B) = (B + A))"), &[], addcom);
        assert!(matches!(result, Err(TransformError::Unsound { .. })));
    }

    #[test]
    fn step_limit() {
        let f = Fixture::arith();
        let mut ws = ProofWorksheet::new(f.library.next_seq());
        let goal = ws.add_step(&f.library, f.parse("(A = C)"));
        let config = TransformConfig::default().with_max_new_steps(1);
        let mut info = WorksheetInfo::new(&f.library, &mut ws, goal, config).unwrap();
        let (addcom, _) = f.library.rule_by_label("addcom").unwrap();
        info.get_or_create_step(f.parse("((A + B) = (B + A))"), &[], addcom)
            .unwrap();
        assert!(matches!(
            info.get_or_create_step(f.parse("((B + C) = (C + B))"), &[], addcom),
            Err(TransformError::LimitExceeded { .. })
        ));
    }

    #[test]
    fn unknown_derivation_step() {
        let f = Fixture::arith();
        let mut ws = ProofWorksheet::new(f.library.next_seq());
        assert!(matches!(
            WorksheetInfo::new(&f.library, &mut ws, 3, TransformConfig::default()),
            Err(TransformError::UnknownStep(3))
        ));
    }

    #[test]
    fn nested_depth_guard() {
        let f = Fixture::arith();
        let mut ws = ProofWorksheet::new(f.library.next_seq());
        let goal = ws.add_step(&f.library, f.parse("(A = C)"));
        let config = TransformConfig::default().with_max_depth(2);
        let mut info = WorksheetInfo::new(&f.library, &mut ws, goal, config).unwrap();
        let ok = info.nested(|info| info.nested(|_| Ok(1)));
        assert_eq!(ok, Ok(1));
        let too_deep = info.nested(|info| info.nested(|info| info.nested(|_| Ok(1))));
        assert!(matches!(too_deep, Err(TransformError::LimitExceeded { .. })));
    }

    #[test]
    fn steps_under_a_prefix() {
        let f = Fixture::deduction();
        let mut ws = f.worksheet();
        let a = ws.add_hypothesis(&f.library, f.parse("(ph -> (A = B))"));
        let goal = ws.add_step(&f.library, f.parse("(ph -> (B = A))"));
        let prefix = Prefix {
            implication: f.op("->"),
            hypothesis: f.parse("ph"),
            stub: f.rule("a1i"),
        };
        let hyp = ProofStep::with_prefix(a, f.parse("(ph -> (A = B))"));
        let mut info = f.session(&mut ws, goal);
        assert!(matches!(
            info.add_prefix(ProofStep::new(a, f.parse("(A = B)"))),
            Err(TransformError::Invariant(_))
        ));
        let other = Prefix {
            hypothesis: f.parse("ps"),
            ..prefix.clone()
        };
        assert!(info.set_prefix(other).is_err());
        info.set_prefix(prefix).unwrap();

        let node = f.parse("((A + B) = (B + A))");
        let plain = info
            .get_or_create_gen_step(node, vec![], f.rule("addcom"), None)
            .unwrap();
        assert!(!plain.prefixed);
        let lifted = info.add_prefix(plain.clone()).unwrap();
        assert!(lifted.prefixed);
        assert_eq!(lifted.formula, f.parse("(ph -> ((A + B) = (B + A)))"));
        assert_eq!(lifted.core(), &plain.formula);
        assert_eq!(info.get_gen_step(&plain.formula), Some(plain));
        assert_eq!(info.get_gen_step(&f.parse("(A = B)")), Some(hyp.clone()));

        assert!(matches!(
            info.get_or_create_gen_step(
                f.parse("(B = A)"),
                vec![hyp.clone()],
                f.rule("eqcomi"),
                None,
            ),
            Err(TransformError::NoMatch(_))
        ));
        let finished = info
            .finish_gen_derivation_step(vec![hyp], f.rule("eqcomi"), Some(f.rule("eqcomd")))
            .unwrap();
        assert_eq!(finished.id, goal);
        drop(info);

        assert_eq!(
            ws.step(goal).unwrap().justification,
            Justification::Derived {
                rule: "eqcomd".to_owned(),
                hyps: vec![a],
            }
        );
        check_worksheet(&f.library, &ws);
    }
}
