//! The entry point of the engine.
//!
//! A [`TransformationManager`] classifies the rules of one library once and afterwards
//! answers, for any derivation step of a worksheet, whether the step follows from an earlier
//! step by an equality the engine can prove.

use crate::{
    config::TransformConfig,
    error::TransformError,
    expression::Expression,
    info::{
        AssociativeInfo, ClosureInfo, CommutativeInfo, EquivalenceInfo, ImplicationInfo,
        ReplaceInfo,
    },
    library::Library,
    pattern::GeneralizedStmt,
    transformation::{Transformation, TransformationKind},
    types::*,
    worksheet::{ProofStep, Worksheet, WorksheetInfo},
};
use tracing::{debug, error, warn};

/// Owns a library together with everything that was learned about its rules.
///
/// The manager is read-only after construction, so it can be shared between threads that
/// work on different worksheets.
#[derive(Debug, Clone)]
pub struct TransformationManager {
    library: Library,
    config: TransformConfig,
    eq_info: EquivalenceInfo,
    impl_info: ImplicationInfo,
    repl_info: ReplaceInfo,
    closure_info: ClosureInfo,
    com_info: CommutativeInfo,
    assoc_info: AssociativeInfo,
}

impl TransformationManager {
    pub fn new(library: Library) -> Self {
        Self::with_config(library, TransformConfig::default())
    }

    pub fn with_config(library: Library, config: TransformConfig) -> Self {
        let mut eq_info = EquivalenceInfo::new(&library);
        let impl_info = ImplicationInfo::new(&library, &eq_info);
        eq_info.fill_deduction_rules(&library, &impl_info);
        let repl_info = ReplaceInfo::new(&library, &eq_info, &impl_info);
        let closure_info = ClosureInfo::new(&library, &impl_info);
        let com_info = CommutativeInfo::new(&library, &eq_info, &impl_info);
        let assoc_info = AssociativeInfo::new(
            &library,
            &eq_info,
            &impl_info,
            &closure_info,
            &repl_info,
        );
        debug!(
            rules = library.rules().count(),
            templates = closure_info.templates().len(),
            "classified library"
        );
        TransformationManager {
            library,
            config,
            eq_info,
            impl_info,
            repl_info,
            closure_info,
            com_info,
            assoc_info,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn eq_info(&self) -> &EquivalenceInfo {
        &self.eq_info
    }

    pub fn impl_info(&self) -> &ImplicationInfo {
        &self.impl_info
    }

    pub fn repl_info(&self) -> &ReplaceInfo {
        &self.repl_info
    }

    pub fn closure_info(&self) -> &ClosureInfo {
        &self.closure_info
    }

    pub fn com_info(&self) -> &CommutativeInfo {
        &self.com_info
    }

    pub fn assoc_info(&self) -> &AssociativeInfo {
        &self.assoc_info
    }

    /// Starts a search session for the derivation step `derivation` of `worksheet`.
    ///
    /// If the step reads `ph -> core` and equalities can be derived under `ph`, the session
    /// gets `ph` as its prefix.
    pub fn session<'a>(
        &'a self,
        worksheet: &'a mut dyn Worksheet,
        derivation: StepId,
    ) -> Result<WorksheetInfo<'a>, TransformError> {
        let mut info = WorksheetInfo::new(&self.library, worksheet, derivation, self.config)?;
        if self.config.implication_prefix {
            let formula = &info.derivation().formula;
            if let Some(prefix) = self.impl_info.extract_prefix(&self.library, formula) {
                debug!(
                    hypothesis = self.library.expression_to_string(&prefix.hypothesis).as_str(),
                    "deriving under an implication prefix"
                );
                info.set_prefix(prefix)?;
            }
        }
        Ok(info)
    }

    /// Chooses how `node` is canonicalized and rewritten.
    ///
    /// Swapping is only used if both swapped positions can be replaced. Otherwise the
    /// operand left at a fixed position would keep its original form.
    pub fn create_transformation(
        &self,
        info: &WorksheetInfo,
        node: &Expression,
    ) -> Transformation {
        let slots = match self.repl_info.possible_replaces(node.head()) {
            Some(slots) => slots,
            None => return Transformation::new(node.clone(), TransformationKind::Identity),
        };
        let replaceable = |gen: &GeneralizedStmt| {
            gen.var_indexes
                .iter()
                .all(|i| matches!(slots.get(*i), Some(Some(_))))
        };
        let assoc = self.assoc_info.detect(info, &self.closure_info, node);
        let kind = match assoc {
            Some(gen) if self.com_info.is_com_op(info, &gen) => {
                TransformationKind::AssociativeCommutative(gen)
            }
            assoc => {
                let com = self
                    .com_info
                    .detect(info, &self.closure_info, node)
                    .filter(|gen| replaceable(gen));
                match (com, assoc) {
                    (Some(gen), _) => TransformationKind::Commutative(gen),
                    (None, Some(gen)) => TransformationKind::Associative(gen),
                    (None, None) => TransformationKind::Replace,
                }
            }
        };
        Transformation::new(node.clone(), kind)
    }

    /// The canonical form of `node`, memoized for the session.
    pub fn canonical_form(
        &self,
        info: &mut WorksheetInfo,
        node: &Expression,
    ) -> Result<Expression, TransformError> {
        if let Some(canonical) = info.cached_canonical(node) {
            return Ok(canonical);
        }
        let canonical = info.nested(|info| {
            let transformation = self.create_transformation(info, node);
            transformation.canonical(self, info)
        })?;
        info.cache_canonical(node.clone(), canonical.clone());
        Ok(canonical)
    }

    /// Gets or creates the step `source = target`. Both expressions must have the same
    /// canonical form. `Ok(None)` means that they are equal already. The step carries the
    /// prefix of the session if one of the steps it is built from does.
    pub fn transform(
        &self,
        info: &mut WorksheetInfo,
        source: &Expression,
        target: &Expression,
    ) -> Result<Option<ProofStep>, TransformError> {
        if source == target {
            return Ok(None);
        }
        let eq = self.eq_info.create_eq_node(&self.library, source, target)?;
        if let Some(step) = info.get_gen_step(&eq) {
            return Ok(Some(step));
        }
        info.nested(|info| {
            let transformation = self.create_transformation(info, source);
            transformation.rewrite(self, info, target)
        })
    }

    /// Like [`transform`](Self::transform), but first checks that the canonical forms agree.
    pub fn prove_equality(
        &self,
        info: &mut WorksheetInfo,
        source: &Expression,
        target: &Expression,
    ) -> Result<Option<ProofStep>, TransformError> {
        let a = self.canonical_form(info, source)?;
        let b = self.canonical_form(info, target)?;
        if a != b {
            return Err(TransformError::NoMatch(format!(
                "canonical forms {} and {} differ",
                self.library.expression_to_string(&a),
                self.library.expression_to_string(&b)
            )));
        }
        self.transform(info, source, target)
    }

    /// Returns the canonical form of `node` and the step `node = canonical`.
    pub fn normalize(
        &self,
        info: &mut WorksheetInfo,
        node: &Expression,
    ) -> Result<(Expression, Option<ProofStep>), TransformError> {
        let canonical = self.canonical_form(info, node)?;
        let step = self.transform(info, node, &canonical)?;
        Ok((canonical, step))
    }

    /// Tries to justify the derivation step `derivation` automatically.
    ///
    /// First every earlier step with the same canonical form is tried: the derivation step is
    /// then justified by that step and the proven equivalence. Otherwise, if enabled, a
    /// derivation step of the form _P(node)_ is proven by closure rules.
    ///
    /// A derivation step `ph -> core` is proven the same way from earlier steps `ph -> x` and
    /// `x`, see [`session`](Self::session).
    ///
    /// Returns the ids of the steps that were added to the worksheet, or `None` if the step
    /// could not be justified. Steps added before an error stay in the worksheet.
    pub fn try_to_find_transformations(
        &self,
        worksheet: &mut dyn Worksheet,
        derivation: StepId,
    ) -> Result<Option<Vec<StepId>>, TransformError> {
        let mut info = self.session(worksheet, derivation)?;
        let result = self.prove_from_previous_steps(&mut info).and_then(|proven| {
            if proven || !self.config.closure_transformation {
                Ok(proven)
            } else {
                self.closure_info.perform_closure_transformation(&mut info)
            }
        });
        match result {
            Ok(true) => Ok(Some(info.into_new_steps())),
            Ok(false) => Ok(None),
            Err(e @ TransformError::LimitExceeded { .. }) => {
                warn!(step = derivation, error = %e, "automatic transformation gave up");
                Err(e)
            }
            Err(e) => {
                error!(step = derivation, error = %e, "automatic transformation failed");
                Err(e)
            }
        }
    }

    fn prove_from_previous_steps(&self, info: &mut WorksheetInfo) -> Result<bool, TransformError> {
        if info.prefix().is_some() {
            return self.prove_under_prefix(info);
        }
        let formula = info.derivation().formula.clone();
        let ty = self.library.type_of(&formula);
        let rule = match ty.and_then(|ty| self.impl_info.eq_implication(ty)) {
            Some(rule) => rule,
            None => {
                debug!("no equivalence implication for the type of the derivation step");
                return Ok(false);
            }
        };
        let canonical = self.canonical_form(info, &formula)?;

        for candidate in info.previous_steps() {
            if candidate.formula == formula || self.library.type_of(&candidate.formula) != ty {
                continue;
            }
            if self.canonical_form(info, &candidate.formula)? != canonical {
                continue;
            }
            match self.transform(info, &candidate.formula, &formula) {
                Ok(Some(eq_step)) => {
                    debug!(candidate = candidate.id, "found equal step");
                    info.finish_derivation_step(&[candidate, eq_step], rule)?;
                    return Ok(true);
                }
                Ok(None) => {}
                Err(e) if e.is_no_match() => {
                    debug!(candidate = candidate.id, reason = %e, "candidate does not work");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }

    fn prove_under_prefix(&self, info: &mut WorksheetInfo) -> Result<bool, TransformError> {
        let prefix = match info.prefix() {
            Some(prefix) => prefix.clone(),
            None => return Ok(false),
        };
        let formula = info.derivation().formula.clone();
        let core = match prefix.strip(&formula) {
            Some(core) => core.clone(),
            None => return Ok(false),
        };
        let ty = self.library.type_of(&core);
        let deduction = match ty
            .and_then(|ty| self.impl_info.deduction_eq_implication(prefix.implication, ty))
        {
            Some(rule) => rule,
            None => {
                debug!("no equivalence implication under the prefix");
                return Ok(false);
            }
        };
        let rule = ty.and_then(|ty| self.impl_info.eq_implication(ty));
        let canonical = self.canonical_form(info, &core)?;

        for step in info.previous_steps() {
            let candidate = if prefix.strip(&step.formula).is_some() {
                ProofStep::with_prefix(step.id, step.formula)
            } else {
                step
            };
            let candidate_core = candidate.core().clone();
            if self.library.type_of(&candidate_core) != ty {
                continue;
            }
            if candidate_core == core {
                if candidate.prefixed {
                    continue;
                }
                debug!(candidate = candidate.id, "found the step without the prefix");
                info.finish_derivation_step(&[candidate], prefix.stub)?;
                return Ok(true);
            }
            if self.canonical_form(info, &candidate_core)? != canonical {
                continue;
            }
            let eq_step = match self.transform(info, &candidate_core, &core) {
                Ok(Some(eq_step)) => eq_step,
                Ok(None) => continue,
                Err(e) if e.is_no_match() => {
                    debug!(candidate = candidate.id, reason = %e, "candidate does not work");
                    continue;
                }
                Err(e) => return Err(e),
            };
            debug!(candidate = candidate.id, "found equal step");
            let hyps = vec![candidate, eq_step];
            match rule {
                Some(rule) => {
                    info.finish_gen_derivation_step(hyps, rule, Some(deduction))?;
                }
                None => {
                    let mut lifted = Vec::with_capacity(hyps.len());
                    for hyp in hyps {
                        lifted.push(info.add_prefix(hyp)?);
                    }
                    info.finish_derivation_step(&lifted, deduction)?;
                }
            }
            return Ok(true);
        }
        Ok(false)
    }
}
