use super::{add_first, ImplicationInfo};
use crate::{
    error::TransformError,
    expression::Expression,
    library::{Library, Rule},
    pattern::{ConstSubst, PropertyTemplate},
    rule_map::{ComplexRuleMap, RuleKey},
    substitution::WholeSubstitution,
    types::*,
    worksheet::{ProofStep, WorksheetInfo},
};
use std::collections::HashMap;
use tracing::debug;

/// How a closure statement can be obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// The statement itself exists or can be proven.
    Plain,
    /// Only the statement under the implication prefix of the session.
    Prefixed,
}

#[derive(Debug, Clone)]
struct ClosureRule {
    rule: RuleId,
    deduction: Option<RuleId>,
    places: Vec<usize>,
    availability: Availability,
}

/// Closure rules like `A e. CC, B e. CC => (A + B) e. CC` and constant facts like `1 e. CC`.
///
/// A closure rule is indexed by its operator, its constant arguments and its property template
/// (`_ e. CC`). Constant facts are indexed by template and constant. Deduction forms of closure
/// rules are indexed the same way, per implication.
#[derive(Debug, Clone, Default)]
pub struct ClosureInfo {
    closures: ComplexRuleMap<RuleId>,
    deduction: HashMap<Identifier, ComplexRuleMap<RuleId>>,
    templates: Vec<PropertyTemplate>,
    constants: HashMap<PropertyTemplate, HashMap<Expression, RuleId>>,
}

impl ClosureInfo {
    pub fn new(library: &Library, impl_info: &ImplicationInfo) -> Self {
        let mut info = ClosureInfo::default();
        for (id, rule) in library.rules() {
            if let Some((template, core)) = closure_shape(rule) {
                let key = closure_key(&core, template.clone());
                if add_first(library, &mut info.closures, key, id, "closure")
                    && !info.templates.contains(&template)
                {
                    info.templates.push(template);
                }
            } else if let Some((prefix_op, stripped)) = impl_info.deduction_form(rule) {
                if let Some((template, core)) = closure_shape(&stripped) {
                    let rules = info.deduction.entry(prefix_op).or_default();
                    let key = closure_key(&core, template);
                    add_first(library, rules, key, id, "deduction closure");
                }
            }
        }

        for (id, rule) in library.rules() {
            if !rule.hypotheses().is_empty() {
                continue;
            }
            for template in &info.templates {
                let constant = match template.extract(rule.conclusion()) {
                    Some(c) if c.is_constant() => c,
                    _ => continue,
                };
                let facts = info.constants.entry(template.clone()).or_default();
                if !facts.contains_key(&constant) {
                    debug!(rule = rule.label(), "found constant closure fact");
                    facts.insert(constant, id);
                }
            }
        }
        info
    }

    pub fn templates(&self) -> &[PropertyTemplate] {
        &self.templates
    }

    pub fn contains(&self, key: &RuleKey) -> bool {
        self.closures.contains(key)
    }

    pub fn get(&self, key: &RuleKey) -> Option<RuleId> {
        self.closures.get(key).copied()
    }

    fn deduction_rule(&self, info: &WorksheetInfo, key: &RuleKey) -> Option<RuleId> {
        let prefix_op = info.prefix()?.implication;
        self.deduction.get(&prefix_op)?.get(key).copied()
    }

    fn constant_fact(&self, template: &PropertyTemplate, node: &Expression) -> Option<RuleId> {
        self.constants.get(template)?.get(node).copied()
    }

    /// Tests whether `template(node)` exists already or could be proven with closure rules,
    /// possibly under the prefix of the session.
    pub fn get_closure_possibility(
        &self,
        info: &WorksheetInfo,
        template: &PropertyTemplate,
        node: &Expression,
    ) -> bool {
        self.availability(info, template, node).is_some()
    }

    /// Every node has the empty property. Plain statements are preferred.
    pub fn availability(
        &self,
        info: &WorksheetInfo,
        template: &PropertyTemplate,
        node: &Expression,
    ) -> Option<Availability> {
        let statement = match template.substitute(node) {
            Some(statement) => statement,
            None => return Some(Availability::Plain),
        };
        if info.get_step(&statement).is_some() {
            return Some(Availability::Plain);
        }
        if node.is_constant() && self.constant_fact(template, node).is_some() {
            return Some(Availability::Plain);
        }
        let found = self.find_rule(info, template, node).map(|r| r.availability);
        if found == Some(Availability::Plain) {
            return found;
        }
        if info.get_gen_step(&statement).is_some() {
            return Some(Availability::Prefixed);
        }
        found
    }

    /// Finds a closure rule for `node` whose variable children all have the property. If one
    /// of them only has it under the prefix, the rule needs a deduction form.
    fn find_rule(
        &self,
        info: &WorksheetInfo,
        template: &PropertyTemplate,
        node: &Expression,
    ) -> Option<ClosureRule> {
        self.closures.visit(node, |key, places, rule| {
            if &key.template != template {
                return None;
            }
            let mut availability = Availability::Plain;
            for p in places {
                if self.availability(info, template, &node.children()[*p])?
                    == Availability::Prefixed
                {
                    availability = Availability::Prefixed;
                }
            }
            let deduction = self.deduction_rule(info, key);
            if availability == Availability::Prefixed && deduction.is_none() {
                return None;
            }
            Some(ClosureRule {
                rule: *rule,
                deduction,
                places: places.to_vec(),
                availability,
            })
        })
    }

    /// Gets or creates the step `template(node)`, together with the closure steps of all
    /// subterms it needs. The step carries the prefix if one of those does.
    pub fn closure_property(
        &self,
        info: &mut WorksheetInfo,
        template: &PropertyTemplate,
        node: &Expression,
    ) -> Result<ProofStep, TransformError> {
        let statement = template.substitute(node).ok_or_else(|| {
            TransformError::Invariant("the empty property has no closure step".to_owned())
        })?;
        if let Some(step) = info.get_step(&statement) {
            return Ok(step);
        }
        if node.is_constant() {
            if let Some(rule) = self.constant_fact(template, node) {
                return info.get_or_create_step(statement, &[], rule);
            }
        }
        let found = self.find_rule(info, template, node);
        if found.as_ref().map(|r| r.availability) != Some(Availability::Plain) {
            if let Some(step) = info.get_gen_step(&statement) {
                return Ok(step);
            }
        }
        let found = found.ok_or_else(|| {
            TransformError::NoMatch(format!(
                "no closure for {}",
                info.library().expression_to_string(&statement)
            ))
        })?;
        let hyps = info.nested(|info| {
            found
                .places
                .iter()
                .map(|p| self.closure_property(info, template, &node.children()[*p]))
                .collect::<Result<Vec<_>, _>>()
        })?;
        info.get_or_create_gen_step(statement, hyps, found.rule, found.deduction)
    }

    /// Gets or creates `node` with `rule`, proving every hypothesis `template(x)` of the rule
    /// by closure first. `deduction` is used if one of them carries the prefix.
    pub fn apply_rule(
        &self,
        info: &mut WorksheetInfo,
        rule: RuleId,
        deduction: Option<RuleId>,
        node: &Expression,
        template: &PropertyTemplate,
    ) -> Result<ProofStep, TransformError> {
        if let Some(step) = info.get_gen_step(node) {
            return Ok(step);
        }
        let library = info.library();
        let r = library.rule(rule).ok_or(TransformError::UnknownRule(rule))?;
        let mut substitution = WholeSubstitution::with_capacity(library.variable_count());
        node.unify(r.conclusion(), &mut substitution)?;
        let mut hyps = Vec::with_capacity(r.hypotheses().len());
        for hyp in r.hypotheses() {
            let statement = hyp.substitute(&substitution);
            let operand = template.extract(&statement).ok_or_else(|| {
                TransformError::Invariant(format!(
                    "hypothesis of `{}` does not fit its property",
                    r.label()
                ))
            })?;
            hyps.push(self.closure_property(info, template, &operand)?);
        }
        info.get_or_create_gen_step(node.clone(), hyps, rule, deduction)
    }

    /// Proves the derivation step directly if it has the form `template(node)` and `node`
    /// is closed under the known closure rules. Returns `false` if it does not.
    ///
    /// With a prefix the derivation step is `prefix -> template(node)`.
    pub fn perform_closure_transformation(
        &self,
        info: &mut WorksheetInfo,
    ) -> Result<bool, TransformError> {
        let formula = info.derivation().formula.clone();
        let core = match info.prefix() {
            Some(prefix) => match prefix.strip(&formula) {
                Some(core) => core.clone(),
                None => return Ok(false),
            },
            None => formula.clone(),
        };
        for template in &self.templates {
            let node = match template.extract(&core) {
                Some(node) => node,
                None => continue,
            };
            if node.is_constant() {
                if let Some(rule) = self.constant_fact(template, &node) {
                    finish(info, Vec::new(), rule, None)?;
                    return Ok(true);
                }
            }
            let found = match self.find_rule(info, template, &node) {
                Some(found) => found,
                None => continue,
            };
            debug!(
                formula = info.library().expression_to_string(&formula).as_str(),
                "proving closure"
            );
            let mut hyps = Vec::with_capacity(found.places.len());
            for p in &found.places {
                hyps.push(self.closure_property(info, template, &node.children()[*p])?);
            }
            finish(info, hyps, found.rule, found.deduction)?;
            return Ok(true);
        }
        Ok(false)
    }
}

fn finish(
    info: &mut WorksheetInfo,
    hyps: Vec<ProofStep>,
    rule: RuleId,
    deduction: Option<RuleId>,
) -> Result<ProofStep, TransformError> {
    if info.prefix().is_some() {
        info.finish_gen_derivation_step(hyps, rule, deduction)
    } else {
        info.finish_derivation_step(&hyps, rule)
    }
}

fn closure_key(core: &Expression, template: PropertyTemplate) -> RuleKey {
    RuleKey::new(core.head(), ConstSubst::from_node(core), template)
}

/// Returns the template and the operator application of a closure rule.
fn closure_shape(rule: &Rule) -> Option<(PropertyTemplate, Expression)> {
    if rule.hypotheses().is_empty() {
        return None;
    }
    let (template, vars) = PropertyTemplate::from_hypotheses(rule)?;
    let core = template.extract(rule.conclusion())?;
    if core.is_variable() || core.arity() == 0 {
        return None;
    }
    let mut core_vars = Vec::with_capacity(vars.len());
    for child in core.children() {
        if child.is_variable() {
            core_vars.push(child.head());
        } else if !child.is_constant() {
            return None;
        }
    }
    if core_vars == vars {
        Some((template, core))
    } else {
        None
    }
}
