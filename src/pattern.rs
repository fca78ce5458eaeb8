//! Pattern primitives used to index rules by the shape of the operator application they talk
//! about.

use crate::{
    expression::{Expression, HOLE},
    library::Rule,
    rule_map::RuleKey,
    substitution::SingleSubstitution,
    types::*,
};

/// The constant arguments of an operator application. Every slot holds the constant subtree
/// at that position, or `None` if the position is variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConstSubst {
    slots: Vec<Option<Expression>>,
}

impl ConstSubst {
    /// Collects the constant children of `node`.
    ///
    /// # Example
    /// ```
    /// use mmtransform::pattern::ConstSubst;
    /// use mmtransform::Expression;
    ///
    /// let one = Expression::leaf(-5);
    /// let node = Expression::new(-2, vec![Expression::leaf(0), one.clone(), Expression::leaf(1)]);
    /// let cs = ConstSubst::from_node(&node);
    /// assert_eq!(cs.slots(), &[None, Some(one), None]);
    /// assert_eq!(cs.var_places(), vec![0, 2]);
    /// ```
    pub fn from_node(node: &Expression) -> Self {
        ConstSubst {
            slots: node
                .children()
                .iter()
                .map(|c| if c.is_constant() { Some(c.clone()) } else { None })
                .collect(),
        }
    }

    pub fn slots(&self) -> &[Option<Expression>] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn var_places(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns the variable positions if every constant slot matches the corresponding child
    /// of `node`. Variable positions accept any child.
    pub fn check_and_get_var_positions(&self, node: &Expression) -> Option<Vec<usize>> {
        if node.arity() != self.slots.len() {
            return None;
        }
        let mut places = Vec::new();
        for (i, (slot, child)) in self.slots.iter().zip(node.children()).enumerate() {
            match slot {
                Some(constant) if constant != child => return None,
                Some(_) => {}
                None => places.push(i),
            }
        }
        Some(places)
    }
}

/// A side condition like _ e. CC_ with exactly one hole, or no side condition at all.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyTemplate {
    Empty,
    Template(Expression),
}

impl PropertyTemplate {
    /// Creates the template of `hypothesis` by replacing the variable `var` with the hole.
    /// `var` has to occur exactly once and the hypothesis must not be `var` itself.
    pub fn from_hypothesis(hypothesis: &Expression, var: Identifier) -> Option<Self> {
        if hypothesis.is_variable() || hypothesis.count(var) != 1 {
            return None;
        }
        Some(PropertyTemplate::Template(hypothesis.substitute(
            &SingleSubstitution {
                from: var,
                to: Expression::hole(),
            },
        )))
    }

    /// Builds the common template of all hypotheses of `rule`. Every hypothesis has to contain
    /// exactly one variable, all of them different, and there have to be as many hypotheses as
    /// mandatory variables. Returns the template and the variable of each hypothesis.
    pub fn from_hypotheses(rule: &Rule) -> Option<(Self, Vec<Identifier>)> {
        let hypotheses = rule.hypotheses();
        if hypotheses.is_empty() {
            return Some((PropertyTemplate::Empty, Vec::new()));
        }
        if hypotheses.len() != rule.mandatory_vars().len() {
            return None;
        }
        let mut vars = Vec::with_capacity(hypotheses.len());
        for hypothesis in hypotheses {
            match hypothesis.variables().as_slice() {
                [var] if !vars.contains(var) => vars.push(*var),
                _ => return None,
            }
        }
        let template = PropertyTemplate::from_hypothesis(&hypotheses[0], vars[0])?;
        for (hypothesis, var) in hypotheses.iter().zip(vars.iter()) {
            if template.extract(hypothesis)? != Expression::leaf(*var) {
                return None;
            }
        }
        Some((template, vars))
    }

    /// Like [`from_hypotheses`](Self::from_hypotheses), but the hypotheses must also follow
    /// the order of the mandatory variables.
    pub fn for_operation(rule: &Rule) -> Option<Self> {
        let (template, vars) = PropertyTemplate::from_hypotheses(rule)?;
        if !template.is_empty() && vars != rule.mandatory_vars() {
            return None;
        }
        Some(template)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PropertyTemplate::Empty)
    }

    /// Fills the hole with `node`. The empty template has nothing to fill.
    ///
    /// # Example
    /// ```
    /// use mmtransform::pattern::PropertyTemplate;
    /// use mmtransform::Expression;
    ///
    /// let cc = Expression::leaf(-3);
    /// let template =
    ///     PropertyTemplate::Template(Expression::new(-2, vec![Expression::hole(), cc.clone()]));
    /// let a = Expression::leaf(4);
    /// let stmt = template.substitute(&a).unwrap();
    /// assert_eq!(stmt, Expression::new(-2, vec![a.clone(), cc]));
    /// assert_eq!(template.extract(&stmt), Some(a));
    /// assert_eq!(PropertyTemplate::Empty.substitute(&stmt), None);
    /// ```
    pub fn substitute(&self, node: &Expression) -> Option<Expression> {
        match self {
            PropertyTemplate::Empty => None,
            PropertyTemplate::Template(template) => Some(template.substitute(
                &SingleSubstitution {
                    from: HOLE,
                    to: node.clone(),
                },
            )),
        }
    }

    /// Matches `input` against the template and returns the part sitting in the hole.
    pub fn extract(&self, input: &Expression) -> Option<Expression> {
        match self {
            PropertyTemplate::Empty => None,
            PropertyTemplate::Template(template) => extract_hole(template, input),
        }
    }
}

fn extract_hole(template: &Expression, input: &Expression) -> Option<Expression> {
    if template.is_hole() {
        return Some(input.clone());
    }
    if template.head() != input.head() || template.arity() != input.arity() {
        return None;
    }
    let mut found = None;
    for (t, i) in template.children().iter().zip(input.children()) {
        if t.contains(HOLE) {
            found = Some(extract_hole(t, i)?);
        } else if t != i {
            return None;
        }
    }
    found
}

/// An operator application generalized over two argument positions: the operator, its
/// constant arguments, the side condition its rules need and the two variable positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneralizedStmt {
    pub op: Identifier,
    pub const_subst: ConstSubst,
    pub template: PropertyTemplate,
    pub var_indexes: [usize; 2],
}

impl GeneralizedStmt {
    pub fn new(
        op: Identifier,
        const_subst: ConstSubst,
        template: PropertyTemplate,
        var_indexes: [usize; 2],
    ) -> Self {
        GeneralizedStmt {
            op,
            const_subst,
            template,
            var_indexes,
        }
    }

    pub fn key(&self) -> RuleKey {
        RuleKey::new(self.op, self.const_subst.clone(), self.template.clone())
    }

    /// Creates the application with `left` and `right` at the two variable positions.
    pub fn create_binary(&self, left: Expression, right: Expression) -> Expression {
        let mut left = Some(left);
        let mut right = Some(right);
        let children = self
            .const_subst
            .slots()
            .iter()
            .enumerate()
            .map(|(i, slot)| match slot {
                Some(constant) => constant.clone(),
                None if i == self.var_indexes[0] => left.take().unwrap_or_else(Expression::hole),
                None => right.take().unwrap_or_else(Expression::hole),
            })
            .collect();
        Expression::new(self.op, children)
    }

    /// Like [`create_binary`](Self::create_binary), but `first` goes to the variable position
    /// `from` and `second` to the other one.
    pub fn create_assoc_binary(
        &self,
        from: usize,
        first: Expression,
        second: Expression,
    ) -> Expression {
        if from == 0 {
            self.create_binary(first, second)
        } else {
            self.create_binary(second, first)
        }
    }

    /// Tests whether `node` applies the same operator with the same constant arguments.
    pub fn matches(&self, node: &Expression) -> bool {
        node.head() == self.op
            && self.const_subst.check_and_get_var_positions(node).as_deref()
                == Some(&self.var_indexes[..])
    }
}
