use crate::{
    error::ProofError,
    substitution::{Substitution, WholeSubstitution},
    types::*,
};
use std::sync::Arc;

/// The identifier reserved for the single hole of a
/// [`PropertyTemplate`](crate::pattern::PropertyTemplate)
pub const HOLE: Identifier = Identifier::MIN;

/// An expression tree. The head is either a variable (`head >= 0`) or an operator
/// (`head < 0`), the children are the operator's arguments.
///
/// Expressions are immutable. Children are shared between clones, so rebuilding a tree with
/// one child replaced only allocates the nodes on the path to that child. Equality and hashing
/// are structural.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Expression {
    head: Identifier,
    children: Arc<[Expression]>,
}

impl Expression {
    /// Creates an operator application (or a variable if `children` is empty and `head` is a
    /// variable identifier).
    pub fn new(head: Identifier, children: Vec<Expression>) -> Self {
        Expression {
            head,
            children: Arc::from(children),
        }
    }

    /// Creates a expression without children, i.e. a variable or a constant.
    pub fn leaf(head: Identifier) -> Self {
        Expression::new(head, Vec::new())
    }

    pub fn hole() -> Self {
        Expression::leaf(HOLE)
    }

    pub fn head(&self) -> Identifier {
        self.head
    }

    pub fn children(&self) -> &[Expression] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&Expression> {
        self.children.get(index)
    }

    pub fn arity(&self) -> usize {
        self.children.len()
    }

    pub fn is_variable(&self) -> bool {
        !is_operator(self.head)
    }

    pub fn is_hole(&self) -> bool {
        self.head == HOLE
    }

    /// Tests whether the expression contains no variables (and no hole).
    ///
    /// # Example
    /// ```
    /// use mmtransform::expression::Expression;
    ///
    /// let one = Expression::leaf(-3);
    /// assert!(Expression::new(-2, vec![one.clone(), one.clone()]).is_constant());
    /// assert!(!Expression::new(-2, vec![one, Expression::leaf(0)]).is_constant());
    /// ```
    pub fn is_constant(&self) -> bool {
        is_operator(self.head) && self.head != HOLE && self.children.iter().all(|c| c.is_constant())
    }

    /// Tests whether `id` occurs somewhere in this expression.
    pub fn contains(&self, id: Identifier) -> bool {
        self.head == id || self.children.iter().any(|c| c.contains(id))
    }

    /// Counts the occurrences of `id` in this expression.
    pub fn count(&self, id: Identifier) -> usize {
        let own = if self.head == id { 1 } else { 0 };
        own + self.children.iter().map(|c| c.count(id)).sum::<usize>()
    }

    /// Returns the variables of this expression in the order of their first appearance.
    ///
    /// # Example
    /// ```
    /// use mmtransform::expression::Expression;
    ///
    /// let e = Expression::new(-2, vec![
    ///     Expression::leaf(1),
    ///     Expression::new(-2, vec![Expression::leaf(0), Expression::leaf(1)]),
    /// ]);
    /// assert_eq!(e.variables(), vec![1, 0]);
    /// ```
    pub fn variables(&self) -> Vec<Identifier> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<Identifier>) {
        if self.is_variable() {
            if !vars.contains(&self.head) {
                vars.push(self.head);
            }
        } else {
            for child in self.children.iter() {
                child.collect_variables(vars);
            }
        }
    }

    /// Maximum depth of the tree. A leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// Returns a copy of this expression where the child at `index` is replaced by `child`.
    ///
    /// # Panics
    /// This method panics if `index` is not a valid child position.
    pub fn with_child(&self, index: usize, child: Expression) -> Expression {
        let mut children = self.children.to_vec();
        children[index] = child;
        Expression::new(self.head, children)
    }

    /// Returns a copy of this expression where the children at `a` and `b` are swapped.
    ///
    /// # Panics
    /// This method panics if `a` or `b` is not a valid child position.
    pub fn with_swapped(&self, a: usize, b: usize) -> Expression {
        let mut children = self.children.to_vec();
        children.swap(a, b);
        Expression::new(self.head, children)
    }

    /// Calculates a `Substitution` which transforms `other` into `self`. If this function
    /// succeeds then it is guaranteed that `other.substitute(&substitution) == self`.
    ///
    /// Variables of `self` are treated like constants, only variables of `other` are
    /// substituted.
    ///
    /// # Errors
    /// * OperatorMismatch - if the operators of `other` do not match the corresponding operators
    /// of `self`
    /// * VariableMismatch - if a variable in `other` would have to be substituted by two different
    /// expressions
    ///
    /// # Example
    /// ```
    /// use mmtransform::expression::Expression;
    /// use mmtransform::substitution::WholeSubstitution;
    /// use mmtransform::error::ProofError;
    ///
    /// let x0 = Expression::leaf(0);
    /// let x1 = Expression::leaf(1);
    /// let inner = Expression::new(-2, vec![x1.clone(), x0.clone()]);
    /// let a = Expression::new(-2, vec![x0.clone(), inner]);
    /// let b = Expression::new(-2, vec![x0.clone(), x1.clone()]);
    /// let mut sub = WholeSubstitution::new();
    /// assert_eq!(a.unify(&b, &mut sub), Ok(()));
    /// assert_eq!(b.substitute(&sub), a);
    ///
    /// let c = Expression::new(-2, vec![x0.clone(), x0.clone()]);
    /// let mut sub = WholeSubstitution::new();
    /// assert!(matches!(a.unify(&c, &mut sub), Err(ProofError::VariableMismatch(0, _, _))));
    ///
    /// let d = Expression::new(-3, vec![x0, x1]);
    /// let mut sub = WholeSubstitution::new();
    /// assert_eq!(a.unify(&d, &mut sub), Err(ProofError::OperatorMismatch(-2, -3)));
    /// ```
    pub fn unify(
        &self,
        other: &Expression,
        substitution: &mut WholeSubstitution,
    ) -> Result<(), ProofError> {
        if other.is_variable() {
            match substitution.substitution_opt(other.head) {
                Some(old) => {
                    if old != self {
                        return Err(ProofError::VariableMismatch(
                            other.head,
                            old.clone(),
                            self.clone(),
                        ));
                    }
                }
                None => substitution.insert(other.head, self.clone()),
            }
            return Ok(());
        }
        if self.head != other.head {
            return Err(ProofError::OperatorMismatch(self.head, other.head));
        }
        if self.children.len() != other.children.len() {
            return Err(ProofError::ParameterError(
                self.children.len(),
                other.children.len(),
            ));
        }
        for (child, pattern) in self.children.iter().zip(other.children.iter()) {
            child.unify(pattern, substitution)?;
        }
        Ok(())
    }

    /// Use the given substitution on this expression to create a new expression
    ///
    /// # Example
    /// ```
    /// use mmtransform::expression::Expression;
    /// use mmtransform::substitution::SingleSubstitution;
    ///
    /// let x0 = Expression::leaf(0);
    /// let expr = Expression::new(-2, vec![x0.clone(), Expression::leaf(1)]);
    /// let sub = SingleSubstitution { from: 1, to: expr.clone() };
    /// assert_eq!(
    ///     expr.substitute(&sub),
    ///     Expression::new(-2, vec![x0, expr.clone()]),
    /// );
    /// ```
    pub fn substitute<S: Substitution>(&self, substitution: &S) -> Expression {
        if self.children.is_empty() {
            return match substitution.substitution_opt(self.head) {
                Some(e) => e.clone(),
                None => self.clone(),
            };
        }
        Expression::new(
            self.head,
            self.children
                .iter()
                .map(|c| c.substitute(substitution))
                .collect(),
        )
    }
}

/// Tests whether the given identifier is an operator
///
/// # Example
/// ```
/// use mmtransform::expression::is_operator;
///
/// assert!(is_operator(-2));
/// assert!(is_operator(-1));
/// assert!(!is_operator(0));
/// ```
pub fn is_operator(x: Identifier) -> bool {
    x < 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(head: Identifier, children: Vec<Expression>) -> Expression {
        Expression::new(head, children)
    }

    #[test]
    fn structural_equality() {
        let a = op(-1, vec![Expression::leaf(0), Expression::leaf(1)]);
        let b = op(-1, vec![Expression::leaf(0), Expression::leaf(1)]);
        assert_eq!(a, b);
        assert_ne!(a, a.with_swapped(0, 1));
    }

    #[test]
    fn depth_and_count() {
        let inner = op(-1, vec![Expression::leaf(0), Expression::leaf(2)]);
        let a = op(-1, vec![Expression::leaf(0), inner]);
        assert_eq!(a.depth(), 3);
        assert_eq!(a.count(0), 2);
        assert!(a.contains(2));
        assert!(!a.contains(1));
    }

    #[test]
    fn with_child_shares_untouched_children() {
        let left = op(-2, vec![Expression::leaf(0)]);
        let a = op(-1, vec![left.clone(), Expression::leaf(1)]);
        let b = a.with_child(1, Expression::leaf(3));
        assert_eq!(b.child(0), Some(&left));
        assert_eq!(b.child(1), Some(&Expression::leaf(3)));
        assert_eq!(a.child(1), Some(&Expression::leaf(1)));
    }

    #[test]
    fn unify_treats_instance_variables_as_constants() {
        let pattern = op(-1, vec![Expression::leaf(0), Expression::leaf(0)]);
        let instance = op(-1, vec![Expression::leaf(5), Expression::leaf(5)]);
        let mut sub = WholeSubstitution::new();
        assert_eq!(instance.unify(&pattern, &mut sub), Ok(()));
        assert_eq!(sub.substitution_opt(0), Some(&Expression::leaf(5)));

        let instance = op(-1, vec![Expression::leaf(5), Expression::leaf(6)]);
        let mut sub = WholeSubstitution::new();
        assert!(instance.unify(&pattern, &mut sub).is_err());
    }

    #[test]
    fn unify_checks_arity() {
        let pattern = op(-1, vec![Expression::leaf(0)]);
        let instance = op(-1, vec![Expression::leaf(0), Expression::leaf(1)]);
        let mut sub = WholeSubstitution::new();
        assert_eq!(
            instance.unify(&pattern, &mut sub),
            Err(ProofError::ParameterError(2, 1))
        );
    }
}
