use crate::{expression::Expression, types::*};

/// A `Substitution` maps variable ids to expressions.
///
/// This is intended to be used together with [`Expression`s](crate::Expression).
pub trait Substitution {
    /// Get the stored substitution for the identifier `id`. Or `None` if it should not be
    /// replaced.
    fn substitution_opt(&self, id: Identifier) -> Option<&Expression>;
}

/// A general [`Substitution`] built by [`Expression::unify`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WholeSubstitution {
    substitution: Vec<Option<Expression>>,
}

impl WholeSubstitution {
    pub fn new() -> Self {
        WholeSubstitution {
            substitution: Vec::new(),
        }
    }

    /// Creates a substitution with preallocated room for the variables `0` to `n - 1`.
    pub fn with_capacity(n: usize) -> Self {
        WholeSubstitution {
            substitution: vec![None; n],
        }
    }

    /// Marks the variable `id` to be substituted by `expr`. Operator identifiers are never
    /// substituted and are ignored.
    pub fn insert(&mut self, id: Identifier, expr: Expression) {
        if let Ok(index) = usize::try_from(id) {
            if self.substitution.len() <= index {
                self.substitution.resize(index + 1, None);
            }
            self.substitution[index] = Some(expr);
        }
    }

    /// Iterates over all variables that have a replacement.
    pub fn iter(&self) -> impl Iterator<Item = (Identifier, &Expression)> {
        self.substitution
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i as Identifier, e)))
    }
}

impl Substitution for WholeSubstitution {
    fn substitution_opt(&self, id: Identifier) -> Option<&Expression> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.substitution.get(i))
            .and_then(|e| e.as_ref())
    }
}

/// Replaces exactly one identifier. Used to fill and to create the hole of a
/// [`PropertyTemplate`](crate::pattern::PropertyTemplate).
pub struct SingleSubstitution {
    pub from: Identifier,
    pub to: Expression,
}

impl Substitution for SingleSubstitution {
    fn substitution_opt(&self, id: Identifier) -> Option<&Expression> {
        if id == self.from {
            Some(&self.to)
        } else {
            None
        }
    }
}
