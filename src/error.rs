use crate::{expression::Expression, types::*};
use thiserror::Error;

/// A error which is produced when an expression is not an instance of a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    OperatorMismatch(Identifier, Identifier),
    VariableMismatch(Identifier, Expression, Expression),
    TypeMismatch(Identifier, TypeCode, TypeCode),
    ParameterError(usize, usize),
}

/// Errors produced while building a [`Library`][crate::library::Library]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),
    #[error("unknown identifier {0}")]
    UnknownIdentifier(Identifier),
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("label `{0}` is already in use")]
    DuplicateLabel(String),
    #[error("operator `{label}` expects {expected} arguments but got {found}")]
    ArityMismatch {
        label: String,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Errors produced by the transformation engine.
///
/// [`TransformError::NoMatch`] is the recoverable one: it only says that the requested
/// rewrite is not possible with the rules the library provides. All other variants abort the
/// automatic search for the current derivation step.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("no match: {0}")]
    NoMatch(String),
    #[error("invariant violated: {0}")]
    Invariant(String),
    #[error("rule `{rule}` cannot justify the step: {reason}")]
    Unsound { rule: String, reason: String },
    #[error("expression does not fit the rule: {0:?}")]
    Proof(ProofError),
    #[error("{limit} limit of {value} exceeded")]
    LimitExceeded { limit: &'static str, value: usize },
    #[error("step {0} does not exist")]
    UnknownStep(StepId),
    #[error("rule {0} does not exist")]
    UnknownRule(RuleId),
}

impl From<ProofError> for TransformError {
    fn from(e: ProofError) -> Self {
        TransformError::Proof(e)
    }
}

impl TransformError {
    /// Returns `true` if the error only means "this rewrite is not possible"
    pub fn is_no_match(&self) -> bool {
        matches!(self, TransformError::NoMatch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unification_errors_convert() {
        let e: TransformError = ProofError::ParameterError(2, 1).into();
        assert_eq!(e, TransformError::Proof(ProofError::ParameterError(2, 1)));
        assert!(!e.is_no_match());
        assert_eq!(
            e.to_string(),
            "expression does not fit the rule: ParameterError(2, 1)"
        );
    }
}
