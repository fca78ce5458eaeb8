use crate::{
    error::{LibraryError, ProofError},
    expression::{is_operator, Expression},
    substitution::WholeSubstitution,
    types::*,
};
use std::collections::{hash_map::Entry, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Operator { arity: usize },
}

/// A declared variable or operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub label: String,
    pub typecode: TypeCode,
    pub seq: SeqNum,
    pub kind: SymbolKind,
}

/// A verified axiom or theorem: zero or more hypotheses and one conclusion. All of them are
/// statements of the form _expression is provable_.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    label: String,
    conclusion: Expression,
    hypotheses: Vec<Expression>,
    mandatory_vars: Vec<Identifier>,
    seq: SeqNum,
}

impl Rule {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn conclusion(&self) -> &Expression {
        &self.conclusion
    }

    pub fn hypotheses(&self) -> &[Expression] {
        &self.hypotheses
    }

    /// The variables of the rule ordered by their declaration sequence number
    pub fn mandatory_vars(&self) -> &[Identifier] {
        &self.mandatory_vars
    }

    pub fn seq(&self) -> SeqNum {
        self.seq
    }

    /// The same rule with other statements, e.g. with an implication prefix removed. Only the
    /// mandatory variables which still occur are kept.
    pub(crate) fn with_statements(
        &self,
        hypotheses: Vec<Expression>,
        conclusion: Expression,
    ) -> Rule {
        let mandatory_vars = self
            .mandatory_vars
            .iter()
            .copied()
            .filter(|v| conclusion.contains(*v) || hypotheses.iter().any(|h| h.contains(*v)))
            .collect();
        Rule {
            label: self.label.clone(),
            conclusion,
            hypotheses,
            mandatory_vars,
            seq: self.seq,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Symbol(Identifier),
    Rule(RuleId),
}

/// The symbols and rules the transformation engine works with.
///
/// Every declaration gets the next sequence number, so symbols and rules share one ordering.
/// Variables get the identifiers `0, 1, 2, ...`, operators `-1, -2, -3, ...`.
///
/// # Example
/// ```
/// use mmtransform::library::Library;
/// use mmtransform::Expression;
///
/// let mut library = Library::new();
/// let wff = library.add_type("wff".to_owned()).unwrap();
/// let ph = library.add_variable("ph".to_owned(), wff).unwrap();
/// let ps = library.add_variable("ps".to_owned(), wff).unwrap();
/// let imp = library.add_operator("->".to_owned(), wff, 2).unwrap();
///
/// let major = Expression::new(imp, vec![Expression::leaf(ph), Expression::leaf(ps)]);
/// let hyps = vec![Expression::leaf(ph), major.clone()];
/// let rule = library
///     .add_rule("ax-mp".to_owned(), hyps, Expression::leaf(ps))
///     .unwrap();
/// assert_eq!(library.rule(rule).unwrap().mandatory_vars(), &[ph, ps]);
/// assert_eq!(library.expression_to_string(&major), "(ph -> ps)");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Library {
    types: Vec<String>,
    variables: Vec<Symbol>,
    operators: Vec<Symbol>,
    rules: Vec<Rule>,
    labels: HashMap<String, Label>,
    next_seq: SeqNum,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a type code. The first declared type is the type of provable formulas.
    pub fn add_type(&mut self, name: String) -> Result<TypeCode, LibraryError> {
        if self.types.contains(&name) {
            return Err(LibraryError::DuplicateLabel(name));
        }
        let code = TypeCode::try_from(self.types.len())
            .map_err(|_| LibraryError::UnknownType(name.clone()))?;
        self.types.push(name);
        Ok(code)
    }

    pub fn type_code(&self, name: &str) -> Option<TypeCode> {
        self.types
            .iter()
            .position(|t| t == name)
            .and_then(|i| TypeCode::try_from(i).ok())
    }

    pub fn type_name(&self, code: TypeCode) -> Option<&str> {
        self.types.get(code as usize).map(|t| t.as_str())
    }

    pub fn formula_type(&self) -> Option<TypeCode> {
        if self.types.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    pub fn add_variable(
        &mut self,
        label: String,
        typecode: TypeCode,
    ) -> Result<Identifier, LibraryError> {
        self.check_type(typecode)?;
        let id = self.variables.len() as Identifier;
        self.insert_label(label.clone(), Label::Symbol(id))?;
        let seq = self.take_seq();
        self.variables.push(Symbol {
            label,
            typecode,
            seq,
            kind: SymbolKind::Variable,
        });
        Ok(id)
    }

    pub fn add_operator(
        &mut self,
        label: String,
        typecode: TypeCode,
        arity: usize,
    ) -> Result<Identifier, LibraryError> {
        self.check_type(typecode)?;
        let id = -(self.operators.len() as Identifier) - 1;
        self.insert_label(label.clone(), Label::Symbol(id))?;
        let seq = self.take_seq();
        self.operators.push(Symbol {
            label,
            typecode,
            seq,
            kind: SymbolKind::Operator { arity },
        });
        Ok(id)
    }

    /// Adds a rule. The mandatory variables are all variables of the hypotheses and the
    /// conclusion, ordered by their declaration.
    pub fn add_rule(
        &mut self,
        label: String,
        hypotheses: Vec<Expression>,
        conclusion: Expression,
    ) -> Result<RuleId, LibraryError> {
        for expression in hypotheses.iter().chain(std::iter::once(&conclusion)) {
            self.check_expression(expression)?;
        }
        let mut mandatory_vars = Vec::new();
        for expression in hypotheses.iter().chain(std::iter::once(&conclusion)) {
            for var in expression.variables() {
                if !mandatory_vars.contains(&var) {
                    mandatory_vars.push(var);
                }
            }
        }
        mandatory_vars.sort_by_key(|v| self.seq(*v));

        let id = self.rules.len();
        self.insert_label(label.clone(), Label::Rule(id))?;
        let seq = self.take_seq();
        self.rules.push(Rule {
            label,
            conclusion,
            hypotheses,
            mandatory_vars,
            seq,
        });
        Ok(id)
    }

    /// Checks that every identifier of `expression` is declared and every operator gets the
    /// right number of arguments.
    pub fn check_expression(&self, expression: &Expression) -> Result<(), LibraryError> {
        let symbol = self
            .symbol(expression.head())
            .ok_or(LibraryError::UnknownIdentifier(expression.head()))?;
        let expected = match symbol.kind {
            SymbolKind::Variable => 0,
            SymbolKind::Operator { arity } => arity,
        };
        if expected != expression.arity() {
            return Err(LibraryError::ArityMismatch {
                label: symbol.label.clone(),
                expected,
                found: expression.arity(),
            });
        }
        expression
            .children()
            .iter()
            .try_for_each(|c| self.check_expression(c))
    }

    pub fn symbol(&self, id: Identifier) -> Option<&Symbol> {
        if is_operator(id) {
            let index = id.checked_neg()?.checked_sub(1)?;
            self.operators.get(index as usize)
        } else {
            self.variables.get(id as usize)
        }
    }

    /// Finds the variable or operator with the given label
    pub fn lookup(&self, label: &str) -> Option<Identifier> {
        match self.labels.get(label) {
            Some(Label::Symbol(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn seq(&self, id: Identifier) -> Option<SeqNum> {
        self.symbol(id).map(|s| s.seq)
    }

    pub fn typecode(&self, id: Identifier) -> Option<TypeCode> {
        self.symbol(id).map(|s| s.typecode)
    }

    /// The type of an expression is the type of its head
    pub fn type_of(&self, expression: &Expression) -> Option<TypeCode> {
        self.typecode(expression.head())
    }

    pub fn label(&self, id: Identifier) -> Option<&str> {
        self.symbol(id).map(|s| s.label.as_str())
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id)
    }

    pub fn rule_by_label(&self, label: &str) -> Option<(RuleId, &Rule)> {
        match self.labels.get(label) {
            Some(Label::Rule(id)) => self.rules.get(*id).map(|r| (*id, r)),
            _ => None,
        }
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// The sequence number the next declaration would get. Every rule of the library has a
    /// smaller one.
    pub fn next_seq(&self) -> SeqNum {
        self.next_seq
    }

    /// Checks that `conclusion` and `hypotheses` are an instance of `rule` under one common
    /// substitution that respects the types of the rule's variables.
    pub fn check_instance(
        &self,
        rule: &Rule,
        conclusion: &Expression,
        hypotheses: &[&Expression],
    ) -> Result<WholeSubstitution, ProofError> {
        if hypotheses.len() != rule.hypotheses.len() {
            return Err(ProofError::ParameterError(
                hypotheses.len(),
                rule.hypotheses.len(),
            ));
        }
        let mut substitution = WholeSubstitution::with_capacity(self.variables.len());
        conclusion.unify(&rule.conclusion, &mut substitution)?;
        for (hypothesis, pattern) in hypotheses.iter().zip(rule.hypotheses.iter()) {
            hypothesis.unify(pattern, &mut substitution)?;
        }
        for (var, expression) in substitution.iter() {
            match (self.typecode(var), self.type_of(expression)) {
                (Some(expected), Some(found)) if expected == found => {}
                (expected, found) => {
                    return Err(ProofError::TypeMismatch(
                        var,
                        expected.unwrap_or(TypeCode::MAX),
                        found.unwrap_or(TypeCode::MAX),
                    ))
                }
            }
        }
        Ok(substitution)
    }

    /// Writes `expression` in the notation `(a + b)` for binary operators, `(f a)` for unary
    /// operators and `(f a b c)` for higher arities.
    pub fn format_expression(&self, s: &mut String, expression: &Expression) {
        if expression.is_hole() {
            s.push('_');
            return;
        }
        let label = match self.label(expression.head()) {
            Some(label) => label,
            None => {
                s.push('?');
                return;
            }
        };
        match expression.children() {
            [] => s.push_str(label),
            [left, right] => {
                s.push('(');
                self.format_expression(s, left);
                s.push(' ');
                s.push_str(label);
                s.push(' ');
                self.format_expression(s, right);
                s.push(')');
            }
            children => {
                s.push('(');
                s.push_str(label);
                for child in children {
                    s.push(' ');
                    self.format_expression(s, child);
                }
                s.push(')');
            }
        }
    }

    pub fn expression_to_string(&self, expression: &Expression) -> String {
        let mut s = String::new();
        self.format_expression(&mut s, expression);
        s
    }

    /// Writes `rule` as `hyp, hyp => conclusion`
    pub fn format_rule(&self, s: &mut String, rule: &Rule) {
        for (i, hypothesis) in rule.hypotheses.iter().enumerate() {
            self.format_expression(s, hypothesis);
            s.push_str(if i + 1 == rule.hypotheses.len() { " => " } else { ", " });
        }
        self.format_expression(s, &rule.conclusion);
    }

    fn check_type(&self, typecode: TypeCode) -> Result<(), LibraryError> {
        if (typecode as usize) < self.types.len() {
            Ok(())
        } else {
            Err(LibraryError::UnknownType(typecode.to_string()))
        }
    }

    fn insert_label(&mut self, label: String, value: Label) -> Result<(), LibraryError> {
        match self.labels.entry(label) {
            Entry::Occupied(entry) => Err(LibraryError::DuplicateLabel(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    fn take_seq(&mut self) -> SeqNum {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> (Library, Identifier, Identifier, Identifier) {
        let mut library = Library::new();
        let wff = library.add_type("wff".to_owned()).unwrap();
        let ph = library.add_variable("ph".to_owned(), wff).unwrap();
        let ps = library.add_variable("ps".to_owned(), wff).unwrap();
        let not = library.add_operator("-.".to_owned(), wff, 1).unwrap();
        (library, ph, ps, not)
    }

    #[test]
    fn identifiers_and_sequence_numbers() {
        let (library, ph, ps, not) = small();
        assert_eq!((ph, ps, not), (0, 1, -1));
        assert_eq!(library.seq(ph), Some(0));
        assert_eq!(library.seq(not), Some(2));
        assert_eq!(library.lookup("-."), Some(not));
        assert_eq!(library.next_seq(), 3);
    }

    #[test]
    fn mandatory_variables_follow_declaration_order() {
        let (mut library, ph, ps, not) = small();
        let hyp = Expression::new(not, vec![Expression::leaf(ps)]);
        let id = library
            .add_rule("r".to_owned(), vec![hyp], Expression::leaf(ph))
            .unwrap();
        assert_eq!(library.rule(id).unwrap().mandatory_vars(), &[ph, ps]);
        assert_eq!(library.rule(id).unwrap().seq(), 3);
    }

    #[test]
    fn rejects_bad_declarations() {
        let (mut library, ph, _, not) = small();
        assert_eq!(
            library.add_variable("ph".to_owned(), 0),
            Err(LibraryError::DuplicateLabel("ph".to_owned()))
        );
        let bad = Expression::new(not, vec![Expression::leaf(ph), Expression::leaf(ph)]);
        assert!(matches!(
            library.add_rule("bad".to_owned(), vec![], bad),
            Err(LibraryError::ArityMismatch { expected: 1, found: 2, .. })
        ));
        assert!(matches!(
            library.add_rule("bad".to_owned(), vec![], Expression::leaf(7)),
            Err(LibraryError::UnknownIdentifier(7))
        ));
    }

    #[test]
    fn check_instance_respects_types() {
        let (mut library, ph, _, not) = small();
        let class = library.add_type("class".to_owned()).unwrap();
        let a = library.add_variable("A".to_owned(), class).unwrap();
        let id = library
            .add_rule(
                "notnot".to_owned(),
                vec![Expression::leaf(ph)],
                Expression::new(not, vec![Expression::new(not, vec![Expression::leaf(ph)])]),
            )
            .unwrap();
        let rule = library.rule(id).unwrap().clone();

        let good = Expression::new(not, vec![Expression::new(not, vec![Expression::leaf(ph)])]);
        assert!(library
            .check_instance(&rule, &good, &[&Expression::leaf(ph)])
            .is_ok());

        let typed = Expression::new(not, vec![Expression::new(not, vec![Expression::leaf(a)])]);
        assert_eq!(
            library
                .check_instance(&rule, &typed, &[&Expression::leaf(a)])
                .map(|_| ()),
            Err(ProofError::TypeMismatch(ph, 0, class))
        );
        assert_eq!(
            library.check_instance(&rule, &good, &[]).map(|_| ()),
            Err(ProofError::ParameterError(0, 1))
        );
    }

    #[test]
    fn formats_all_arities() {
        let (mut library, ph, ps, not) = small();
        let imp = library.add_operator("->".to_owned(), 0, 2).unwrap();
        let ifp = library.add_operator("if-".to_owned(), 0, 3).unwrap();
        let e = Expression::new(
            ifp,
            vec![
                Expression::new(not, vec![Expression::leaf(ph)]),
                Expression::new(imp, vec![Expression::leaf(ph), Expression::leaf(ps)]),
                Expression::hole(),
            ],
        );
        assert_eq!(library.expression_to_string(&e), "(if- (-. ph) (ph -> ps) _)");
    }
}
