use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::char,
    combinator::{map, map_opt},
    error::context,
    multi::{count, separated_list1},
    sequence::{preceded, tuple},
    IResult,
};

use super::error::GreedyError;
use crate::{
    expression::Expression,
    library::{Library, SymbolKind},
    types::*,
};

/// Reads expressions and rules in the notation [`Library::format_expression`] writes.
///
/// ```
/// use mmtransform::library::Library;
/// use mmtransform::serialization::Formatter;
///
/// let mut library = Library::new();
/// let wff = library.add_type("wff".to_owned()).unwrap();
/// library.add_variable("ph".to_owned(), wff).unwrap();
/// library.add_variable("ps".to_owned(), wff).unwrap();
/// library.add_operator("->".to_owned(), wff, 2).unwrap();
/// library.add_operator("-.".to_owned(), wff, 1).unwrap();
///
/// let fmt = Formatter::new(&library);
/// let (remaining, expression) = fmt.parse_expression("((-. ph) -> ps)").unwrap();
/// assert_eq!(remaining, "");
/// assert_eq!(library.expression_to_string(&expression), "((-. ph) -> ps)");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Formatter<'l> {
    library: &'l Library,
}

impl<'l> Formatter<'l> {
    pub fn new(library: &'l Library) -> Self {
        Formatter { library }
    }

    pub fn library(&self) -> &'l Library {
        self.library
    }

    fn parse_symbol(input: &str) -> IResult<&str, &str, GreedyError<&str>> {
        is_not(" (),")(input)
    }

    fn operator<F>(&self, symbol: &str, accept: F) -> Option<(Identifier, usize)>
    where
        F: Fn(usize) -> bool,
    {
        let id = self.library.lookup(symbol)?;
        match self.library.symbol(id)?.kind {
            SymbolKind::Operator { arity } if accept(arity) => Some((id, arity)),
            _ => None,
        }
    }

    fn parse_leaf<'a>(
        &self,
        input: &'a str,
    ) -> IResult<&'a str, Expression, GreedyError<&'a str>> {
        map_opt(Self::parse_symbol, |s| {
            let id = self.library.lookup(s)?;
            match self.library.symbol(id)?.kind {
                SymbolKind::Variable | SymbolKind::Operator { arity: 0 } => {
                    Some(Expression::leaf(id))
                }
                SymbolKind::Operator { .. } => None,
            }
        })(input)
    }

    fn parse_infix<'a>(
        &self,
        input: &'a str,
    ) -> IResult<&'a str, Expression, GreedyError<&'a str>> {
        let (input, _) = char('(')(input)?;
        let (input, left) = self.parse_expression(input)?;
        let (input, _) = char(' ')(input)?;
        let (input, (op, _)) =
            map_opt(Self::parse_symbol, |s| self.operator(s, |a| a == 2))(input)?;
        let (input, _) = char(' ')(input)?;
        let (input, right) = self.parse_expression(input)?;
        let (input, _) = char(')')(input)?;
        Ok((input, Expression::new(op, vec![left, right])))
    }

    fn parse_prefix<'a>(
        &self,
        input: &'a str,
    ) -> IResult<&'a str, Expression, GreedyError<&'a str>> {
        let (input, _) = char('(')(input)?;
        let (input, (op, arity)) =
            map_opt(Self::parse_symbol, |s| self.operator(s, |a| a == 1 || a > 2))(input)?;
        let (input, children) =
            count(preceded(char(' '), |input| self.parse_expression(input)), arity)(input)?;
        let (input, _) = char(')')(input)?;
        Ok((input, Expression::new(op, children)))
    }

    pub fn parse_expression<'a>(
        &self,
        input: &'a str,
    ) -> IResult<&'a str, Expression, GreedyError<&'a str>> {
        context(
            "expression",
            alt((
                |input| self.parse_infix(input),
                |input| self.parse_prefix(input),
                |input| self.parse_leaf(input),
            )),
        )(input)
    }

    /// Parses `hyp, hyp => conclusion` or a lone conclusion.
    pub fn parse_rule<'a>(
        &self,
        input: &'a str,
    ) -> IResult<&'a str, (Vec<Expression>, Expression), GreedyError<&'a str>> {
        alt((
            map(
                tuple((
                    separated_list1(tag(", "), |input| self.parse_expression(input)),
                    tag(" => "),
                    |input| self.parse_expression(input),
                )),
                |(hypotheses, _, conclusion)| (hypotheses, conclusion),
            ),
            map(
                |input| self.parse_expression(input),
                |conclusion| (Vec::new(), conclusion),
            ),
        ))(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[test]
    fn notations() {
        let f = Fixture::from_text(
            "typ wff\n\
             typ class\n\
             var wff ph\n\
             var class A B C\n\
             opr wff -. 1\n\
             opr class if 3\n\
             opr wff = 2\n\
             opr class 0 0\n",
        );
        let fmt = Formatter::new(&f.library);
        for text in [
            "ph",
            "0",
            "(-. ph)",
            "(A = 0)",
            "(if ph (A = B) C)",
            "((if ph A 0) = (-. (B = C)))",
        ] {
            let (remaining, expression) = fmt.parse_expression(text).unwrap();
            assert_eq!(remaining, "");
            assert_eq!(f.library.expression_to_string(&expression), text);
        }
        let (_, expression) = fmt.parse_expression("(if ph A 0)").unwrap();
        assert_eq!(expression.arity(), 3);
        assert_eq!(expression.head(), f.op("if"));
    }

    #[test]
    fn rejects_malformed_expressions() {
        let f = Fixture::arith();
        let fmt = Formatter::new(&f.library);
        assert!(fmt.parse_expression("(A + )").is_err());
        assert!(fmt.parse_expression("(+ A B)").is_err());
        assert!(fmt.parse_expression("X").is_err());
        assert!(fmt.parse_expression("+").is_err());
        let (remaining, _) = fmt.parse_expression("(A + B))").unwrap();
        assert_eq!(remaining, ")");
    }

    #[test]
    fn rules() {
        let f = Fixture::arith();
        let fmt = Formatter::new(&f.library);
        let (remaining, (hyps, concl)) = fmt
            .parse_rule("(A e. CC), (B e. CC) => ((A * B) e. CC)")
            .unwrap();
        assert_eq!(remaining, "");
        assert_eq!(hyps, vec![f.parse("(A e. CC)"), f.parse("(B e. CC)")]);
        assert_eq!(concl, f.parse("((A * B) e. CC)"));

        let (_, (hyps, _)) = fmt.parse_rule("(1 e. CC)").unwrap();
        assert!(hyps.is_empty());
    }
}
