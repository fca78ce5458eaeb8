use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_until},
    character::complete::{char, digit1},
    combinator::{all_consuming, map_opt, map_parser, rest},
    error::context,
    multi::many1,
    sequence::preceded,
    IResult,
};

use super::{
    error::{or_fail, GreedyError},
    Formatter,
};
use crate::{error::LibraryError, expression::Expression, library::Library};

/// One line of the library text format.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
    /// `typ wff`
    Type(String),
    /// `var class A B C`
    Variables(String, Vec<String>),
    /// `opr class + 2`
    Operator(String, String, usize),
    /// `axm { (A = B) => (B = A) }: eqcomi`
    Axiom(Vec<Expression>, Expression, String),
}

impl Command {
    pub fn apply(self, library: &mut Library) -> Result<(), LibraryError> {
        match self {
            Command::Type(name) => {
                library.add_type(name)?;
            }
            Command::Variables(typ, names) => {
                let typecode = library
                    .type_code(&typ)
                    .ok_or(LibraryError::UnknownType(typ))?;
                for name in names {
                    library.add_variable(name, typecode)?;
                }
            }
            Command::Operator(typ, symbol, arity) => {
                let typecode = library
                    .type_code(&typ)
                    .ok_or(LibraryError::UnknownType(typ))?;
                library.add_operator(symbol, typecode, arity)?;
            }
            Command::Axiom(hypotheses, conclusion, label) => {
                library.add_rule(label, hypotheses, conclusion)?;
            }
        }
        Ok(())
    }

    pub fn parse<'a>(
        fmt: &Formatter,
        input: &'a str,
    ) -> Result<Self, nom::Err<GreedyError<&'a str>>> {
        let (_, command) = or_fail(all_consuming(alt((
            context("typ", Self::parse_type),
            context("var", Self::parse_variables),
            context("opr", Self::parse_operator),
            context("axm", |input| Self::parse_axiom(fmt, input)),
        ))))(input)?;
        Ok(command)
    }

    fn parse_type(input: &str) -> IResult<&str, Command, GreedyError<&str>> {
        let (input, _) = tag("typ ")(input)?;
        let (input, name) = is_not(" ")(input)?;
        Ok((input, Command::Type(name.to_owned())))
    }

    fn parse_variables(input: &str) -> IResult<&str, Command, GreedyError<&str>> {
        let (input, _) = tag("var ")(input)?;
        let (input, typ) = is_not(" ")(input)?;
        let (input, names) = many1(preceded(char(' '), is_not(" ")))(input)?;
        Ok((
            input,
            Command::Variables(
                typ.to_owned(),
                names.into_iter().map(|name| name.to_owned()).collect(),
            ),
        ))
    }

    fn parse_operator(input: &str) -> IResult<&str, Command, GreedyError<&str>> {
        let (input, _) = tag("opr ")(input)?;
        let (input, typ) = is_not(" ")(input)?;
        let (input, _) = char(' ')(input)?;
        let (input, symbol) = take_until(" ")(input)?;
        let (input, _) = char(' ')(input)?;
        let (input, arity) = map_opt(digit1, |s: &str| s.parse::<usize>().ok())(input)?;
        Ok((
            input,
            Command::Operator(typ.to_owned(), symbol.to_owned(), arity),
        ))
    }

    fn parse_axiom<'a>(
        fmt: &Formatter,
        input: &'a str,
    ) -> IResult<&'a str, Command, GreedyError<&'a str>> {
        let (input, _) = tag("axm { ")(input)?;
        or_fail(|input| {
            let (input, (hypotheses, conclusion)) = map_parser(take_until(" }"), |input| {
                all_consuming(|input| fmt.parse_rule(input))(input)
            })(input)?;
            let (input, _) = tag(" }: ")(input)?;
            let (input, label) = rest(input)?;
            Ok((
                input,
                Command::Axiom(hypotheses, conclusion, label.to_owned()),
            ))
        })(input)
    }
}

fn parse_error(line: usize, error: nom::Err<GreedyError<&str>>) -> LibraryError {
    let message = match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.to_string(),
        nom::Err::Incomplete(_) => "incomplete input".to_owned(),
    };
    LibraryError::Parse { line, message }
}

/// Builds a library from its text format, one command per line. Empty lines and lines
/// starting with `#` are skipped.
///
/// ```
/// use mmtransform::serialization::parse_library;
///
/// let library = parse_library(
///     "typ wff\n\
///      var wff ph ps\n\
///      opr wff -> 2\n\
///      ## modus ponens\n\
///      axm { ph, (ph -> ps) => ps }: ax-mp\n",
/// )
/// .unwrap();
/// let (_, rule) = library.rule_by_label("ax-mp").unwrap();
/// assert_eq!(rule.hypotheses().len(), 2);
/// ```
pub fn parse_library(input: &str) -> Result<Library, LibraryError> {
    let mut library = Library::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command =
            Command::parse(&Formatter::new(&library), line).map_err(|e| parse_error(i + 1, e))?;
        command.apply(&mut library)?;
    }
    Ok(library)
}

/// Parses a single expression over the symbols of `library`.
pub fn parse_expression(library: &Library, input: &str) -> Result<Expression, LibraryError> {
    let fmt = Formatter::new(library);
    let (_, expression) = or_fail(all_consuming(|input| fmt.parse_expression(input)))(input)
        .map_err(|e| parse_error(1, e))?;
    library.check_expression(&expression)?;
    Ok(expression)
}
