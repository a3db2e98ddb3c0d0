//! Parsing for parameter-list syntax into [`Parameter`]s.
//!
//! # Syntax
//!
//! A comma-separated list, optionally wrapped in parentheses:
//! - `x` - required positional
//! - `x = expr` - optional positional
//! - `*rest` / `*` - positional splat
//! - `x:` - required keyword
//! - `x: expr` - optional keyword
//! - `**opts` / `**` - keyword splat
//! - `&blk` / `&` - block
//! - `...` - argument forwarding (splat, keyword splat and block)
//!
//! Default expressions run up to the next comma outside brackets or quotes.

use error_set::error_set;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::{char, multispace0, satisfy, space0};
use nom::combinator::{all_consuming, map, opt, recognize, value};
use nom::error::{Error, ErrorKind};
use nom::multi::separated_list0;
use nom::sequence::{delimited, pair, preceded};
use nom::{IResult, Parser};

use super::Parameter;

error_set! {
    /// Errors from parsing a parameter list
    SignatureParseError := {
        /// The text is not a parameter list
        #[display("Unexpected input at column {column}: '{rest}'")]
        UnexpectedInput { column: usize, rest: String },
        #[display("Duplicated parameter name '{name}'")]
        DuplicateParameter { name: String },
        /// A parameter appears after one that must follow it
        #[display("Parameter '{parameter}' is out of order")]
        OutOfOrder { parameter: String },
        #[display("Only one {kind} parameter is allowed")]
        MultipleSplats { kind: String },
    }
}

/// Parse a parameter list such as `(a, b = 1, *c, d:, **e, &f)`.
pub fn parse_parameters(input: &str) -> Result<Vec<Parameter>, SignatureParseError> {
    let (_, groups) = parameter_list(input).map_err(|err| {
        let rest = match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => e.input,
            nom::Err::Incomplete(_) => "",
        };
        SignatureParseError::UnexpectedInput {
            column: input.len() - rest.len() + 1,
            rest: rest.to_string(),
        }
    })?;

    let parameters: Vec<Parameter> = groups.into_iter().flatten().collect();
    validate(&parameters)?;
    Ok(parameters)
}

fn parameter_list(input: &str) -> IResult<&str, Vec<Vec<Parameter>>> {
    let parenthesized = delimited(pair(char('('), multispace0), parameters, pair(multispace0, char(')')));
    all_consuming(delimited(multispace0, alt((parenthesized, parameters)), multispace0)).parse(input)
}

fn parameters(input: &str) -> IResult<&str, Vec<Vec<Parameter>>> {
    separated_list0(delimited(multispace0, char(','), multispace0), parameter).parse(input)
}

fn parameter(input: &str) -> IResult<&str, Vec<Parameter>> {
    let named = |name: Option<&str>| name.map(str::to_string);
    alt((
        value(
            vec![Parameter::Rest(None), Parameter::KeyRest(None), Parameter::Block(None)],
            tag("..."),
        ),
        map(preceded(tag("**"), opt(identifier)), move |name| {
            vec![Parameter::KeyRest(named(name))]
        }),
        map(preceded(char('*'), opt(identifier)), move |name| {
            vec![Parameter::Rest(named(name))]
        }),
        map(preceded(char('&'), opt(identifier)), move |name| {
            vec![Parameter::Block(named(name))]
        }),
        map(
            (identifier, char(':'), opt(preceded(space0, default_expression))),
            |(name, _, default)| match default {
                Some(_) => vec![Parameter::Key(name.to_string())],
                None => vec![Parameter::KeyRequired(name.to_string())],
            },
        ),
        map(
            (identifier, space0, char('='), space0, default_expression),
            |(name, ..)| vec![Parameter::Optional(name.to_string())],
        ),
        map(identifier, |name| vec![Parameter::Required(name.to_string())]),
    ))
    .parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

/// Everything up to the next top-level `,` or unmatched closing bracket
fn default_expression(input: &str) -> IResult<&str, &str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut end = input.len();

    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth == 0 => {
                end = i;
                break;
            }
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                end = i;
                break;
            }
            _ => {}
        }
    }

    let expression = input[..end].trim_end();
    if expression.is_empty() || quote.is_some() {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::TakeWhile1)));
    }
    Ok((&input[expression.len()..], expression))
}

/// Position of each kind within a parameter list
fn rank(parameter: &Parameter, after_optional: bool) -> u8 {
    match parameter {
        Parameter::Required(_) if after_optional => 3,
        Parameter::Required(_) => 0,
        Parameter::Optional(_) => 1,
        Parameter::Rest(_) => 2,
        Parameter::KeyRequired(_) | Parameter::Key(_) => 4,
        Parameter::KeyRest(_) => 5,
        Parameter::Block(_) => 6,
    }
}

fn validate(parameters: &[Parameter]) -> Result<(), SignatureParseError> {
    let mut names: Vec<&str> = Vec::new();
    let mut last_rank = 0;
    let mut after_optional = false;

    for parameter in parameters {
        if let Some(name) = parameter.name() {
            if names.contains(&name) {
                return Err(SignatureParseError::DuplicateParameter {
                    name: name.to_string(),
                });
            }
            names.push(name);
        }

        let rank = rank(parameter, after_optional);
        if rank == last_rank && matches!(rank, 2 | 5 | 6) {
            let kind = match rank {
                2 => "positional splat",
                5 => "keyword splat",
                _ => "block",
            };
            return Err(SignatureParseError::MultipleSplats {
                kind: kind.to_string(),
            });
        }
        if rank < last_rank {
            return Err(SignatureParseError::OutOfOrder {
                parameter: parameter.to_string(),
            });
        }
        after_optional |= matches!(rank, 1 | 2);
        last_rank = rank;
    }

    tracing::trace!(count = parameters.len(), "parsed parameter list");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn req(name: &str) -> Parameter {
        Parameter::Required(name.to_string())
    }

    #[test]
    fn parse_full_list() {
        let parsed = parse_parameters("x, y = 1, *rest, a:, b: 2, **opts, &blk").unwrap();
        assert_eq!(
            parsed,
            vec![
                req("x"),
                Parameter::Optional("y".into()),
                Parameter::Rest(Some("rest".into())),
                Parameter::KeyRequired("a".into()),
                Parameter::Key("b".into()),
                Parameter::KeyRest(Some("opts".into())),
                Parameter::Block(Some("blk".into())),
            ]
        );
    }

    #[test]
    fn parse_parenthesized_and_empty() {
        assert_eq!(parse_parameters("(a, b)").unwrap(), vec![req("a"), req("b")]);
        assert_eq!(parse_parameters("").unwrap(), vec![]);
        assert_eq!(parse_parameters("  ()  ").unwrap(), vec![]);
    }

    #[test]
    fn default_expressions_may_contain_commas() {
        let parsed = parse_parameters("a = foo(1, 2), b: [3, \"x,y\"], c:").unwrap();
        assert_eq!(
            parsed,
            vec![
                Parameter::Optional("a".into()),
                Parameter::Key("b".into()),
                Parameter::KeyRequired("c".into()),
            ]
        );
    }

    #[test]
    fn anonymous_splats() {
        assert_eq!(
            parse_parameters("*, **, &").unwrap(),
            vec![Parameter::Rest(None), Parameter::KeyRest(None), Parameter::Block(None)]
        );
        assert_eq!(
            parse_parameters("a, ...").unwrap(),
            vec![req("a"), Parameter::Rest(None), Parameter::KeyRest(None), Parameter::Block(None)]
        );
    }

    #[test]
    fn post_required_parameters() {
        assert_eq!(
            parse_parameters("a = 1, *b, c").unwrap(),
            vec![Parameter::Optional("a".into()), Parameter::Rest(Some("b".into())), req("c")]
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_parameters("a, 1b"),
            Err(SignatureParseError::UnexpectedInput { column: 2, .. })
        ));
    }

    #[test]
    fn rejects_duplicates() {
        assert!(matches!(
            parse_parameters("a, a"),
            Err(SignatureParseError::DuplicateParameter { name }) if name == "a"
        ));
    }

    #[test]
    fn rejects_out_of_order() {
        assert!(matches!(
            parse_parameters("a:, b"),
            Err(SignatureParseError::OutOfOrder { parameter }) if parameter == "b"
        ));
        assert!(matches!(
            parse_parameters("a = 1, b, c = 2"),
            Err(SignatureParseError::OutOfOrder { .. })
        ));
        assert!(matches!(
            parse_parameters("*a, *b"),
            Err(SignatureParseError::MultipleSplats { .. })
        ));
    }
}
