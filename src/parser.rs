use crate::ast::*;
use crate::error::ParseError;
use crate::pdata::decode_hex;
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while},
    character::complete::{char, digit1, hex_digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, peek, recognize, value, verify},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use tracing::instrument;

const RESERVED: &[&str] = &["where", "and", "or", "not", "true", "false", "nil"];

/// Parses a full statement: `editor(args) [where condition]`.
#[instrument(level = "debug", skip(input))]
pub fn parse_statement(input: &str) -> Result<Statement, ParseError> {
    all_consuming(ws(statement))(input)
        .map(|(_, statement)| statement)
        .map_err(|err| to_parse_error(input, err))
}

/// Parses a standalone boolean condition.
#[instrument(level = "debug", skip(input))]
pub fn parse_condition(input: &str) -> Result<BoolExpression, ParseError> {
    all_consuming(ws(condition))(input)
        .map(|(_, condition)| condition)
        .map_err(|err| to_parse_error(input, err))
}

fn to_parse_error(source: &str, err: nom::Err<nom::error::Error<&str>>) -> ParseError {
    match err {
        nom::Err::Incomplete(_) => {
            ParseError::new(source, "unexpected end of input").at(source.len(), "")
        }
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = source.len() - e.input.len();
            let fragment: String = e.input.chars().take(24).collect();
            let message = if e.input.is_empty() {
                "unexpected end of input".to_string()
            } else {
                format!("unexpected input ({:?})", e.code)
            };
            ParseError::new(source, message).at(position, fragment)
        }
    }
}

fn statement(input: &str) -> IResult<&str, Statement> {
    map(
        pair(editor_call, opt(preceded(keyword("where"), condition))),
        |(editor, condition)| Statement { editor, condition },
    )(input)
}

fn editor_call(input: &str) -> IResult<&str, FunctionCall> {
    map(
        pair(ws(editor_name), arguments),
        |(name, arguments)| FunctionCall {
            name: name.to_string(),
            arguments,
        },
    )(input)
}

fn converter_call(input: &str) -> IResult<&str, FunctionCall> {
    map(pair(converter_name, arguments), |(name, arguments)| {
        FunctionCall {
            name: name.to_string(),
            arguments,
        }
    })(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<Expression>> {
    delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), expression),
        ws(char(')')),
    )(input)
}

#[instrument(level = "debug", skip(input))]
fn condition(input: &str) -> IResult<&str, BoolExpression> {
    let (input, first) = and_condition(input)?;
    let (input, rest) = many0(preceded(keyword("or"), and_condition))(input)?;
    Ok((
        input,
        rest.into_iter().fold(first, |left, right| {
            BoolExpression::Or(Box::new(left), Box::new(right))
        }),
    ))
}

fn and_condition(input: &str) -> IResult<&str, BoolExpression> {
    let (input, first) = not_condition(input)?;
    let (input, rest) = many0(preceded(keyword("and"), not_condition))(input)?;
    Ok((
        input,
        rest.into_iter().fold(first, |left, right| {
            BoolExpression::And(Box::new(left), Box::new(right))
        }),
    ))
}

fn not_condition(input: &str) -> IResult<&str, BoolExpression> {
    alt((
        map(preceded(keyword("not"), not_condition), |inner| {
            BoolExpression::Not(Box::new(inner))
        }),
        delimited(ws(char('(')), condition, ws(char(')'))),
        comparison,
    ))(input)
}

fn comparison(input: &str) -> IResult<&str, BoolExpression> {
    let (input, left) = expression(input)?;
    let (input, rest) = opt(pair(ws(compare_operator), expression))(input)?;
    Ok((
        input,
        match rest {
            Some((op, right)) => BoolExpression::Comparison { left, op, right },
            None => BoolExpression::Value(left),
        },
    ))
}

fn compare_operator(input: &str) -> IResult<&str, CompareOperator> {
    alt((
        value(CompareOperator::Equal, tag("==")),
        value(CompareOperator::NotEqual, tag("!=")),
        value(CompareOperator::LessThanEqual, tag("<=")),
        value(CompareOperator::GreaterThanEqual, tag(">=")),
        value(CompareOperator::LessThan, tag("<")),
        value(CompareOperator::GreaterThan, tag(">")),
    ))(input)
}

#[instrument(level = "debug", skip(input))]
fn expression(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        map(literal, Expression::Literal),
        map(list, Expression::List),
        map(converter_call, Expression::Converter),
        map(path, Expression::Path),
    )))(input)
}

fn list(input: &str) -> IResult<&str, Vec<Expression>> {
    delimited(
        ws(char('[')),
        separated_list0(ws(char(',')), expression),
        ws(char(']')),
    )(input)
}

fn path(input: &str) -> IResult<&str, Path> {
    let (input, first) = path_segment(input)?;
    let (input, rest) = many0(preceded(char('.'), identifier))(input)?;
    let (input, keys) = many0(delimited(ws(char('[')), ws(key), char(']')))(input)?;
    let mut segments = vec![first.to_string()];
    segments.extend(rest.into_iter().map(str::to_string));
    Ok((input, Path { segments, keys }))
}

fn key(input: &str) -> IResult<&str, Key> {
    alt((
        map(string_literal, Key::String),
        map(integer_literal, Key::Integer),
    ))(input)
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(bytes_literal, Literal::Bytes),
        map(float_literal, Literal::Float),
        map(integer_literal, Literal::Integer),
        map(string_literal, Literal::String),
        value(Literal::Boolean(true), reserved("true")),
        value(Literal::Boolean(false), reserved("false")),
        value(Literal::Nil, reserved("nil")),
    ))(input)
}

fn bytes_literal(input: &str) -> IResult<&str, Vec<u8>> {
    map_res(preceded(tag("0x"), hex_digit1), decode_hex)(input)
}

fn float_literal(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
        str::parse::<f64>,
    )(input)
}

fn integer_literal(input: &str) -> IResult<&str, i64> {
    map_res(
        recognize(terminated(pair(opt(char('-')), digit1), not(peek(char('.'))))),
        str::parse::<i64>,
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("\n", tag("n")),
                    value("\t", tag("t")),
                )),
            )),
            |s: Option<String>| s.unwrap_or_default(),
        ),
        char('"'),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_identifier_char),
    ))(input)
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn path_segment(input: &str) -> IResult<&str, &str> {
    verify(identifier, |id: &str| !RESERVED.contains(&id))(input)
}

fn editor_name(input: &str) -> IResult<&str, &str> {
    verify(identifier, |id: &str| {
        id.starts_with(|c: char| c.is_ascii_lowercase()) && !RESERVED.contains(&id)
    })(input)
}

fn converter_name(input: &str) -> IResult<&str, &str> {
    verify(identifier, |id: &str| {
        id.starts_with(|c: char| c.is_ascii_uppercase())
    })(input)
}

/// Matches `word` only when it is not the prefix of a longer identifier.
fn reserved<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(peek(satisfy(is_identifier_char))))
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    ws(reserved(word))
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_expr(segments: &[&str], keys: Vec<Key>) -> Expression {
        Expression::Path(Path {
            segments: segments.iter().map(|s| s.to_string()).collect(),
            keys,
        })
    }

    fn string(s: &str) -> Expression {
        Expression::Literal(Literal::String(s.to_string()))
    }

    #[test]
    fn test_parse_set_with_where() {
        let statement =
            parse_statement(r#"set(attributes["test"], "pass") where body == "operationA""#)
                .unwrap();
        assert_eq!(statement.editor.name, "set");
        assert_eq!(
            statement.editor.arguments,
            vec![
                path_expr(&["attributes"], vec![Key::String("test".into())]),
                string("pass"),
            ]
        );
        assert_eq!(
            statement.condition,
            Some(BoolExpression::Comparison {
                left: path_expr(&["body"], vec![]),
                op: CompareOperator::Equal,
                right: string("operationA"),
            })
        );
    }

    #[test]
    fn test_parse_literals() {
        let statement =
            parse_statement(r#"set(cache["x"], [1, -2.5, 0x0102, true, false, nil, "a\"b"])"#)
                .unwrap();
        assert_eq!(
            statement.editor.arguments[1],
            Expression::List(vec![
                Expression::Literal(Literal::Integer(1)),
                Expression::Literal(Literal::Float(-2.5)),
                Expression::Literal(Literal::Bytes(vec![0x01, 0x02])),
                Expression::Literal(Literal::Boolean(true)),
                Expression::Literal(Literal::Boolean(false)),
                Expression::Literal(Literal::Nil),
                string("a\"b"),
            ])
        );
    }

    #[test]
    fn test_parse_empty_string() {
        let condition = parse_condition(r#"cache["test"] == """#).unwrap();
        assert_eq!(
            condition,
            BoolExpression::Comparison {
                left: path_expr(&["cache"], vec![Key::String("test".into())]),
                op: CompareOperator::Equal,
                right: string(""),
            }
        );
    }

    #[test]
    fn test_parse_nested_converters() {
        let statement = parse_statement(
            r#"set(attributes["test"], Concat([attributes["http.method"], attributes["http.url"]], ": "))"#,
        )
        .unwrap();
        match &statement.editor.arguments[1] {
            Expression::Converter(call) => {
                assert_eq!(call.name, "Concat");
                assert_eq!(call.arguments.len(), 2);
            }
            other => panic!("unexpected argument {:?}", other),
        }
    }

    #[test]
    fn test_parse_boolean_precedence() {
        let condition =
            parse_condition("flags == 1 or body == \"a\" and not dropped_attributes_count > 0")
                .unwrap();
        match condition {
            BoolExpression::Or(_, right) => match *right {
                BoolExpression::And(_, inner) => {
                    assert!(matches!(*inner, BoolExpression::Not(_)))
                }
                other => panic!("expected and, got {:?}", other),
            },
            other => panic!("expected or, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_context_prefixed_paths() {
        let statement = parse_statement(
            r#"set(profile.attributes["test"], "pass") where resource.attributes["host.name"] == "localhost""#,
        )
        .unwrap();
        let paths: Vec<String> = statement.paths().iter().map(|p| p.to_string()).collect();
        assert_eq!(
            paths,
            vec!["profile.attributes[test]", "resource.attributes[host.name]"]
        );
    }

    #[test]
    fn test_keywords_do_not_swallow_identifiers() {
        let condition = parse_condition("nothing == notable").unwrap();
        assert_eq!(
            condition,
            BoolExpression::Comparison {
                left: path_expr(&["nothing"], vec![]),
                op: CompareOperator::Equal,
                right: path_expr(&["notable"], vec![]),
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_statement("set(attributes[\"test\"], ").unwrap_err();
        assert_eq!(err.statement, "set(attributes[\"test\"], ");
        assert!(err.position.is_some());

        assert!(parse_statement("Set(body, 1)").is_err());
        assert!(parse_statement("set(body, 1) where").is_err());
        assert!(parse_statement("set(body, 0x123)").is_err());
        assert!(parse_condition("body ==").is_err());
    }
}
