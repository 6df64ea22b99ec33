use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace1, none_of, not_line_ending, one_of},
    combinator::{all_consuming, map, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

use parsegen::Predicate;

use super::{Alternative, Production, Rhs};

/// Whitespace and `#` comments.
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((multispace1, recognize(pair(char('#'), not_line_ending))))),
    )(input)
}

pub fn identifier(input: &str) -> IResult<&str, String> {
    let (rem, matched) = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)?;
    Ok((rem, matched.to_owned()))
}

fn escape(input: &str) -> IResult<&str, char> {
    preceded(
        char('\\'),
        alt((
            value('\n', char('n')),
            value('\t', char('t')),
            value('\r', char('r')),
            value('\\', char('\\')),
            value('\'', char('\'')),
            value('"', char('"')),
        )),
    )(input)
}

pub fn char_literal(input: &str) -> IResult<&str, char> {
    delimited(char('\''), alt((escape, none_of("\\'"))), char('\''))(input)
}

pub fn string_literal(input: &str) -> IResult<&str, String> {
    let (rem, chars) = delimited(char('"'), many1(alt((escape, none_of("\\\"")))), char('"'))(input)?;
    Ok((rem, chars.into_iter().collect()))
}

/// `@digit`, `'c'` or `'a'..'z'`.
pub fn terminal(input: &str) -> IResult<&str, Predicate> {
    alt((
        class,
        map(
            pair(char_literal, opt(preceded(tag(".."), char_literal))),
            |(lo, hi)| match hi {
                Some(hi) => Predicate::Range(lo, hi),
                None => Predicate::Char(lo),
            },
        ),
    ))(input)
}

fn class(input: &str) -> IResult<&str, Predicate> {
    let (rem, name) = preceded(char('@'), identifier)(input)?;
    match Predicate::class(&name) {
        Some(pred) => Ok((rem, pred)),
        // An unknown class can't be anything else, stop here.
        None => Err(nom::Err::Failure(Error::new(input, ErrorKind::Tag))),
    }
}

pub fn rhs(input: &str) -> IResult<&str, Rhs> {
    preceded(
        ws,
        alt((rhs_terminal, rhs_series, rhs_record, rhs_choice, rhs_repetition)),
    )(input)
}

pub fn production(input: &str) -> IResult<&str, Production> {
    let (rem, (name, description, _, rhs, _)) = tuple((
        preceded(ws, identifier),
        opt(preceded(ws, string_literal)),
        preceded(ws, char('=')),
        rhs,
        preceded(ws, char(';')),
    ))(input)?;
    Ok((
        rem,
        Production {
            name,
            description,
            rhs,
        },
    ))
}

pub fn productions(input: &str) -> IResult<&str, Vec<Production>> {
    all_consuming(terminated(many0(production), ws))(input)
}

fn rhs_terminal(input: &str) -> IResult<&str, Rhs> {
    let (rem, pred) = terminal(input)?;
    Ok((rem, Rhs::Terminal(pred)))
}

fn rhs_series(input: &str) -> IResult<&str, Rhs> {
    let (rem, lit) = string_literal(input)?;
    Ok((rem, Rhs::Series(lit)))
}

fn rhs_record(input: &str) -> IResult<&str, Rhs> {
    let (rem, fields) = delimited(
        pair(char('('), ws),
        many0(terminated(identifier, ws)),
        char(')'),
    )(input)?;
    Ok((rem, Rhs::Record(fields)))
}

fn alternative(input: &str) -> IResult<&str, Alternative> {
    let (rem, (label, fields)) = separated_pair(
        identifier,
        pair(ws, char(':')),
        many0(preceded(ws, identifier)),
    )(input)?;
    Ok((rem, Alternative { label, fields }))
}

fn rhs_choice(input: &str) -> IResult<&str, Rhs> {
    let (rem, alts) = separated_list1(tuple((ws, char('|'), ws)), alternative)(input)?;
    Ok((rem, Rhs::Choice(alts)))
}

fn rhs_repetition(input: &str) -> IResult<&str, Rhs> {
    let (rem, (name, suffix)) = pair(identifier, opt(one_of("?*+")))(input)?;
    let rhs = match suffix {
        Some('?') => Rhs::Opt(name),
        Some('*') => Rhs::Star(name),
        Some('+') => Rhs::Plus(name),
        _ => Rhs::Wrap(name),
    };
    Ok((rem, rhs))
}
