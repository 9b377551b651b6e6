//! Lexical-level extraction of Gerber's three primitive data types (`NUMBER`, `NAME`, `FIELD`)
//! plus command-code identification and parameter-list splitting. Grounded on
//! `graphics/DataTypeParser.{h,cpp}`, reimplemented with `nom` combinators over plain string
//! slices — the parsing technique already established in this codebase — rather than pulling in
//! a dedicated regex engine.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char as nom_char, digit1, one_of},
    combinator::{map, opt, recognize},
    sequence::{pair, preceded},
    IResult,
};

use crate::error::ParseError;

/// `[+-]?[0-9]*\.?[0-9]+`
pub fn number(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        opt(one_of("+-")),
        alt((
            recognize(pair(take_while(|c: char| c.is_ascii_digit()), pair(nom_char('.'), digit1))),
            digit1,
        )),
    ))(input)
}

/// `[._$a-zA-Z][._$a-zA-Z0-9]{0,126}`
pub fn name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        one_of("._$abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ"),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '$'),
    ))(input)
}

/// `[^%*,]*`
pub fn field(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c != '%' && c != '*' && c != ',')(input)
}

/// Parses a single `NUMBER` token as a floating point value, used by `split_params`.
fn parse_number_value(input: &str) -> Result<f64, ParseError> {
    let (rest, text) = number(input).map_err(|_| ParseError::MalformedToken {
        word: input.to_string(),
        reason: "not a valid number".to_string(),
    })?;
    if !rest.is_empty() {
        return Err(ParseError::MalformedToken {
            word: input.to_string(),
            reason: "not a valid number".to_string(),
        });
    }
    text.parse().map_err(|_| ParseError::MalformedToken {
        word: input.to_string(),
        reason: "not a valid number".to_string(),
    })
}

/// Splits `field` on `delim`, parsing each piece as a `NUMBER`. Empty input yields an empty
/// list. Any non-numeric piece is an error.
pub fn split_params(field: &str, delim: char) -> Result<Vec<f64>, ParseError> {
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field.split(delim).map(parse_number_value).collect()
}

/// The canonical command key derived from a word's prefix/suffix, per the rules in §4.2:
/// a two-letter or `[GM][0-9]{2}` prefix takes priority; otherwise a trailing `D([0-9]+)`
/// resolves to the literal text when the ident is below 10 (e.g. `"D02"`), or the generic key
/// `"Dnn"` otherwise.
pub fn command_code(word: &str) -> Result<String, ParseError> {
    if let Ok((_, prefix)) = recognize_leading_code(word) {
        return Ok(prefix.to_string());
    }

    if let Some(d_index) = word.rfind('D') {
        let digits = &word[d_index + 1..];
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(ident) = digits.parse::<u32>() {
                return if ident < 10 {
                    Ok(word[d_index..].to_string())
                } else {
                    Ok("Dnn".to_string())
                };
            }
        }
    }

    Err(ParseError::MalformedToken {
        word: word.to_string(),
        reason: "unrecognized command word".to_string(),
    })
}

fn recognize_leading_code(word: &str) -> IResult<&str, &str> {
    alt((
        recognize(take_while1_ascii_upper_pair),
        recognize(pair(one_of("GM"), take_while_m_n_digits)),
    ))(word)
}

fn take_while1_ascii_upper_pair(input: &str) -> IResult<&str, &str> {
    let mut chars = input.chars();
    let first = chars.next();
    let second = chars.next();
    match (first, second) {
        (Some(a), Some(b)) if a.is_ascii_uppercase() && b.is_ascii_uppercase() => {
            Ok((&input[2..], &input[..2]))
        }
        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        ))),
    }
}

fn take_while_m_n_digits(input: &str) -> IResult<&str, &str> {
    let digit_count = input.chars().take_while(|c| c.is_ascii_digit()).count();
    if digit_count == 2 {
        Ok((&input[2..], &input[..2]))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )))
    }
}

/// `ADD<ident><name>` prefix parser used by the `AD` handler: `"D"` then digits then a NAME.
pub fn aperture_define_prefix(input: &str) -> IResult<&str, (u32, &str)> {
    map(
        preceded(tag("D"), pair(digit1, name)),
        |(digits, template_name): (&str, &str)| (digits.parse().unwrap_or(0), template_name),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_matches_signed_decimals() {
        assert_eq!(number("3.14abc").unwrap().1, "3.14");
        assert_eq!(number("-0.5").unwrap().1, "-0.5");
        assert_eq!(number("+5").unwrap().1, "+5");
    }

    #[test]
    fn name_matches_identifier_grammar() {
        assert_eq!(name("DONUTVAR,rest").unwrap().1, "DONUTVAR");
        assert_eq!(name("$1").unwrap().1, "$1");
    }

    #[test]
    fn split_params_parses_and_rejects_non_numeric() {
        assert_eq!(split_params("", 'X').unwrap(), Vec::<f64>::new());
        assert_eq!(split_params("0.010X0.020", 'X').unwrap(), vec![0.010, 0.020]);
        assert!(split_params("abc", 'X').is_err());
    }

    #[test]
    fn command_code_prioritizes_two_letter_prefix() {
        assert_eq!(command_code("MOMM").unwrap(), "MO");
        assert_eq!(command_code("G04").unwrap(), "G04");
        assert_eq!(command_code("G01").unwrap(), "G01");
    }

    #[test]
    fn command_code_resolves_d_suffix() {
        assert_eq!(command_code("D02").unwrap(), "D02");
        assert_eq!(command_code("X0Y0D02").unwrap(), "D02");
        assert_eq!(command_code("D10").unwrap(), "Dnn");
        assert_eq!(command_code("D123").unwrap(), "Dnn");
    }

    #[test]
    fn command_code_rejects_unrecognized_words() {
        assert!(command_code("1,1,$1,$2,$3").is_err());
    }
}
