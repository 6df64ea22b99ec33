use std::fmt::{self, Display};

/// A test on a single input char, used by `Expr::MatchOne`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    Digit,
    Space,
    Alpha,
    Alphanumeric,
    Upper,
    Lower,
    Punct,
    Any,
    Char(char),
    /// Inclusive range.
    Range(char, char),
}

impl Predicate {
    pub fn test(&self, ch: char) -> bool {
        match *self {
            Predicate::Digit => ch.is_ascii_digit(),
            Predicate::Space => ch.is_whitespace(),
            Predicate::Alpha => ch.is_alphabetic(),
            Predicate::Alphanumeric => ch.is_alphanumeric(),
            Predicate::Upper => ch.is_uppercase(),
            Predicate::Lower => ch.is_lowercase(),
            Predicate::Punct => ch.is_ascii_punctuation(),
            Predicate::Any => true,
            Predicate::Char(c) => ch == c,
            Predicate::Range(lo, hi) => lo <= ch && ch <= hi,
        }
    }

    /// Look up a named class such as `digit`.
    pub fn class(name: &str) -> Option<Predicate> {
        let pred = match name {
            "digit" => Predicate::Digit,
            "space" => Predicate::Space,
            "alpha" => Predicate::Alpha,
            "alnum" => Predicate::Alphanumeric,
            "upper" => Predicate::Upper,
            "lower" => Predicate::Lower,
            "punct" => Predicate::Punct,
            "any" => Predicate::Any,
            _ => return None,
        };
        Some(pred)
    }
}

/// Write `ch` as a quoted char literal, escaping what the notation escapes.
pub fn write_char_literal(f: &mut fmt::Formatter, ch: char) -> fmt::Result {
    match ch {
        '\n' => write!(f, "'\\n'"),
        '\t' => write!(f, "'\\t'"),
        '\r' => write!(f, "'\\r'"),
        '\\' => write!(f, "'\\\\'"),
        '\'' => write!(f, "'\\''"),
        c => write!(f, "'{}'", c),
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Predicate::Digit => write!(f, "@digit"),
            Predicate::Space => write!(f, "@space"),
            Predicate::Alpha => write!(f, "@alpha"),
            Predicate::Alphanumeric => write!(f, "@alnum"),
            Predicate::Upper => write!(f, "@upper"),
            Predicate::Lower => write!(f, "@lower"),
            Predicate::Punct => write!(f, "@punct"),
            Predicate::Any => write!(f, "@any"),
            Predicate::Char(c) => write_char_literal(f, c),
            Predicate::Range(lo, hi) => {
                write_char_literal(f, lo)?;
                write!(f, "..")?;
                write_char_literal(f, hi)
            }
        }
    }
}
