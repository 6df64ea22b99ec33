use thiserror::Error;

use crate::{Constructor, Handle, Position};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input could not be parsed. `position` is `None` at end of input.
    #[error("unexpected {} at {}, expected {}", describe_found(.found), describe_position(.position), describe_expected(.expected))]
    Unexpected {
        position: Option<Position>,
        found: Option<char>,
        expected: Vec<String>,
    },
    #[error("rule {handle} was not issued by this registry")]
    UnknownHandle { handle: Handle },
    #[error("rule {handle} was declared but never defined")]
    Undefined { handle: Handle },
    #[error("constructor {constructor} applied to a value of the wrong shape")]
    ShapeMismatch { constructor: Constructor },
}

fn describe_found(found: &Option<char>) -> String {
    match found {
        Some(c) => format!("{:?}", c),
        None => "end of input".to_owned(),
    }
}

fn describe_position(position: &Option<Position>) -> String {
    match position {
        Some(p) => p.to_string(),
        None => "end of input".to_owned(),
    }
}

fn describe_expected(expected: &[String]) -> String {
    if expected.is_empty() {
        "nothing".to_owned()
    } else {
        expected.join(" or ")
    }
}
