use std::fmt::{self, Display};

use crate::position::Position;

/// A single input char together with where it occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub ch: char,
    pub position: Position,
}

impl Token {
    pub fn new(ch: char, position: Position) -> Self {
        Token { ch, position }
    }

    /// Annotate every char of `input` with its position.
    pub fn stream(input: &str) -> Vec<Token> {
        let mut position = Position::start();
        let mut tokens = Vec::with_capacity(input.len());
        for ch in input.chars() {
            tokens.push(Token::new(ch, position));
            position = position.advance(ch);
        }
        tokens
    }

    pub fn ch(&self) -> char {
        self.ch
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} at {}", self.ch, self.position)
    }
}

/// Concatenate the chars of a token sequence back into a string.
pub fn text<'a, I>(tokens: I) -> String
where
    I: IntoIterator<Item = &'a Token>,
{
    tokens.into_iter().map(|t| t.ch).collect()
}
