use std::fmt::{self, Display};

use crate::Token;

/// A parsed value, labeled with the rule (and branch) that built it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Terminal {
        rule: String,
        token: Token,
    },
    Branch {
        rule: String,
        branch: String,
        fields: Vec<Value>,
    },
    Wrap {
        rule: String,
        inner: Box<Value>,
    },
    Record {
        rule: String,
        fields: Vec<Value>,
    },
    Opt {
        rule: String,
        inner: Option<Box<Value>>,
    },
    Star {
        rule: String,
        items: Vec<Value>,
    },
    Plus {
        rule: String,
        head: Box<Value>,
        tail: Vec<Value>,
    },
    Series {
        rule: String,
        tokens: Vec<Token>,
    },
}

impl Value {
    /// Name of the rule whose constructor built this value.
    pub fn rule(&self) -> &str {
        match self {
            Value::Terminal { rule, .. }
            | Value::Branch { rule, .. }
            | Value::Wrap { rule, .. }
            | Value::Record { rule, .. }
            | Value::Opt { rule, .. }
            | Value::Star { rule, .. }
            | Value::Plus { rule, .. }
            | Value::Series { rule, .. } => rule,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Terminal { .. } => "terminal",
            Value::Branch { .. } => "branch",
            Value::Wrap { .. } => "wrap",
            Value::Record { .. } => "record",
            Value::Opt { .. } => "opt",
            Value::Star { .. } => "star",
            Value::Plus { .. } => "plus",
            Value::Series { .. } => "series",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn list(f: &mut fmt::Formatter, vals: &[Value]) -> fmt::Result {
            for (i, v) in vals.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", v)?;
            }
            Ok(())
        }

        match self {
            Value::Terminal { token, .. } => write!(f, "{:?}", token.ch),
            Value::Branch { branch, fields, .. } => {
                write!(f, "({}", branch)?;
                if !fields.is_empty() {
                    write!(f, " ")?;
                    list(f, fields)?;
                }
                write!(f, ")")
            }
            Value::Wrap { rule, inner } => write!(f, "({} {})", rule, inner),
            Value::Record { rule, fields } => {
                write!(f, "({}", rule)?;
                if !fields.is_empty() {
                    write!(f, " ")?;
                    list(f, fields)?;
                }
                write!(f, ")")
            }
            Value::Opt { inner: None, .. } => write!(f, "nothing"),
            Value::Opt { inner: Some(v), .. } => write!(f, "(just {})", v),
            Value::Star { items, .. } => {
                write!(f, "[")?;
                list(f, items)?;
                write!(f, "]")
            }
            Value::Plus { head, tail, .. } => {
                write!(f, "[{}", head)?;
                for v in tail {
                    write!(f, " {}", v)?;
                }
                write!(f, "]")
            }
            Value::Series { tokens, .. } => {
                write!(f, "{:?}", crate::tokens::text(tokens))
            }
        }
    }
}

/// Intermediate semantic value produced while running engine expressions,
/// before a constructor turns it into a `Value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sem {
    Token(Token),
    Tokens(Vec<Token>),
    Node(Value),
    Fields(Vec<Value>),
    Nothing,
    Just(Value),
    List(Vec<Value>),
    Pair(Value, Vec<Value>),
}

/// Builds a `Value` for one rule (or one branch of a choice) from the
/// semantic value its parser produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constructor {
    Terminal { rule: String },
    Branch { rule: String, branch: String, arity: usize },
    Wrap { rule: String },
    Record { rule: String, arity: usize },
    Opt { rule: String },
    Star { rule: String },
    Plus { rule: String },
    Series { rule: String },
}

impl Constructor {
    pub fn rule(&self) -> &str {
        match self {
            Constructor::Terminal { rule }
            | Constructor::Branch { rule, .. }
            | Constructor::Wrap { rule }
            | Constructor::Record { rule, .. }
            | Constructor::Opt { rule }
            | Constructor::Star { rule }
            | Constructor::Plus { rule }
            | Constructor::Series { rule } => rule,
        }
    }

    /// Apply the constructor. Returns `None` when `sem` does not have the
    /// shape this constructor expects.
    pub fn apply(&self, sem: Sem) -> Option<Value> {
        let rule = self.rule().to_owned();
        let value = match (self, sem) {
            (Constructor::Terminal { .. }, Sem::Token(token)) => Value::Terminal { rule, token },
            (Constructor::Branch { branch, arity, .. }, Sem::Fields(fields))
                if fields.len() == *arity =>
            {
                Value::Branch {
                    rule,
                    branch: branch.clone(),
                    fields,
                }
            }
            (Constructor::Wrap { .. }, Sem::Node(inner)) => Value::Wrap {
                rule,
                inner: Box::new(inner),
            },
            (Constructor::Record { arity, .. }, Sem::Fields(fields)) if fields.len() == *arity => {
                Value::Record { rule, fields }
            }
            (Constructor::Opt { .. }, Sem::Nothing) => Value::Opt { rule, inner: None },
            (Constructor::Opt { .. }, Sem::Just(v)) => Value::Opt {
                rule,
                inner: Some(Box::new(v)),
            },
            (Constructor::Star { .. }, Sem::List(items)) => Value::Star { rule, items },
            (Constructor::Plus { .. }, Sem::Pair(head, tail)) => Value::Plus {
                rule,
                head: Box::new(head),
                tail,
            },
            (Constructor::Series { .. }, Sem::Tokens(tokens)) => Value::Series { rule, tokens },
            _ => return None,
        };
        Some(value)
    }
}

impl Display for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Constructor::Branch { rule, branch, arity } => {
                write!(f, "{}::{}/{}", rule, branch, arity)
            }
            Constructor::Record { rule, arity } => write!(f, "{}/{}", rule, arity),
            other => write!(f, "{}", other.rule()),
        }
    }
}
