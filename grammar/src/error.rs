use thiserror::Error;

pub type Result<T> = std::result::Result<T, GrammarError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("rule '{name}' is defined more than once")]
    DuplicateRuleName { name: String },
    #[error("rule '{name}' is referenced but never defined")]
    UndefinedRule { name: String },
    #[error("choice '{rule}' has no branches")]
    EmptyChoice { rule: String },
    #[error("series '{rule}' has an empty literal")]
    EmptySeries { rule: String },
    #[error("choice '{rule}' has more than one branch named '{branch}'")]
    DuplicateBranchName { rule: String, branch: String },
    #[error("rule '{rule}' has an empty description")]
    EmptyDescription { rule: String },
    #[error("failed to parse grammar: {0}")]
    Syntax(String),
}

impl From<nom::Err<nom::error::Error<&str>>> for GrammarError {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> GrammarError {
        let msg = match err {
            nom::Err::Incomplete(_) => "incomplete input".to_owned(),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                let near: String = e.input.chars().take(24).collect();
                format!("{:?} near {:?}", e.code, near)
            }
        };
        GrammarError::Syntax(msg)
    }
}
