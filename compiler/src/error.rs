use thiserror::Error;

use parsegen::ParseError;

pub type Result<T> = std::result::Result<T, CompileError>;

/// Construction-time failures. All are fatal: nothing partially compiled is
/// ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A binding or the rule's constructor lookup refers to something with no
    /// definition. Signals the type layer and the grammar being out of step.
    #[error("'{rule}' references '{reference}', which has no matching binding")]
    UnresolvedReference { rule: String, reference: String },
    #[error("'{ident}' is bound more than once in one binding group")]
    DuplicateBinding { ident: String },
    /// A product classified as guaranteed-nonempty has no guaranteed-nonempty
    /// field.
    #[error("'{rule}' is classified nonempty but none of its fields is")]
    MalformedProduct { rule: String },
    #[error("parser construction failed: {0}")]
    Engine(#[from] ParseError),
}

/// Failures applying a terminalizer to a value it was not compiled for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerminalizeError {
    #[error("expected a value built by {expected}, found {found}")]
    UnexpectedValue { expected: String, found: String },
    #[error("'{rule}' has no branch named '{branch}'")]
    UnknownBranch { rule: String, branch: String },
    #[error("'{rule}' expects {expected} fields, found {found}")]
    ArityMismatch {
        rule: String,
        expected: usize,
        found: usize,
    },
    #[error("'{rule}' produced a value that disagrees with its nonempty classification")]
    Inconsistent { rule: String },
}
