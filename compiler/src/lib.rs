//! Compilers from grammars to parsers and terminalizers.
//!
//! Every compiler walks a rule family, emits one binding per rule (plus
//! helpers) that refers to other rules by identifier only, and ties the
//! bindings together with `recursive_let`. Constructors come from a
//! `TypeLayer` and are never invented here.

mod analysis;
mod binder;
mod error;
mod parser;
mod splice;
mod terminalize;
mod types;

pub use analysis::{at_least_one, Analysis};
pub use binder::{recursive_let, Binder, Binding, Ident, LetRec, Resolve, Scope, Slot};
pub use error::{CompileError, Result, TerminalizeError};
pub use parser::{
    compile_grammar, compile_product, compile_rule, parser_bindings, CompiledGrammar, Product,
};
pub use splice::NonEmpty;
pub use terminalize::{
    compile_projection, compile_terminalizer, compile_terminalizers, splice_plan, Part,
    Projection, Projector, Splice, Terminalizer, Terminals,
};
pub use types::{branch_constructor, rule_constructor, DerivedTypes, TypeLayer};
