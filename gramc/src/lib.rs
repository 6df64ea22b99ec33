//! Grammar notation in, parser and terminalizer out.
//!
//! ```
//! use gramc::Language;
//! use parsegen::Parser;
//!
//! let lang = Language::new("digits = digit+ ; digit = @digit ;", "digits").unwrap();
//! let value = lang.parse("123").unwrap();
//! assert_eq!(lang.terminalize(&value).unwrap().text(), "123");
//! assert!(lang.at_least_one("digits").unwrap());
//! ```

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::debug;

use compiler::{
    compile_grammar, compile_product, compile_terminalizer, Analysis, CompiledGrammar,
    DerivedTypes, Product, Terminalizer, Terminals,
};
use grammar::{Grammar, RuleId};
use parsegen::{Parser, Value};

/// A grammar compiled for one root rule.
#[derive(Debug)]
pub struct Language {
    grammar: Grammar,
    types: DerivedTypes,
    analysis: Analysis,
    root: RuleId,
    parser: CompiledGrammar,
    terminalizer: Terminalizer,
}

impl Language {
    /// Parse grammar notation and compile it for `root`.
    pub fn new(source: &str, root: &str) -> Result<Self> {
        let grammar: Grammar = source.parse().context("invalid grammar")?;
        Self::from_grammar(grammar, root)
    }

    /// Read grammar notation from a file and compile it for `root`.
    pub fn from_file(path: impl AsRef<Path>, root: &str) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read grammar {}", path.display()))?;
        Self::new(&source, root).with_context(|| format!("in grammar {}", path.display()))
    }

    pub fn from_grammar(grammar: Grammar, root: &str) -> Result<Self> {
        let root_id = grammar
            .lookup(root)
            .ok_or_else(|| anyhow!("no rule named '{}'", root))?;
        let types = DerivedTypes::new(&grammar);
        let parser = compile_grammar(&types, &grammar, root_id)
            .with_context(|| format!("failed to compile parser for '{}'", root))?;
        let terminalizer = compile_terminalizer(&types, &grammar, root_id)
            .with_context(|| format!("failed to compile terminalizer for '{}'", root))?;
        let analysis = Analysis::new(&grammar);
        debug!("language ready for '{}' ({} rules)", root, grammar.len());

        Ok(Language {
            grammar,
            types,
            analysis,
            root: root_id,
            parser,
            terminalizer,
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn root(&self) -> &str {
        self.grammar.name(self.root)
    }

    pub fn terminalizer(&self) -> &Terminalizer {
        &self.terminalizer
    }

    pub fn terminalize(&self, value: &Value) -> Result<Terminals> {
        Ok(self.terminalizer.terminalize(value)?)
    }

    /// Parse `input` and terminalize the result, which reproduces `input`.
    pub fn round_trip(&self, input: &str) -> Result<String> {
        let value = self.parse(input)?;
        Ok(self.terminalize(&value)?.text())
    }

    pub fn at_least_one(&self, rule: &str) -> Result<bool> {
        let id = self
            .grammar
            .lookup(rule)
            .ok_or_else(|| anyhow!("no rule named '{}'", rule))?;
        Ok(self.analysis.at_least_one(id))
    }

    /// Parsers for `roots` and every rule they reach, labeled by rule name.
    pub fn product(&self, roots: &[&str]) -> Result<Product> {
        let ids = roots
            .iter()
            .map(|name| {
                self.grammar
                    .lookup(name)
                    .ok_or_else(|| anyhow!("no rule named '{}'", name))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(compile_product(
            &self.types,
            &|name| name.to_owned(),
            &self.grammar,
            &ids,
        )?)
    }
}

impl Parser for Language {
    fn parse(&self, input: &str) -> Result<Value> {
        self.parser
            .parse(input)
            .with_context(|| format!("failed to parse {}", self.root()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compiler::CompileError;
    use grammar::GrammarError;
    use parsegen::ParseError;

    const PAIR: &str = "
        pair = ( maybe_sp digits ) ;
        maybe_sp = sp? ;
        sp = @space ;
        digits = digit+ ;
        digit = @digit ;
    ";

    #[test]
    fn round_trips() {
        let lang = Language::new(PAIR, "pair").unwrap();
        assert_eq!(lang.root(), "pair");
        assert_eq!(lang.round_trip(" 42").unwrap(), " 42");
        assert_eq!(lang.round_trip("9").unwrap(), "9");
    }

    #[test]
    fn errors_stay_typed() {
        let err = Language::new("a = b ;", "a").unwrap_err();
        assert!(err.downcast_ref::<GrammarError>().is_some(), "{:?}", err);

        let err = Language::new(PAIR, "nope").unwrap_err();
        assert!(err.to_string().contains("nope"));

        let lang = Language::new(PAIR, "pair").unwrap();
        let err = lang.parse("x").unwrap_err();
        assert!(err.downcast_ref::<ParseError>().is_some(), "{:?}", err);
    }

    #[test]
    fn compile_errors_stay_typed() {
        let g: Grammar = PAIR.parse().unwrap();
        let types = DerivedTypes::new(&g).without("sp");
        let err = compile_grammar(&types, &g, g.lookup("pair").unwrap()).unwrap_err();
        let err = anyhow::Error::from(err).context("compiling");
        assert!(err.downcast_ref::<CompileError>().is_some());
    }

    #[test]
    fn from_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/grammars/arith.gram");
        let lang = Language::from_file(path, "expr").unwrap();
        assert_eq!(lang.round_trip("1 + 2*(3 - 4)").unwrap(), "1 + 2*(3 - 4)");
        assert!(Language::from_file("/no/such/file.gram", "expr").is_err());
    }
}
