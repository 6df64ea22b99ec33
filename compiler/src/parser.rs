//! Compiles rules into engine expressions.
//!
//! Each rule becomes one binding whose body refers to other rules only by
//! their binder identifiers; repetition rules add one helper binding for the
//! list they loop over. A family's bindings are then tied into one recursive
//! group and instantiated as engine `Rules`.

use std::collections::HashMap;

use log::debug;

use grammar::{families, family, Family, Grammar, RuleId, RuleType};
use parsegen::{Expr, Handle, ParseError, Parser, Rules, Token, Value};

use crate::binder::{recursive_let, Binder, Binding, Ident, LetRec, Slot};
use crate::error::{CompileError, Result};
use crate::types::{lookup_rule, resolve_branch, resolve_rule, TypeLayer};

type ParserBinding = Binding<Expr<Ident>>;

fn refs(idents: Vec<Ident>) -> Vec<Expr<Ident>> {
    idents.into_iter().map(Expr::Ref).collect()
}

/// Applicative chain over the fields, or pure unit for none.
fn chain(fields: Vec<Expr<Ident>>) -> Expr<Ident> {
    if fields.is_empty() {
        Expr::Unit
    } else {
        Expr::Seq(fields)
    }
}

/// `helper = nil <|> cons(inner, helper)`.
fn many_helper(helper: &Ident, inner: &Ident) -> Expr<Ident> {
    Expr::alt(
        Expr::Nil,
        Expr::cons(Expr::Ref(inner.clone()), Expr::Ref(helper.clone())),
    )
}

/// Emit the bindings for a single rule: its own, labeled with the rule's
/// description, plus any helpers it needs.
pub fn compile_rule(
    types: &dyn TypeLayer,
    binder: &mut Binder,
    grammar: &Grammar,
    id: RuleId,
) -> Result<Vec<ParserBinding>> {
    let rule = lookup_rule(grammar, id)?;
    let ident = binder.rule(grammar, id);
    let mut helpers = Vec::new();

    let body = match rule.ty() {
        RuleType::Terminal(pred) => Expr::map(resolve_rule(types, rule)?, Expr::MatchOne(*pred)),
        RuleType::Choice(branches) => {
            let mut alts = Vec::with_capacity(branches.len());
            for branch in branches {
                let ctor = resolve_branch(types, rule, branch)?;
                let fields = refs(binder.rules(grammar, &branch.fields));
                alts.push(Expr::map(ctor, chain(fields)));
            }
            // Builder and notation both reject empty choices.
            let mut alts = alts.into_iter();
            let first = alts.next().ok_or_else(|| CompileError::UnresolvedReference {
                rule: rule.name().to_owned(),
                reference: "a first branch".to_owned(),
            })?;
            alts.fold(first, Expr::alt)
        }
        RuleType::Wrap(inner) => Expr::map(
            resolve_rule(types, rule)?,
            Expr::Ref(binder.rule(grammar, *inner)),
        ),
        RuleType::Record(fields) => Expr::map(
            resolve_rule(types, rule)?,
            chain(refs(binder.rules(grammar, fields))),
        ),
        RuleType::Opt(inner) => Expr::map(
            resolve_rule(types, rule)?,
            Expr::alt(Expr::Nothing, Expr::just(Expr::Ref(binder.rule(grammar, *inner)))),
        ),
        RuleType::Star(inner) => {
            let ctor = resolve_rule(types, rule)?;
            let inner = binder.rule(grammar, *inner);
            let helper = binder.helper(grammar, id);
            helpers.push(Binding::new(helper.clone(), many_helper(&helper, &inner)));
            Expr::map(ctor, Expr::Ref(helper))
        }
        RuleType::Plus(inner) => {
            let ctor = resolve_rule(types, rule)?;
            let inner = binder.rule(grammar, *inner);
            let helper = binder.helper(grammar, id);
            helpers.push(Binding::new(helper.clone(), many_helper(&helper, &inner)));
            Expr::map(ctor, Expr::pair(Expr::Ref(inner), Expr::Ref(helper)))
        }
        RuleType::Series(lit) => Expr::map(resolve_rule(types, rule)?, Expr::Symbol(lit.clone())),
    };

    let mut bindings = Vec::with_capacity(1 + helpers.len());
    bindings.push(Binding::new(ident, Expr::label(rule.description(), body)));
    bindings.extend(helpers);
    Ok(bindings)
}

/// Bindings for every rule of `family`, sharing one binder so that each rule
/// is compiled and bound exactly once.
pub fn parser_bindings(
    types: &dyn TypeLayer,
    binder: &mut Binder,
    grammar: &Grammar,
    family: &Family,
) -> Result<Vec<ParserBinding>> {
    let mut bindings = Vec::new();
    for id in family.ids() {
        bindings.extend(compile_rule(types, binder, grammar, *id)?);
    }
    Ok(bindings)
}

/// Declare one handle per slot, then define every body against them.
fn instantiate(group: LetRec<Expr<Slot>>) -> Result<(Rules, Vec<Handle>)> {
    let mut rules = Rules::new();
    let handles: Vec<Handle> = (0..group.len()).map(|_| rules.declare()).collect();
    let body = group.body().iter().map(|s| handles[s.index()]).collect();
    for (handle, expr) in handles.iter().zip(group.into_slots()) {
        rules.define(*handle, expr.map_refs(|slot| handles[slot.index()]))?;
    }
    Ok((rules, body))
}

/// A parser for one root rule.
#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    name: String,
    rules: Rules,
    root: Handle,
}

impl CompiledGrammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn parse_tokens(&self, tokens: &[Token]) -> std::result::Result<Value, ParseError> {
        self.rules.parse_tokens(self.root, tokens)
    }
}

impl Parser for CompiledGrammar {
    fn parse(&self, input: &str) -> anyhow::Result<Value> {
        Ok(self.parse_tokens(&Token::stream(input))?)
    }
}

/// Compile the parser for `root` and everything it reaches.
pub fn compile_grammar(
    types: &dyn TypeLayer,
    grammar: &Grammar,
    root: RuleId,
) -> Result<CompiledGrammar> {
    lookup_rule(grammar, root)?;
    let fam = family(grammar, root);
    let mut binder = Binder::new();
    let bindings = parser_bindings(types, &mut binder, grammar, &fam)?;
    let root_ident = binder.rule(grammar, root);
    let group = recursive_let(bindings, &[root_ident])?;
    let (rules, body) = instantiate(group)?;
    debug!(
        "compiled parser for '{}': {} rules, {} bindings",
        grammar.name(root),
        fam.len(),
        rules.len()
    );

    Ok(CompiledGrammar {
        name: grammar.name(root).to_owned(),
        rules,
        root: body[0],
    })
}

/// Parsers for every rule reachable from a set of roots, built over one
/// shared binding group so a rule reachable from more than one root is
/// compiled once. Each parser is exposed under its label.
#[derive(Debug, Clone)]
pub struct Product {
    rules: Rules,
    roots: Vec<String>,
    labels: Vec<String>,
    entries: HashMap<String, Handle>,
}

impl Product {
    /// Labels of the requested roots, in root order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Labels of every rule in the product, in family order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn get(&self, label: &str) -> Option<Handle> {
        self.entries.get(label).copied()
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn parse_tokens(&self, label: &str, tokens: &[Token]) -> anyhow::Result<Value> {
        let root = self
            .get(label)
            .ok_or_else(|| anyhow::anyhow!("no parser labeled '{}'", label))?;
        Ok(self.rules.parse_tokens(root, tokens)?)
    }

    pub fn parse(&self, label: &str, input: &str) -> anyhow::Result<Value> {
        self.parse_tokens(label, &Token::stream(input))
    }
}

/// Compile parsers for `roots` and all their ancestors, each exposed under
/// `label` applied to the rule's name. Labels must be distinct.
pub fn compile_product(
    types: &dyn TypeLayer,
    label: &dyn Fn(&str) -> String,
    grammar: &Grammar,
    roots: &[RuleId],
) -> Result<Product> {
    for root in roots {
        lookup_rule(grammar, *root)?;
    }
    let fam = families(grammar, roots);
    let mut binder = Binder::new();
    let bindings = parser_bindings(types, &mut binder, grammar, &fam)?;
    let idents = binder.rules(grammar, fam.ids());
    let group = recursive_let(bindings, &idents)?;
    let (rules, body) = instantiate(group)?;

    let mut labels = Vec::with_capacity(fam.len());
    let mut entries = HashMap::with_capacity(fam.len());
    for (id, handle) in fam.ids().iter().zip(body) {
        let l = label(grammar.name(*id));
        if entries.insert(l.clone(), handle).is_some() {
            return Err(CompileError::DuplicateBinding { ident: l });
        }
        labels.push(l);
    }
    let roots = roots.iter().map(|id| label(grammar.name(*id))).collect();
    debug!(
        "compiled product over {} rules: {} bindings",
        fam.len(),
        rules.len()
    );

    Ok(Product {
        rules,
        roots,
        labels,
        entries,
    })
}
