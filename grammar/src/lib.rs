//! The rule model: an immutable, possibly cyclic graph of named grammar
//! rules.
//!
//! Rules live in an arena owned by `Grammar` and refer to each other by
//! `RuleId`, so self and mutual recursion need no shared ownership. Graphs are
//! assembled with `GrammarBuilder`, or parsed from the textual notation in
//! `notation`.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display};
use std::str::FromStr;

use parsegen::Predicate;

mod error;
mod family;
pub mod notation;
mod slots;

pub use error::{GrammarError, Result};
pub use family::{families, family, Family};

use slots::{SlotPos, Slots};

/// Index of a rule within its `Grammar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(usize);

impl RuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One labeled alternative of a choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub fields: Vec<RuleId>,
}

impl Branch {
    pub fn new(name: impl Into<String>, fields: Vec<RuleId>) -> Self {
        Branch {
            name: name.into(),
            fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleType {
    /// Exactly one token satisfying the predicate.
    Terminal(Predicate),
    /// Ordered alternation over labeled branches.
    Choice(Vec<Branch>),
    /// Transparent delegation to a single rule.
    Wrap(RuleId),
    /// Unlabeled fixed-arity product.
    Record(Vec<RuleId>),
    Opt(RuleId),
    Star(RuleId),
    Plus(RuleId),
    /// An exact, statically known run of tokens.
    Series(String),
}

impl RuleType {
    /// Structural children, in order, including repeats.
    pub fn children(&self) -> Vec<RuleId> {
        match self {
            RuleType::Terminal(_) | RuleType::Series(_) => Vec::new(),
            RuleType::Choice(branches) => branches
                .iter()
                .flat_map(|b| b.fields.iter().copied())
                .collect(),
            RuleType::Record(fields) => fields.clone(),
            RuleType::Wrap(inner)
            | RuleType::Opt(inner)
            | RuleType::Star(inner)
            | RuleType::Plus(inner) => vec![*inner],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RuleType::Terminal(_) => "terminal",
            RuleType::Choice(_) => "choice",
            RuleType::Wrap(_) => "wrap",
            RuleType::Record(_) => "record",
            RuleType::Opt(_) => "opt",
            RuleType::Star(_) => "star",
            RuleType::Plus(_) => "plus",
            RuleType::Series(_) => "series",
        }
    }
}

/// A named grammar production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: String,
    description: Option<String>,
    ty: RuleType,
}

impl Rule {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human readable label, defaulting to the rule name.
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    pub fn explicit_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn ty(&self) -> &RuleType {
        &self.ty
    }

    pub fn children(&self) -> Vec<RuleId> {
        self.ty.children()
    }
}

/// A complete rule graph in which every name maps to exactly one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    rules: Vec<Rule>,
    names: HashMap<String, RuleId>,
}

impl Grammar {
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::new()
    }

    /// Get a rule by id. Ids are only meaningful for the grammar that issued
    /// them; panics on an id this grammar never issued, see `get`.
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.0)
    }

    pub fn contains(&self, id: RuleId) -> bool {
        id.0 < self.rules.len()
    }

    pub fn name(&self, id: RuleId) -> &str {
        self.rule(id).name()
    }

    pub fn lookup(&self, name: &str) -> Option<RuleId> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All rules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate().map(|(i, r)| (RuleId(i), r))
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for prod in notation::productions(self) {
            writeln!(f, "{}", prod)?;
        }
        Ok(())
    }
}

impl FromStr for Grammar {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self> {
        notation::parse_grammar(s)
    }
}

/// Builds a `Grammar`, allowing rules to be declared before they are defined
/// so cyclic graphs can be expressed.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    slots: Slots<Rule>,
    declared: Vec<String>,
    names: HashMap<String, RuleId>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        GrammarBuilder::default()
    }

    /// Reserve a rule name. Fails if the name was already declared.
    pub fn declare(&mut self, name: impl Into<String>) -> Result<RuleId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(GrammarError::DuplicateRuleName { name });
        }
        let id = RuleId(self.slots.reserve_next().index());
        self.names.insert(name.clone(), id);
        self.declared.push(name);
        Ok(id)
    }

    /// Look up an already declared rule.
    pub fn get(&self, name: &str) -> Option<RuleId> {
        self.names.get(name).copied()
    }

    /// Provide the definition for a declared rule.
    pub fn define(&mut self, id: RuleId, description: Option<&str>, ty: RuleType) -> Result<()> {
        let name = match self.declared.get(id.0) {
            Some(name) => name.clone(),
            None => {
                return Err(GrammarError::UndefinedRule {
                    name: format!("#{}", id.0),
                })
            }
        };

        for child in ty.children() {
            if child.0 >= self.declared.len() {
                return Err(GrammarError::UndefinedRule {
                    name: format!("#{}", child.0),
                });
            }
        }
        match &ty {
            RuleType::Choice(branches) if branches.is_empty() => {
                return Err(GrammarError::EmptyChoice { rule: name })
            }
            RuleType::Series(lit) if lit.is_empty() => {
                return Err(GrammarError::EmptySeries { rule: name })
            }
            RuleType::Choice(branches) => {
                let mut seen = HashSet::new();
                for branch in branches {
                    if !seen.insert(branch.name.as_str()) {
                        return Err(GrammarError::DuplicateBranchName {
                            rule: name,
                            branch: branch.name.clone(),
                        });
                    }
                }
            }
            _ => (),
        }
        if description == Some("") {
            return Err(GrammarError::EmptyDescription { rule: name });
        }

        let rule = Rule {
            name: name.clone(),
            description: description.map(|d| d.to_owned()),
            ty,
        };
        self.slots
            .fill(SlotPos::from(id), rule)
            .map_err(|_| GrammarError::DuplicateRuleName { name })
    }

    /// Declare and define a rule in one step.
    pub fn rule(&mut self, name: impl Into<String>, ty: RuleType) -> Result<RuleId> {
        let id = self.declare(name)?;
        self.define(id, None, ty)?;
        Ok(id)
    }

    /// Like `rule`, with a description used in parse diagnostics.
    pub fn described(
        &mut self,
        name: impl Into<String>,
        description: &str,
        ty: RuleType,
    ) -> Result<RuleId> {
        let id = self.declare(name)?;
        self.define(id, Some(description), ty)?;
        Ok(id)
    }

    pub fn build(self) -> Result<Grammar> {
        let declared = self.declared;
        let rules = self
            .slots
            .into_vec()
            .map_err(|pos| GrammarError::UndefinedRule {
                name: declared[pos.index()].clone(),
            })?;
        Ok(Grammar {
            rules,
            names: self.names,
        })
    }
}

impl From<RuleId> for SlotPos {
    fn from(id: RuleId) -> SlotPos {
        SlotPos::at(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// expr = Add: expr plus digit | Lit: digit ;
    fn recursive() -> Grammar {
        let mut b = Grammar::builder();
        let expr = b.declare("expr").unwrap();
        let digit = b.rule("digit", RuleType::Terminal(Predicate::Digit)).unwrap();
        let plus = b.rule("plus", RuleType::Terminal(Predicate::Char('+'))).unwrap();
        b.define(
            expr,
            Some("an expression"),
            RuleType::Choice(vec![
                Branch::new("Add", vec![expr, plus, digit]),
                Branch::new("Lit", vec![digit]),
            ]),
        )
        .unwrap();
        b.build().unwrap()
    }

    #[test]
    fn build_cyclic() {
        let g = recursive();
        let expr = g.lookup("expr").unwrap();
        assert_eq!(g.len(), 3);
        assert_eq!(g.rule(expr).description(), "an expression");
        assert_eq!(g.rule(expr).children(), vec![expr, RuleId(2), RuleId(1), RuleId(1)]);
        assert_eq!(g.rule(RuleId(1)).description(), "digit");
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut b = Grammar::builder();
        b.rule("a", RuleType::Terminal(Predicate::Any)).unwrap();
        let err = b.rule("a", RuleType::Series("x".into())).unwrap_err();
        assert_eq!(
            err,
            GrammarError::DuplicateRuleName {
                name: "a".to_owned()
            }
        );
    }

    #[test]
    fn redefinition_rejected() {
        let mut b = Grammar::builder();
        let a = b.rule("a", RuleType::Terminal(Predicate::Any)).unwrap();
        let err = b.define(a, None, RuleType::Opt(a)).unwrap_err();
        assert!(matches!(err, GrammarError::DuplicateRuleName { .. }));
    }

    #[test]
    fn undefined_rule_rejected() {
        let mut b = Grammar::builder();
        let a = b.declare("a").unwrap();
        b.rule("b", RuleType::Star(a)).unwrap();
        let err = b.build().unwrap_err();
        assert_eq!(
            err,
            GrammarError::UndefinedRule {
                name: "a".to_owned()
            }
        );
    }

    #[test]
    fn empty_constructs_rejected() {
        let mut b = Grammar::builder();
        let err = b.rule("c", RuleType::Choice(vec![])).unwrap_err();
        assert!(matches!(err, GrammarError::EmptyChoice { .. }));
        let err = b.rule("s", RuleType::Series(String::new())).unwrap_err();
        assert!(matches!(err, GrammarError::EmptySeries { .. }));
    }

    #[test]
    fn duplicate_branch_rejected() {
        let mut b = Grammar::builder();
        let x = b.rule("x", RuleType::Series("x".into())).unwrap();
        let y = b.rule("y", RuleType::Series("y".into())).unwrap();
        let err = b
            .rule(
                "c",
                RuleType::Choice(vec![Branch::new("A", vec![x]), Branch::new("A", vec![y])]),
            )
            .unwrap_err();
        assert_eq!(
            err,
            GrammarError::DuplicateBranchName {
                rule: "c".to_owned(),
                branch: "A".to_owned()
            }
        );
        // Same fields under distinct labels are fine.
        b.rule(
            "d",
            RuleType::Choice(vec![Branch::new("A", vec![x]), Branch::new("B", vec![x])]),
        )
        .unwrap();
    }

    #[test]
    fn empty_description_rejected() {
        let mut b = Grammar::builder();
        let err = b
            .described("a", "", RuleType::Terminal(Predicate::Any))
            .unwrap_err();
        assert_eq!(
            err,
            GrammarError::EmptyDescription {
                rule: "a".to_owned()
            }
        );
        b.described("b", "anything", RuleType::Terminal(Predicate::Any))
            .unwrap();
    }

    #[test]
    fn lookup_by_foreign_id() {
        let g = recursive();
        let mut big = Grammar::builder();
        for name in &["a", "b", "c", "d", "e"] {
            big.declare(*name).unwrap();
        }
        let foreign = big.get("e").unwrap();
        assert!(!g.contains(foreign));
        assert!(g.get(foreign).is_none());
        assert!(g.get(g.lookup("expr").unwrap()).is_some());
    }

    #[test]
    fn foreign_id_rejected() {
        let mut other = Grammar::builder();
        for name in &["x", "y", "z"] {
            other.declare(*name).unwrap();
        }
        let foreign = other.get("z").unwrap();

        let mut b = Grammar::builder();
        let err = b.rule("a", RuleType::Opt(foreign)).unwrap_err();
        assert!(matches!(err, GrammarError::UndefinedRule { .. }));
    }
}
