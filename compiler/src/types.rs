//! The data-type layer: constructors for every rule and branch.
//!
//! Compilers never invent constructors themselves. They ask a `TypeLayer` for
//! the constructor registered under a rule (or rule and branch) name and check
//! it has the shape the rule needs, so the layer and the grammar can't drift
//! apart silently.

use std::collections::HashMap;

use grammar::{Branch, Grammar, Rule, RuleId, RuleType};
use parsegen::Constructor;

use crate::error::{CompileError, Result};

pub trait TypeLayer {
    /// Constructor for a non-choice rule.
    fn rule(&self, rule: &str) -> Option<Constructor>;

    /// Constructor for one branch of a choice rule.
    fn branch(&self, rule: &str, branch: &str) -> Option<Constructor>;
}

/// Constructors derived directly from a grammar's rule shapes.
#[derive(Debug, Clone, Default)]
pub struct DerivedTypes {
    rules: HashMap<String, Constructor>,
    branches: HashMap<(String, String), Constructor>,
}

impl DerivedTypes {
    pub fn new(grammar: &Grammar) -> Self {
        let mut types = DerivedTypes::default();
        for (_, rule) in grammar.iter() {
            match rule.ty() {
                RuleType::Choice(branches) => {
                    for b in branches {
                        types.branches.insert(
                            (rule.name().to_owned(), b.name.clone()),
                            branch_constructor(rule, b),
                        );
                    }
                }
                _ => {
                    if let Some(ctor) = rule_constructor(rule) {
                        types.rules.insert(rule.name().to_owned(), ctor);
                    }
                }
            }
        }
        types
    }

    /// Drop the constructor for `rule`, and those for its branches.
    pub fn without(mut self, rule: &str) -> Self {
        self.rules.remove(rule);
        self.branches.retain(|(r, _), _| r != rule);
        self
    }

    /// Register `ctor` under `rule`, replacing whatever was there.
    pub fn with_rule(mut self, rule: &str, ctor: Constructor) -> Self {
        self.rules.insert(rule.to_owned(), ctor);
        self
    }
}

impl TypeLayer for DerivedTypes {
    fn rule(&self, rule: &str) -> Option<Constructor> {
        self.rules.get(rule).cloned()
    }

    fn branch(&self, rule: &str, branch: &str) -> Option<Constructor> {
        self.branches
            .get(&(rule.to_owned(), branch.to_owned()))
            .cloned()
    }
}

/// The constructor a non-choice rule needs. `None` for choices, which only
/// have per-branch constructors.
pub fn rule_constructor(rule: &Rule) -> Option<Constructor> {
    let name = rule.name().to_owned();
    let ctor = match rule.ty() {
        RuleType::Terminal(_) => Constructor::Terminal { rule: name },
        RuleType::Choice(_) => return None,
        RuleType::Wrap(_) => Constructor::Wrap { rule: name },
        RuleType::Record(fields) => Constructor::Record {
            rule: name,
            arity: fields.len(),
        },
        RuleType::Opt(_) => Constructor::Opt { rule: name },
        RuleType::Star(_) => Constructor::Star { rule: name },
        RuleType::Plus(_) => Constructor::Plus { rule: name },
        RuleType::Series(_) => Constructor::Series { rule: name },
    };
    Some(ctor)
}

pub fn branch_constructor(rule: &Rule, branch: &Branch) -> Constructor {
    Constructor::Branch {
        rule: rule.name().to_owned(),
        branch: branch.name.clone(),
        arity: branch.fields.len(),
    }
}

/// The rule `id` names, failing for ids `grammar` never issued.
pub(crate) fn lookup_rule(grammar: &Grammar, id: RuleId) -> Result<&Rule> {
    grammar.get(id).ok_or_else(|| {
        let reference = format!("#{}", id.index());
        CompileError::UnresolvedReference {
            rule: reference.clone(),
            reference,
        }
    })
}

/// Look up and check the constructor for a non-choice rule.
pub(crate) fn resolve_rule(types: &dyn TypeLayer, rule: &Rule) -> Result<Constructor> {
    let unresolved = |reference: String| CompileError::UnresolvedReference {
        rule: rule.name().to_owned(),
        reference,
    };
    let expected = rule_constructor(rule).ok_or_else(|| unresolved(rule.name().to_owned()))?;
    match types.rule(rule.name()) {
        Some(ctor) if ctor == expected => Ok(ctor),
        _ => Err(unresolved(format!("constructor {}", expected))),
    }
}

/// Look up and check the constructor for one branch of a choice rule.
pub(crate) fn resolve_branch(
    types: &dyn TypeLayer,
    rule: &Rule,
    branch: &Branch,
) -> Result<Constructor> {
    let expected = branch_constructor(rule, branch);
    match types.branch(rule.name(), &branch.name) {
        Some(ctor) if ctor == expected => Ok(ctor),
        _ => Err(CompileError::UnresolvedReference {
            rule: rule.name().to_owned(),
            reference: format!("constructor {}", expected),
        }),
    }
}
