//! Textual grammar notation.
//!
//! ```text
//! # comments run to end of line
//! digit            = @digit ;
//! digits "number"  = digit+ ;
//! maybe_sp         = sp? ;
//! sp               = ' ' ;
//! pair             = ( maybe_sp digits ) ;
//! let_kw           = "let" ;
//! expr             = Add: expr plus digits | Num: digits ;
//! plus             = '+' ;
//! item             = digits ;
//! ```
//!
//! Every right-hand side applies exactly one constructor to named rules, so
//! productions map one-to-one onto rules.

use std::fmt::{self, Display};
use std::str::FromStr;

use parsegen::Predicate;

use crate::error::{GrammarError, Result};
use crate::{Branch, Grammar, RuleId, RuleType};

mod parser;

/// A labeled alternative of a choice.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Alternative {
    pub label: String,
    pub fields: Vec<String>,
}

/// The rhs of a production.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Rhs {
    Terminal(Predicate),
    Choice(Vec<Alternative>),
    Wrap(String),
    Record(Vec<String>),
    Opt(String),
    Star(String),
    Plus(String),
    Series(String),
}

fn write_fields(f: &mut fmt::Formatter, fields: &[String]) -> fmt::Result {
    for field in fields {
        write!(f, " {}", field)?;
    }
    Ok(())
}

fn write_string_literal(f: &mut fmt::Formatter, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in s.chars() {
        match ch {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

impl Display for Rhs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rhs::Terminal(pred) => write!(f, "{}", pred),
            Rhs::Choice(alts) => {
                for (i, alt) in alts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}:", alt.label)?;
                    write_fields(f, &alt.fields)?;
                }
                Ok(())
            }
            Rhs::Wrap(name) => write!(f, "{}", name),
            Rhs::Record(fields) => {
                write!(f, "(")?;
                write_fields(f, fields)?;
                write!(f, " )")
            }
            Rhs::Opt(name) => write!(f, "{}?", name),
            Rhs::Star(name) => write!(f, "{}*", name),
            Rhs::Plus(name) => write!(f, "{}+", name),
            Rhs::Series(lit) => write_string_literal(f, lit),
        }
    }
}

impl FromStr for Rhs {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self> {
        let (_, rhs) = parser::rhs(s)?;
        Ok(rhs)
    }
}

/// A production: `name ["description"] = rhs ;`.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Production {
    pub name: String,
    pub description: Option<String>,
    pub rhs: Rhs,
}

impl Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(desc) = &self.description {
            write!(f, " ")?;
            write_string_literal(f, desc)?;
        }
        write!(f, " = {} ;", self.rhs)
    }
}

impl FromStr for Production {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self> {
        let (_, prod) = parser::production(s)?;
        Ok(prod)
    }
}

/// Parse notation text and lower it into a `Grammar`.
pub fn parse_grammar(s: &str) -> Result<Grammar> {
    let (_, prods) = parser::productions(s)?;
    lower(&prods)
}

/// Lower productions into a grammar. Every name is declared before any rule
/// is defined, so productions may appear in any order.
pub fn lower(prods: &[Production]) -> Result<Grammar> {
    let mut b = Grammar::builder();
    for prod in prods {
        b.declare(prod.name.as_str())?;
    }

    let resolve = |name: &String| -> Result<RuleId> {
        b.get(name).ok_or_else(|| GrammarError::UndefinedRule { name: name.clone() })
    };
    let resolve_all = |names: &[String]| -> Result<Vec<RuleId>> { names.iter().map(resolve).collect() };

    let mut defs = Vec::with_capacity(prods.len());
    for prod in prods {
        let ty = match &prod.rhs {
            Rhs::Terminal(pred) => RuleType::Terminal(*pred),
            Rhs::Choice(alts) => RuleType::Choice(
                alts.iter()
                    .map(|alt| -> Result<Branch> {
                        Ok(Branch::new(alt.label.as_str(), resolve_all(&alt.fields)?))
                    })
                    .collect::<Result<_>>()?,
            ),
            Rhs::Wrap(name) => RuleType::Wrap(resolve(name)?),
            Rhs::Record(fields) => RuleType::Record(resolve_all(fields)?),
            Rhs::Opt(name) => RuleType::Opt(resolve(name)?),
            Rhs::Star(name) => RuleType::Star(resolve(name)?),
            Rhs::Plus(name) => RuleType::Plus(resolve(name)?),
            Rhs::Series(lit) => RuleType::Series(lit.clone()),
        };
        defs.push((resolve(&prod.name)?, prod.description.as_deref(), ty));
    }

    for (id, desc, ty) in defs {
        b.define(id, desc, ty)?;
    }
    b.build()
}

/// The productions that would rebuild `grammar`, in declaration order.
pub fn productions(grammar: &Grammar) -> Vec<Production> {
    let names = |ids: &[RuleId]| -> Vec<String> {
        ids.iter().map(|id| grammar.name(*id).to_owned()).collect()
    };
    grammar
        .iter()
        .map(|(_, rule)| {
            let rhs = match rule.ty() {
                RuleType::Terminal(pred) => Rhs::Terminal(*pred),
                RuleType::Choice(branches) => Rhs::Choice(
                    branches
                        .iter()
                        .map(|b| Alternative {
                            label: b.name.clone(),
                            fields: names(&b.fields),
                        })
                        .collect(),
                ),
                RuleType::Wrap(id) => Rhs::Wrap(grammar.name(*id).to_owned()),
                RuleType::Record(fields) => Rhs::Record(names(fields)),
                RuleType::Opt(id) => Rhs::Opt(grammar.name(*id).to_owned()),
                RuleType::Star(id) => Rhs::Star(grammar.name(*id).to_owned()),
                RuleType::Plus(id) => Rhs::Plus(grammar.name(*id).to_owned()),
                RuleType::Series(lit) => Rhs::Series(lit.clone()),
            };
            Production {
                name: rule.name().to_owned(),
                description: rule.explicit_description().map(|d| d.to_owned()),
                rhs,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Debug;
    use std::string::ToString;

    fn assert_lossless_conversion<T, E>(t: T)
    where
        T: ToString + FromStr<Err = E> + Eq + Debug,
        E: std::error::Error,
    {
        let s = t.to_string();
        let t_parse = T::from_str(&s).unwrap();
        assert_eq!(t, t_parse, "To string:\n{}\n", s);
    }

    #[test]
    fn lossless_rhs() {
        let tests = vec![
            Rhs::Terminal(Predicate::Digit),
            Rhs::Terminal(Predicate::Char('\'')),
            Rhs::Terminal(Predicate::Range('a', 'z')),
            Rhs::Series("a \"quoted\"\n".into()),
            Rhs::Record(vec![]),
            Rhs::Record(vec!["a".into(), "b".into()]),
            Rhs::Opt("a".into()),
            Rhs::Star("a".into()),
            Rhs::Plus("a".into()),
            Rhs::Wrap("a".into()),
            Rhs::Choice(vec![
                Alternative {
                    label: "Cons".into(),
                    fields: vec!["item".into(), "list".into()],
                },
                Alternative {
                    label: "Nil".into(),
                    fields: vec![],
                },
            ]),
        ];

        for test in tests {
            assert_lossless_conversion(test);
        }
    }

    #[test]
    fn lossless_production() {
        let prod = Production {
            name: "digits".into(),
            description: Some("a number".into()),
            rhs: Rhs::Plus("digit".into()),
        };

        assert_lossless_conversion(prod)
    }

    #[test]
    fn lossless_grammar() {
        let src = "
            expr \"expression\" = Add: expr plus num | Num: num ;
            num = digit+ ;
            digit = @digit ;
            plus = '+' ;
            kw = \"let\" ;
            pair = ( ws num ) ;
            ws = sp* ;
            sp = ' ' ;
        ";
        let g: Grammar = src.parse().unwrap();
        let again: Grammar = g.to_string().parse().unwrap();
        assert_eq!(g, again, "To string:\n{}\n", g);
    }

    #[test]
    fn description_must_not_be_empty() {
        let mut b = Grammar::builder();
        assert!(b
            .described("a", "", RuleType::Terminal(Predicate::Any))
            .is_err());

        // Everything the builder accepts prints back in a parseable form.
        let err = "a \"\" = @any ;".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, GrammarError::Syntax(_)), "{:?}", err);
        let g: Grammar = "a \" \" = @any ;".parse().unwrap();
        let again: Grammar = g.to_string().parse().unwrap();
        assert_eq!(g, again);
    }

    #[test]
    fn duplicate_branch_label() {
        let err = "c = A: x | A: y ; x = 'x' ; y = 'y' ;"
            .parse::<Grammar>()
            .unwrap_err();
        assert_eq!(
            err,
            GrammarError::DuplicateBranchName {
                rule: "c".to_owned(),
                branch: "A".to_owned()
            }
        );
    }

    #[test]
    fn order_independent() {
        let g: Grammar = "b = a? ; a = @alpha ;".parse().unwrap();
        let b = g.lookup("b").unwrap();
        let a = g.lookup("a").unwrap();
        assert_eq!(g.rule(b).ty(), &RuleType::Opt(a));
    }

    #[test]
    fn unknown_reference() {
        let err = "a = b* ;".parse::<Grammar>().unwrap_err();
        assert_eq!(
            err,
            GrammarError::UndefinedRule {
                name: "b".to_owned()
            }
        );
    }

    #[test]
    fn duplicate_production() {
        let err = "a = 'x' ; a = 'y' ;".parse::<Grammar>().unwrap_err();
        assert_eq!(
            err,
            GrammarError::DuplicateRuleName {
                name: "a".to_owned()
            }
        );
    }

    #[test]
    fn syntax_error() {
        let err = "a = = ;".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, GrammarError::Syntax(_)), "{:?}", err);
    }
}
