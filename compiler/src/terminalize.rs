//! Compiles rules into terminalizers: functions from a parsed value back to
//! the token sequence it covers.
//!
//! A terminalizer for a rule classified nonempty produces `Terminals::Nonempty`
//! for every value, so the guarantee is carried in the result's type rather
//! than re-checked by callers. Products reach it by splicing: everything
//! before the first guaranteed-nonempty field is prepended to it, everything
//! after is appended.

use std::fmt;
use std::sync::Arc;

use log::debug;

use grammar::{families, Grammar, RuleId, RuleType};
use parsegen::{text, Token, Value};

use crate::analysis::Analysis;
use crate::binder::{recursive_let, Binder, Binding, Ident, LetRec, Resolve, Scope, Slot};
use crate::error::{CompileError, Result, TerminalizeError};
use crate::splice::NonEmpty;
use crate::types::{lookup_rule, resolve_branch, resolve_rule, TypeLayer};

/// Tokens recovered from a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminals {
    /// From a rule that may terminalize to nothing. May still hold tokens.
    Possibly(Vec<Token>),
    /// From a rule guaranteed to terminalize to at least one token.
    Nonempty(NonEmpty<Token>),
}

impl Terminals {
    pub fn is_nonempty_shape(&self) -> bool {
        matches!(self, Terminals::Nonempty(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Terminals::Possibly(v) => v.len(),
            Terminals::Nonempty(n) => n.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn text(&self) -> String {
        match self {
            Terminals::Possibly(v) => text(v),
            Terminals::Nonempty(n) => text(n.iter()),
        }
    }

    pub fn into_vec(self) -> Vec<Token> {
        match self {
            Terminals::Possibly(v) => v,
            Terminals::Nonempty(n) => n.into_vec(),
        }
    }

    fn widen(self) -> Self {
        Terminals::Possibly(self.into_vec())
    }
}

/// A reference to another rule's terminalizer, tagged with that rule's
/// classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part<R> {
    pub target: R,
    pub nonempty: bool,
}

impl<R> Part<R> {
    fn try_map<S, F>(self, f: &mut F) -> Result<Part<S>>
    where
        F: FnMut(R) -> Result<S>,
    {
        Ok(Part {
            target: f(self.target)?,
            nonempty: self.nonempty,
        })
    }
}

fn try_map_parts<R, S, F>(parts: Vec<Part<R>>, f: &mut F) -> Result<Vec<Part<S>>>
where
    F: FnMut(R) -> Result<S>,
{
    parts.into_iter().map(|p| p.try_map(f)).collect()
}

/// How the fields of a product combine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Splice<R> {
    /// Plain concatenation, for products that may be empty.
    Flat(Vec<Part<R>>),
    /// `before ++ pivot ++ after`, where `pivot` is the first guaranteed
    /// nonempty field.
    Pivot {
        before: Vec<Part<R>>,
        pivot: Part<R>,
        after: Vec<Part<R>>,
    },
}

impl<R> Splice<R> {
    pub fn arity(&self) -> usize {
        match self {
            Splice::Flat(parts) => parts.len(),
            Splice::Pivot { before, after, .. } => before.len() + 1 + after.len(),
        }
    }

    /// Every part, in field order.
    pub fn parts(&self) -> Vec<&Part<R>> {
        match self {
            Splice::Flat(parts) => parts.iter().collect(),
            Splice::Pivot {
                before,
                pivot,
                after,
            } => before
                .iter()
                .chain(std::iter::once(pivot))
                .chain(after.iter())
                .collect(),
        }
    }

    fn try_map<S, F>(self, f: &mut F) -> Result<Splice<S>>
    where
        F: FnMut(R) -> Result<S>,
    {
        Ok(match self {
            Splice::Flat(parts) => Splice::Flat(try_map_parts(parts, f)?),
            Splice::Pivot {
                before,
                pivot,
                after,
            } => Splice::Pivot {
                before: try_map_parts(before, f)?,
                pivot: pivot.try_map(f)?,
                after: try_map_parts(after, f)?,
            },
        })
    }
}

/// Plan how a product's fields combine. A product classified nonempty must
/// have a nonempty field to pivot on.
pub fn splice_plan<R>(rule: &str, parts: Vec<Part<R>>, nonempty: bool) -> Result<Splice<R>> {
    if !nonempty {
        return Ok(Splice::Flat(parts));
    }
    let idx = parts
        .iter()
        .position(|p| p.nonempty)
        .ok_or_else(|| CompileError::MalformedProduct {
            rule: rule.to_owned(),
        })?;
    let mut before = parts;
    let mut after = before.split_off(idx);
    let pivot = after.remove(0);
    Ok(Splice::Pivot {
        before,
        pivot,
        after,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection<R> {
    Terminal,
    /// Branch name and plan, in declaration order.
    Choice(Vec<(String, Splice<R>)>),
    Wrap(Part<R>),
    Record(Splice<R>),
    Opt(Part<R>),
    Star(Part<R>),
    Plus(Part<R>),
    /// The literal every value must spell out.
    Series(String),
}

impl<R> Projection<R> {
    pub fn kind(&self) -> &'static str {
        match self {
            Projection::Terminal => "terminal",
            Projection::Choice(_) => "branch",
            Projection::Wrap(_) => "wrap",
            Projection::Record(_) => "record",
            Projection::Opt(_) => "opt",
            Projection::Star(_) => "star",
            Projection::Plus(_) => "plus",
            Projection::Series(_) => "series",
        }
    }
}

/// One compiled terminalizer binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projector<R> {
    pub rule: String,
    pub nonempty: bool,
    pub projection: Projection<R>,
}

impl Resolve for Projector<Ident> {
    type Resolved = Projector<Slot>;

    fn resolve(self, scope: &Scope) -> Result<Projector<Slot>> {
        let mut f = |ident: Ident| scope.lookup(&ident);
        let projection = match self.projection {
            Projection::Terminal => Projection::Terminal,
            Projection::Choice(branches) => Projection::Choice(
                branches
                    .into_iter()
                    .map(|(name, plan)| -> Result<(String, Splice<Slot>)> {
                        Ok((name, plan.try_map(&mut f)?))
                    })
                    .collect::<Result<_>>()?,
            ),
            Projection::Wrap(p) => Projection::Wrap(p.try_map(&mut f)?),
            Projection::Record(plan) => Projection::Record(plan.try_map(&mut f)?),
            Projection::Opt(p) => Projection::Opt(p.try_map(&mut f)?),
            Projection::Star(p) => Projection::Star(p.try_map(&mut f)?),
            Projection::Plus(p) => Projection::Plus(p.try_map(&mut f)?),
            Projection::Series(lit) => Projection::Series(lit),
        };
        Ok(Projector {
            rule: self.rule,
            nonempty: self.nonempty,
            projection,
        })
    }
}

/// Emit the terminalizer binding for a single rule.
pub fn compile_projection(
    types: &dyn TypeLayer,
    binder: &mut Binder,
    grammar: &Grammar,
    analysis: &Analysis,
    id: RuleId,
) -> Result<Binding<Projector<Ident>>> {
    let rule = lookup_rule(grammar, id)?;
    let nonempty = analysis.at_least_one(id);
    let part = |binder: &mut Binder, id: RuleId| Part {
        target: binder.rule(grammar, id),
        nonempty: analysis.at_least_one(id),
    };
    let parts = |binder: &mut Binder, ids: &[RuleId]| -> Vec<Part<Ident>> {
        ids.iter().map(|id| part(binder, *id)).collect()
    };

    if !matches!(rule.ty(), RuleType::Choice(_)) {
        resolve_rule(types, rule)?;
    }
    let projection = match rule.ty() {
        RuleType::Terminal(_) => Projection::Terminal,
        RuleType::Choice(branches) => {
            let mut plans = Vec::with_capacity(branches.len());
            for branch in branches {
                resolve_branch(types, rule, branch)?;
                let plan = splice_plan(rule.name(), parts(binder, &branch.fields), nonempty)?;
                plans.push((branch.name.clone(), plan));
            }
            Projection::Choice(plans)
        }
        RuleType::Wrap(inner) => Projection::Wrap(part(binder, *inner)),
        RuleType::Record(fields) => {
            Projection::Record(splice_plan(rule.name(), parts(binder, fields), nonempty)?)
        }
        RuleType::Opt(inner) => Projection::Opt(part(binder, *inner)),
        RuleType::Star(inner) => Projection::Star(part(binder, *inner)),
        RuleType::Plus(inner) => Projection::Plus(part(binder, *inner)),
        RuleType::Series(lit) => Projection::Series(lit.clone()),
    };

    Ok(Binding::new(
        binder.rule(grammar, id),
        Projector {
            rule: rule.name().to_owned(),
            nonempty,
            projection,
        },
    ))
}

type Table = LetRec<Projector<Slot>>;

fn build(types: &dyn TypeLayer, grammar: &Grammar, roots: &[RuleId]) -> Result<Arc<Table>> {
    for root in roots {
        lookup_rule(grammar, *root)?;
    }
    let fam = families(grammar, roots);
    let analysis = Analysis::new(grammar);
    let mut binder = Binder::new();
    let mut bindings = Vec::with_capacity(fam.len());
    for id in fam.ids() {
        bindings.push(compile_projection(types, &mut binder, grammar, &analysis, *id)?);
    }
    let body = binder.rules(grammar, roots);
    let table = recursive_let(bindings, &body)?;
    debug!(
        "compiled terminalizers for {} roots over {} rules",
        roots.len(),
        table.len()
    );
    Ok(Arc::new(table))
}

/// Compile the terminalizer for `root` and everything it reaches.
pub fn compile_terminalizer(
    types: &dyn TypeLayer,
    grammar: &Grammar,
    root: RuleId,
) -> Result<Terminalizer> {
    let table = build(types, grammar, &[root])?;
    let root = table.body()[0];
    Ok(Terminalizer { table, root })
}

/// Compile terminalizers for several roots over one shared table, in root
/// order.
pub fn compile_terminalizers(
    types: &dyn TypeLayer,
    grammar: &Grammar,
    roots: &[RuleId],
) -> Result<Vec<Terminalizer>> {
    let table = build(types, grammar, roots)?;
    Ok(table
        .body()
        .iter()
        .map(|slot| Terminalizer {
            table: Arc::clone(&table),
            root: *slot,
        })
        .collect())
}

/// Maps values of one rule back to their tokens.
#[derive(Clone)]
pub struct Terminalizer {
    table: Arc<Table>,
    root: Slot,
}

impl fmt::Debug for Terminalizer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Terminalizer")
            .field("rule", &self.rule())
            .field("nonempty", &self.nonempty())
            .finish()
    }
}

type Run<T> = std::result::Result<T, TerminalizeError>;

/// Pending work of one `terminalize` call.
enum Step<'t, 'v> {
    Enter(Slot, &'v Value),
    /// Combine the last `n` results into the one for `value`.
    Leave {
        slot: Slot,
        value: &'v Value,
        plan: Option<&'t Splice<Slot>>,
        n: usize,
    },
}

fn flatten<I>(results: I) -> Vec<Token>
where
    I: IntoIterator<Item = Terminals>,
{
    results.into_iter().flat_map(Terminals::into_vec).collect()
}

impl Terminalizer {
    pub fn rule(&self) -> &str {
        &self.table.get(self.root).rule
    }

    /// Whether every result is `Terminals::Nonempty`.
    pub fn nonempty(&self) -> bool {
        self.table.get(self.root).nonempty
    }

    /// Walks the value with an explicit stack, so nesting depth is bounded
    /// by memory rather than the call stack.
    pub fn terminalize(&self, value: &Value) -> Run<Terminals> {
        let mut steps = vec![Step::Enter(self.root, value)];
        let mut done: Vec<Terminals> = Vec::new();
        while let Some(step) = steps.pop() {
            match step {
                Step::Enter(slot, value) => self.enter(slot, value, &mut steps)?,
                Step::Leave {
                    slot,
                    value,
                    plan,
                    n,
                } => {
                    let parts = done.split_off(done.len() - n);
                    done.push(self.leave(slot, value, plan, parts)?);
                }
            }
        }
        done.pop().ok_or_else(|| TerminalizeError::Inconsistent {
            rule: self.rule().to_owned(),
        })
    }

    /// Check `value` against the projector for `slot` and schedule its
    /// children.
    fn enter<'t, 'v>(
        &'t self,
        slot: Slot,
        value: &'v Value,
        steps: &mut Vec<Step<'t, 'v>>,
    ) -> Run<()> {
        let p = self.table.get(slot);
        let unexpected = || TerminalizeError::UnexpectedValue {
            expected: format!("{} '{}'", p.projection.kind(), p.rule),
            found: format!("{} '{}'", value.kind(), value.rule()),
        };
        if value.rule() != p.rule {
            return Err(unexpected());
        }

        let mut plan = None;
        let children: Vec<(Slot, &'v Value)> = match (&p.projection, value) {
            (Projection::Terminal, Value::Terminal { .. })
            | (Projection::Series(_), Value::Series { .. }) => Vec::new(),
            (Projection::Choice(branches), Value::Branch { branch, fields, .. }) => {
                let (_, found) = branches.iter().find(|(name, _)| name == branch).ok_or_else(|| {
                    TerminalizeError::UnknownBranch {
                        rule: p.rule.clone(),
                        branch: branch.clone(),
                    }
                })?;
                plan = Some(found);
                fields_of(&p.rule, found, fields)?
            }
            (Projection::Record(found), Value::Record { fields, .. }) => {
                plan = Some(found);
                fields_of(&p.rule, found, fields)?
            }
            (Projection::Wrap(part), Value::Wrap { inner, .. }) => vec![(part.target, &**inner)],
            (Projection::Opt(part), Value::Opt { inner, .. }) => {
                inner.iter().map(|v| (part.target, &**v)).collect()
            }
            (Projection::Star(part), Value::Star { items, .. }) => {
                items.iter().map(|v| (part.target, v)).collect()
            }
            (Projection::Plus(part), Value::Plus { head, tail, .. }) => std::iter::once(&**head)
                .chain(tail.iter())
                .map(|v| (part.target, v))
                .collect(),
            _ => return Err(unexpected()),
        };

        steps.push(Step::Leave {
            slot,
            value,
            plan,
            n: children.len(),
        });
        steps.extend(children.into_iter().rev().map(|(s, v)| Step::Enter(s, v)));
        Ok(())
    }

    /// Combine the results of a value's children, in field order.
    fn leave(
        &self,
        slot: Slot,
        value: &Value,
        plan: Option<&Splice<Slot>>,
        mut parts: Vec<Terminals>,
    ) -> Run<Terminals> {
        let p = self.table.get(slot);
        let inconsistent = || TerminalizeError::Inconsistent {
            rule: p.rule.clone(),
        };

        let out = match (&p.projection, value, plan) {
            (_, _, Some(plan)) => splice(plan, parts).ok_or_else(inconsistent)?,
            (Projection::Terminal, Value::Terminal { token, .. }, _) => {
                Terminals::Nonempty(NonEmpty::new(*token))
            }
            (Projection::Series(lit), Value::Series { tokens, .. }, _) => {
                if !tokens.iter().map(|t| t.ch).eq(lit.chars()) {
                    return Err(inconsistent());
                }
                match NonEmpty::from_vec(tokens.clone()) {
                    Some(n) => Terminals::Nonempty(n),
                    None => Terminals::Possibly(Vec::new()),
                }
            }
            (Projection::Star(_), _, _) => Terminals::Possibly(flatten(parts)),
            (Projection::Plus(_), _, _) => {
                let rest = flatten(parts.split_off(parts.len().min(1)));
                match parts.pop() {
                    Some(Terminals::Nonempty(head)) => Terminals::Nonempty(head.append(rest)),
                    Some(Terminals::Possibly(mut head)) => {
                        head.extend(rest);
                        Terminals::Possibly(head)
                    }
                    None => Terminals::Possibly(rest),
                }
            }
            // wrap and opt pass their single result through
            _ => parts.pop().unwrap_or(Terminals::Possibly(Vec::new())),
        };

        match (p.nonempty, out) {
            (true, out @ Terminals::Nonempty(_)) => Ok(out),
            (true, Terminals::Possibly(_)) => Err(inconsistent()),
            (false, out) => Ok(out.widen()),
        }
    }
}

/// Pair each field with the terminalizer planned for it.
fn fields_of<'t, 'v>(
    rule: &str,
    plan: &'t Splice<Slot>,
    fields: &'v [Value],
) -> Run<Vec<(Slot, &'v Value)>> {
    if plan.arity() != fields.len() {
        return Err(TerminalizeError::ArityMismatch {
            rule: rule.to_owned(),
            expected: plan.arity(),
            found: fields.len(),
        });
    }
    Ok(plan
        .parts()
        .into_iter()
        .zip(fields)
        .map(|(part, v)| (part.target, v))
        .collect())
}

/// Join field results as `plan` says. `None` when the pivot came back
/// possibly empty.
fn splice(plan: &Splice<Slot>, mut parts: Vec<Terminals>) -> Option<Terminals> {
    match plan {
        Splice::Flat(_) => Some(Terminals::Possibly(flatten(parts))),
        Splice::Pivot { before, .. } => {
            let after = parts.split_off(before.len() + 1);
            let pivot = match parts.pop()? {
                Terminals::Nonempty(n) => n,
                Terminals::Possibly(_) => return None,
            };
            Some(Terminals::Nonempty(
                pivot.prepend(flatten(parts)).append(flatten(after)),
            ))
        }
    }
}
