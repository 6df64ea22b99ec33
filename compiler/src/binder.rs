//! Fresh identifiers and recursive binding groups.
//!
//! Compilers emit `(Ident, expression)` bindings where any expression may
//! mention any identifier, its own included. `recursive_let` turns such a
//! group into a table of slots in which every reference has been resolved;
//! declaration order inside the group is irrelevant.

use std::collections::HashMap;
use std::fmt::{self, Display};

use grammar::{Grammar, RuleId};
use parsegen::Expr;

use crate::error::{CompileError, Result};

/// A name issued by a `Binder`, unique within one compile call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident {
    hint: String,
    owner: String,
    id: usize,
}

impl Ident {
    /// The rule name (or helper name) this identifier was issued for.
    pub fn hint(&self) -> &str {
        &self.hint
    }

    /// The rule whose compiled form the binding belongs to. Differs from the
    /// hint for helpers.
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_{}", self.hint, self.id)
    }
}

/// Issues identifiers, remembering the one assigned to each rule so that every
/// use site of a rule refers to the same binding.
#[derive(Debug, Default)]
pub struct Binder {
    next: usize,
    rules: HashMap<RuleId, Ident>,
}

impl Binder {
    pub fn new() -> Self {
        Binder::default()
    }

    pub fn fresh(&mut self, hint: &str) -> Ident {
        self.issue(hint.to_owned(), hint.to_owned())
    }

    fn issue(&mut self, hint: String, owner: String) -> Ident {
        let ident = Ident {
            hint,
            owner,
            id: self.next,
        };
        self.next += 1;
        ident
    }

    /// The identifier bound to `id`'s compiled form, issued on first request.
    pub fn rule(&mut self, grammar: &Grammar, id: RuleId) -> Ident {
        if let Some(ident) = self.rules.get(&id) {
            return ident.clone();
        }
        let ident = self.fresh(grammar.name(id));
        self.rules.insert(id, ident.clone());
        ident
    }

    pub fn rules(&mut self, grammar: &Grammar, ids: &[RuleId]) -> Vec<Ident> {
        ids.iter().map(|id| self.rule(grammar, *id)).collect()
    }

    /// A fresh identifier for an auxiliary binding belonging to `id`.
    pub fn helper(&mut self, grammar: &Grammar, id: RuleId) -> Ident {
        let owner = grammar.name(id);
        self.issue(format!("{}_go", owner), owner.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding<E> {
    pub ident: Ident,
    pub expr: E,
}

impl<E> Binding<E> {
    pub fn new(ident: Ident, expr: E) -> Self {
        Binding { ident, expr }
    }
}

/// Position of a binding within a resolved group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(usize);

impl Slot {
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Name resolution for the binding currently being resolved.
pub struct Scope<'a> {
    owner: &'a str,
    index: &'a HashMap<Ident, Slot>,
}

impl<'a> Scope<'a> {
    pub fn lookup(&self, ident: &Ident) -> Result<Slot> {
        self.index
            .get(ident)
            .copied()
            .ok_or_else(|| CompileError::UnresolvedReference {
                rule: self.owner.to_owned(),
                reference: ident.to_string(),
            })
    }
}

/// Expressions whose identifier references can be resolved to slots.
pub trait Resolve {
    type Resolved;

    fn resolve(self, scope: &Scope) -> Result<Self::Resolved>;
}

impl Resolve for Expr<Ident> {
    type Resolved = Expr<Slot>;

    fn resolve(self, scope: &Scope) -> Result<Expr<Slot>> {
        self.try_map_refs(&mut |ident| scope.lookup(&ident))
    }
}

/// A resolved binding group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetRec<T> {
    idents: Vec<Ident>,
    slots: Vec<T>,
    body: Vec<Slot>,
}

impl<T> LetRec<T> {
    pub fn idents(&self) -> &[Ident] {
        &self.idents
    }

    pub fn slots(&self) -> &[T] {
        &self.slots
    }

    pub fn get(&self, slot: Slot) -> &T {
        &self.slots[slot.0]
    }

    /// Slots of the identifiers requested as the group's result.
    pub fn body(&self) -> &[Slot] {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn into_slots(self) -> Vec<T> {
        self.slots
    }
}

/// Bind every `(ident, expr)` pair in one group where each identifier is
/// visible to every binding and to `body`, then resolve all references.
///
/// Fails if any binding, or `body`, mentions an identifier that is not bound
/// in the group, or if an identifier is bound twice.
pub fn recursive_let<E: Resolve>(
    bindings: Vec<Binding<E>>,
    body: &[Ident],
) -> Result<LetRec<E::Resolved>> {
    let mut index = HashMap::with_capacity(bindings.len());
    for (i, b) in bindings.iter().enumerate() {
        if index.insert(b.ident.clone(), Slot(i)).is_some() {
            return Err(CompileError::DuplicateBinding {
                ident: b.ident.to_string(),
            });
        }
    }

    let mut idents = Vec::with_capacity(bindings.len());
    let mut slots = Vec::with_capacity(bindings.len());
    for b in bindings {
        let scope = Scope {
            owner: b.ident.owner(),
            index: &index,
        };
        slots.push(b.expr.resolve(&scope)?);
        idents.push(b.ident);
    }

    let scope = Scope {
        owner: "letrec body",
        index: &index,
    };
    let body = body
        .iter()
        .map(|ident| scope.lookup(ident))
        .collect::<Result<_>>()?;

    Ok(LetRec {
        idents,
        slots,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parsegen::Predicate;

    #[test]
    fn fresh_idents_are_unique() {
        let mut b = Binder::new();
        let x = b.fresh("x");
        let y = b.fresh("x");
        assert_ne!(x, y);
        assert_eq!(x.hint(), y.hint());
    }

    #[test]
    fn rule_idents_are_memoized() {
        let g: Grammar = "a = b? ; b = @any ;".parse().unwrap();
        let a = g.lookup("a").unwrap();
        let mut b = Binder::new();
        let first = b.rule(&g, a);
        let helper = b.helper(&g, a);
        assert_eq!(b.rule(&g, a), first);
        assert_ne!(helper, first);
        assert_eq!(helper.hint(), "a_go");
    }

    #[test]
    fn mutual_references_resolve() {
        let mut b = Binder::new();
        let even = b.fresh("even");
        let odd = b.fresh("odd");
        let bindings = vec![
            Binding::new(
                even.clone(),
                Expr::alt(Expr::Nil, Expr::cons(Expr::MatchOne(Predicate::Any), Expr::Ref(odd.clone()))),
            ),
            Binding::new(odd.clone(), Expr::cons(Expr::MatchOne(Predicate::Any), Expr::Ref(even.clone()))),
        ];
        let group = recursive_let(bindings, &[odd]).unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group.body(), &[Slot(1)]);
        assert_eq!(group.get(Slot(1)).refs(), vec![&Slot(0)]);
        assert_eq!(group.get(Slot(0)).refs(), vec![&Slot(1)]);
    }

    #[test]
    fn self_reference_resolves() {
        let mut b = Binder::new();
        let go = b.fresh("go");
        let bindings = vec![Binding::new(
            go.clone(),
            Expr::alt(Expr::Nil, Expr::cons(Expr::MatchOne(Predicate::Any), Expr::Ref(go.clone()))),
        )];
        let group = recursive_let(bindings, &[go]).unwrap();
        assert_eq!(group.get(Slot(0)).refs(), vec![&Slot(0)]);
    }

    #[test]
    fn unresolved_reference_names_rule() {
        let mut b = Binder::new();
        let a = b.fresh("a");
        let ghost = b.fresh("ghost");
        let bindings = vec![Binding::new(a.clone(), Expr::just(Expr::Ref(ghost)))];
        let err = recursive_let(bindings, &[a]).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnresolvedReference {
                rule: "a".into(),
                reference: "ghost_1".into(),
            }
        );
    }

    #[test]
    fn helper_failures_name_their_rule() {
        let g: Grammar = "x = y* ; y = @any ;".parse().unwrap();
        let mut b = Binder::new();
        let helper = b.helper(&g, g.lookup("x").unwrap());
        let item = b.rule(&g, g.lookup("y").unwrap());
        assert_eq!(helper.hint(), "x_go");
        assert_eq!(helper.owner(), "x");
        assert_eq!(item.owner(), "y");

        let body = Expr::alt(
            Expr::Nil,
            Expr::cons(Expr::Ref(item), Expr::Ref(helper.clone())),
        );
        let err = recursive_let(vec![Binding::new(helper.clone(), body)], &[helper]).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnresolvedReference {
                rule: "x".into(),
                reference: "y_1".into(),
            }
        );
    }

    #[test]
    fn unresolved_body() {
        let mut b = Binder::new();
        let a = b.fresh("a");
        let ghost = b.fresh("ghost");
        let bindings = vec![Binding::new(a, Expr::<Ident>::Unit)];
        let err = recursive_let(bindings, &[ghost]).unwrap_err();
        assert!(matches!(err, CompileError::UnresolvedReference { .. }));
    }

    #[test]
    fn duplicate_binding() {
        let mut b = Binder::new();
        let a = b.fresh("a");
        let bindings = vec![
            Binding::new(a.clone(), Expr::<Ident>::Unit),
            Binding::new(a.clone(), Expr::<Ident>::Nil),
        ];
        let err = recursive_let(bindings, &[a]).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateBinding { .. }));
    }
}
