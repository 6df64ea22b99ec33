use std::convert::Infallible;
use std::fmt::{self, Display};

use crate::{Constructor, Predicate};

/// A deferred rule handle. Handles are allocated before their bodies exist so
/// that rules can refer to each other, and to themselves, freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub(crate) usize);

impl Handle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A composed parser. `R` is what a reference to another rule looks like: the
/// compiler builds expressions over its own identifiers, the engine runs them
/// over `Handle`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr<R> {
    /// Run the rule bound to `R`.
    Ref(R),
    /// Match exactly one token satisfying the predicate.
    MatchOne(Predicate),
    /// Match an exact run of chars as one unit.
    Symbol(String),
    /// Succeed without consuming, producing no fields.
    Unit,
    /// Succeed without consuming, producing an absent optional.
    Nothing,
    /// Succeed without consuming, producing an empty list.
    Nil,
    Just(Box<Expr<R>>),
    /// Ordered choice. Both sides are explored; the engine decides which
    /// result survives for a given span.
    Alt(Box<Expr<R>>, Box<Expr<R>>),
    /// Applicative chain collecting one value per element.
    Seq(Vec<Expr<R>>),
    /// Prepend the first value onto the list produced by the second.
    Cons(Box<Expr<R>>, Box<Expr<R>>),
    /// Pair the first value with the list produced by the second.
    Pair(Box<Expr<R>>, Box<Expr<R>>),
    Map(Constructor, Box<Expr<R>>),
    /// Description used for diagnostics only.
    Label(String, Box<Expr<R>>),
}

impl<R> Expr<R> {
    pub fn alt(a: Expr<R>, b: Expr<R>) -> Self {
        Expr::Alt(Box::new(a), Box::new(b))
    }

    pub fn map(ctor: Constructor, e: Expr<R>) -> Self {
        Expr::Map(ctor, Box::new(e))
    }

    pub fn label(desc: impl Into<String>, e: Expr<R>) -> Self {
        Expr::Label(desc.into(), Box::new(e))
    }

    pub fn just(e: Expr<R>) -> Self {
        Expr::Just(Box::new(e))
    }

    pub fn cons(head: Expr<R>, tail: Expr<R>) -> Self {
        Expr::Cons(Box::new(head), Box::new(tail))
    }

    pub fn pair(head: Expr<R>, tail: Expr<R>) -> Self {
        Expr::Pair(Box::new(head), Box::new(tail))
    }

    /// Every reference in the expression, in order of appearance.
    pub fn refs(&self) -> Vec<&R> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a R>) {
        match self {
            Expr::Ref(r) => out.push(r),
            Expr::MatchOne(_) | Expr::Symbol(_) | Expr::Unit | Expr::Nothing | Expr::Nil => (),
            Expr::Just(e) | Expr::Map(_, e) | Expr::Label(_, e) => e.collect_refs(out),
            Expr::Alt(a, b) | Expr::Cons(a, b) | Expr::Pair(a, b) => {
                a.collect_refs(out);
                b.collect_refs(out);
            }
            Expr::Seq(es) => {
                for e in es {
                    e.collect_refs(out);
                }
            }
        }
    }

    /// Rewrite every reference, failing on the first one `f` rejects.
    pub fn try_map_refs<S, E, F>(self, f: &mut F) -> Result<Expr<S>, E>
    where
        F: FnMut(R) -> Result<S, E>,
    {
        let expr = match self {
            Expr::Ref(r) => Expr::Ref(f(r)?),
            Expr::MatchOne(p) => Expr::MatchOne(p),
            Expr::Symbol(s) => Expr::Symbol(s),
            Expr::Unit => Expr::Unit,
            Expr::Nothing => Expr::Nothing,
            Expr::Nil => Expr::Nil,
            Expr::Just(e) => Expr::just(e.try_map_refs(f)?),
            Expr::Alt(a, b) => Expr::alt(a.try_map_refs(f)?, b.try_map_refs(f)?),
            Expr::Seq(es) => Expr::Seq(
                es.into_iter()
                    .map(|e| e.try_map_refs(f))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Cons(a, b) => Expr::cons(a.try_map_refs(f)?, b.try_map_refs(f)?),
            Expr::Pair(a, b) => Expr::pair(a.try_map_refs(f)?, b.try_map_refs(f)?),
            Expr::Map(c, e) => Expr::map(c, e.try_map_refs(f)?),
            Expr::Label(l, e) => Expr::label(l, e.try_map_refs(f)?),
        };
        Ok(expr)
    }

    pub fn map_refs<S, F>(self, mut f: F) -> Expr<S>
    where
        F: FnMut(R) -> S,
    {
        match self.try_map_refs(&mut |r| Ok::<S, Infallible>(f(r))) {
            Ok(expr) => expr,
            Err(never) => match never {},
        }
    }
}

impl<R: Display> Display for Expr<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Ref(r) => write!(f, "{}", r),
            Expr::MatchOne(p) => write!(f, "match({})", p),
            Expr::Symbol(s) => write!(f, "symbol({:?})", s),
            Expr::Unit => write!(f, "pure(())"),
            Expr::Nothing => write!(f, "pure(nothing)"),
            Expr::Nil => write!(f, "pure([])"),
            Expr::Just(e) => write!(f, "just({})", e),
            Expr::Alt(a, b) => write!(f, "alt({}, {})", a, b),
            Expr::Seq(es) => {
                write!(f, "seq(")?;
                for (i, e) in es.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            Expr::Cons(a, b) => write!(f, "cons({}, {})", a, b),
            Expr::Pair(a, b) => write!(f, "pair({}, {})", a, b),
            Expr::Map(c, e) => write!(f, "map({}, {})", c, e),
            Expr::Label(l, e) => write!(f, "{} <?> {:?}", e, l),
        }
    }
}
