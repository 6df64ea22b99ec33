use std::collections::{BTreeSet, HashMap, HashSet};
use std::mem;
use std::rc::Rc;

use log::trace;

use crate::error::ParseError;
use crate::forest::{Deriv, Items, Node, Trail};
use crate::{Constructor, Expr, Handle, Token, Value};

/// Registry of rules that may refer to each other before they are defined.
///
/// Rules are allocated with `declare` and patched with `define`, so a body can
/// mention any handle, including its own.
#[derive(Debug, Default, Clone)]
pub struct Rules {
    defs: Vec<Option<Expr<Handle>>>,
}

impl Rules {
    pub fn new() -> Self {
        Rules { defs: Vec::new() }
    }

    /// Allocate a handle whose body will be provided later.
    pub fn declare(&mut self) -> Handle {
        let handle = Handle(self.defs.len());
        self.defs.push(None);
        handle
    }

    /// Provide the body for a previously declared handle, replacing any
    /// earlier body. Fails for handles this registry never issued.
    pub fn define(&mut self, handle: Handle, expr: Expr<Handle>) -> Result<(), ParseError> {
        match self.defs.get_mut(handle.0) {
            Some(def) => {
                *def = Some(expr);
                Ok(())
            }
            None => Err(ParseError::UnknownHandle { handle }),
        }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn get(&self, handle: Handle) -> Option<&Expr<Handle>> {
        self.defs.get(handle.0).and_then(|d| d.as_ref())
    }

    /// Parse the entire token stream with the rule bound to `root`.
    ///
    /// # Examples
    ///
    /// ```
    /// use parsegen::{Constructor, Expr, Predicate, Rules, Token};
    ///
    /// let mut rules = Rules::new();
    /// let digit = rules.declare();
    /// rules
    ///     .define(
    ///         digit,
    ///         Expr::map(
    ///             Constructor::Terminal { rule: "digit".into() },
    ///             Expr::MatchOne(Predicate::Digit),
    ///         ),
    ///     )
    ///     .unwrap();
    ///
    /// let value = rules.parse_tokens(digit, &Token::stream("7")).unwrap();
    /// assert_eq!(value.rule(), "digit");
    /// assert!(rules.parse_tokens(digit, &Token::stream("x")).is_err());
    /// ```
    pub fn parse_tokens(&self, root: Handle, tokens: &[Token]) -> Result<Value, ParseError> {
        if root.0 >= self.defs.len() {
            return Err(ParseError::UnknownHandle { handle: root });
        }
        if let Some(idx) = self.defs.iter().position(|d| d.is_none()) {
            return Err(ParseError::Undefined {
                handle: Handle(idx),
            });
        }

        let mut chart = Chart::new(self, tokens);
        let results = chart.call(root, 0);
        if let Some(constructor) = chart.mismatch.take() {
            return Err(ParseError::ShapeMismatch { constructor });
        }

        let complete = results
            .iter()
            .find(|(end, _)| *end == tokens.len())
            .map(|(_, deriv)| deriv);
        match complete {
            Some(Deriv::Node(node)) => {
                Node::build(node).map_err(|constructor| ParseError::ShapeMismatch { constructor })
            }
            Some(_) => Err(ParseError::Unexpected {
                position: None,
                found: None,
                expected: vec!["a labeled rule at the root".to_owned()],
            }),
            None => Err(chart.failure()),
        }
    }
}

type Key = (Handle, usize);

/// Results of running a parser from one start position: at most one
/// derivation per end position, in the order they were found.
type Results<'r> = Vec<(usize, Deriv<'r>)>;

/// Collects results, keeping the first derivation to reach each end.
#[derive(Default)]
struct Collect<'r> {
    out: Results<'r>,
    ends: HashSet<usize>,
}

impl<'r> Collect<'r> {
    fn push(&mut self, end: usize, deriv: Deriv<'r>) {
        if self.ends.insert(end) {
            self.out.push((end, deriv));
        }
    }
}

struct Entry<'r> {
    results: Rc<Results<'r>>,
    /// Growing rules whose approximations these results were computed from.
    deps: Vec<Key>,
}

/// Approximation of a rule that is being computed and has been reached again
/// from inside its own body.
struct Seed<'r> {
    results: Rc<Results<'r>>,
    deps: Vec<Key>,
    reentered: bool,
}

/// One parse of one input.
///
/// Memoizes results per (rule, start). A rule reached again from inside its
/// own body at the same start reads its current approximation, initially
/// empty; the body is then re-run with the larger approximation until no new
/// end position appears. End sets only grow and are bounded by the input
/// length, so this terminates on left-recursive and nullable-cyclic grammars.
/// Entries computed from an approximation are dropped before each re-run.
struct Chart<'r, 't> {
    rules: &'r Rules,
    input: &'t [Token],
    memo: HashMap<Key, Entry<'r>>,
    growing: HashMap<Key, Seed<'r>>,
    /// Memo entries with dependencies on growing rules.
    provisional: Vec<Key>,
    /// Dependencies of the entry currently being computed.
    deps: Vec<Key>,
    furthest: usize,
    expected: BTreeSet<String>,
    mismatch: Option<Constructor>,
}

impl<'r, 't> Chart<'r, 't> {
    fn new(rules: &'r Rules, input: &'t [Token]) -> Self {
        Chart {
            rules,
            input,
            memo: HashMap::new(),
            growing: HashMap::new(),
            provisional: Vec::new(),
            deps: Vec::new(),
            furthest: 0,
            expected: BTreeSet::new(),
            mismatch: None,
        }
    }

    fn call(&mut self, handle: Handle, start: usize) -> Rc<Results<'r>> {
        let key = (handle, start);
        if let Some(entry) = self.memo.get(&key) {
            let results = Rc::clone(&entry.results);
            let deps = entry.deps.clone();
            self.depend(&deps);
            return results;
        }
        if let Some(seed) = self.growing.get_mut(&key) {
            seed.reentered = true;
            let results = Rc::clone(&seed.results);
            let mut deps = seed.deps.clone();
            deps.push(key);
            self.depend(&deps);
            return results;
        }

        let rules = self.rules;
        let body = match rules.get(handle) {
            Some(body) => body,
            None => return Rc::new(Vec::new()),
        };

        self.growing.insert(
            key,
            Seed {
                results: Rc::new(Vec::new()),
                deps: Vec::new(),
                reentered: false,
            },
        );
        let outer = mem::take(&mut self.deps);
        let mut rounds = 1;
        let (results, deps) = loop {
            let results = Rc::new(self.body(handle, body, start));
            let mut deps = mem::take(&mut self.deps);
            deps.retain(|k| *k != key);
            let seed = match self.growing.get_mut(&key) {
                Some(seed) if seed.reentered && grew(&seed.results, &results) => seed,
                _ => break (results, deps),
            };
            seed.results = Rc::clone(&results);
            seed.deps = deps;
            seed.reentered = false;
            rounds += 1;
            self.forget(key);
        };
        self.growing.remove(&key);
        if rounds > 1 {
            trace!("rule {} at {} settled after {} rounds", handle, start, rounds);
        }

        self.deps = outer;
        self.depend(&deps);
        if !deps.is_empty() {
            self.provisional.push(key);
        }
        self.memo.insert(
            key,
            Entry {
                results: Rc::clone(&results),
                deps,
            },
        );
        results
    }

    fn body(&mut self, handle: Handle, body: &'r Expr<Handle>, start: usize) -> Results<'r> {
        match repeated_item(handle, body) {
            Some(item) => self.repeat(item, start),
            None => self.eval(body, start).to_vec(),
        }
    }

    /// Record that the entry being computed depends on `deps`. Rules that
    /// have finished growing are no longer tracked.
    fn depend(&mut self, deps: &[Key]) {
        for key in deps {
            if self.growing.contains_key(key) && !self.deps.contains(key) {
                self.deps.push(*key);
            }
        }
    }

    /// Drop memo entries computed from `key`'s previous approximation.
    fn forget(&mut self, key: Key) {
        let memo = &mut self.memo;
        self.provisional.retain(|k| {
            let stale = memo.get(k).map(|entry| entry.deps.contains(&key));
            match stale {
                Some(true) => {
                    memo.remove(k);
                    false
                }
                Some(false) => true,
                None => false,
            }
        });
    }

    /// Run a repetition loop without recursing per iteration.
    ///
    /// Positions are explored depth first in the order the item produces
    /// them, and each end keeps the first list that reached it. An iteration
    /// that consumes nothing is not repeated.
    fn repeat(&mut self, item: &'r Expr<Handle>, start: usize) -> Results<'r> {
        let mut trail = Trail::default();
        let mut reached = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![(start, None)];
        while let Some((pos, at)) = stack.pop() {
            if !seen.insert(pos) {
                continue;
            }
            reached.push((pos, at));
            let found = self.eval(item, pos);
            for (end, deriv) in found.iter().rev() {
                if *end == pos {
                    continue;
                }
                if let Deriv::Node(node) = deriv {
                    let step = trail.push(Rc::clone(node), at);
                    stack.push((*end, Some(step)));
                }
            }
        }

        let trail = Rc::new(trail);
        reached
            .into_iter()
            .map(|(end, at)| (end, Deriv::List(Items::Trail(Rc::clone(&trail), at))))
            .collect()
    }

    fn eval(&mut self, expr: &'r Expr<Handle>, start: usize) -> Rc<Results<'r>> {
        let results = match expr {
            Expr::Ref(handle) => return self.call(*handle, start),
            Expr::MatchOne(pred) => match self.input.get(start) {
                Some(tok) if pred.test(tok.ch) => vec![(start + 1, Deriv::Token(*tok))],
                _ => {
                    self.expect(start, pred.to_string());
                    Vec::new()
                }
            },
            Expr::Symbol(literal) => {
                let mut matched = Vec::new();
                for (i, ch) in literal.chars().enumerate() {
                    match self.input.get(start + i) {
                        Some(tok) if tok.ch == ch => matched.push(*tok),
                        _ => {
                            self.expect(start + i, format!("{:?}", literal));
                            return Rc::new(Vec::new());
                        }
                    }
                }
                vec![(start + matched.len(), Deriv::Tokens(matched.into()))]
            }
            Expr::Unit => vec![(start, Deriv::Fields(Rc::from(Vec::new())))],
            Expr::Nothing => vec![(start, Deriv::Nothing)],
            Expr::Nil => vec![(start, Deriv::List(Items::empty()))],
            Expr::Just(inner) => self
                .eval(inner, start)
                .iter()
                .filter_map(|(end, deriv)| match deriv {
                    Deriv::Node(node) => Some((*end, Deriv::Just(Rc::clone(node)))),
                    _ => None,
                })
                .collect(),
            Expr::Alt(a, b) => {
                let mut out = Collect::default();
                for (end, deriv) in self.eval(a, start).iter() {
                    out.push(*end, deriv.clone());
                }
                for (end, deriv) in self.eval(b, start).iter() {
                    out.push(*end, deriv.clone());
                }
                out.out
            }
            Expr::Seq(exprs) => {
                let mut partial: Vec<(usize, Vec<Rc<Node<'r>>>)> = vec![(start, Vec::new())];
                for e in exprs {
                    let mut next = Vec::new();
                    let mut ends = HashSet::new();
                    for (pos, acc) in &partial {
                        for (end, deriv) in self.eval(e, *pos).iter() {
                            if let Deriv::Node(node) = deriv {
                                if ends.insert(*end) {
                                    let mut fields = acc.clone();
                                    fields.push(Rc::clone(node));
                                    next.push((*end, fields));
                                }
                            }
                        }
                    }
                    if next.is_empty() {
                        return Rc::new(Vec::new());
                    }
                    partial = next;
                }
                partial
                    .into_iter()
                    .map(|(end, fields)| (end, Deriv::Fields(fields.into())))
                    .collect()
            }
            Expr::Cons(head, tail) | Expr::Pair(head, tail) => {
                let pairing = matches!(expr, Expr::Pair(..));
                let mut out = Collect::default();
                for (mid, head_deriv) in self.eval(head, start).iter() {
                    let node = match head_deriv {
                        Deriv::Node(node) => node,
                        _ => continue,
                    };
                    for (end, tail_deriv) in self.eval(tail, *mid).iter() {
                        let items = match tail_deriv {
                            Deriv::List(items) => items,
                            _ => continue,
                        };
                        let deriv = if pairing {
                            Deriv::Pair(Rc::clone(node), items.clone())
                        } else {
                            Deriv::List(items.cons(Rc::clone(node)))
                        };
                        out.push(*end, deriv);
                    }
                }
                out.out
            }
            Expr::Map(ctor, inner) => {
                let mut out = Vec::new();
                for (end, deriv) in self.eval(inner, start).iter() {
                    match Node::new(ctor, deriv.clone()) {
                        Some(node) => out.push((*end, Deriv::Node(node))),
                        None => {
                            if self.mismatch.is_none() {
                                self.mismatch = Some(ctor.clone());
                            }
                        }
                    }
                }
                out
            }
            Expr::Label(desc, inner) => {
                let out = self.eval(inner, start);
                if out.is_empty() {
                    self.expect(start, desc.clone());
                }
                return out;
            }
        };
        Rc::new(results)
    }

    /// Record what would have been accepted at `pos`, keeping only the
    /// furthest position reached.
    fn expect(&mut self, pos: usize, what: String) {
        if pos > self.furthest {
            self.furthest = pos;
            self.expected.clear();
        }
        if pos == self.furthest {
            self.expected.insert(what);
        }
    }

    fn failure(&self) -> ParseError {
        // Any end a rule reached is at least as far as the recorded failure
        // when the grammar simply stopped short of the input.
        let reached = self
            .memo
            .values()
            .flat_map(|entry| entry.results.iter().map(|(end, _)| *end))
            .max()
            .unwrap_or(0);
        let (pos, expected) = if reached > self.furthest {
            (reached, vec!["end of input".to_owned()])
        } else {
            (self.furthest, self.expected.iter().cloned().collect())
        };
        let tok = self.input.get(pos);
        ParseError::Unexpected {
            position: tok.map(|t| t.position),
            found: tok.map(|t| t.ch),
            expected,
        }
    }
}

/// The item of a rule shaped `alt(nil, cons(item, self))`: the accumulation
/// loop behind repetition, which the chart runs iteratively.
fn repeated_item(handle: Handle, body: &Expr<Handle>) -> Option<&Expr<Handle>> {
    match body {
        Expr::Alt(nil, rest) if **nil == Expr::Nil => match &**rest {
            Expr::Cons(item, tail) if **tail == Expr::Ref(handle) => Some(&**item),
            _ => None,
        },
        _ => None,
    }
}

fn grew(before: &Results, after: &Results) -> bool {
    let known: HashSet<usize> = before.iter().map(|(end, _)| *end).collect();
    after.iter().any(|(end, _)| !known.contains(end))
}
