//! Parse results as the chart holds them.
//!
//! Derivations are shared through `Rc`, so handing a memoized result to
//! another caller costs a pointer copy. Constructors are only applied once a
//! complete parse has been chosen, by `Node::build`.

use std::rc::Rc;

use crate::{Constructor, Sem, Token, Value};

/// A constructor waiting to be applied to its arguments.
#[derive(Debug)]
pub(crate) struct Node<'r> {
    ctor: &'r Constructor,
    args: Deriv<'r>,
}

#[derive(Debug, Clone)]
pub(crate) enum Deriv<'r> {
    Token(Token),
    Tokens(Rc<[Token]>),
    Node(Rc<Node<'r>>),
    Fields(Rc<[Rc<Node<'r>>]>),
    Nothing,
    Just(Rc<Node<'r>>),
    List(Items<'r>),
    Pair(Rc<Node<'r>>, Items<'r>),
}

/// A list of nodes.
///
/// Lists built by a repetition loop live on a shared `Trail`: every element
/// records its predecessor, so each prefix the loop reached is one index.
#[derive(Debug, Clone)]
pub(crate) enum Items<'r> {
    Owned(Rc<[Rc<Node<'r>>]>),
    Trail(Rc<Trail<'r>>, Option<usize>),
}

#[derive(Debug, Default)]
pub(crate) struct Trail<'r> {
    steps: Vec<(Rc<Node<'r>>, Option<usize>)>,
}

impl<'r> Trail<'r> {
    /// Record `node` following the step `prev`, returning the new step.
    pub(crate) fn push(&mut self, node: Rc<Node<'r>>, prev: Option<usize>) -> usize {
        self.steps.push((node, prev));
        self.steps.len() - 1
    }
}

impl<'r> Items<'r> {
    pub(crate) fn empty() -> Self {
        Items::Owned(Rc::from(Vec::new()))
    }

    pub(crate) fn cons(&self, head: Rc<Node<'r>>) -> Self {
        let mut items = Vec::with_capacity(self.len() + 1);
        items.push(head);
        items.extend(self.to_vec());
        Items::Owned(items.into())
    }

    fn len(&self) -> usize {
        match self {
            Items::Owned(items) => items.len(),
            Items::Trail(trail, at) => {
                let mut n = 0;
                let mut cur = *at;
                while let Some(i) = cur {
                    n += 1;
                    cur = trail.steps[i].1;
                }
                n
            }
        }
    }

    pub(crate) fn to_vec(&self) -> Vec<Rc<Node<'r>>> {
        match self {
            Items::Owned(items) => items.to_vec(),
            Items::Trail(trail, at) => {
                let mut out = Vec::new();
                let mut cur = *at;
                while let Some(i) = cur {
                    let (node, prev) = &trail.steps[i];
                    out.push(Rc::clone(node));
                    cur = *prev;
                }
                out.reverse();
                out
            }
        }
    }
}

impl<'r> Deriv<'r> {
    fn children(&self) -> Vec<Rc<Node<'r>>> {
        match self {
            Deriv::Token(_) | Deriv::Tokens(_) | Deriv::Nothing => Vec::new(),
            Deriv::Node(node) | Deriv::Just(node) => vec![Rc::clone(node)],
            Deriv::Fields(fields) => fields.to_vec(),
            Deriv::List(items) => items.to_vec(),
            Deriv::Pair(head, items) => {
                let mut out = vec![Rc::clone(head)];
                out.extend(items.to_vec());
                out
            }
        }
    }

    /// Reassemble the semantic value from the built children, in the order
    /// `children` listed them.
    fn sem(&self, children: Vec<Value>) -> Option<Sem> {
        let mut children = children.into_iter();
        let sem = match self {
            Deriv::Token(tok) => Sem::Token(*tok),
            Deriv::Tokens(toks) => Sem::Tokens(toks.to_vec()),
            Deriv::Nothing => Sem::Nothing,
            Deriv::Node(_) => Sem::Node(children.next()?),
            Deriv::Just(_) => Sem::Just(children.next()?),
            Deriv::Fields(_) => Sem::Fields(children.collect()),
            Deriv::List(_) => Sem::List(children.collect()),
            Deriv::Pair(..) => {
                let head = children.next()?;
                Sem::Pair(head, children.collect())
            }
        };
        Some(sem)
    }
}

/// Whether `ctor` accepts `args`. Agrees with `Constructor::apply`.
fn fits(ctor: &Constructor, args: &Deriv) -> bool {
    match (ctor, args) {
        (Constructor::Terminal { .. }, Deriv::Token(_)) => true,
        (Constructor::Branch { arity, .. }, Deriv::Fields(fields))
        | (Constructor::Record { arity, .. }, Deriv::Fields(fields)) => fields.len() == *arity,
        (Constructor::Wrap { .. }, Deriv::Node(_)) => true,
        (Constructor::Opt { .. }, Deriv::Nothing) | (Constructor::Opt { .. }, Deriv::Just(_)) => true,
        (Constructor::Star { .. }, Deriv::List(_)) => true,
        (Constructor::Plus { .. }, Deriv::Pair(..)) => true,
        (Constructor::Series { .. }, Deriv::Tokens(_)) => true,
        _ => false,
    }
}

enum Step<'r> {
    Enter(Rc<Node<'r>>),
    Leave(Rc<Node<'r>>, usize),
}

impl<'r> Node<'r> {
    /// `None` when `args` do not have the shape `ctor` expects.
    pub(crate) fn new(ctor: &'r Constructor, args: Deriv<'r>) -> Option<Rc<Self>> {
        if fits(ctor, &args) {
            Some(Rc::new(Node { ctor, args }))
        } else {
            None
        }
    }

    /// Apply every pending constructor under `root`, children first. Walks an
    /// explicit stack so deeply nested values do not exhaust the call stack.
    /// Fails with the constructor that rejected its arguments.
    pub(crate) fn build(root: &Rc<Node<'r>>) -> Result<Value, Constructor> {
        let mut steps = vec![Step::Enter(Rc::clone(root))];
        let mut built: Vec<Value> = Vec::new();
        while let Some(step) = steps.pop() {
            match step {
                Step::Enter(node) => {
                    let children = node.args.children();
                    steps.push(Step::Leave(Rc::clone(&node), children.len()));
                    steps.extend(children.into_iter().rev().map(Step::Enter));
                }
                Step::Leave(node, n) => {
                    let children = built.split_off(built.len() - n);
                    let value = node
                        .args
                        .sem(children)
                        .and_then(|sem| node.ctor.apply(sem))
                        .ok_or_else(|| node.ctor.clone())?;
                    built.push(value);
                }
            }
        }
        built.pop().ok_or_else(|| root.ctor.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    fn digit(ctor: &Constructor, ch: char) -> Rc<Node> {
        Node::new(ctor, Deriv::Token(Token::new(ch, Position::start()))).unwrap()
    }

    #[test]
    fn trail_prefixes() {
        let d = Constructor::Terminal {
            rule: "digit".into(),
        };
        let mut trail = Trail::default();
        let a = trail.push(digit(&d, '1'), None);
        let b = trail.push(digit(&d, '2'), Some(a));
        let trail = Rc::new(trail);

        let star = Constructor::Star { rule: "ds".into() };
        let full = Node::new(&star, Deriv::List(Items::Trail(Rc::clone(&trail), Some(b)))).unwrap();
        assert_eq!(Node::build(&full).unwrap().to_string(), "['1' '2']");

        let none = Node::new(&star, Deriv::List(Items::Trail(trail, None))).unwrap();
        assert_eq!(Node::build(&none).unwrap().to_string(), "[]");
    }

    #[test]
    fn shape_checked_on_construction() {
        let pair = Constructor::Record {
            rule: "pair".into(),
            arity: 2,
        };
        assert!(Node::new(&pair, Deriv::Fields(Rc::from(Vec::new()))).is_none());
        assert!(Node::new(&pair, Deriv::Nothing).is_none());
    }

    #[test]
    fn deep_values_build_without_recursion() {
        let leaf = Constructor::Terminal { rule: "x".into() };
        let wrap = Constructor::Wrap { rule: "w".into() };
        let mut node = digit(&leaf, 'x');
        for _ in 0..100_000 {
            node = Node::new(&wrap, Deriv::Node(node)).unwrap();
        }
        let mut value = Node::build(&node).unwrap();
        let mut depth = 0;
        while let Value::Wrap { inner, .. } = value {
            value = *inner;
            depth += 1;
        }
        assert_eq!(depth, 100_000);
        // Unwind the Rc chain iteratively as well.
        while let Ok(Node {
            args: Deriv::Node(inner),
            ..
        }) = Rc::try_unwrap(node)
        {
            node = inner;
        }
    }
}
