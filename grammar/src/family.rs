use std::collections::HashSet;

use crate::{Grammar, Rule, RuleId};

/// A set of rules closed under reachability, ordered by first discovery.
///
/// The order only affects the order in which rules get declared downstream,
/// never what they mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Family {
    members: Vec<RuleId>,
    seen: HashSet<RuleId>,
}

impl Family {
    fn new() -> Self {
        Family {
            members: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Depth first walk from `root`, skipping anything already present and
    /// ids `grammar` never issued.
    fn extend(&mut self, grammar: &Grammar, root: RuleId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let rule = match grammar.get(id) {
                Some(rule) => rule,
                None => continue,
            };
            if !self.seen.insert(id) {
                continue;
            }
            self.members.push(id);
            let children = rule.children();
            stack.extend(children.into_iter().rev().filter(|c| !self.seen.contains(c)));
        }
    }

    pub fn contains(&self, id: RuleId) -> bool {
        self.seen.contains(&id)
    }

    pub fn ids(&self) -> &[RuleId] {
        &self.members
    }

    pub fn rules<'g>(&'g self, grammar: &'g Grammar) -> impl Iterator<Item = (RuleId, &'g Rule)> {
        self.members.iter().map(move |id| (*id, grammar.rule(*id)))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// `root` plus every rule transitively reachable from it, each once.
pub fn family(grammar: &Grammar, root: RuleId) -> Family {
    families(grammar, &[root])
}

/// Union of the families of `roots`, keeping first-discovery order.
pub fn families(grammar: &Grammar, roots: &[RuleId]) -> Family {
    let mut fam = Family::new();
    for root in roots {
        fam.extend(grammar, *root);
    }
    fam
}
