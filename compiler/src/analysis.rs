//! Guaranteed non-emptiness.
//!
//! A rule is classified nonempty when every value it can build terminalizes
//! to at least one token. The classification is the greatest fixpoint of the
//! structural rules below, starting from "everything is nonempty" and
//! demoting until stable, so a cycle that never bottoms out in an empty
//! alternative stays nonempty.
//!
//! | kind     | nonempty when                 |
//! |----------|-------------------------------|
//! | terminal | always                        |
//! | series   | always                        |
//! | opt      | never                         |
//! | star     | never                         |
//! | plus     | its element is                |
//! | wrap     | its inner rule is             |
//! | record   | any field is                  |
//! | choice   | every branch has a field that is |

use log::trace;

use grammar::{Grammar, RuleId, RuleType};

/// Non-emptiness classification of every rule in a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    nonempty: Vec<bool>,
}

fn step(ty: &RuleType, current: &[bool]) -> bool {
    let ne = |id: &RuleId| current[id.index()];
    match ty {
        RuleType::Terminal(_) | RuleType::Series(_) => true,
        RuleType::Opt(_) | RuleType::Star(_) => false,
        RuleType::Plus(inner) | RuleType::Wrap(inner) => ne(inner),
        RuleType::Record(fields) => fields.iter().any(ne),
        RuleType::Choice(branches) => branches.iter().all(|b| b.fields.iter().any(ne)),
    }
}

impl Analysis {
    pub fn new(grammar: &Grammar) -> Self {
        let mut nonempty = vec![true; grammar.len()];
        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut changed = false;
            for (id, rule) in grammar.iter() {
                // Values only ever go from true to false, so this terminates.
                if nonempty[id.index()] && !step(rule.ty(), &nonempty) {
                    nonempty[id.index()] = false;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        trace!("non-emptiness settled after {} rounds", rounds);
        Analysis { nonempty }
    }

    /// Ids the analyzed grammar never issued are not nonempty.
    pub fn at_least_one(&self, id: RuleId) -> bool {
        self.nonempty.get(id.index()).copied().unwrap_or(false)
    }
}

/// Whether every value of `id` is guaranteed to terminalize to at least one
/// token.
pub fn at_least_one(grammar: &Grammar, id: RuleId) -> bool {
    Analysis::new(grammar).at_least_one(id)
}
