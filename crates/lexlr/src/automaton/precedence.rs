//! Precedence ordering among automaton outputs.

use super::AutomatonError;
use crate::types::Set;
use std::{fmt, hash::Hash};

/// An ordered sequence of disjoint output sets.
///
/// The rank of an output is the index of the level containing it; a lower
/// rank wins. Outputs that appear in no level share the lowest rank.
#[derive(Debug, Clone)]
pub struct Precedence<O> {
    levels: Vec<Set<O>>,
}

impl<O> Default for Precedence<O> {
    fn default() -> Self {
        Self { levels: vec![] }
    }
}

impl<O> Precedence<O>
where
    O: Eq + Hash + fmt::Debug,
{
    /// An ordering without levels, under which any collision of distinct outputs is ambiguous.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a level ranked below all the existing ones.
    pub fn level<I>(mut self, outputs: I) -> Result<Self, AutomatonError>
    where
        I: IntoIterator<Item = O>,
    {
        let mut level = Set::default();
        for output in outputs {
            if self.levels.iter().any(|l| l.contains(&output)) {
                return Err(AutomatonError::OverlappingPrecedence {
                    output: format!("{:?}", output),
                });
            }
            level.insert(output);
        }
        self.levels.push(level);
        Ok(self)
    }

    pub fn rank(&self, output: &O) -> usize {
        self.levels
            .iter()
            .position(|level| level.contains(output))
            .unwrap_or(self.levels.len())
    }

    /// Pick the winner among the candidate outputs.
    ///
    /// Returns `Ok(None)` when there are no candidates, and the distinct
    /// outputs tied at the best rank when there is more than one of them.
    pub fn resolve<'o>(&self, candidates: &[&'o O]) -> Result<Option<&'o O>, Vec<&'o O>> {
        let mut best: Vec<&'o O> = vec![];
        let mut best_rank = usize::MAX;
        for &candidate in candidates {
            let rank = self.rank(candidate);
            if rank < best_rank {
                best_rank = rank;
                best.clear();
                best.push(candidate);
            } else if rank == best_rank && !best.contains(&candidate) {
                best.push(candidate);
            }
        }
        match best.len() {
            0 => Ok(None),
            1 => Ok(Some(best[0])),
            _ => Err(best),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_level_wins() {
        let prec = Precedence::new().level(["X"]).unwrap().level(["Y"]).unwrap();
        assert_eq!(prec.resolve(&[&"Y", &"X"]), Ok(Some(&"X")));
        assert_eq!(prec.resolve(&[&"Z", &"Y"]), Ok(Some(&"Y")));
        assert_eq!(prec.resolve(&[]), Ok(None));
    }

    #[test]
    fn ties_are_reported() {
        let prec = Precedence::new().level(["X", "Y"]).unwrap();
        assert_eq!(prec.resolve(&[&"X", &"Y"]), Err(vec![&"X", &"Y"]));
        // both absent
        assert_eq!(prec.resolve(&[&"P", &"Q", &"P"]), Err(vec![&"P", &"Q"]));
        // the same output twice is not a tie
        assert_eq!(prec.resolve(&[&"X", &"X"]), Ok(Some(&"X")));
    }

    #[test]
    fn empty_ordering_rejects_every_collision() {
        let prec = Precedence::<u8>::new();
        assert_eq!(prec.resolve(&[&1]), Ok(Some(&1)));
        assert!(prec.resolve(&[&1, &2]).is_err());
    }

    #[test]
    fn levels_must_be_disjoint() {
        assert!(matches!(
            Precedence::new().level(["X"]).unwrap().level(["Y", "X"]),
            Err(AutomatonError::OverlappingPrecedence { .. })
        ));
    }
}
