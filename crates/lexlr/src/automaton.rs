//! Finite automata over an abstract input-class alphabet.
//!
//! Automata are values: every structural operation consumes the
//! automaton and returns a new one, so an automaton handed out is never
//! modified afterwards.

pub mod dfa;
pub mod nfa;
pub mod precedence;
pub mod subset;

pub use self::{
    dfa::Dfa,
    nfa::{EpsilonStar, Nfa},
    precedence::Precedence,
    subset::{to_dfa, SubsetError},
};

use crate::types::Set;
use std::{fmt, hash::Hash};

/// The symbols that automata transition on.
///
/// Raw input values are mapped to input classes by a caller-supplied
/// function before they reach an automaton.
pub trait InputClass: Copy + Eq + Hash + fmt::Debug {}
impl<T> InputClass for T where T: Copy + Eq + Hash + fmt::Debug {}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID(u32);

impl StateID {
    pub const START: Self = Self(0);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn into_raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("too many automaton states"))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    fn shifted(self, k: usize) -> Self {
        Self::from_index(self.index() + k)
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// A set of automaton states.
#[derive(Debug, Default, Clone)]
pub struct StateSet {
    inner: bit_set::BitSet,
}

impl StateSet {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn contains(&self, id: StateID) -> bool {
        self.inner.contains(id.index())
    }
    pub fn insert(&mut self, id: StateID) -> bool {
        self.inner.insert(id.index())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = StateID> + '_ {
        self.inner.iter().map(StateID::from_index)
    }

    fn shifted(&self, k: usize) -> Self {
        self.iter().map(|s| s.shifted(k)).collect()
    }
}

impl PartialEq for StateSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}
impl Eq for StateSet {}

impl Hash for StateSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for id in self.iter() {
            id.hash(state);
        }
    }
}

impl FromIterator<StateID> for StateSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = StateID>,
    {
        Self {
            inner: iter.into_iter().map(StateID::index).collect(),
        }
    }
}

impl fmt::Display for StateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        crate::util::write_separated(f, self.iter(), ", ")?;
        f.write_str("}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AutomatonError {
    #[error("an automaton must have at least one state")]
    NoStates,

    #[error("the input-class alphabet must not be empty")]
    EmptyAlphabet,

    #[error("state {state} is out of range (the automaton has {num_states} states)")]
    StateOutOfRange { state: StateID, num_states: usize },

    #[error("input class `{class}' is not in the alphabet")]
    UnknownInputClass { class: String },

    #[error("{state} already moves to {existing} on `{class}', refusing {incoming}")]
    TransitionConflict {
        state: StateID,
        class: String,
        existing: StateID,
        incoming: StateID,
    },

    #[error("output `{output}' appears in more than one precedence level")]
    OverlappingPrecedence { output: String },
}

fn check_state(num_states: usize, state: StateID) -> Result<(), AutomatonError> {
    if state.index() < num_states {
        Ok(())
    } else {
        Err(AutomatonError::StateOutOfRange { state, num_states })
    }
}

fn check_class<C: InputClass>(alphabet: &Set<C>, class: &C) -> Result<(), AutomatonError> {
    if alphabet.contains(class) {
        Ok(())
    } else {
        Err(AutomatonError::UnknownInputClass {
            class: format!("{:?}", class),
        })
    }
}

fn make_alphabet<C, I>(alphabet: I) -> Result<Set<C>, AutomatonError>
where
    C: InputClass,
    I: IntoIterator<Item = C>,
{
    let alphabet: Set<C> = alphabet.into_iter().collect();
    if alphabet.is_empty() {
        return Err(AutomatonError::EmptyAlphabet);
    }
    Ok(alphabet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Map;

    #[test]
    fn state_set_equality_ignores_capacity() {
        let mut a = StateSet::new();
        a.insert(StateID::from_raw(100));
        a = a.iter().filter(|s| s.index() != 100).collect();
        a.insert(StateID::from_raw(1));

        let b: StateSet = Some(StateID::from_raw(1)).into_iter().collect();
        assert_eq!(a, b);

        let mut map = Map::default();
        map.insert(a, 0);
        assert_eq!(map.get(&b), Some(&0));
    }

    #[test]
    fn state_set_display() {
        let set: StateSet = [0, 3, 2].into_iter().map(StateID::from_raw).collect();
        assert_eq!(set.to_string(), "{q0, q2, q3}");
    }
}
