//! Deterministic finite automata.

use super::{check_class, check_state, make_alphabet, AutomatonError, InputClass, StateID};
use crate::{
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

#[derive(Debug, Clone)]
pub struct Dfa<C, O> {
    alphabet: Set<C>,
    transitions: Vec<Map<C, StateID>>,
    outputs: Map<StateID, O>,
}

impl<C, O> Dfa<C, O>
where
    C: InputClass,
{
    /// Create an automaton with `num_states` blank states.
    pub fn new<I>(num_states: usize, alphabet: I) -> Result<Self, AutomatonError>
    where
        I: IntoIterator<Item = C>,
    {
        if num_states == 0 {
            return Err(AutomatonError::NoStates);
        }
        Ok(Self {
            alphabet: make_alphabet(alphabet)?,
            transitions: vec![Map::default(); num_states],
            outputs: Map::default(),
        })
    }

    pub(crate) fn from_parts(
        alphabet: Set<C>,
        transitions: Vec<Map<C, StateID>>,
        outputs: Map<StateID, O>,
    ) -> Self {
        debug_assert!(!transitions.is_empty());
        Self {
            alphabet,
            transitions,
            outputs,
        }
    }

    pub fn num_states(&self) -> usize {
        self.transitions.len()
    }

    pub fn alphabet(&self) -> &Set<C> {
        &self.alphabet
    }

    /// Set the transition `from --class--> to`.
    ///
    /// Adding the same transition twice is harmless, but redirecting an
    /// existing transition to another state is an error.
    pub fn with_transition(
        mut self,
        from: StateID,
        class: C,
        to: StateID,
    ) -> Result<Self, AutomatonError> {
        check_state(self.num_states(), from)?;
        check_state(self.num_states(), to)?;
        check_class(&self.alphabet, &class)?;
        match self.transitions[from.index()].get(&class) {
            Some(&existing) if existing != to => Err(AutomatonError::TransitionConflict {
                state: from,
                class: format!("{:?}", class),
                existing,
                incoming: to,
            }),
            _ => {
                self.transitions[from.index()].insert(class, to);
                Ok(self)
            }
        }
    }

    /// Add a transition for every combination of source state, target state and input class.
    pub fn with_transitions<F, T, K>(
        mut self,
        froms: F,
        tos: T,
        classes: K,
    ) -> Result<Self, AutomatonError>
    where
        F: IntoIterator<Item = StateID>,
        T: IntoIterator<Item = StateID>,
        K: IntoIterator<Item = C>,
    {
        let tos: Vec<_> = tos.into_iter().collect();
        let classes: Vec<_> = classes.into_iter().collect();
        for from in froms {
            for &class in &classes {
                for &to in &tos {
                    self = self.with_transition(from, class, to)?;
                }
            }
        }
        Ok(self)
    }

    pub fn with_output(mut self, state: StateID, output: O) -> Result<Self, AutomatonError> {
        check_state(self.num_states(), state)?;
        self.outputs.insert(state, output);
        Ok(self)
    }

    pub fn with_outputs<P, I>(self, outputs: I) -> Result<Dfa<C, P>, AutomatonError>
    where
        I: IntoIterator<Item = (StateID, P)>,
    {
        let mut new_outputs = Map::default();
        for (state, output) in outputs {
            check_state(self.num_states(), state)?;
            new_outputs.insert(state, output);
        }
        Ok(Dfa {
            alphabet: self.alphabet,
            transitions: self.transitions,
            outputs: new_outputs,
        })
    }

    pub fn map_outputs<P, F>(self, mut f: F) -> Dfa<C, P>
    where
        F: FnMut(O) -> P,
    {
        Dfa {
            alphabet: self.alphabet,
            transitions: self.transitions,
            outputs: self.outputs.into_iter().map(|(s, o)| (s, f(o))).collect(),
        }
    }

    /// Renumber every state by `+k`, leaving the lowest `k` states blank.
    pub fn shift(self, k: usize) -> Self {
        if k == 0 {
            return self;
        }
        let mut transitions = vec![Map::default(); k];
        transitions.extend(self.transitions.into_iter().map(|row| {
            row.into_iter()
                .map(|(class, target)| (class, target.shifted(k)))
                .collect()
        }));
        Self {
            alphabet: self.alphabet,
            transitions,
            outputs: self
                .outputs
                .into_iter()
                .map(|(s, o)| (s.shifted(k), o))
                .collect(),
        }
    }

    pub fn prepend_states(self, k: usize) -> Self {
        self.shift(k)
    }

    pub fn append_states(mut self, k: usize) -> Self {
        let n = self.num_states() + k;
        self.transitions.resize_with(n, Map::default);
        self
    }

    /// Place the states of `other` after the states of `self`.
    pub fn merge(mut self, other: Self) -> Self {
        let other = other.shift(self.num_states());
        let n = self.num_states();
        self.alphabet.extend(other.alphabet);
        self.transitions
            .extend(other.transitions.into_iter().skip(n));
        self.outputs.extend(other.outputs);
        self
    }

    /// Return the successor of `state` on `class`.
    pub fn next(&self, state: StateID, class: C) -> Result<Option<StateID>, AutomatonError> {
        check_state(self.num_states(), state)?;
        check_class(&self.alphabet, &class)?;
        Ok(self.transitions[state.index()].get(&class).copied())
    }

    /// Return the outgoing transitions of `state`.
    pub fn transitions(
        &self,
        state: StateID,
    ) -> Result<impl Iterator<Item = (C, StateID)> + '_, AutomatonError> {
        check_state(self.num_states(), state)?;
        Ok(self.transitions[state.index()]
            .iter()
            .map(|(class, target)| (*class, *target)))
    }

    pub fn output(&self, state: StateID) -> Result<Option<&O>, AutomatonError> {
        check_state(self.num_states(), state)?;
        Ok(self.outputs.get(&state))
    }

    pub fn outputs(&self) -> impl Iterator<Item = (StateID, &O)> + '_ {
        self.outputs.iter().map(|(s, o)| (*s, o))
    }

    /// Run the automaton over the whole input.
    ///
    /// Returns the output of the state reached at the end, or `None` if
    /// the input is rejected.
    pub fn run<T, I, F>(&self, input: I, mut classify: F) -> Result<Option<&O>, AutomatonError>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> C,
    {
        let mut current = StateID::START;
        for value in input {
            match self.next(current, classify(value))? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        self.output(current)
    }
}

impl<C, O> Dfa<C, O>
where
    C: InputClass,
    O: fmt::Debug,
{
    pub fn display(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            for (i, row) in self.transitions.iter().enumerate() {
                let state = StateID::from_index(i);
                write!(f, "{}", state)?;
                if let Some(output) = self.outputs.get(&state) {
                    write!(f, " => {:?}", output)?;
                }
                writeln!(f)?;
                for (class, target) in row {
                    writeln!(f, "  - {:?} -> {}", class, target)?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(raw: u32) -> StateID {
        StateID::from_raw(raw)
    }

    // a+ b?
    fn sample() -> Dfa<char, &'static str> {
        Dfa::new(3, ['a', 'b'])
            .and_then(|d| d.with_transition(s(0), 'a', s(1)))
            .and_then(|d| d.with_transition(s(1), 'a', s(1)))
            .and_then(|d| d.with_transition(s(1), 'b', s(2)))
            .and_then(|d| d.with_output(s(1), "as"))
            .and_then(|d| d.with_output(s(2), "as-b"))
            .unwrap()
    }

    #[test]
    fn run_input() {
        let dfa = sample();
        assert_eq!(dfa.run("aaa".chars(), |c| c).unwrap(), Some(&"as"));
        assert_eq!(dfa.run("ab".chars(), |c| c).unwrap(), Some(&"as-b"));
        assert_eq!(dfa.run("".chars(), |c| c).unwrap(), None);
        assert_eq!(dfa.run("ba".chars(), |c| c).unwrap(), None);
        assert!(matches!(
            dfa.run("ax".chars(), |c| c),
            Err(AutomatonError::UnknownInputClass { .. })
        ));
    }

    #[test]
    fn display_dfa() {
        let dump = sample().display().to_string();
        assert_eq!(
            dump,
            "q0\n  - 'a' -> q1\nq1 => \"as\"\n  - 'a' -> q1\n  - 'b' -> q2\nq2 => \"as-b\"\n"
        );
    }

    #[test]
    fn redirecting_a_transition_fails() {
        let dfa = sample();
        let dfa = dfa.with_transition(s(0), 'a', s(1)).unwrap();
        assert!(matches!(
            dfa.with_transition(s(0), 'a', s(2)),
            Err(AutomatonError::TransitionConflict {
                existing,
                incoming,
                ..
            }) if existing == s(1) && incoming == s(2)
        ));
    }

    #[test]
    fn accessors_validate_arguments() {
        let dfa = sample();
        assert!(dfa.next(s(3), 'a').is_err());
        assert!(dfa.next(s(0), 'c').is_err());
        assert!(dfa.output(s(3)).is_err());
        assert!(dfa.transitions(s(3)).is_err());
        assert_eq!(dfa.next(s(0), 'b').unwrap(), None);
        assert_eq!(dfa.transitions(s(1)).unwrap().count(), 2);
    }

    #[test]
    fn merge_renumbers_second_operand() {
        let other = Dfa::new(2, ['c'])
            .and_then(|d| d.with_transition(s(0), 'c', s(1)))
            .and_then(|d| d.with_output(s(1), "c"))
            .unwrap();
        let merged = sample().merge(other);
        assert_eq!(merged.num_states(), 5);
        assert_eq!(merged.alphabet().len(), 3);
        assert_eq!(merged.next(s(3), 'c').unwrap(), Some(s(4)));
        assert_eq!(merged.output(s(4)).unwrap(), Some(&"c"));
        assert_eq!(merged.output(s(1)).unwrap(), Some(&"as"));
        // the first automaton is untouched.
        assert_eq!(merged.run("ab".chars(), |c| c).unwrap(), Some(&"as-b"));
    }

    #[test]
    fn append_and_retarget() {
        let dfa = sample().append_states(2);
        assert_eq!(dfa.num_states(), 5);
        assert_eq!(dfa.transitions(s(4)).unwrap().count(), 0);
        let dfa = dfa.map_outputs(str::len);
        assert_eq!(dfa.output(s(2)).unwrap(), Some(&4));
        let dfa = dfa.with_outputs([(s(4), ())]).unwrap();
        assert_eq!(dfa.outputs().count(), 1);
    }
}
